//! Task extraction: turning graph nodes into tunable workload descriptors.

mod extract;
mod target;
mod workload;

pub use extract::{extract_from_graph, Task};
pub use target::Target;
pub use workload::Workload;
