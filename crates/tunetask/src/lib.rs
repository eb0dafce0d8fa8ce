//! Tunable-task extraction for neural-network computation graphs.
//!
//! The crate builds symbolic operator graphs (a small model zoo of reference
//! networks is included), infers every value shape from the data-input shapes,
//! and extracts the deduplicated set of tunable workloads an autotuner would
//! search over.

pub mod graph;
pub mod hashing;
pub mod infer;
pub mod model;
pub mod task;
pub mod tensor;

pub use graph::{Graph, GraphBuilder, OpKind};
pub use task::{extract_from_graph, Target, Task, Workload};
pub use tensor::{DType, Shape, Tensor};
