//! Reference network topologies used as task-extraction fixtures.
//!
//! Each module exposes a `get_workload` constructor mirroring the model-zoo
//! convention: build the symbolic graph, infer shapes once against the
//! canonical input, and return the graph together with its parameter specs.

pub mod dcgan;
pub mod mobilenet;
mod params;
pub mod registry;
pub mod resnet;
pub mod squeezenet;
pub mod vgg;

pub use params::ParamSet;
pub use registry::{get_network, network_names, NetworkWorkload};
