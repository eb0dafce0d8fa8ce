//! Symbolic computation-graph infrastructure.
//!
//! The graph layer records operator nodes and named inputs in arena order,
//! allowing the model zoo to stitch network topologies without materialising
//! any tensor data. Builders declare inputs and emit operators; the walker
//! traverses finished graphs for inference and task extraction.

mod builder;
pub mod spec;
mod state;
mod walker;

pub use builder::GraphBuilder;
pub use spec::{
    ActivationOp, BatchNormSpec, ConcatSpec, Conv2dSpec, Conv2dTransposeSpec, DenseSpec,
    DropoutSpec, ElementwiseBinaryOp, Layout, OpKind, Operation, Pool2dSpec, ReshapeSpec,
    SoftmaxSpec, TensorSpec, ValueId,
};
pub use state::{Graph, GraphError, InputRecord, InputRole, NodeRecord};
pub use walker::{walk_graph, GraphVisitor};
