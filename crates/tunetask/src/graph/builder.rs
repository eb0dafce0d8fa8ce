//! Mutable builder used to stage operators into a [`Graph`].

use anyhow::{ensure, Result};

use super::spec::{
    ActivationOp, BatchNormSpec, ConcatSpec, Conv2dSpec, Conv2dTransposeSpec, DenseSpec,
    DropoutSpec, ElementwiseBinaryOp, Layout, Operation, Pool2dSpec, ReshapeSpec, SoftmaxSpec,
    ValueId,
};
use super::state::{Graph, InputRecord, InputRole, NodeRecord};

/// Builds a [`Graph`] one operator at a time.
///
/// The per-operator helpers declare their own parameter inputs using the
/// `<name>_weight` / `<name>_bias` / `<name>_gamma` naming the reference zoo
/// expects, so a network definition reads as a flat sequence of layer calls.
pub struct GraphBuilder {
    graph: Graph,
    next_value: u32,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::default(),
            next_value: 0,
        }
    }

    fn allocate_value(&mut self) -> ValueId {
        let value = ValueId(self.next_value);
        self.next_value += 1;
        value
    }

    /// Declares a caller-supplied data input (e.g. `"data"`).
    pub fn input(&mut self, name: &str) -> Result<ValueId> {
        self.declare_input(name, InputRole::Arg)
    }

    /// Declares a learned parameter input.
    pub fn param(&mut self, name: &str) -> Result<ValueId> {
        self.declare_input(name, InputRole::Param)
    }

    fn declare_input(&mut self, name: &str, role: InputRole) -> Result<ValueId> {
        let value = self.allocate_value();
        self.graph.push_input(InputRecord {
            value,
            name: name.to_string(),
            role,
        })?;
        Ok(value)
    }

    /// Emits a new operator node and returns its output value identifier.
    /// Insertion order is preserved, keeping the node list topological.
    pub fn emit(&mut self, name: &str, op: Operation, operands: Vec<ValueId>) -> ValueId {
        let value = self.allocate_value();
        self.graph.push_node(NodeRecord {
            value,
            name: name.to_string(),
            op,
            operands,
        });
        value
    }

    pub fn conv2d(&mut self, name: &str, data: ValueId, spec: Conv2dSpec) -> Result<ValueId> {
        ensure!(spec.channels > 0, "conv2d '{name}' channels must be > 0");
        ensure!(spec.groups > 0, "conv2d '{name}' groups must be > 0");
        ensure!(
            spec.channels % spec.groups == 0,
            "conv2d '{name}' channels ({}) must be divisible by groups ({})",
            spec.channels,
            spec.groups
        );
        ensure!(
            spec.kernel.iter().all(|&k| k > 0) && spec.strides.iter().all(|&s| s > 0),
            "conv2d '{name}' kernel and strides must be > 0"
        );
        ensure!(
            spec.dilation.iter().all(|&d| d > 0),
            "conv2d '{name}' dilation must be > 0"
        );

        let weight = self.param(&format!("{name}_weight"))?;
        let mut operands = vec![data, weight];
        if spec.use_bias {
            operands.push(self.param(&format!("{name}_bias"))?);
        }
        Ok(self.emit(name, Operation::Conv2d(spec), operands))
    }

    pub fn conv2d_transpose(
        &mut self,
        name: &str,
        data: ValueId,
        spec: Conv2dTransposeSpec,
    ) -> Result<ValueId> {
        ensure!(
            spec.channels > 0,
            "conv2d_transpose '{name}' channels must be > 0"
        );
        ensure!(
            spec.kernel.iter().all(|&k| k > 0) && spec.strides.iter().all(|&s| s > 0),
            "conv2d_transpose '{name}' kernel and strides must be > 0"
        );

        let weight = self.param(&format!("{name}_weight"))?;
        let mut operands = vec![data, weight];
        if spec.use_bias {
            operands.push(self.param(&format!("{name}_bias"))?);
        }
        Ok(self.emit(name, Operation::Conv2dTranspose(spec), operands))
    }

    pub fn dense(&mut self, name: &str, data: ValueId, spec: DenseSpec) -> Result<ValueId> {
        ensure!(spec.units > 0, "dense '{name}' units must be > 0");

        let weight = self.param(&format!("{name}_weight"))?;
        let mut operands = vec![data, weight];
        if spec.use_bias {
            operands.push(self.param(&format!("{name}_bias"))?);
        }
        Ok(self.emit(name, Operation::Dense(spec), operands))
    }

    /// Declares the four batch-norm parameter vectors alongside the node.
    pub fn batch_norm(&mut self, name: &str, data: ValueId, spec: BatchNormSpec) -> Result<ValueId> {
        let gamma = self.param(&format!("{name}_gamma"))?;
        let beta = self.param(&format!("{name}_beta"))?;
        let moving_mean = self.param(&format!("{name}_moving_mean"))?;
        let moving_var = self.param(&format!("{name}_moving_var"))?;
        Ok(self.emit(
            name,
            Operation::BatchNorm(spec),
            vec![data, gamma, beta, moving_mean, moving_var],
        ))
    }

    pub fn activation(&mut self, name: &str, data: ValueId, op: ActivationOp) -> ValueId {
        self.emit(name, Operation::Activation(op), vec![data])
    }

    pub fn relu(&mut self, name: &str, data: ValueId) -> ValueId {
        self.activation(name, data, ActivationOp::Relu)
    }

    pub fn leaky_relu(&mut self, name: &str, data: ValueId, alpha: f32) -> ValueId {
        self.activation(name, data, ActivationOp::LeakyRelu { alpha })
    }

    pub fn tanh(&mut self, name: &str, data: ValueId) -> ValueId {
        self.activation(name, data, ActivationOp::Tanh)
    }

    pub fn softmax(&mut self, name: &str, data: ValueId) -> ValueId {
        self.emit(name, Operation::Softmax(SoftmaxSpec::default()), vec![data])
    }

    pub fn max_pool2d(&mut self, name: &str, data: ValueId, spec: Pool2dSpec) -> Result<ValueId> {
        ensure!(
            spec.window.iter().all(|&w| w > 0) && spec.strides.iter().all(|&s| s > 0),
            "max_pool2d '{name}' window and strides must be > 0"
        );
        Ok(self.emit(name, Operation::MaxPool2d(spec), vec![data]))
    }

    pub fn avg_pool2d(&mut self, name: &str, data: ValueId, spec: Pool2dSpec) -> Result<ValueId> {
        ensure!(
            spec.window.iter().all(|&w| w > 0) && spec.strides.iter().all(|&s| s > 0),
            "avg_pool2d '{name}' window and strides must be > 0"
        );
        Ok(self.emit(name, Operation::AvgPool2d(spec), vec![data]))
    }

    pub fn global_avg_pool2d(&mut self, name: &str, data: ValueId, layout: Layout) -> ValueId {
        self.emit(name, Operation::GlobalAvgPool2d { layout }, vec![data])
    }

    pub fn add(&mut self, name: &str, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit(
            name,
            Operation::ElementwiseBinary(ElementwiseBinaryOp::Add),
            vec![lhs, rhs],
        )
    }

    pub fn concat(&mut self, name: &str, operands: Vec<ValueId>, axis: usize) -> Result<ValueId> {
        ensure!(
            !operands.is_empty(),
            "concat '{name}' requires at least one operand"
        );
        Ok(self.emit(name, Operation::Concat(ConcatSpec { axis }), operands))
    }

    pub fn flatten(&mut self, name: &str, data: ValueId) -> ValueId {
        self.emit(name, Operation::Flatten, vec![data])
    }

    pub fn reshape(&mut self, name: &str, data: ValueId, new_shape: Vec<i64>) -> Result<ValueId> {
        let wildcards = new_shape.iter().filter(|&&d| d == -1).count();
        ensure!(
            wildcards <= 1,
            "reshape '{name}' admits at most one -1 wildcard"
        );
        ensure!(
            new_shape.iter().all(|&d| d == -1 || d > 0),
            "reshape '{name}' dims must be positive or -1"
        );
        Ok(self.emit(name, Operation::Reshape(ReshapeSpec { new_shape }), vec![data]))
    }

    pub fn dropout(&mut self, name: &str, data: ValueId, rate: f32) -> ValueId {
        self.emit(name, Operation::Dropout(DropoutSpec { rate }), vec![data])
    }

    /// Finalises the graph with its declared outputs.
    pub fn finish(mut self, outputs: impl Into<Vec<ValueId>>) -> Graph {
        self.graph.set_outputs(outputs.into());
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
