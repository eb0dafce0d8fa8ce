//! Operator and value definitions for the symbolic computation graph.
//!
//! Every operator the reference networks use is described by a spec struct
//! carrying its static attributes. Shapes are deliberately absent here: data
//! shapes arrive at inference time and parameter shapes are derived from the
//! consuming operator (see [`crate::infer`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tensor::{DType, Shape};

/// Dense identifier for a value produced by a graph input or operator node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ValueId(pub u32);

/// Dtype plus fully static shape of a graph value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorSpec {
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self { dtype, shape }
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }
}

/// Memory layout of 4-D activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    Nchw,
    Nhwc,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Nchw => "NCHW",
            Layout::Nhwc => "NHWC",
        }
    }

    pub fn batch_axis(self) -> usize {
        0
    }

    pub fn channel_axis(self) -> usize {
        match self {
            Layout::Nchw => 1,
            Layout::Nhwc => 3,
        }
    }

    /// Height and width axes, in that order.
    pub fn spatial_axes(self) -> [usize; 2] {
        match self {
            Layout::Nchw => [2, 3],
            Layout::Nhwc => [1, 2],
        }
    }

    /// Assembles a 4-D dim vector from its logical components.
    pub fn make_dims(self, n: usize, c: usize, h: usize, w: usize) -> Vec<usize> {
        match self {
            Layout::Nchw => vec![n, c, h, w],
            Layout::Nhwc => vec![n, h, w, c],
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elementwise activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationOp {
    Relu,
    LeakyRelu { alpha: f32 },
    Sigmoid,
    Tanh,
}

/// Elementwise binary arithmetic between same-shaped operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementwiseBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Static attributes of a (possibly grouped) 2-D convolution.
///
/// Weights follow the canonical OIHW layout `[C_out, C_in/groups, KH, KW]`
/// regardless of the activation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conv2dSpec {
    pub channels: usize,
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub padding: [usize; 2],
    pub dilation: [usize; 2],
    pub groups: usize,
    pub layout: Layout,
    pub use_bias: bool,
}

impl Conv2dSpec {
    pub fn new(channels: usize, kernel: [usize; 2], strides: [usize; 2], padding: [usize; 2]) -> Self {
        Self {
            channels,
            kernel,
            strides,
            padding,
            dilation: [1, 1],
            groups: 1,
            layout: Layout::Nchw,
            use_bias: false,
        }
    }

    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_bias(mut self) -> Self {
        self.use_bias = true;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
}

/// Static attributes of a 2-D transposed convolution.
///
/// Weights use the IOHW layout `[C_in, C_out, KH, KW]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conv2dTransposeSpec {
    pub channels: usize,
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub padding: [usize; 2],
    pub output_padding: [usize; 2],
    pub layout: Layout,
    pub use_bias: bool,
}

impl Conv2dTransposeSpec {
    pub fn new(channels: usize, kernel: [usize; 2], strides: [usize; 2], padding: [usize; 2]) -> Self {
        Self {
            channels,
            kernel,
            strides,
            padding,
            output_padding: [0, 0],
            layout: Layout::Nchw,
            use_bias: false,
        }
    }
}

/// Fully-connected layer attributes; weights are `[units, in_features]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DenseSpec {
    pub units: usize,
    pub use_bias: bool,
}

impl DenseSpec {
    pub fn new(units: usize) -> Self {
        Self {
            units,
            use_bias: true,
        }
    }
}

/// Batch normalisation over the channel axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchNormSpec {
    pub epsilon: f32,
    pub axis: usize,
}

impl Default for BatchNormSpec {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            axis: 1,
        }
    }
}

/// Windowed 2-D pooling attributes, shared by max and average pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pool2dSpec {
    pub window: [usize; 2],
    pub strides: [usize; 2],
    pub padding: [usize; 2],
    pub layout: Layout,
}

impl Pool2dSpec {
    pub fn new(window: [usize; 2], strides: [usize; 2], padding: [usize; 2]) -> Self {
        Self {
            window,
            strides,
            padding,
            layout: Layout::Nchw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcatSpec {
    pub axis: usize,
}

/// Target dims for reshape; a single `-1` entry is inferred from the rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReshapeSpec {
    pub new_shape: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoftmaxSpec {
    pub axis: isize,
}

impl Default for SoftmaxSpec {
    fn default() -> Self {
        Self { axis: -1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropoutSpec {
    pub rate: f32,
}

/// Operator attached to a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Conv2d(Conv2dSpec),
    Conv2dTranspose(Conv2dTransposeSpec),
    Dense(DenseSpec),
    BatchNorm(BatchNormSpec),
    Activation(ActivationOp),
    Softmax(SoftmaxSpec),
    MaxPool2d(Pool2dSpec),
    AvgPool2d(Pool2dSpec),
    GlobalAvgPool2d { layout: Layout },
    ElementwiseBinary(ElementwiseBinaryOp),
    Concat(ConcatSpec),
    Flatten,
    Reshape(ReshapeSpec),
    Dropout(DropoutSpec),
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Conv2d(_) => OpKind::Conv2d,
            Operation::Conv2dTranspose(_) => OpKind::Conv2dTranspose,
            Operation::Dense(_) => OpKind::Dense,
            Operation::BatchNorm(_) => OpKind::BatchNorm,
            Operation::Activation(_) => OpKind::Activation,
            Operation::Softmax(_) => OpKind::Softmax,
            Operation::MaxPool2d(_) => OpKind::MaxPool2d,
            Operation::AvgPool2d(_) => OpKind::AvgPool2d,
            Operation::GlobalAvgPool2d { .. } => OpKind::GlobalAvgPool2d,
            Operation::ElementwiseBinary(_) => OpKind::ElementwiseBinary,
            Operation::Concat(_) => OpKind::Concat,
            Operation::Flatten => OpKind::Flatten,
            Operation::Reshape(_) => OpKind::Reshape,
            Operation::Dropout(_) => OpKind::Dropout,
        }
    }
}

/// Operator-kind tag used as the symbol filter during task extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Conv2d,
    Conv2dTranspose,
    Dense,
    BatchNorm,
    Activation,
    Softmax,
    MaxPool2d,
    AvgPool2d,
    GlobalAvgPool2d,
    ElementwiseBinary,
    Concat,
    Flatten,
    Reshape,
    Dropout,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Conv2d => "conv2d",
            OpKind::Conv2dTranspose => "conv2d_transpose",
            OpKind::Dense => "dense",
            OpKind::BatchNorm => "batch_norm",
            OpKind::Activation => "activation",
            OpKind::Softmax => "softmax",
            OpKind::MaxPool2d => "max_pool2d",
            OpKind::AvgPool2d => "avg_pool2d",
            OpKind::GlobalAvgPool2d => "global_avg_pool2d",
            OpKind::ElementwiseBinary => "elementwise_binary",
            OpKind::Concat => "concat",
            OpKind::Flatten => "flatten",
            OpKind::Reshape => "reshape",
            OpKind::Dropout => "dropout",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
