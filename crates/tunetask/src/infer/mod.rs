//! Shape inference over symbolic graphs.
//!
//! Data-input shapes are supplied by the caller; parameter shapes are derived
//! from the operator consuming them (conv weights from channel counts, dense
//! weights from feature counts, batch-norm vectors from the channel axis).
//! The pass runs once over the node list, which the builder keeps topological.

use std::collections::HashMap;

use anyhow::{anyhow, bail, ensure, Result};

use crate::graph::{Graph, InputRole, NodeRecord, Operation, TensorSpec, ValueId};
use crate::tensor::{DType, Shape};

/// Value-id to tensor-spec mapping produced by [`infer_shapes`].
#[derive(Debug, Clone, Default)]
pub struct InferredShapes {
    specs: HashMap<ValueId, TensorSpec>,
}

impl InferredShapes {
    pub fn get(&self, value: ValueId) -> Option<&TensorSpec> {
        self.specs.get(&value)
    }

    pub fn spec(&self, value: ValueId) -> Result<&TensorSpec> {
        self.specs
            .get(&value)
            .ok_or_else(|| anyhow!("value {value:?} has no inferred shape"))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn bind(&mut self, value: ValueId, expected: TensorSpec, what: &str, node: &str) -> Result<()> {
        if let Some(existing) = self.specs.get(&value) {
            ensure!(
                *existing == expected,
                "{what} of '{node}' already inferred as {:?}, conflicting with {:?}",
                existing.dims(),
                expected.dims()
            );
            return Ok(());
        }
        self.specs.insert(value, expected);
        Ok(())
    }

    fn operand(&self, value: ValueId, node: &str) -> Result<&TensorSpec> {
        self.specs
            .get(&value)
            .ok_or_else(|| anyhow!("operand {value:?} of '{node}' has no inferred shape"))
    }
}

/// Runs shape inference over `graph` with the given data-input shapes.
pub fn infer_shapes(
    graph: &Graph,
    input_shapes: &HashMap<String, Shape>,
    dtype: DType,
) -> Result<InferredShapes> {
    for name in input_shapes.keys() {
        ensure!(
            graph.input_named(name).is_some(),
            "shape provided for unknown graph input '{name}'"
        );
    }

    let mut inferred = InferredShapes::default();
    for input in graph.inputs() {
        match input.role {
            InputRole::Arg => {
                let shape = input_shapes.get(&input.name).ok_or_else(|| {
                    anyhow!("no shape provided for graph input '{}'", input.name)
                })?;
                inferred
                    .specs
                    .insert(input.value, TensorSpec::new(dtype, shape.clone()));
            }
            InputRole::Param => {}
        }
    }

    for node in graph.nodes() {
        infer_node(node, dtype, &mut inferred)?;
    }

    Ok(inferred)
}

/// Output extent of a strided window over a padded input.
fn window_out_dim(
    input: usize,
    window: usize,
    stride: usize,
    pad: usize,
    dilation: usize,
    node: &str,
) -> Result<usize> {
    ensure!(input > 0, "'{node}' requires input dims > 0");
    let effective = (window - 1)
        .checked_mul(dilation)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| anyhow!("'{node}' effective window overflow"))?;
    let padded = input
        .checked_add(pad)
        .and_then(|v| v.checked_add(pad))
        .ok_or_else(|| anyhow!("'{node}' padded dimension overflow"))?;
    ensure!(
        padded >= effective,
        "'{node}' window ({effective}) exceeds padded input ({padded})"
    );
    Ok((padded - effective) / stride + 1)
}

/// Output extent of a transposed (fractionally strided) window.
fn transposed_out_dim(
    input: usize,
    window: usize,
    stride: usize,
    pad: usize,
    output_pad: usize,
    node: &str,
) -> Result<usize> {
    ensure!(input > 0, "'{node}' requires input dims > 0");
    let base = (input - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(window))
        .and_then(|v| v.checked_add(output_pad))
        .ok_or_else(|| anyhow!("'{node}' output dimension overflow"))?;
    ensure!(
        base > 2 * pad,
        "'{node}' padding ({pad}) consumes the whole output extent ({base})"
    );
    Ok(base - 2 * pad)
}

fn infer_node(node: &NodeRecord, dtype: DType, inferred: &mut InferredShapes) -> Result<()> {
    let name = node.name.as_str();
    let output = match &node.op {
        Operation::Conv2d(spec) => {
            let expected_operands = if spec.use_bias { 3 } else { 2 };
            ensure!(
                node.operands.len() == expected_operands,
                "conv2d '{name}' expects {expected_operands} operands"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                data.shape.rank() == 4,
                "conv2d '{name}' expects 4-D input, got rank {}",
                data.shape.rank()
            );
            let dims = data.dims();
            let n = dims[spec.layout.batch_axis()];
            let c_in = dims[spec.layout.channel_axis()];
            let [h_axis, w_axis] = spec.layout.spatial_axes();
            ensure!(
                c_in % spec.groups == 0,
                "conv2d '{name}' input channels ({c_in}) must be divisible by groups ({})",
                spec.groups
            );

            let weight_shape =
                Shape::new([spec.channels, c_in / spec.groups, spec.kernel[0], spec.kernel[1]]);
            inferred.bind(
                node.operands[1],
                TensorSpec::new(dtype, weight_shape),
                "weight",
                name,
            )?;
            if spec.use_bias {
                inferred.bind(
                    node.operands[2],
                    TensorSpec::new(dtype, Shape::new([spec.channels])),
                    "bias",
                    name,
                )?;
            }

            let out_h = window_out_dim(
                dims[h_axis],
                spec.kernel[0],
                spec.strides[0],
                spec.padding[0],
                spec.dilation[0],
                name,
            )?;
            let out_w = window_out_dim(
                dims[w_axis],
                spec.kernel[1],
                spec.strides[1],
                spec.padding[1],
                spec.dilation[1],
                name,
            )?;
            TensorSpec::new(
                dtype,
                Shape::new(spec.layout.make_dims(n, spec.channels, out_h, out_w)),
            )
        }
        Operation::Conv2dTranspose(spec) => {
            let expected_operands = if spec.use_bias { 3 } else { 2 };
            ensure!(
                node.operands.len() == expected_operands,
                "conv2d_transpose '{name}' expects {expected_operands} operands"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                data.shape.rank() == 4,
                "conv2d_transpose '{name}' expects 4-D input, got rank {}",
                data.shape.rank()
            );
            let dims = data.dims();
            let n = dims[spec.layout.batch_axis()];
            let c_in = dims[spec.layout.channel_axis()];
            let [h_axis, w_axis] = spec.layout.spatial_axes();

            let weight_shape =
                Shape::new([c_in, spec.channels, spec.kernel[0], spec.kernel[1]]);
            inferred.bind(
                node.operands[1],
                TensorSpec::new(dtype, weight_shape),
                "weight",
                name,
            )?;
            if spec.use_bias {
                inferred.bind(
                    node.operands[2],
                    TensorSpec::new(dtype, Shape::new([spec.channels])),
                    "bias",
                    name,
                )?;
            }

            let out_h = transposed_out_dim(
                dims[h_axis],
                spec.kernel[0],
                spec.strides[0],
                spec.padding[0],
                spec.output_padding[0],
                name,
            )?;
            let out_w = transposed_out_dim(
                dims[w_axis],
                spec.kernel[1],
                spec.strides[1],
                spec.padding[1],
                spec.output_padding[1],
                name,
            )?;
            TensorSpec::new(
                dtype,
                Shape::new(spec.layout.make_dims(n, spec.channels, out_h, out_w)),
            )
        }
        Operation::Dense(spec) => {
            let expected_operands = if spec.use_bias { 3 } else { 2 };
            ensure!(
                node.operands.len() == expected_operands,
                "dense '{name}' expects {expected_operands} operands"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                data.shape.rank() == 2,
                "dense '{name}' expects [N, K] input, got rank {}",
                data.shape.rank()
            );
            let n = data.dims()[0];
            let in_features = data.dims()[1];

            inferred.bind(
                node.operands[1],
                TensorSpec::new(dtype, Shape::new([spec.units, in_features])),
                "weight",
                name,
            )?;
            if spec.use_bias {
                inferred.bind(
                    node.operands[2],
                    TensorSpec::new(dtype, Shape::new([spec.units])),
                    "bias",
                    name,
                )?;
            }

            TensorSpec::new(dtype, Shape::new([n, spec.units]))
        }
        Operation::BatchNorm(spec) => {
            ensure!(
                node.operands.len() == 5,
                "batch_norm '{name}' expects data plus four parameter vectors"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                spec.axis < data.shape.rank(),
                "batch_norm '{name}' axis {} out of range for rank {}",
                spec.axis,
                data.shape.rank()
            );
            let channels = data.dims()[spec.axis];
            for (operand, what) in node.operands[1..].iter().zip([
                "gamma",
                "beta",
                "moving_mean",
                "moving_var",
            ]) {
                inferred.bind(
                    *operand,
                    TensorSpec::new(dtype, Shape::new([channels])),
                    what,
                    name,
                )?;
            }
            data
        }
        Operation::Activation(_) | Operation::Dropout(_) => {
            ensure!(
                node.operands.len() == 1,
                "'{name}' expects exactly one operand"
            );
            inferred.operand(node.operands[0], name)?.clone()
        }
        Operation::Softmax(spec) => {
            ensure!(
                node.operands.len() == 1,
                "softmax '{name}' expects exactly one operand"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            let rank = data.shape.rank() as isize;
            let axis = if spec.axis < 0 { spec.axis + rank } else { spec.axis };
            ensure!(
                (0..rank).contains(&axis),
                "softmax '{name}' axis {} out of range for rank {rank}",
                spec.axis
            );
            data
        }
        Operation::MaxPool2d(spec) | Operation::AvgPool2d(spec) => {
            ensure!(
                node.operands.len() == 1,
                "pool '{name}' expects exactly one operand"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                data.shape.rank() == 4,
                "pool '{name}' expects 4-D input, got rank {}",
                data.shape.rank()
            );
            let dims = data.dims();
            let n = dims[spec.layout.batch_axis()];
            let c = dims[spec.layout.channel_axis()];
            let [h_axis, w_axis] = spec.layout.spatial_axes();
            let out_h = window_out_dim(
                dims[h_axis],
                spec.window[0],
                spec.strides[0],
                spec.padding[0],
                1,
                name,
            )?;
            let out_w = window_out_dim(
                dims[w_axis],
                spec.window[1],
                spec.strides[1],
                spec.padding[1],
                1,
                name,
            )?;
            TensorSpec::new(dtype, Shape::new(spec.layout.make_dims(n, c, out_h, out_w)))
        }
        Operation::GlobalAvgPool2d { layout } => {
            ensure!(
                node.operands.len() == 1,
                "global_avg_pool2d '{name}' expects exactly one operand"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                data.shape.rank() == 4,
                "global_avg_pool2d '{name}' expects 4-D input, got rank {}",
                data.shape.rank()
            );
            let dims = data.dims();
            let n = dims[layout.batch_axis()];
            let c = dims[layout.channel_axis()];
            TensorSpec::new(dtype, Shape::new(layout.make_dims(n, c, 1, 1)))
        }
        Operation::ElementwiseBinary(_) => {
            ensure!(
                node.operands.len() == 2,
                "elementwise '{name}' expects exactly two operands"
            );
            let lhs = inferred.operand(node.operands[0], name)?.clone();
            let rhs = inferred.operand(node.operands[1], name)?;
            ensure!(
                lhs.shape == rhs.shape,
                "elementwise '{name}' operands must share shape ({:?} vs {:?})",
                lhs.dims(),
                rhs.dims()
            );
            ensure!(
                lhs.dtype == rhs.dtype,
                "elementwise '{name}' operands must share dtype"
            );
            lhs
        }
        Operation::Concat(spec) => {
            ensure!(
                !node.operands.is_empty(),
                "concat '{name}' requires at least one operand"
            );
            let first = inferred.operand(node.operands[0], name)?.clone();
            ensure!(
                spec.axis < first.shape.rank(),
                "concat '{name}' axis {} out of range for rank {}",
                spec.axis,
                first.shape.rank()
            );
            let mut result_dims = first.dims().to_vec();
            for operand in &node.operands[1..] {
                let rhs = inferred.operand(*operand, name)?;
                ensure!(
                    rhs.shape.rank() == first.shape.rank(),
                    "concat '{name}' rank mismatch"
                );
                for (axis, (&lhs_dim, &rhs_dim)) in
                    first.dims().iter().zip(rhs.dims().iter()).enumerate()
                {
                    if axis == spec.axis {
                        continue;
                    }
                    ensure!(
                        lhs_dim == rhs_dim,
                        "concat '{name}' dimension mismatch at axis {axis}"
                    );
                }
                result_dims[spec.axis] += rhs.dims()[spec.axis];
            }
            TensorSpec::new(dtype, Shape::new(result_dims))
        }
        Operation::Flatten => {
            ensure!(
                node.operands.len() == 1,
                "flatten '{name}' expects exactly one operand"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            let dims = data.dims();
            let rest: usize = dims[1..].iter().product();
            TensorSpec::new(dtype, Shape::new([dims[0], rest]))
        }
        Operation::Reshape(spec) => {
            ensure!(
                node.operands.len() == 1,
                "reshape '{name}' expects exactly one operand"
            );
            let data = inferred.operand(node.operands[0], name)?.clone();
            let total = data.shape.num_elements();
            let known: usize = spec
                .new_shape
                .iter()
                .filter(|&&d| d != -1)
                .map(|&d| d as usize)
                .product();
            let mut dims = Vec::with_capacity(spec.new_shape.len());
            for &dim in &spec.new_shape {
                if dim == -1 {
                    ensure!(
                        known > 0 && total % known == 0,
                        "reshape '{name}' cannot infer wildcard: {total} elements vs {known} known"
                    );
                    dims.push(total / known);
                } else {
                    dims.push(dim as usize);
                }
            }
            let product: usize = dims.iter().product();
            ensure!(
                product == total,
                "reshape '{name}' requires the same number of elements (got {total} vs {product})"
            );
            TensorSpec::new(dtype, Shape::new(dims))
        }
    };

    if inferred.specs.insert(node.value, output).is_some() {
        bail!("value {:?} inferred twice", node.value);
    }
    Ok(())
}
