//! MobileNet v1: depthwise-separable convolution stacks.

use anyhow::Result;

use crate::graph::{
    BatchNormSpec, Conv2dSpec, DenseSpec, GraphBuilder, Layout, ValueId,
};
use crate::tensor::Shape;

use super::registry::{workload_from_graph, NetworkWorkload};

/// (input channels, output channels, depthwise stride) per separable block.
const BLOCKS: [(usize, usize, usize); 13] = [
    (32, 64, 1),
    (64, 128, 2),
    (128, 128, 1),
    (128, 256, 2),
    (256, 256, 1),
    (256, 512, 2),
    (512, 512, 1),
    (512, 512, 1),
    (512, 512, 1),
    (512, 512, 1),
    (512, 512, 1),
    (512, 1024, 2),
    (1024, 1024, 1),
];

const NUM_CLASSES: usize = 1000;

fn conv_block(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    spec: Conv2dSpec,
) -> Result<ValueId> {
    let conv = g.conv2d(&format!("{name}_conv"), data, spec)?;
    let bn = g.batch_norm(&format!("{name}_bn"), conv, BatchNormSpec::default())?;
    Ok(g.relu(&format!("{name}_relu"), bn))
}

/// Depthwise 3x3 (groups == channels) followed by a 1x1 pointwise projection.
fn separable_conv_block(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    in_channels: usize,
    out_channels: usize,
    stride: usize,
) -> Result<ValueId> {
    let depthwise = conv_block(
        g,
        &format!("{name}_depthwise"),
        data,
        Conv2dSpec::new(in_channels, [3, 3], [stride, stride], [1, 1]).with_groups(in_channels),
    )?;
    conv_block(
        g,
        &format!("{name}_pointwise"),
        depthwise,
        Conv2dSpec::new(out_channels, [1, 1], [1, 1], [0, 0]),
    )
}

pub fn get_workload(batch_size: usize) -> Result<NetworkWorkload> {
    let mut g = GraphBuilder::new();
    let data = g.input("data")?;
    let mut x = conv_block(
        &mut g,
        "conv_block_1",
        data,
        Conv2dSpec::new(32, [3, 3], [2, 2], [1, 1]),
    )?;

    for (idx, (in_channels, out_channels, stride)) in BLOCKS.iter().copied().enumerate() {
        let name = format!("separable_conv_block_{}", idx + 2);
        x = separable_conv_block(&mut g, &name, x, in_channels, out_channels, stride)?;
    }

    x = g.global_avg_pool2d("pool", x, Layout::Nchw);
    x = g.flatten("flatten", x);
    x = g.dense("fc", x, DenseSpec::new(NUM_CLASSES))?;
    let out = g.softmax("softmax", x);

    workload_from_graph(
        g.finish([out]),
        "data",
        Shape::new([batch_size, 3, 224, 224]),
        Some(Shape::new([batch_size, NUM_CLASSES])),
    )
}
