//! SqueezeNet: fire modules with squeeze/expand convolutions.

use anyhow::{bail, Result};

use crate::graph::{Conv2dSpec, GraphBuilder, Layout, Pool2dSpec, ValueId};
use crate::tensor::Shape;

use super::registry::{workload_from_graph, NetworkWorkload};

const NUM_CLASSES: usize = 1000;

fn conv_relu(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    spec: Conv2dSpec,
) -> Result<ValueId> {
    let conv = g.conv2d(name, data, spec)?;
    Ok(g.relu(&format!("{name}_relu"), conv))
}

/// Fire module: 1x1 squeeze, then parallel 1x1 and 3x3 expands concatenated
/// along the channel axis.
fn fire_module(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    squeeze: usize,
    expand: usize,
) -> Result<ValueId> {
    let squeezed = conv_relu(
        g,
        &format!("{name}_squeeze1x1"),
        data,
        Conv2dSpec::new(squeeze, [1, 1], [1, 1], [0, 0]).with_bias(),
    )?;
    let left = conv_relu(
        g,
        &format!("{name}_expand1x1"),
        squeezed,
        Conv2dSpec::new(expand, [1, 1], [1, 1], [0, 0]).with_bias(),
    )?;
    let right = conv_relu(
        g,
        &format!("{name}_expand3x3"),
        squeezed,
        Conv2dSpec::new(expand, [3, 3], [1, 1], [1, 1]).with_bias(),
    )?;
    g.concat(&format!("{name}_concat"), vec![left, right], 1)
}

fn pool(g: &mut GraphBuilder, name: &str, data: ValueId) -> Result<ValueId> {
    g.max_pool2d(name, data, Pool2dSpec::new([3, 3], [2, 2], [0, 0]))
}

pub fn get_workload(batch_size: usize, version: &str) -> Result<NetworkWorkload> {
    let mut g = GraphBuilder::new();
    let data = g.input("data")?;

    let mut x = match version {
        "1.0" => {
            let mut x = conv_relu(
                &mut g,
                "conv1",
                data,
                Conv2dSpec::new(96, [7, 7], [2, 2], [0, 0]).with_bias(),
            )?;
            x = pool(&mut g, "pool1", x)?;
            x = fire_module(&mut g, "fire2", x, 16, 64)?;
            x = fire_module(&mut g, "fire3", x, 16, 64)?;
            x = fire_module(&mut g, "fire4", x, 32, 128)?;
            x = pool(&mut g, "pool4", x)?;
            x = fire_module(&mut g, "fire5", x, 32, 128)?;
            x = fire_module(&mut g, "fire6", x, 48, 192)?;
            x = fire_module(&mut g, "fire7", x, 48, 192)?;
            x = fire_module(&mut g, "fire8", x, 64, 256)?;
            x = pool(&mut g, "pool8", x)?;
            fire_module(&mut g, "fire9", x, 64, 256)?
        }
        "1.1" => {
            let mut x = conv_relu(
                &mut g,
                "conv1",
                data,
                Conv2dSpec::new(64, [3, 3], [2, 2], [0, 0]).with_bias(),
            )?;
            x = pool(&mut g, "pool1", x)?;
            x = fire_module(&mut g, "fire2", x, 16, 64)?;
            x = fire_module(&mut g, "fire3", x, 16, 64)?;
            x = pool(&mut g, "pool3", x)?;
            x = fire_module(&mut g, "fire4", x, 32, 128)?;
            x = fire_module(&mut g, "fire5", x, 32, 128)?;
            x = pool(&mut g, "pool5", x)?;
            x = fire_module(&mut g, "fire6", x, 48, 192)?;
            x = fire_module(&mut g, "fire7", x, 48, 192)?;
            x = fire_module(&mut g, "fire8", x, 64, 256)?;
            fire_module(&mut g, "fire9", x, 64, 256)?
        }
        other => bail!("unsupported squeezenet version: {other}"),
    };

    x = g.dropout("drop9", x, 0.5);
    x = conv_relu(
        &mut g,
        "conv10",
        x,
        Conv2dSpec::new(NUM_CLASSES, [1, 1], [1, 1], [0, 0]).with_bias(),
    )?;
    x = g.global_avg_pool2d("pool10", x, Layout::Nchw);
    x = g.flatten("flatten", x);
    let out = g.softmax("softmax", x);

    workload_from_graph(
        g.finish([out]),
        "data",
        Shape::new([batch_size, 3, 224, 224]),
        Some(Shape::new([batch_size, NUM_CLASSES])),
    )
}
