//! Basic-block residual networks (18 and 34 layer variants).

use anyhow::{bail, Result};

use crate::graph::{
    BatchNormSpec, Conv2dSpec, DenseSpec, GraphBuilder, Layout, Pool2dSpec, ValueId,
};
use crate::tensor::Shape;

use super::registry::{workload_from_graph, NetworkWorkload};

const FILTERS: [usize; 4] = [64, 128, 256, 512];
const NUM_CLASSES: usize = 1000;

fn stage_units(num_layers: usize) -> Result<[usize; 4]> {
    match num_layers {
        18 => Ok([2, 2, 2, 2]),
        34 => Ok([3, 4, 6, 3]),
        other => bail!("unsupported resnet depth: {other}"),
    }
}

fn batch_norm_spec() -> BatchNormSpec {
    BatchNormSpec {
        epsilon: 2e-5,
        ..Default::default()
    }
}

/// Pre-activation residual unit. The first unit of a stage downsamples and
/// projects the shortcut with a strided 1x1 convolution.
fn residual_unit(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    filters: usize,
    stride: usize,
    dim_match: bool,
) -> Result<ValueId> {
    let bn1 = g.batch_norm(&format!("{name}_bn1"), data, batch_norm_spec())?;
    let act1 = g.relu(&format!("{name}_relu1"), bn1);
    let conv1 = g.conv2d(
        &format!("{name}_conv1"),
        act1,
        Conv2dSpec::new(filters, [3, 3], [stride, stride], [1, 1]),
    )?;
    let bn2 = g.batch_norm(&format!("{name}_bn2"), conv1, batch_norm_spec())?;
    let act2 = g.relu(&format!("{name}_relu2"), bn2);
    let conv2 = g.conv2d(
        &format!("{name}_conv2"),
        act2,
        Conv2dSpec::new(filters, [3, 3], [1, 1], [1, 1]),
    )?;

    let shortcut = if dim_match {
        data
    } else {
        g.conv2d(
            &format!("{name}_sc"),
            act1,
            Conv2dSpec::new(filters, [1, 1], [stride, stride], [0, 0]),
        )?
    };

    Ok(g.add(&format!("{name}_add"), conv2, shortcut))
}

/// Builds the resnet graph together with its parameter specs.
pub fn get_workload(num_layers: usize, batch_size: usize) -> Result<NetworkWorkload> {
    let units = stage_units(num_layers)?;

    let mut g = GraphBuilder::new();
    let data = g.input("data")?;
    let mut x = g.batch_norm("bn_data", data, batch_norm_spec())?;
    x = g.conv2d("conv0", x, Conv2dSpec::new(64, [7, 7], [2, 2], [3, 3]))?;
    x = g.batch_norm("bn0", x, batch_norm_spec())?;
    x = g.relu("relu0", x);
    x = g.max_pool2d("pool0", x, Pool2dSpec::new([3, 3], [2, 2], [1, 1]))?;

    for (stage, (&filters, &num_units)) in FILTERS.iter().zip(units.iter()).enumerate() {
        for unit in 0..num_units {
            let stride = if stage == 0 || unit > 0 { 1 } else { 2 };
            let name = format!("stage{}_unit{}", stage + 1, unit + 1);
            x = residual_unit(&mut g, &name, x, filters, stride, unit > 0)?;
        }
    }

    x = g.batch_norm("bn1", x, batch_norm_spec())?;
    x = g.relu("relu1", x);
    x = g.global_avg_pool2d("pool1", x, Layout::Nchw);
    x = g.flatten("flatten0", x);
    x = g.dense("fc1", x, DenseSpec::new(NUM_CLASSES))?;
    let out = g.softmax("softmax", x);

    workload_from_graph(
        g.finish([out]),
        "data",
        Shape::new([batch_size, 3, 224, 224]),
        Some(Shape::new([batch_size, NUM_CLASSES])),
    )
}
