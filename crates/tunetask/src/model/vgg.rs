//! VGG: stacked 3x3 convolution blocks with a large dense head.

use anyhow::{bail, Result};

use crate::graph::{Conv2dSpec, DenseSpec, GraphBuilder, Pool2dSpec, ValueId};
use crate::tensor::Shape;

use super::registry::{workload_from_graph, NetworkWorkload};

const FILTERS: [usize; 5] = [64, 128, 256, 512, 512];
const NUM_CLASSES: usize = 1000;

fn block_convs(num_layers: usize) -> Result<[usize; 5]> {
    match num_layers {
        11 => Ok([1, 1, 2, 2, 2]),
        13 => Ok([2, 2, 2, 2, 2]),
        16 => Ok([2, 2, 3, 3, 3]),
        19 => Ok([2, 2, 4, 4, 4]),
        other => bail!("unsupported vgg depth: {other}"),
    }
}

fn classifier(g: &mut GraphBuilder, name: &str, data: ValueId, units: usize) -> Result<ValueId> {
    let dense = g.dense(name, data, DenseSpec::new(units))?;
    let act = g.relu(&format!("{name}_relu"), dense);
    Ok(g.dropout(&format!("{name}_drop"), act, 0.5))
}

pub fn get_workload(num_layers: usize, batch_size: usize) -> Result<NetworkWorkload> {
    let blocks = block_convs(num_layers)?;

    let mut g = GraphBuilder::new();
    let data = g.input("data")?;
    let mut x = data;

    for (block, (&filters, &convs)) in FILTERS.iter().zip(blocks.iter()).enumerate() {
        for conv in 0..convs {
            let name = format!("conv{}_{}", block + 1, conv + 1);
            x = g.conv2d(
                &name,
                x,
                Conv2dSpec::new(filters, [3, 3], [1, 1], [1, 1]).with_bias(),
            )?;
            x = g.relu(&format!("{name}_relu"), x);
        }
        x = g.max_pool2d(
            &format!("pool{}", block + 1),
            x,
            Pool2dSpec::new([2, 2], [2, 2], [0, 0]),
        )?;
    }

    x = g.flatten("flatten", x);
    x = classifier(&mut g, "fc6", x, 4096)?;
    x = classifier(&mut g, "fc7", x, 4096)?;
    x = g.dense("fc8", x, DenseSpec::new(NUM_CLASSES))?;
    let out = g.softmax("softmax", x);

    workload_from_graph(
        g.finish([out]),
        "data",
        Shape::new([batch_size, 3, 224, 224]),
        Some(Shape::new([batch_size, NUM_CLASSES])),
    )
}
