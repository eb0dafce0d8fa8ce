//! DCGAN generator: dense projection followed by strided transposed convolutions.

use anyhow::Result;

use crate::graph::{
    BatchNormSpec, Conv2dTransposeSpec, DenseSpec, GraphBuilder, ValueId,
};
use crate::tensor::Shape;

use super::registry::{workload_from_graph, NetworkWorkload};

/// Latent code length fed to the generator.
const RANDOM_LEN: usize = 100;
/// Base feature width; the projection starts at `8 * NGF` channels.
const NGF: usize = 128;

fn deconv_block(
    g: &mut GraphBuilder,
    name: &str,
    data: ValueId,
    channels: usize,
) -> Result<ValueId> {
    let deconv = g.conv2d_transpose(
        &format!("{name}_deconv"),
        data,
        Conv2dTransposeSpec::new(channels, [4, 4], [2, 2], [1, 1]),
    )?;
    let bn = g.batch_norm(&format!("{name}_bn"), deconv, BatchNormSpec::default())?;
    Ok(g.relu(&format!("{name}_relu"), bn))
}

/// Generator mapping a `[batch, 100]` latent code to a `[batch, 3, 64, 64]` image.
pub fn get_workload(batch_size: usize) -> Result<NetworkWorkload> {
    let mut g = GraphBuilder::new();
    let code = g.input("data")?;

    let mut x = g.dense("g1", code, DenseSpec::new(4 * 4 * NGF * 8))?;
    x = g.relu("g1_relu", x);
    x = g.reshape("g1_reshape", x, vec![-1, (NGF * 8) as i64, 4, 4])?;

    x = deconv_block(&mut g, "g2", x, NGF * 4)?;
    x = deconv_block(&mut g, "g3", x, NGF * 2)?;
    x = deconv_block(&mut g, "g4", x, NGF)?;

    x = g.conv2d_transpose(
        "g5_deconv",
        x,
        Conv2dTransposeSpec::new(3, [4, 4], [2, 2], [1, 1]),
    )?;
    let out = g.tanh("g5_tanh", x);

    workload_from_graph(
        g.finish([out]),
        "data",
        Shape::new([batch_size, RANDOM_LEN]),
        None,
    )
}
