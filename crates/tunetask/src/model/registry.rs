//! Name-based lookup for the reference networks.

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::graph::Graph;
use crate::infer::infer_shapes;
use crate::tensor::{DType, Shape};

use super::{dcgan, mobilenet, resnet, squeezenet, vgg, ParamSet};

/// Everything a tuning client needs to know about a reference network.
///
/// `output_shape` is `None` for generative models whose output is not a
/// classification logits tensor (the DCGAN generator).
#[derive(Debug, Clone)]
pub struct NetworkWorkload {
    pub graph: Graph,
    pub params: ParamSet,
    pub input_shape: Shape,
    pub output_shape: Option<Shape>,
}

/// Signature for network builders keyed by name in the registry.
pub type BuildFn = fn(usize) -> Result<NetworkWorkload>;

#[derive(Clone, Copy)]
pub struct NetworkFactory {
    pub name: &'static str,
    pub build: BuildFn,
}

fn build_resnet18(batch_size: usize) -> Result<NetworkWorkload> {
    resnet::get_workload(18, batch_size)
}

fn build_squeezenet_v1_1(batch_size: usize) -> Result<NetworkWorkload> {
    squeezenet::get_workload(batch_size, "1.1")
}

fn build_vgg16(batch_size: usize) -> Result<NetworkWorkload> {
    vgg::get_workload(16, batch_size)
}

/// Returns the list of built-in network factories.
pub fn network_factories() -> &'static [NetworkFactory] {
    &[
        NetworkFactory {
            name: "resnet-18",
            build: build_resnet18,
        },
        NetworkFactory {
            name: "mobilenet",
            build: mobilenet::get_workload,
        },
        NetworkFactory {
            name: "squeezenet v1.1",
            build: build_squeezenet_v1_1,
        },
        NetworkFactory {
            name: "vgg-16",
            build: build_vgg16,
        },
        NetworkFactory {
            name: "dcgan",
            build: dcgan::get_workload,
        },
    ]
}

pub fn network_names() -> Vec<&'static str> {
    network_factories()
        .iter()
        .map(|factory| factory.name)
        .collect()
}

/// Resolves a network by its exact registered name.
///
/// Unrecognised names are invalid arguments, never a silent default network.
pub fn get_network(name: &str, batch_size: usize) -> Result<NetworkWorkload> {
    let factory = network_factories()
        .iter()
        .find(|factory| factory.name == name)
        .ok_or_else(|| anyhow!("unsupported network: {name}"))?;
    (factory.build)(batch_size)
}

/// Shared tail of every zoo builder: infer once with the canonical input
/// shape, then collect the parameter specs the inference bound.
pub(super) fn workload_from_graph(
    graph: Graph,
    input_name: &str,
    input_shape: Shape,
    output_shape: Option<Shape>,
) -> Result<NetworkWorkload> {
    let mut shapes = HashMap::new();
    shapes.insert(input_name.to_string(), input_shape.clone());
    let inferred = infer_shapes(&graph, &shapes, DType::F32)?;
    let params = ParamSet::from_graph(&graph, &inferred)?;
    Ok(NetworkWorkload {
        graph,
        params,
        input_shape,
        output_shape,
    })
}
