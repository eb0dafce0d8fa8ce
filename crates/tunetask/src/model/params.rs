//! Parameter sets attached to a network workload descriptor.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use rand::Rng;
use serde::Serialize;

use crate::graph::{Graph, InputRole, TensorSpec};
use crate::infer::InferredShapes;
use crate::tensor::Tensor;

/// Name-to-spec map for every learned parameter a graph declares.
///
/// The descriptor stays spec-level; [`ParamSet::initialize`] materialises
/// random values when a caller actually needs them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParamSet {
    specs: BTreeMap<String, TensorSpec>,
}

impl ParamSet {
    /// Collects the inferred spec of every `Param`-role input.
    ///
    /// Fails if a declared parameter was never consumed by an operator, since
    /// its shape would be unknowable.
    pub fn from_graph(graph: &Graph, inferred: &InferredShapes) -> Result<Self> {
        let mut specs = BTreeMap::new();
        for input in graph.inputs() {
            if input.role != InputRole::Param {
                continue;
            }
            let spec = inferred.get(input.value).ok_or_else(|| {
                anyhow!("parameter '{}' is never consumed by an operator", input.name)
            })?;
            specs.insert(input.name.clone(), spec.clone());
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &BTreeMap<String, TensorSpec> {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&TensorSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Total scalar count across all parameters.
    pub fn num_elements(&self) -> usize {
        self.specs
            .values()
            .map(|spec| spec.shape.num_elements())
            .sum()
    }

    /// Total byte footprint across all parameters.
    pub fn num_bytes(&self) -> usize {
        self.specs
            .values()
            .map(|spec| spec.shape.num_elements() * spec.dtype.size_in_bytes())
            .sum()
    }

    /// Materialises every parameter as `N(0, std^2)` host tensors.
    pub fn initialize(&self, std: f32, rng: &mut impl Rng) -> BTreeMap<String, Tensor> {
        self.specs
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    Tensor::randn(spec.shape.clone(), std, rng),
                )
            })
            .collect()
    }
}
