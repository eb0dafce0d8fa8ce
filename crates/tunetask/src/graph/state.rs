//! Graph storage: named inputs, operator nodes, and structural lookups.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::spec::{Operation, ValueId};

/// Distinguishes caller-supplied data inputs from learned parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputRole {
    Arg,
    Param,
}

/// Named graph input. Shapes are bound later: data inputs from the shape map
/// handed to inference, parameter inputs from their consuming operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRecord {
    pub value: ValueId,
    pub name: String,
    pub role: InputRole,
}

/// Operator node staged by the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub value: ValueId,
    pub name: String,
    pub op: Operation,
    pub operands: Vec<ValueId>,
}

/// Errors surfaced by structural graph lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("value {value:?} is not defined in this graph")]
    UnknownValue { value: ValueId },
    #[error("duplicate input name '{name}'")]
    DuplicateInput { name: String },
}

/// Immutable symbolic computation graph.
///
/// Nodes are stored in insertion order, which the builder guarantees to be
/// topological: every operand of a node precedes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    inputs: Vec<InputRecord>,
    nodes: Vec<NodeRecord>,
    outputs: Vec<ValueId>,
}

impl Graph {
    pub fn inputs(&self) -> &[InputRecord] {
        &self.inputs
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    pub fn input_named(&self, name: &str) -> Option<&InputRecord> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn node(&self, value: ValueId) -> Result<&NodeRecord, GraphError> {
        self.nodes
            .iter()
            .find(|node| node.value == value)
            .ok_or(GraphError::UnknownValue { value })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn push_input(&mut self, input: InputRecord) -> Result<(), GraphError> {
        if self.input_named(&input.name).is_some() {
            return Err(GraphError::DuplicateInput { name: input.name });
        }
        self.inputs.push(input);
        Ok(())
    }

    pub(super) fn push_node(&mut self, node: NodeRecord) {
        self.nodes.push(node);
    }

    pub(super) fn set_outputs(&mut self, outputs: Vec<ValueId>) {
        self.outputs = outputs;
    }
}
