//! Discovers tunable tasks by walking a computation graph.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, ensure, Result};
use serde::Serialize;

use crate::graph::{walk_graph, Graph, GraphVisitor, NodeRecord, OpKind, Operation};
use crate::hashing;
use crate::infer::{infer_shapes, InferredShapes};
use crate::tensor::{DType, Shape};

use super::target::Target;
use super::workload::Workload;

/// One tunable compute-kernel instance discovered in a graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub kind: OpKind,
    pub workload: Workload,
    pub target: Target,
}

impl Task {
    pub fn fingerprint(&self) -> u64 {
        hashing::hash_value(&(self.kind, &self.workload, self.target))
    }

    /// Short human-readable identity, e.g. for tuning progress output.
    pub fn describe(&self) -> String {
        format!("{}@{} #{:016x}", self.kind, self.target, self.fingerprint())
    }
}

fn tunable(kind: OpKind) -> bool {
    matches!(
        kind,
        OpKind::Conv2d | OpKind::Conv2dTranspose | OpKind::Dense
    )
}

/// Builds the workload signature of a single tunable node.
fn node_workload(node: &NodeRecord, shapes: &InferredShapes) -> Result<Workload> {
    let workload = match &node.op {
        Operation::Conv2d(spec) => {
            let data = shapes.spec(node.operands[0])?.clone();
            let weight = shapes.spec(node.operands[1])?.clone();
            Workload::Conv2d {
                out_dtype: data.dtype,
                data,
                weight,
                strides: spec.strides,
                padding: spec.padding,
                dilation: spec.dilation,
                groups: spec.groups,
                layout: spec.layout,
            }
        }
        Operation::Conv2dTranspose(spec) => {
            let data = shapes.spec(node.operands[0])?.clone();
            let weight = shapes.spec(node.operands[1])?.clone();
            Workload::Conv2dTranspose {
                out_dtype: data.dtype,
                data,
                weight,
                strides: spec.strides,
                padding: spec.padding,
                output_padding: spec.output_padding,
                layout: spec.layout,
            }
        }
        Operation::Dense(_) => {
            let data = shapes.spec(node.operands[0])?.clone();
            let weight = shapes.spec(node.operands[1])?.clone();
            Workload::Dense {
                out_dtype: data.dtype,
                data,
                weight,
            }
        }
        other => bail!("operator '{}' has no tunable workload", other.kind()),
    };
    Ok(workload)
}

/// Collects deduplicated tasks while the walker traverses the node list.
struct TaskCollector<'a> {
    shapes: &'a InferredShapes,
    symbols: &'a [OpKind],
    target: Target,
    seen: HashSet<Workload>,
    tasks: Vec<Task>,
    error: Option<anyhow::Error>,
}

impl GraphVisitor for TaskCollector<'_> {
    fn on_node(&mut self, _graph: &Graph, _index: usize, node: &NodeRecord) {
        if self.error.is_some() {
            return;
        }
        let kind = node.op.kind();
        if !self.symbols.contains(&kind) {
            return;
        }
        match node_workload(node, self.shapes) {
            Ok(workload) => {
                if self.seen.insert(workload.clone()) {
                    self.tasks.push(Task {
                        kind,
                        workload,
                        target: self.target,
                    });
                }
            }
            Err(err) => self.error = Some(err),
        }
    }
}

/// Extracts the tunable tasks of `graph` matching the `symbols` filter.
///
/// Shape inference runs first with the provided data-input shapes; every node
/// whose operator kind is in `symbols` contributes its workload signature, and
/// duplicate signatures collapse to a single task. Task order is the order of
/// first occurrence in the graph, so repeated extractions are deterministic.
pub fn extract_from_graph(
    graph: &Graph,
    target: Target,
    shapes: &HashMap<String, Shape>,
    dtype: DType,
    symbols: &[OpKind],
) -> Result<Vec<Task>> {
    for &symbol in symbols {
        ensure!(
            tunable(symbol),
            "operator '{symbol}' has no tunable workload"
        );
    }

    let inferred = infer_shapes(graph, shapes, dtype)?;

    let mut collector = TaskCollector {
        shapes: &inferred,
        symbols,
        target,
        seen: HashSet::new(),
        tasks: Vec::new(),
        error: None,
    };
    walk_graph(graph, &mut collector);

    if let Some(err) = collector.error {
        return Err(err);
    }
    Ok(collector.tasks)
}
