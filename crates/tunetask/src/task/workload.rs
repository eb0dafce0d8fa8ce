//! Workload signatures identifying unique tunable operations.

use serde::Serialize;

use crate::graph::{Layout, OpKind, TensorSpec};
use crate::hashing;
use crate::tensor::DType;

/// Shape/attribute signature of one tunable operator instance.
///
/// Two graph nodes with equal workloads are the same tuning problem, so
/// extraction deduplicates on this value. Field sets mirror the tuning-log
/// records the autotuner persists for each operator family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Workload {
    Conv2d {
        data: TensorSpec,
        weight: TensorSpec,
        strides: [usize; 2],
        padding: [usize; 2],
        dilation: [usize; 2],
        groups: usize,
        layout: Layout,
        out_dtype: DType,
    },
    Conv2dTranspose {
        data: TensorSpec,
        weight: TensorSpec,
        strides: [usize; 2],
        padding: [usize; 2],
        output_padding: [usize; 2],
        layout: Layout,
        out_dtype: DType,
    },
    Dense {
        data: TensorSpec,
        weight: TensorSpec,
        out_dtype: DType,
    },
}

impl Workload {
    pub fn kind(&self) -> OpKind {
        match self {
            Workload::Conv2d { .. } => OpKind::Conv2d,
            Workload::Conv2dTranspose { .. } => OpKind::Conv2dTranspose,
            Workload::Dense { .. } => OpKind::Dense,
        }
    }

    /// Stable fingerprint used to key tuning logs.
    pub fn fingerprint(&self) -> u64 {
        hashing::hash_value(self)
    }
}
