//! Enumerates the scalar element types understood by the graph and task layers.

use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Logical dtype identifier shared between host tensors and graph value specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
    /// 16-bit floating point with full mantissa (fp16).
    F16,
    /// 16-bit bfloat16 precision as used by many accelerators.
    BF16,
    /// 32-bit signed integer, primarily for index buffers.
    I32,
}

impl DType {
    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 | DType::BF16 => 2,
            DType::I32 => 4,
        }
    }

    /// Canonical lowercase name, matching what tuning logs record.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::BF16 => "bfloat16",
            DType::I32 => "int32",
        }
    }

    /// Parses a canonical dtype name back into a `DType`.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "float32" => Ok(DType::F32),
            "float16" => Ok(DType::F16),
            "bfloat16" => Ok(DType::BF16),
            "int32" => Ok(DType::I32),
            other => bail!("unsupported dtype: {other}"),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
