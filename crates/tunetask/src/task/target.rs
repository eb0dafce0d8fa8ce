//! Compilation targets a task can be tuned for.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Llvm,
    Cuda,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Llvm => "llvm",
            Target::Cuda => "cuda",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "llvm" => Ok(Target::Llvm),
            "cuda" => Ok(Target::Cuda),
            other => bail!("unsupported target: {other}"),
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Target::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
