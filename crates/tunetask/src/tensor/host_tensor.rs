//! Host-backed tensor used for materialised parameters and tests.

use anyhow::{bail, Result};
use rand::Rng;

use super::{dtype::DType, shape::Shape};

/// Simple host-backed `f32` tensor.
///
/// The task-extraction pipeline never executes kernels, so a flat value buffer
/// is all a parameter needs once a caller asks for initialised weights.
#[derive(Debug, Clone)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Vec<f32>,
}

impl Tensor {
    /// Constructs a tensor from raw values, validating the length against the shape.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.num_elements() {
            bail!(
                "tensor data length ({}) does not match shape {:?}",
                data.len(),
                shape.dims()
            );
        }
        Ok(Tensor {
            shape,
            dtype: DType::F32,
            data,
        })
    }

    /// Returns a zero-initialized tensor of the requested shape.
    pub fn zeros(shape: Shape) -> Self {
        let len = shape.num_elements();
        Tensor {
            shape,
            dtype: DType::F32,
            data: vec![0.0; len],
        }
    }

    /// Returns a one-initialized tensor of the requested shape.
    pub fn ones(shape: Shape) -> Self {
        let len = shape.num_elements();
        Tensor {
            shape,
            dtype: DType::F32,
            data: vec![1.0; len],
        }
    }

    /// Samples from a normal distribution (`N(0, std^2)`) using the Box-Muller transform.
    pub fn randn(shape: Shape, std: f32, rng: &mut impl Rng) -> Self {
        let len = shape.num_elements();
        let mut values = Vec::with_capacity(len);
        while values.len() < len {
            let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
            let u2: f32 = rng.gen::<f32>();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = r * theta.cos() * std;
            let z1 = r * theta.sin() * std;
            values.push(z0);
            if values.len() < len {
                values.push(z1);
            }
        }
        Tensor {
            shape,
            dtype: DType::F32,
            data: values,
        }
    }

    /// Returns the total number of elements stored in the tensor.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Borrow the underlying value buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
