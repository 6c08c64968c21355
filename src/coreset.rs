//! Coreset selection: optional random projection followed by farthest-point sampling.

use std::time::Instant;

use log::{debug, info};

use crate::device::Device;
use crate::error::{CoresetError, Result};
use crate::projection::reduce;
use crate::sampler::FarthestPointSampler;

/// Coreset selection configuration.
#[derive(Debug, Clone)]
pub struct Coreset {
    n: usize,
    eps: Option<f32>,
    device: Device,
    seed: Option<u64>,
}

impl Default for Coreset {
    fn default() -> Self {
        Self {
            n: 1000,
            eps: Some(0.95),
            device: Device::default(),
            seed: None,
        }
    }
}

impl Coreset {
    /// Create a new coreset configuration.
    ///
    /// # Arguments
    ///
    /// * `n` - number of points to select, must be at least 1
    /// * `eps` - distortion tolerance of the random projection in (0, 1), `None` to
    ///   select on the original vectors
    /// * `device` - where the per-iteration distance step runs
    pub fn new(n: usize, eps: Option<f32>, device: Device) -> Result<Self> {
        if n < 1 {
            return Err(CoresetError::InvalidArgument(
                "n must be greater than 0".to_string(),
            ));
        }
        if let Some(eps) = eps {
            if !(eps > 0.0 && eps < 1.0) {
                return Err(CoresetError::Configuration(format!(
                    "eps must be in (0, 1), got {eps}"
                )));
            }
        }
        Ok(Self {
            n,
            eps,
            device,
            seed: None,
        })
    }

    /// Fix the seed of the random projection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Select `n` row indices from a row-major matrix with `dim` columns.
    ///
    /// Indices refer to the rows of `vecs` and come in selection order, so any
    /// prefix is a valid smaller coreset.
    pub fn select(&self, vecs: &[f32], dim: usize) -> Result<Vec<usize>> {
        if dim == 0 || vecs.is_empty() {
            return Err(CoresetError::InvalidArgument(
                "feature matrix is empty".to_string(),
            ));
        }
        if vecs.len() % dim != 0 {
            return Err(CoresetError::InvalidArgument(format!(
                "feature matrix length {} is not a multiple of dim {}",
                vecs.len(),
                dim
            )));
        }
        let num = vecs.len() / dim;
        check_num_rows(num)?;
        if self.n > num {
            return Err(CoresetError::InvalidArgument(format!(
                "n must be in [1, {}], got {}",
                num, self.n
            )));
        }
        if let Some(pos) = vecs.iter().position(|v| !v.is_finite()) {
            return Err(CoresetError::InvalidArgument(format!(
                "non-finite value at row {}",
                pos / dim
            )));
        }
        debug!("num of points: {}, coreset size: {}", num, self.n);

        let reduced = match self.eps {
            Some(eps) => Some(reduce(vecs, dim, eps, self.seed)?),
            None => None,
        };
        let (working, working_dim) = match &reduced {
            Some((reduced, reduced_dim)) => (&reduced[..], *reduced_dim),
            None => (vecs, dim),
        };

        let start = Instant::now();
        let sampler = FarthestPointSampler::new(self.device.backend(working, working_dim));
        let indices: Vec<usize> = sampler.take(self.n).collect();
        info!(
            "selected {} of {} points on {:?}, takes {} s",
            indices.len(),
            num,
            self.device,
            start.elapsed().as_secs_f32()
        );

        Ok(indices)
    }
}

/// The arg-max kernels track row indices in `u32` lanes.
fn check_num_rows(num: usize) -> Result<()> {
    if num > u32::MAX as usize {
        return Err(CoresetError::InvalidArgument(format!(
            "at most {} rows are supported, got {}",
            u32::MAX,
            num
        )));
    }
    Ok(())
}

/// Select a coreset of `n` rows from a row-major matrix with `dim` columns.
///
/// The matrix is first reduced with a sparse random projection of distortion
/// `eps`, then sampled greedily. `accelerate` runs the distance step on the
/// batched accelerator backend.
pub fn select_coreset(
    vecs: &[f32],
    dim: usize,
    n: usize,
    eps: f32,
    accelerate: bool,
) -> Result<Vec<usize>> {
    let device = if accelerate {
        Device::Accelerator
    } else {
        Device::Host
    };
    Coreset::new(n, Some(eps), device)?.select(vecs, dim)
}
