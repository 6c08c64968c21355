//! Sparse random projection for distance-preserving dimensionality reduction.
//!
//! The projection matrix follows Achlioptas / Li: each entry is non-zero with
//! probability `density = 1 / sqrt(n_features)`, and non-zero entries are
//! `±sqrt(1 / density) / sqrt(n_components)` with equal probability. The output
//! dimension comes from the Johnson-Lindenstrauss bound, so pairwise distances
//! are kept within `(1 ± eps)` with high probability.

use std::iter;
use std::time::Instant;

use aligned_vec::{AVec, CACHELINE_ALIGN};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};
use rayon::prelude::*;

use crate::error::{CoresetError, Result};

fn check_eps(eps: f32) -> Result<()> {
    if !(eps > 0.0 && eps < 1.0) {
        return Err(CoresetError::Configuration(format!(
            "eps must be in (0, 1), got {eps}"
        )));
    }
    Ok(())
}

/// Minimal output dimension that keeps `n_samples` points within `eps` distortion.
///
/// `4 * ln(n_samples) / (eps^2 / 2 - eps^3 / 3)`, truncated.
pub fn johnson_lindenstrauss_min_dim(n_samples: usize, eps: f32) -> Result<usize> {
    check_eps(eps)?;
    if n_samples == 0 {
        return Err(CoresetError::Configuration(
            "n_samples must be greater than 0".to_string(),
        ));
    }
    let eps = eps as f64;
    let denominator = eps.powi(2) / 2.0 - eps.powi(3) / 3.0;
    Ok((4.0 * (n_samples as f64).ln() / denominator) as usize)
}

/// Non-zero input features of one output component, split by sign.
#[derive(Debug, Clone)]
struct Component {
    positive: Vec<u32>,
    negative: Vec<u32>,
}

/// A fitted sparse random projection.
#[derive(Debug, Clone)]
pub struct SparseRandomProjection {
    n_features: usize,
    scale: f32,
    components: Vec<Component>,
}

impl SparseRandomProjection {
    /// Draw a projection for `n_samples` rows of `n_features` columns.
    ///
    /// Fails with [`CoresetError::Configuration`] when `eps` is outside (0, 1),
    /// when there are too few samples for a positive target dimension, or when the
    /// target dimension would exceed `n_features`.
    pub fn fit<R: Rng + ?Sized>(
        n_samples: usize,
        n_features: usize,
        eps: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let n_components = johnson_lindenstrauss_min_dim(n_samples, eps)?;
        if n_components == 0 {
            return Err(CoresetError::Configuration(format!(
                "eps={eps} and n_samples={n_samples} lead to a target dimension of 0"
            )));
        }
        if n_components > n_features {
            return Err(CoresetError::Configuration(format!(
                "eps={eps} and n_samples={n_samples} lead to a target dimension of {n_components} \
                 which is larger than the original space with n_features={n_features}"
            )));
        }

        let density = 1.0 / (n_features as f64).sqrt();
        let scale = ((1.0 / density).sqrt() / (n_components as f64).sqrt()) as f32;
        let binomial = Binomial::new(n_features as u64, density)
            .map_err(|err| CoresetError::Configuration(err.to_string()))?;

        let components = (0..n_components)
            .map(|_| {
                let nnz = binomial.sample(rng) as usize;
                let mut features = sample(rng, n_features, nnz).into_vec();
                features.sort_unstable();
                let mut component = Component {
                    positive: Vec::with_capacity(nnz),
                    negative: Vec::with_capacity(nnz),
                };
                for feature in features {
                    if rng.random::<bool>() {
                        component.positive.push(feature as u32);
                    } else {
                        component.negative.push(feature as u32);
                    }
                }
                component
            })
            .collect::<Vec<_>>();
        debug!(
            "random projection: {} -> {} dims, density {:.4}",
            n_features, n_components, density
        );

        Ok(Self {
            n_features,
            scale,
            components,
        })
    }

    /// Output dimension.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Project a row-major matrix with `dim` columns. Row order is preserved.
    pub fn transform(&self, vecs: &[f32], dim: usize) -> Result<AVec<f32>> {
        if dim != self.n_features {
            return Err(CoresetError::InvalidArgument(format!(
                "projection was fitted on {} features, got {}",
                self.n_features, dim
            )));
        }
        let num = vecs.len() / dim;
        let n_components = self.n_components();
        let mut reduced =
            AVec::from_iter(CACHELINE_ALIGN, iter::repeat_n(0.0f32, num * n_components));

        reduced
            .par_chunks_mut(n_components)
            .zip(vecs.par_chunks(dim))
            .for_each(|(out, vec)| {
                for (o, component) in out.iter_mut().zip(self.components.iter()) {
                    let positive: f32 = component.positive.iter().map(|&i| vec[i as usize]).sum();
                    let negative: f32 = component.negative.iter().map(|&i| vec[i as usize]).sum();
                    *o = (positive - negative) * self.scale;
                }
            });

        Ok(reduced)
    }
}

/// Fit a fresh projection on `vecs` and apply it.
///
/// Returns the reduced matrix and its dimension. A `seed` makes the projection
/// reproducible, otherwise it is drawn from OS entropy.
pub fn reduce(
    vecs: &[f32],
    dim: usize,
    eps: f32,
    seed: Option<u64>,
) -> Result<(AVec<f32>, usize)> {
    let num = vecs.len() / dim;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    info!("fitting random projection, start dim = ({}, {})", num, dim);
    let start = Instant::now();
    let projection = SparseRandomProjection::fit(num, dim, eps, &mut rng)?;
    let reduced = projection.transform(vecs, dim)?;
    info!(
        "transformed dim = ({}, {}), takes {} s",
        num,
        projection.n_components(),
        start.elapsed().as_secs_f32()
    );

    Ok((reduced, projection.n_components()))
}
