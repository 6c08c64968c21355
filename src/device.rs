//! Execution devices for the per-iteration distance step.
//!
//! The farthest-point loop only needs one primitive: the distance from every
//! row to the latest center. [`PairwiseDistance`] hides where that runs, and
//! [`Device`] picks the implementation from an explicit flag.

use faer::Mat;
use log::debug;
use rayon::prelude::*;

use crate::distance;

const RAYON_BLOCK_SIZE: usize = 1024;

/// Batched distance computation against a fixed working matrix.
pub trait PairwiseDistance: Send + Sync {
    /// Number of rows in the working matrix.
    fn num_rows(&self) -> usize;

    /// Write the Euclidean distance from every row to row `center` into `out`.
    ///
    /// `out` must hold exactly [`num_rows`](Self::num_rows) entries.
    fn distances_to(&self, center: usize, out: &mut [f32]);
}

/// Where the distance step runs.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Device {
    /// SIMD row kernel over the borrowed matrix, row blocks run on the rayon pool.
    #[default]
    Host,
    /// Dense batched matrix-vector product. The matrix is copied once into a
    /// device-resident layout before the loop starts.
    Accelerator,
}

impl Device {
    /// Build the distance backend for a row-major matrix with `dim` columns.
    pub fn backend<'a>(self, vecs: &'a [f32], dim: usize) -> Box<dyn PairwiseDistance + 'a> {
        match self {
            Device::Host => Box::new(HostDistance::new(vecs, dim)),
            Device::Accelerator => Box::new(AcceleratorDistance::new(vecs, dim)),
        }
    }
}

/// Borrowing host backend.
#[derive(Debug)]
pub struct HostDistance<'a> {
    vecs: &'a [f32],
    dim: usize,
}

impl<'a> HostDistance<'a> {
    /// Wrap a row-major matrix with `dim` columns.
    pub fn new(vecs: &'a [f32], dim: usize) -> Self {
        Self { vecs, dim }
    }
}

impl PairwiseDistance for HostDistance<'_> {
    fn num_rows(&self) -> usize {
        self.vecs.len() / self.dim
    }

    fn distances_to(&self, center: usize, out: &mut [f32]) {
        assert_eq!(out.len(), self.num_rows());
        let dim = self.dim;
        let center = &self.vecs[center * dim..(center + 1) * dim];

        #[cfg(feature = "perf")]
        distance::distances_to(self.vecs, center, out);
        #[cfg(not(feature = "perf"))]
        out.par_chunks_mut(RAYON_BLOCK_SIZE)
            .zip(self.vecs.par_chunks(dim * RAYON_BLOCK_SIZE))
            .for_each(|(block_out, block)| distance::distances_to(block, center, block_out));
    }
}

/// Batched backend on a dense `faer` matrix.
///
/// Uses `‖x − c‖² = ‖x‖² + ‖c‖² − 2·x·c` with the row norms computed once, so
/// each iteration is a single matrix product. Rows are centered on the column
/// mean and kept in `f64`: the expansion cancels badly when the norms are large
/// compared to the distances, and both steps keep it within `f32` rounding of
/// the direct difference.
#[derive(Debug)]
pub struct AcceleratorDistance {
    matrix: Mat<f64>,
    squared_norms: Vec<f64>,
}

impl AcceleratorDistance {
    /// Move a row-major matrix with `dim` columns into the dense layout.
    pub fn new(vecs: &[f32], dim: usize) -> Self {
        let num = vecs.len() / dim;
        let mut mean = vec![0.0f64; dim];
        for vec in vecs.chunks_exact(dim) {
            for (m, &x) in mean.iter_mut().zip(vec) {
                *m += x as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= num.max(1) as f64);

        let matrix = Mat::from_fn(num, dim, |i, j| vecs[i * dim + j] as f64 - mean[j]);
        let squared_norms = (0..num)
            .into_par_iter()
            .map(|i| (0..dim).map(|j| matrix[(i, j)] * matrix[(i, j)]).sum::<f64>())
            .collect();
        debug!("accelerator: moved {} x {} matrix", num, dim);
        Self {
            matrix,
            squared_norms,
        }
    }
}

impl PairwiseDistance for AcceleratorDistance {
    fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    fn distances_to(&self, center: usize, out: &mut [f32]) {
        assert_eq!(out.len(), self.num_rows());
        let center_vec = Mat::from_fn(self.matrix.ncols(), 1, |i, _| self.matrix[(center, i)]);
        let dots = &self.matrix * &center_vec;
        let center_norm = self.squared_norms[center];

        for (i, (o, &norm)) in out.iter_mut().zip(self.squared_norms.iter()).enumerate() {
            *o = (norm + center_norm - 2.0 * dots[(i, 0)]).max(0.0).sqrt() as f32;
        }
        // cancellation can leave a tiny residue on the diagonal
        out[center] = 0.0;
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::{Device, PairwiseDistance};
    use crate::distance::native_squared_euclidean;
    use crate::sampler::FarthestPointSampler;

    #[test]
    fn test_devices_agree() {
        let mut rng = rand::rng();
        let dim = 24;
        let num = 3000;
        let vecs: Vec<f32> = (0..dim * num).map(|_| rng.random::<f32>()).collect();

        let host = Device::Host.backend(&vecs, dim);
        let accelerator = Device::Accelerator.backend(&vecs, dim);
        assert_eq!(host.num_rows(), num);
        assert_eq!(accelerator.num_rows(), num);

        let mut host_out = vec![0.0; num];
        let mut accelerator_out = vec![0.0; num];
        for center in [0, 1, 1023, 1024, num - 1] {
            host.distances_to(center, &mut host_out);
            accelerator.distances_to(center, &mut accelerator_out);
            assert_eq!(host_out[center], 0.0);
            assert_eq!(accelerator_out[center], 0.0);

            let center_vec = &vecs[center * dim..(center + 1) * dim];
            for (i, vec) in vecs.chunks(dim).enumerate() {
                let expect = native_squared_euclidean(vec, center_vec).sqrt();
                assert!((expect - host_out[i]).abs() < 1e-4);
                assert!(
                    (expect - accelerator_out[i]).abs() < 1e-4,
                    "row {i}: {expect} vs {}",
                    accelerator_out[i]
                );
            }
        }
    }

    #[test]
    fn test_exact_on_small_integers() {
        let vecs = [0.0, 1.0, 2.0, 5.0, 9.0];
        for device in [Device::Host, Device::Accelerator] {
            let backend = device.backend(&vecs, 1);
            let mut out = vec![0.0; 5];
            backend.distances_to(4, &mut out);
            assert_eq!(out, vec![9.0, 8.0, 7.0, 4.0, 0.0], "{device:?}");
        }
    }

    #[test]
    fn test_devices_agree_on_offset_rows() {
        // large norms, small distances
        let mut rng = StdRng::seed_from_u64(42);
        let dim = 32;
        let num = 1000;
        let vecs: Vec<f32> = (0..dim * num)
            .map(|_| 100.0 + rng.random::<f32>())
            .collect();

        let host = Device::Host.backend(&vecs, dim);
        let accelerator = Device::Accelerator.backend(&vecs, dim);
        let mut host_out = vec![0.0; num];
        let mut accelerator_out = vec![0.0; num];
        for center in [0, 1, 500, num - 1] {
            host.distances_to(center, &mut host_out);
            accelerator.distances_to(center, &mut accelerator_out);

            let center_vec = &vecs[center * dim..(center + 1) * dim];
            for (i, vec) in vecs.chunks(dim).enumerate() {
                let expect = native_squared_euclidean(vec, center_vec).sqrt();
                assert!((expect - host_out[i]).abs() < 1e-4);
                assert!(
                    (expect - accelerator_out[i]).abs() < 1e-4,
                    "row {i}: {expect} vs {}",
                    accelerator_out[i]
                );
            }
        }

        let host_selected: Vec<usize> = FarthestPointSampler::new(host).take(100).collect();
        let accelerator_selected: Vec<usize> =
            FarthestPointSampler::new(accelerator).take(100).collect();
        assert_eq!(host_selected, accelerator_selected);
    }
}
