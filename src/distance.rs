//! Compute the distance between vectors.
//!
//! Every kernel has a `native_*` scalar version used as a reference in tests and
//! benchmarks, and a dispatched version that picks the widest SIMD available at
//! runtime.

use pulp::{Arch, Simd, WithSimd};

use crate::simd;

/// Squared Euclidean distance without SIMD.
pub fn native_squared_euclidean(lhs: &[f32], rhs: &[f32]) -> f32 {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(&l, &r)| (l - r) * (l - r))
        .sum()
}

/// Squared L2 norm without SIMD.
pub fn native_squared_norm(vec: &[f32]) -> f32 {
    vec.iter().map(|&v| v * v).sum()
}

/// Index of the maximum value, the lowest index wins on ties.
pub fn native_argmax(vec: &[f32]) -> usize {
    let mut index = 0;
    let mut maximal = f32::NEG_INFINITY;
    for (i, &val) in vec.iter().enumerate() {
        if val > maximal {
            maximal = val;
            index = i;
        }
    }
    index
}

/// Scalar version of [`min_argmax`].
pub fn native_min_argmax(min_distances: &mut [f32], distances: &[f32]) -> usize {
    min_distances
        .iter_mut()
        .zip(distances.iter())
        .for_each(|(m, &d)| *m = m.min(d));
    native_argmax(min_distances)
}

/// Squared L2 norm of the vector.
pub fn squared_norm(vec: &[f32]) -> f32 {
    Arch::new().dispatch(SquaredNorm { vec })
}

/// Euclidean distance from every row of `vecs` to `center`, written into `out`.
///
/// Uses the raw AVX/FMA kernel when the CPU has it, `pulp` dispatch otherwise.
pub fn distances_to(vecs: &[f32], center: &[f32], out: &mut [f32]) {
    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    {
        if is_x86_feature_detected!("avx") && is_x86_feature_detected!("fma") {
            unsafe { simd::distances_to(vecs, center, out) };
            return;
        }
    }
    Arch::new().dispatch(DistancesTo { vecs, center, out })
}

/// Elementwise `min_distances = min(min_distances, distances)`, then the index of
/// the maximum of the updated vector. Ties go to the lowest index.
pub fn min_argmax(min_distances: &mut [f32], distances: &[f32]) -> usize {
    Arch::new().dispatch(MinArgmax {
        min_distances,
        distances,
    })
}

struct SquaredNorm<'a> {
    vec: &'a [f32],
}

impl WithSimd for SquaredNorm<'_> {
    type Output = f32;

    #[inline(always)]
    fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
        simd::pulp::squared_norm(simd, self.vec)
    }
}

struct DistancesTo<'a> {
    vecs: &'a [f32],
    center: &'a [f32],
    out: &'a mut [f32],
}

impl WithSimd for DistancesTo<'_> {
    type Output = ();

    #[inline(always)]
    fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
        simd::pulp::distances_to(simd, self.vecs, self.center, self.out)
    }
}

struct MinArgmax<'a> {
    min_distances: &'a mut [f32],
    distances: &'a [f32],
}

impl WithSimd for MinArgmax<'_> {
    type Output = usize;

    #[inline(always)]
    fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
        simd::pulp::min_argmax(simd, self.min_distances, self.distances)
    }
}

#[cfg(test)]
mod test {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_squared_norm() {
        let mut rng = rand::rng();

        for dim in [1, 7, 8, 15, 16, 31, 64, 100, 129] {
            let vec: Vec<f32> = (0..dim).map(|_| rng.random::<f32>()).collect();
            let expect = native_squared_norm(&vec);
            let got = squared_norm(&vec);
            assert!((expect - got).abs() < 1e-4, "dim: {dim}, {expect} vs {got}");
        }
    }

    #[test]
    fn test_distances_to() {
        let mut rng = rand::rng();
        let num = 50;

        // cover the 16-wide blocks, the 8-wide remainder and the scalar tail
        for dim in [1, 7, 8, 13, 16, 24, 31, 64, 129] {
            let vecs: Vec<f32> = (0..dim * num).map(|_| rng.random::<f32>()).collect();
            let center = &vecs[3 * dim..4 * dim];

            let mut dispatched = vec![0.0; num];
            distances_to(&vecs, center, &mut dispatched);
            let mut portable = vec![0.0; num];
            Arch::new().dispatch(DistancesTo {
                vecs: &vecs,
                center,
                out: &mut portable,
            });

            for (i, vec) in vecs.chunks(dim).enumerate() {
                let expect = native_squared_euclidean(vec, center).sqrt();
                assert!((expect - dispatched[i]).abs() < 1e-4, "dim: {dim}, row {i}");
                assert!((expect - portable[i]).abs() < 1e-4, "dim: {dim}, row {i}");
            }
            assert_eq!(dispatched[3], 0.0);
            assert_eq!(portable[3], 0.0);
        }
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(native_argmax(&[0.0, 5.0, 5.0]), 1);
        assert_eq!(native_argmax(&[-1.0, 0.0, 0.0, 0.0]), 1);
        assert_eq!(native_argmax(&[3.0]), 0);
    }

    #[test]
    fn test_min_argmax_ties_across_lanes() {
        // ties placed in different lanes, accumulators and the tail
        for len in [3, 8, 17, 33, 64, 77, 130] {
            for first in 0..len {
                for second in first + 1..len.min(first + 40) {
                    let mut mins = vec![1.0; len];
                    mins[first] = 4.0;
                    mins[second] = 4.0;
                    let dists = vec![9.0; len];
                    assert_eq!(min_argmax(&mut mins, &dists), first, "len: {len}");
                }
            }
        }
    }

    #[test]
    fn test_min_argmax() {
        let mut rng = rand::rng();

        for len in [1, 2, 9, 16, 31, 100, 257, 1000] {
            let mins: Vec<f32> = (0..len).map(|_| rng.random::<f32>()).collect();
            let dists: Vec<f32> = (0..len).map(|_| rng.random::<f32>()).collect();

            let mut expect_mins = mins.clone();
            let expect = native_min_argmax(&mut expect_mins, &dists);
            let mut got_mins = mins.clone();
            let got = min_argmax(&mut got_mins, &dists);

            assert_eq!(expect, got, "len: {len}");
            assert_eq!(expect_mins, got_mins);
        }
    }

    #[test]
    fn test_min_argmax_sentinel() {
        let mut mins = vec![-1.0, 1.0, 2.0, 5.0, 9.0];
        let dists = vec![9.0, 8.0, 7.0, 4.0, 0.0];
        assert_eq!(min_argmax(&mut mins, &dists), 3);
        assert_eq!(mins, vec![-1.0, 1.0, 2.0, 4.0, 0.0]);
    }
}
