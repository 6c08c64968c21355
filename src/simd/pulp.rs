//! SIMD implementation with `pulp`

use core::iter;

use pulp::{Simd, as_arrays, as_arrays_mut};

#[inline(always)]
fn abs2_add<S: Simd>(simd: S, x: S::f32s, acc: S::f32s) -> S::f32s {
    simd.mul_add_f32s(x, x, acc)
}

/// Compute the squared Euclidean distance between two vectors.
///
/// Code refers to <https://github.com/nmslib/hnswlib/blob/master/hnswlib/space_l2.h>
#[inline]
pub fn l2_squared_distance<S: Simd>(simd: S, lhs: &[f32], rhs: &[f32]) -> f32 {
    simd.vectorize(
        #[inline(always)]
        || {
            assert_eq!(lhs.len(), rhs.len());

            let (lhs, lhs_tail) = S::as_simd_f32s(lhs);
            let (rhs, rhs_tail) = S::as_simd_f32s(rhs);

            let (lhs2, lhs1) = as_arrays::<2, _>(lhs);
            let (rhs2, rhs1) = as_arrays::<2, _>(rhs);

            let mut sum0 = simd.splat_f32s(0.0);
            let mut sum1 = simd.splat_f32s(0.0);

            for (&[l0, l1], &[r0, r1]) in iter::zip(lhs2, rhs2) {
                sum0 = abs2_add(simd, simd.sub_f32s(l0, r0), sum0);
                sum1 = abs2_add(simd, simd.sub_f32s(l1, r1), sum1);
            }

            for (&l0, &r0) in iter::zip(lhs1, rhs1) {
                sum0 = abs2_add(simd, simd.sub_f32s(l0, r0), sum0);
            }
            {
                let l0 = simd.partial_load_f32s(lhs_tail);
                let r0 = simd.partial_load_f32s(rhs_tail);

                sum0 = abs2_add(simd, simd.sub_f32s(l0, r0), sum0);
            }

            simd.reduce_sum_f32s(simd.add_f32s(sum0, sum1))
        },
    )
}

/// Compute the squared L2 norm of the vector.
#[inline]
pub fn squared_norm<S: Simd>(simd: S, vec: &[f32]) -> f32 {
    simd.vectorize(
        #[inline(always)]
        || {
            let (vec, vec_tail) = S::as_simd_f32s(vec);
            let (vec2, vec1) = as_arrays::<2, _>(vec);

            let mut sum0 = simd.splat_f32s(0.0);
            let mut sum1 = simd.splat_f32s(0.0);

            for &[v0, v1] in vec2 {
                sum0 = abs2_add(simd, v0, sum0);
                sum1 = abs2_add(simd, v1, sum1);
            }

            for &v0 in vec1 {
                sum0 = abs2_add(simd, v0, sum0);
            }
            {
                let v0 = simd.partial_load_f32s(vec_tail);
                sum0 = abs2_add(simd, v0, sum0);
            }

            simd.reduce_sum_f32s(simd.add_f32s(sum0, sum1))
        },
    )
}

/// Write the Euclidean distance from every row of `vecs` to `center` into `out`.
///
/// `vecs` is row-major with `center.len()` columns and `out` holds one entry per row.
#[inline]
pub fn distances_to<S: Simd>(simd: S, vecs: &[f32], center: &[f32], out: &mut [f32]) {
    simd.vectorize(
        #[inline(always)]
        || {
            let dim = center.len();
            assert_eq!(vecs.len(), out.len() * dim);

            for (o, vec) in iter::zip(out.iter_mut(), vecs.chunks_exact(dim)) {
                *o = l2_squared_distance(simd, vec, center).sqrt();
            }
        },
    )
}

/// Update `min_distances` with the elementwise minimum against `distances` and
/// return the index of the maximum of the updated vector.
///
/// Each lane only replaces its candidate on a strictly greater value, so it keeps
/// the first occurrence it has seen. The final reduction picks the lowest index
/// among all lanes holding the maximum, which makes ties resolve to the lowest
/// index regardless of the lane width.
#[inline]
pub fn min_argmax<S: Simd>(simd: S, min_distances: &mut [f32], distances: &[f32]) -> usize {
    simd.vectorize(
        #[inline(always)]
        || {
            assert_eq!(min_distances.len(), distances.len());

            let (mins, mins_tail) = S::as_mut_simd_f32s(min_distances);
            let (dists, dists_tail) = S::as_simd_f32s(distances);

            let (mins2, mins1) = as_arrays_mut::<2, _>(mins);
            let (dists2, dists1) = as_arrays::<2, _>(dists);

            let lanes = simd.splat_u32s(S::U32_LANES as u32);
            let inc = simd.add_u32s(lanes, lanes);
            let neg_infty = simd.splat_f32s(f32::NEG_INFINITY);

            let mut max0 = neg_infty;
            let mut max1 = neg_infty;
            let mut max_idx0 = simd.splat_u32s(0);
            let mut max_idx1 = simd.splat_u32s(0);

            let mut idx0: S::u32s =
                pulp::cast_lossy([0u32, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
            let mut idx1 = simd.add_u32s(idx0, lanes);

            for ([m0, m1], &[d0, d1]) in iter::zip(mins2, dists2) {
                *m0 = simd.min_f32s(*m0, d0);
                let greater = simd.less_than_f32s(max0, *m0);
                max0 = simd.select_f32s_m32s(greater, *m0, max0);
                max_idx0 = simd.select_u32s_m32s(greater, idx0, max_idx0);

                *m1 = simd.min_f32s(*m1, d1);
                let greater = simd.less_than_f32s(max1, *m1);
                max1 = simd.select_f32s_m32s(greater, *m1, max1);
                max_idx1 = simd.select_u32s_m32s(greater, idx1, max_idx1);

                idx0 = simd.add_u32s(idx0, inc);
                idx1 = simd.add_u32s(idx1, inc);
            }

            for (m0, &d0) in iter::zip(mins1, dists1) {
                *m0 = simd.min_f32s(*m0, d0);
                let greater = simd.less_than_f32s(max0, *m0);
                max0 = simd.select_f32s_m32s(greater, *m0, max0);
                max_idx0 = simd.select_u32s_m32s(greater, idx0, max_idx0);

                idx0 = simd.add_u32s(idx0, lanes);
            }

            {
                let mask = simd.mask_between_m32s(0, mins_tail.len() as u32).mask();

                let m0 = simd.partial_load_f32s(mins_tail);
                let d0 = simd.partial_load_f32s(dists_tail);
                let updated = simd.min_f32s(m0, d0);
                simd.partial_store_f32s(mins_tail, updated);

                let updated = simd.select_f32s_m32s(mask, updated, neg_infty);
                let greater = simd.less_than_f32s(max0, updated);
                max0 = simd.select_f32s_m32s(greater, updated, max0);
                max_idx0 = simd.select_u32s_m32s(greater, idx0, max_idx0);
            }

            let max = simd.reduce_max_f32s(simd.max_f32s(max0, max1));
            let values = [max0, max1];
            let indices = [max_idx0, max_idx1];
            let values = bytemuck::cast_slice::<S::f32s, f32>(values.as_slice());
            let indices = bytemuck::cast_slice::<S::u32s, u32>(indices.as_slice());

            iter::zip(values, indices)
                .filter(|&(&value, _)| value == max)
                .map(|(_, &index)| index as usize)
                .min()
                .unwrap_or(0)
        },
    )
}
