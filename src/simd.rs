//! Accelerate with SIMD.

pub mod pulp;

/// Write the Euclidean distance from every row of `vecs` to `center` into `out`.
///
/// `vecs` is row-major with `center.len()` columns. Each row accumulates two
/// 8-lane FMA sums, as in <https://github.com/nmslib/hnswlib/blob/master/hnswlib/space_l2.h>.
///
/// # Safety
///
/// This function is marked unsafe because it requires the AVX and FMA intrinsics.
#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[target_feature(enable = "fma,avx")]
#[inline]
pub unsafe fn distances_to(vecs: &[f32], center: &[f32], out: &mut [f32]) {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    let dim = center.len();
    assert_eq!(vecs.len(), out.len() * dim);
    let blocks = dim / 16;
    let rest8 = (dim & 0b1111) / 8;
    let rest = dim & 0b111;

    for (o, row) in out.iter_mut().zip(vecs.chunks_exact(dim)) {
        let mut row_ptr = row.as_ptr();
        let mut center_ptr = center.as_ptr();

        unsafe {
            let mut sum0 = _mm256_setzero_ps();
            let mut sum1 = _mm256_setzero_ps();
            for _ in 0..blocks {
                let diff0 = _mm256_sub_ps(_mm256_loadu_ps(row_ptr), _mm256_loadu_ps(center_ptr));
                let diff1 = _mm256_sub_ps(
                    _mm256_loadu_ps(row_ptr.add(8)),
                    _mm256_loadu_ps(center_ptr.add(8)),
                );
                sum0 = _mm256_fmadd_ps(diff0, diff0, sum0);
                sum1 = _mm256_fmadd_ps(diff1, diff1, sum1);
                row_ptr = row_ptr.add(16);
                center_ptr = center_ptr.add(16);
            }
            for _ in 0..rest8 {
                let diff = _mm256_sub_ps(_mm256_loadu_ps(row_ptr), _mm256_loadu_ps(center_ptr));
                sum0 = _mm256_fmadd_ps(diff, diff, sum0);
                row_ptr = row_ptr.add(8);
                center_ptr = center_ptr.add(8);
            }

            let mut res = reduce_sum_256(_mm256_add_ps(sum0, sum1));
            for _ in 0..rest {
                let residual = *row_ptr - *center_ptr;
                res += residual * residual;
                row_ptr = row_ptr.add(1);
                center_ptr = center_ptr.add(1);
            }
            *o = res.sqrt();
        }
    }

    #[inline(always)]
    unsafe fn reduce_sum_256(accumulate: __m256) -> f32 {
        unsafe {
            // add [4..7] to [0..3]
            let mut combined = _mm256_add_ps(
                accumulate,
                _mm256_permute2f128_ps(accumulate, accumulate, 1),
            );
            // add [0..3] to [0..1]
            combined = _mm256_hadd_ps(combined, combined);
            // add [0..1] to [0]
            combined = _mm256_hadd_ps(combined, combined);
            _mm256_cvtss_f32(combined)
        }
    }
}
