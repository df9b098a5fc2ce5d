use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;

const TILE: usize = 32;

/// Swaps the last two dimensions: `[..., M, N] -> [..., N, M]`.
///
/// Matrices in the batch are transposed in parallel; inside one matrix the copy walks
/// `TILE x TILE` blocks.
pub fn cpu_transpose<T>(data: &[T], shape: &[usize]) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let rank = shape.len();
    if rank < 2 {
        return Err(KernelError::InvalidAxis { axis: 1, rank });
    }
    let size: usize = shape.iter().product();
    if data.len() != size {
        return Err(KernelError::ShapeMismatch {
            expected: vec![size],
            got: vec![data.len()],
        });
    }

    let (m, n) = (shape[rank - 2], shape[rank - 1]);
    let mut out_data = vec![T::zero(); size];
    if m == 0 || n == 0 {
        return Ok(out_data);
    }

    out_data
        .par_chunks_mut(m * n)
        .zip(data.par_chunks(m * n))
        .for_each(|(dst, src)| {
            for r0 in (0..m).step_by(TILE) {
                for c0 in (0..n).step_by(TILE) {
                    for r in r0..(r0 + TILE).min(m) {
                        for c in c0..(c0 + TILE).min(n) {
                            dst[c * m + r] = src[r * n + c];
                        }
                    }
                }
            }
        });

    Ok(out_data)
}
