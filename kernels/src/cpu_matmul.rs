use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;

/// Batched matrix multiplication `[..., M, K] x [..., K, N] -> [..., M, N]`.
///
/// Leading (batch) dimensions must match exactly. Each output row is computed independently
/// on the rayon pool with an `i-k-j` loop order, so both inputs are streamed row by row.
pub fn cpu_matmul<T>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize],
    rhs_shape: &[usize],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let rank = lhs_shape.len();
    if rank < 2 || rhs_shape.len() != rank {
        return Err(KernelError::ShapeMismatch {
            expected: lhs_shape.to_vec(),
            got: rhs_shape.to_vec(),
        });
    }

    let (m, k) = (lhs_shape[rank - 2], lhs_shape[rank - 1]);
    let (k2, n) = (rhs_shape[rank - 2], rhs_shape[rank - 1]);
    if k != k2 || lhs_shape[..rank - 2] != rhs_shape[..rank - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: lhs_shape.to_vec(),
            got: rhs_shape.to_vec(),
        });
    }

    let batch: usize = lhs_shape[..rank - 2].iter().product();
    let mut out_data = vec![T::zero(); batch * m * n];
    if n == 0 {
        return Ok(out_data);
    }

    out_data
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(global_row, out_row)| {
            let b = global_row / m.max(1);
            let lhs_row = &lhs_data[global_row * k..(global_row + 1) * k];
            let rhs_matrix = &rhs_data[b * k * n..(b + 1) * k * n];

            for (l, &a) in lhs_row.iter().enumerate() {
                let rhs_row = &rhs_matrix[l * n..(l + 1) * n];
                for (o, &r) in out_row.iter_mut().zip(rhs_row) {
                    *o += a * r;
                }
            }
        });

    Ok(out_data)
}
