use crate::{AxisLayout, KernelElem, KernelError, Result};
use rayon::prelude::*;

/// Gathers the slices at `indices` along `axis`.
///
/// The result has the shape of the input with `shape[axis]` replaced by `indices.len()`.
/// Indices may repeat.
pub fn cpu_index_select<T>(
    data: &[T],
    shape: &[usize],
    axis: usize,
    indices: &[usize],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    layout.check_len(data.len())?;
    check_indices(indices, layout.len)?;
    let AxisLayout { outer, len, inner } = layout;

    let block = indices.len() * inner;
    let mut out = vec![T::zero(); outer * block];
    if block == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(block).enumerate().for_each(|(o, dst)| {
        let src = &data[o * len * inner..(o + 1) * len * inner];
        for (row, &idx) in dst.chunks_mut(inner).zip(indices) {
            row.copy_from_slice(&src[idx * inner..(idx + 1) * inner]);
        }
    });
    Ok(out)
}

/// Adjoint of [`cpu_index_select`]: scatters `grad` back onto a zero tensor of `shape`,
/// summing the contributions of repeated indices.
///
/// Slices whose index equals `skip` are left untouched.
pub fn cpu_index_add<T>(
    grad: &[T],
    shape: &[usize],
    axis: usize,
    indices: &[usize],
    skip: Option<usize>,
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    check_indices(indices, layout.len)?;
    let AxisLayout { outer, len, inner } = layout;

    let block = indices.len() * inner;
    if grad.len() != outer * block {
        return Err(KernelError::ShapeMismatch {
            expected: vec![outer * block],
            got: vec![grad.len()],
        });
    }

    let mut out = vec![T::zero(); layout.size()];
    if len * inner == 0 || block == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(len * inner)
        .zip(grad.par_chunks(block))
        .for_each(|(dst, src)| {
            for (row, &idx) in src.chunks(inner).zip(indices) {
                if Some(idx) == skip {
                    continue;
                }
                for (d, &g) in dst[idx * inner..(idx + 1) * inner].iter_mut().zip(row) {
                    *d += g;
                }
            }
        });
    Ok(out)
}

fn check_indices(indices: &[usize], bound: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= bound) {
        Some(&index) => Err(KernelError::IndexOutOfBounds { index, bound }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_select_rows() {
        // Embedding-style lookup: table [3, 2], ids [2, 0, 2]
        let table = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = cpu_index_select(&table, &[3, 2], 0, &[2, 0, 2]).unwrap();
        assert_eq!(out, vec![5.0, 6.0, 1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_index_select_middle_axis() {
        // [1, 3, 2], pick field 2 then field 0
        let data = vec![1, 2, 3, 4, 5, 6];
        let out = cpu_index_select(&data, &[1, 3, 2], 1, &[2, 0]).unwrap();
        assert_eq!(out, vec![5, 6, 1, 2]);
    }

    #[test]
    fn test_index_select_out_of_bounds() {
        let err = cpu_index_select(&[1.0f32, 2.0], &[2, 1], 0, &[0, 2]);
        assert!(matches!(
            err,
            Err(KernelError::IndexOutOfBounds { index: 2, bound: 2 })
        ));
    }

    #[test]
    fn test_index_add_accumulates_repeats() {
        let grad = vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let out = cpu_index_add(&grad, &[3, 2], 0, &[2, 0, 2], None).unwrap();
        // row 0 <- 2, row 2 <- 1 + 3
        assert_eq!(out, vec![2.0, 2.0, 0.0, 0.0, 4.0, 4.0]);
    }

    #[test]
    fn test_index_add_skip() {
        let grad = vec![1.0, 2.0, 3.0];
        let out = cpu_index_add(&grad, &[2, 1], 0, &[0, 1, 0], Some(0)).unwrap();
        assert_eq!(out, vec![0.0, 2.0]);
    }
}
