use crate::{AxisLayout, KernelElem, KernelError, Result};
use rayon::prelude::*;

/// Sums `data` along `axis`; the result has that axis collapsed to length 1.
pub fn cpu_sum_axis<T>(data: &[T], shape: &[usize], axis: usize) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    layout.check_len(data.len())?;
    let AxisLayout { outer, len, inner } = layout;

    let mut out = vec![T::zero(); outer * inner];
    if inner == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(inner).enumerate().for_each(|(o, dst)| {
        let block = &data[o * len * inner..(o + 1) * len * inner];
        for row in block.chunks(inner) {
            for (d, &v) in dst.iter_mut().zip(row) {
                *d += v;
            }
        }
    });
    Ok(out)
}

/// Maximum along `axis` together with the position of the maximum inside the axis.
///
/// Ties resolve to the first occurrence. An empty axis has no maximum and is rejected.
pub fn cpu_max_axis<T>(data: &[T], shape: &[usize], axis: usize) -> Result<(Vec<T>, Vec<usize>)>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    layout.check_len(data.len())?;
    let AxisLayout { outer, len, inner } = layout;
    if len == 0 {
        return Err(KernelError::ShapeMismatch {
            expected: vec![1],
            got: vec![0],
        });
    }

    let mut values = vec![T::zero(); outer * inner];
    let mut positions = vec![0usize; outer * inner];
    if inner == 0 {
        return Ok((values, positions));
    }
    values
        .par_chunks_mut(inner)
        .zip(positions.par_chunks_mut(inner))
        .enumerate()
        .for_each(|(o, (vals, pos))| {
            let block = &data[o * len * inner..(o + 1) * len * inner];
            vals.copy_from_slice(&block[..inner]);
            for (l, row) in block.chunks(inner).enumerate().skip(1) {
                for i in 0..inner {
                    if row[i] > vals[i] {
                        vals[i] = row[i];
                        pos[i] = l;
                    }
                }
            }
        });
    Ok((values, positions))
}

/// Repeats a length-1 `axis` `size` times.
pub fn cpu_expand_axis<T>(data: &[T], shape: &[usize], axis: usize, size: usize) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    layout.check_len(data.len())?;
    if layout.len != 1 {
        return Err(KernelError::ShapeMismatch {
            expected: vec![1],
            got: vec![layout.len],
        });
    }
    let inner = layout.inner;

    let mut out = vec![T::zero(); layout.outer * size * inner];
    if inner == 0 || size == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(size * inner)
        .zip(data.par_chunks(inner))
        .for_each(|(dst, src)| {
            for row in dst.chunks_mut(inner) {
                row.copy_from_slice(src);
            }
        });
    Ok(out)
}
