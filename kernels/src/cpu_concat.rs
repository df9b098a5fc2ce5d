use crate::{AxisLayout, KernelElem, KernelError, Result};
use rayon::prelude::*;

/// Concatenates `parts` (data, shape) along `axis`, returning the data and the output shape.
///
/// All parts must share rank and every dimension except `axis`.
pub fn cpu_concat<T>(parts: &[(&[T], &[usize])], axis: usize) -> Result<(Vec<T>, Vec<usize>)>
where
    T: KernelElem,
{
    let Some((_, first_shape)) = parts.first() else {
        return Err(KernelError::ShapeMismatch {
            expected: vec![1],
            got: vec![0],
        });
    };

    AxisLayout::new(first_shape, axis)?;
    let mut out_shape = first_shape.to_vec();
    out_shape[axis] = 0;
    let mut layouts = Vec::with_capacity(parts.len());
    for (data, shape) in parts {
        let layout = AxisLayout::new(shape, axis)?;
        layout.check_len(data.len())?;
        let compatible = shape.len() == first_shape.len()
            && shape
                .iter()
                .zip(first_shape.iter())
                .enumerate()
                .all(|(d, (a, b))| d == axis || a == b);
        if !compatible {
            return Err(KernelError::ShapeMismatch {
                expected: first_shape.to_vec(),
                got: shape.to_vec(),
            });
        }
        out_shape[axis] += layout.len;
        layouts.push(layout);
    }

    let outer = layouts[0].outer;
    let inner = layouts[0].inner;
    let block = out_shape[axis] * inner;
    let mut out = vec![T::zero(); outer * block];
    if block == 0 {
        return Ok((out, out_shape));
    }

    out.par_chunks_mut(block).enumerate().for_each(|(o, dst)| {
        let mut offset = 0;
        for ((data, _), layout) in parts.iter().zip(&layouts) {
            let width = layout.len * inner;
            dst[offset..offset + width].copy_from_slice(&data[o * width..(o + 1) * width]);
            offset += width;
        }
    });
    Ok((out, out_shape))
}

/// Splits `data` along `axis` into consecutive pieces of the given `sizes`.
pub fn cpu_split<T>(data: &[T], shape: &[usize], axis: usize, sizes: &[usize]) -> Result<Vec<Vec<T>>>
where
    T: KernelElem,
{
    let layout = AxisLayout::new(shape, axis)?;
    layout.check_len(data.len())?;
    let total: usize = sizes.iter().sum();
    if total != layout.len {
        return Err(KernelError::ShapeMismatch {
            expected: vec![layout.len],
            got: sizes.to_vec(),
        });
    }

    let AxisLayout { outer, len, inner } = layout;
    let mut pieces: Vec<Vec<T>> = sizes
        .iter()
        .map(|s| Vec::with_capacity(outer * s * inner))
        .collect();
    for o in 0..outer {
        let mut offset = o * len * inner;
        for (piece, &s) in pieces.iter_mut().zip(sizes) {
            piece.extend_from_slice(&data[offset..offset + s * inner]);
            offset += s * inner;
        }
    }
    Ok(pieces)
}
