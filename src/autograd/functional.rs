use crate::autograd::Variable;
use crate::tensor::{Cpu, Result, Tensor, TensorElem};

type CpuTensor<T, const RANK: usize> = Tensor<T, RANK, Cpu>;

/// Turns `f` into a function returning the gradient of `f` at its argument.
///
/// The output of `f` is seeded with ones, so for non-scalar outputs this is the gradient of
/// the sum of the outputs.
///
/// # Example
/// ```
/// use recsys_rs::autograd::functional::grad;
/// use recsys_rs::autograd::Variable;
/// use recsys_rs::tensor::Tensor;
///
/// let grad_square = grad(|x: Variable<f32, 0>| &x * &x);
/// let g = grad_square(Tensor::new(vec![3.0], []).unwrap()).unwrap();
/// assert_eq!(g.data(), &[6.0]);
/// ```
pub fn grad<F, T, const RANK: usize, const OUT: usize>(
    f: F,
) -> impl Fn(CpuTensor<T, RANK>) -> Result<CpuTensor<T, RANK>>
where
    F: Fn(Variable<T, RANK>) -> Result<Variable<T, OUT>>,
    T: TensorElem + 'static,
{
    let vag = value_and_grad(f);
    move |x| vag(x).map(|(_, g)| g)
}

/// Like [`grad`], but also returns the value of `f`.
pub fn value_and_grad<F, T, const RANK: usize, const OUT: usize>(
    f: F,
) -> impl Fn(CpuTensor<T, RANK>) -> Result<(CpuTensor<T, OUT>, CpuTensor<T, RANK>)>
where
    F: Fn(Variable<T, RANK>) -> Result<Variable<T, OUT>>,
    T: TensorElem + 'static,
{
    move |x| {
        let x_var = Variable::new(x);
        let y_var = f(x_var.clone())?;
        y_var.backward()?;

        // No dependency on the input means a zero gradient.
        let g = x_var
            .gradient()
            .unwrap_or_else(|| Tensor::zeros(*x_var.shape()));
        Ok((y_var.data, g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grad_square() {
        // f(x) = x^2, f'(x) = 2x
        let grad_square = grad(|x: Variable<f32, 0>| &x * &x);
        let g = grad_square(Tensor::new(vec![3.0], []).unwrap()).unwrap();
        assert_eq!(g.data()[0], 6.0);
    }

    #[test]
    fn test_value_and_grad_cubic() {
        // f(x) = x^3, f'(x) = 3x^2
        let cubic = value_and_grad(|x: Variable<f32, 0>| &(&x * &x)? * &x);
        let (val, g) = cubic(Tensor::new(vec![2.0], []).unwrap()).unwrap();

        assert_eq!(val.data()[0], 8.0);
        assert_eq!(g.data()[0], 12.0);
    }

    #[test]
    fn test_grad_constant() {
        let constant = value_and_grad(|_x: Variable<f32, 0>| {
            Tensor::<f32, 0>::new(vec![5.0], []).map(Variable::new)
        });
        let (val, g) = constant(Tensor::new(vec![2.0], []).unwrap()).unwrap();

        assert_eq!(val.data()[0], 5.0);
        assert_eq!(g.data()[0], 0.0);
    }

    #[test]
    fn test_grad_of_reduction() {
        // f(x) = sum(x * x) over a vector, f'(x) = 2x
        let sum_sq = grad(|x: Variable<f64, 1>| (&x * &x).map(|sq| sq.sum_all()));
        let g = sum_sq(Tensor::new(vec![1.0, -2.0, 0.5], [3]).unwrap()).unwrap();
        assert_eq!(g.data(), &[2.0, -4.0, 1.0]);
    }
}
