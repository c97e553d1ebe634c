//! Fitting polynomials to data.

use crate::{Expression, Term};
use nalgebra::{DMatrix as Matrix, DVector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("Received {inputs} inputs but {outputs} outputs")]
    LengthMismatch { inputs: usize, outputs: usize },
    #[error("At least one point is needed")]
    NoPoints,
    /// Usually caused by the same input appearing twice.
    #[error("The interpolation matrix is singular")]
    Singular,
}

/// Find the polynomial in `variable` of degree `n - 1` which passes through
/// all `n` points.
///
/// This solves the Vandermonde system `V.c = y` using LU decomposition,
/// where each row of `V` is `[x^(n-1), ..., x, 1]`.
pub fn interpolate(
    variable: &str,
    inputs: &[f64],
    outputs: &[f64],
) -> Result<Expression, InterpolationError> {
    if inputs.len() != outputs.len() {
        return Err(InterpolationError::LengthMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }
    if inputs.is_empty() {
        return Err(InterpolationError::NoPoints);
    }

    let n = inputs.len();
    let exponent = |column: usize| (n - 1 - column) as i32;

    let vandermonde =
        Matrix::from_fn(n, n, |row, column| inputs[row].powi(exponent(column)));
    let outputs = DVector::from_vec(outputs.to_vec());

    let coefficients = vandermonde
        .lu()
        .solve(&outputs)
        .ok_or(InterpolationError::Singular)?;
    tracing::trace!(?coefficients, "Solved the Vandermonde system");

    let terms = coefficients.iter().enumerate().map(|(column, &c)| {
        Term::new(c, std::iter::once((variable, f64::from(exponent(column)))))
    });

    Ok(Expression::from_terms(terms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_a_quadratic() {
        let got = interpolate("x", &[0.0, 1.0, 2.0], &[1.0, 3.0, 7.0]).unwrap();

        let should_be: Expression = "x^2 + x + 1".parse().unwrap();
        assert_eq!(got, should_be.simplify());
        let value = got.value_at(|_| Some(3.0)).unwrap();
        approx::assert_relative_eq!(value, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn a_single_point_is_a_constant() {
        let got = interpolate("t", &[5.0], &[2.0]).unwrap();

        assert_eq!(got, Expression::scalar(2.0));
    }

    #[test]
    fn mismatched_lengths() {
        let got = interpolate("x", &[1.0, 2.0], &[1.0]);

        assert_eq!(
            got,
            Err(InterpolationError::LengthMismatch {
                inputs: 2,
                outputs: 1
            })
        );
    }

    #[test]
    fn need_at_least_one_point() {
        assert_eq!(
            interpolate("x", &[], &[]),
            Err(InterpolationError::NoPoints)
        );
    }

    #[test]
    fn duplicate_inputs_are_singular() {
        let got = interpolate("x", &[1.0, 1.0], &[2.0, 3.0]);

        assert_eq!(got, Err(InterpolationError::Singular));
    }
}
