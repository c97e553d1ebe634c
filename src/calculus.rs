//! Symbolic differentiation and integration.

use crate::{ops::EvaluationError, BinaryOperation, Expression, Vector};

/// Calculate an [`Expression`]'s partial derivative with respect to
/// `variable`.
pub fn differentiate(
    expr: &Expression,
    variable: &str,
) -> Result<Expression, EvaluationError> {
    match expr {
        Expression::Terms(terms) => Ok(Expression::from_terms(
            terms.iter().map(|term| term.differentiate(variable)),
        )),
        Expression::Binary { left, right, op } => {
            differentiate_binary(*op, left, right, variable)
        },
        Expression::FunctionCall { function, .. } => {
            Err(EvaluationError::UnableToDifferentiate {
                name: function.name().into(),
            })
        },
    }
}

fn differentiate_binary(
    op: BinaryOperation,
    left: &Expression,
    right: &Expression,
    variable: &str,
) -> Result<Expression, EvaluationError> {
    match op {
        BinaryOperation::Add => {
            let d_left = differentiate(left, variable)?;
            let d_right = differentiate(right, variable)?;

            Ok(d_left.add(d_right).simplify())
        },
        BinaryOperation::Subtract => {
            let d_left = differentiate(left, variable)?;
            let d_right = differentiate(right, variable)?;

            Ok(d_left.subtract(d_right).simplify())
        },
        BinaryOperation::Multiply => {
            // The product rule
            let d_left = differentiate(left, variable)?;
            let d_right = differentiate(right, variable)?;
            let left = left.clone().multiply(d_right).simplify();
            let right = right.clone().multiply(d_left).simplify();

            Ok(left.add(right).simplify())
        },
        BinaryOperation::Divide => {
            // The quotient rule
            let d_left = differentiate(left, variable)?;
            let d_right = differentiate(right, variable)?;
            let numerator = right
                .clone()
                .multiply(d_left)
                .simplify()
                .subtract(left.clone().multiply(d_right).simplify())
                .simplify();

            if numerator.is_zero() {
                return Ok(Expression::zero());
            }

            let denominator = right.clone().multiply(right.clone()).simplify();
            let quotient = numerator.divide(denominator);

            Ok(quotient.try_simplify().unwrap_or(quotient))
        },
        BinaryOperation::Power => Err(EvaluationError::UnableToDifferentiate {
            name: op.symbol().into(),
        }),
    }
}

/// Calculate the indefinite integral of an [`Expression`] with respect to
/// `variable`. No constant of integration is added.
///
/// # Panics
///
/// Integrating `x^-1` with respect to `x` would need a logarithm, so it
/// panics just like [`crate::Term::integrate()`].
pub fn integrate(
    expr: &Expression,
    variable: &str,
) -> Result<Expression, EvaluationError> {
    match expr {
        Expression::Terms(terms) => Ok(Expression::from_terms(
            terms.iter().map(|term| term.integrate(variable)),
        )),
        Expression::Binary { left, right, op } => {
            integrate_binary(*op, left, right, variable).or_else(|error| {
                // products have no rule of their own, but they may still
                // expand into a polynomial
                match (*op, expr.try_simplify()) {
                    (
                        BinaryOperation::Multiply,
                        Some(simplified @ Expression::Terms(_)),
                    ) => integrate(&simplified, variable),
                    _ => Err(error),
                }
            })
        },
        Expression::FunctionCall { function, .. } => {
            Err(EvaluationError::UnableToIntegrate {
                name: function.name().into(),
            })
        },
    }
}

fn integrate_binary(
    op: BinaryOperation,
    left: &Expression,
    right: &Expression,
    variable: &str,
) -> Result<Expression, EvaluationError> {
    match op {
        BinaryOperation::Add => {
            let left = integrate(left, variable)?;
            let right = integrate(right, variable)?;

            Ok(left.add(right).simplify())
        },
        BinaryOperation::Subtract => {
            let left = integrate(left, variable)?;
            let right = integrate(right, variable)?;

            Ok(left.subtract(right).simplify())
        },
        _ => Err(EvaluationError::UnableToIntegrate {
            name: op.symbol().into(),
        }),
    }
}

/// Integrate between two bounds, `F(end) - F(start)`.
pub fn integrate_over(
    expr: &Expression,
    variable: &str,
    start: f64,
    end: f64,
) -> Result<Expression, EvaluationError> {
    let antiderivative = integrate(expr, variable)?;

    let at = |value: f64| {
        antiderivative.substitute(move |name: &str| {
            if name == variable {
                Some(value)
            } else {
                None
            }
        })
    };

    Ok(at(end).subtract(at(start)).simplify())
}

/// Get the partial derivative with respect to every variable.
pub fn gradient(expr: &Expression) -> Result<Vector, EvaluationError> {
    let mut components = Vector::new();

    for variable in expr.variables() {
        let derivative = differentiate(expr, &variable)?;
        components.insert(variable, derivative);
    }

    Ok(components)
}
