//! [`Expression`] operations.

use crate::{
    expr::{degree_of, reduce_terms, terms_are_zero},
    BinaryOperation, Builtin, Expression, Term,
};
use smol_str::SmolStr;
use thiserror::Error;

/// Long division of multivariate polynomials isn't guaranteed to terminate,
/// so we give up after this many steps.
const MAX_DIVISION_STEPS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("No value was provided for \"{name}\"")]
    UnboundVariable { name: SmolStr },
    #[error("Attempted to divide by zero")]
    DivideByZero,
    #[error("Unable to differentiate \"{name}\"")]
    UnableToDifferentiate { name: SmolStr },
    #[error("Unable to integrate \"{name}\"")]
    UnableToIntegrate { name: SmolStr },
}

/// Simplify an expression, collapsing as much of it into a sum of terms as
/// possible.
pub fn simplify(expr: &Expression) -> Expression {
    if let Some(simplified) = try_simplify(expr) {
        return simplified;
    }

    match expr {
        Expression::Binary { left, right, op } => {
            Expression::binary(*op, simplify(left), simplify(right))
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => Expression::FunctionCall {
            function: *function,
            arguments: arguments.iter().map(simplify).collect(),
        },
        Expression::Terms(_) => expr.clone(),
    }
}

/// Try to turn an expression into a sum of terms.
pub fn try_simplify(expr: &Expression) -> Option<Expression> {
    match expr {
        Expression::Terms(terms) => {
            Some(Expression::from_terms(terms.iter().cloned()))
        },
        Expression::Binary { left, right, op } => {
            simplify_binary(*op, left, right)
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => fold_function_call(*function, arguments),
    }
}

fn flatten(expr: &Expression) -> Option<Vec<Term>> {
    match try_simplify(expr)? {
        Expression::Terms(terms) => Some(terms),
        _ => None,
    }
}

fn simplify_binary(
    op: BinaryOperation,
    left: &Expression,
    right: &Expression,
) -> Option<Expression> {
    match op {
        BinaryOperation::Add => {
            let mut terms = flatten(left)?;
            terms.extend(flatten(right)?);
            Some(Expression::from_terms(terms))
        },
        BinaryOperation::Subtract => {
            let mut terms = flatten(left)?;
            terms.extend(flatten(right)?.iter().map(Term::negate));
            Some(Expression::from_terms(terms))
        },
        BinaryOperation::Multiply => {
            let left = flatten(left)?;
            let right = flatten(right)?;

            let products = left
                .iter()
                .flat_map(|l| right.iter().map(move |r| l.multiply(r)));
            Some(Expression::from_terms(products))
        },
        BinaryOperation::Divide => {
            long_division(flatten(left)?, flatten(right)?)
        },
        BinaryOperation::Power => None,
    }
}

/// Divide one polynomial by another, only succeeding when there is no
/// remainder.
fn long_division(dividend: Vec<Term>, divisor: Vec<Term>) -> Option<Expression> {
    let dividend = reduce_terms(dividend);
    let divisor = reduce_terms(divisor);

    if terms_are_zero(&divisor) {
        return None;
    }
    if terms_are_zero(&dividend) {
        return Some(Expression::zero());
    }

    let divisor_degree = degree_of(&divisor);
    if degree_of(&dividend) < divisor_degree {
        return None;
    }

    // terms are kept in canonical order, so the first one leads
    let leading_divisor = divisor.first()?;
    let mut quotient = Vec::new();
    let mut remainder = dividend;
    let mut steps = 0;

    while !terms_are_zero(&remainder) && degree_of(&remainder) >= divisor_degree
    {
        if steps >= MAX_DIVISION_STEPS {
            tracing::debug!(
                steps,
                remainder = %Expression::Terms(remainder.clone()),
                "Giving up on long division"
            );
            return None;
        }
        steps += 1;

        let next = remainder.first()?.divide(leading_divisor);
        tracing::trace!(step = steps, quotient_term = %next, "Long division");

        let subtracted = divisor.iter().map(|term| term.multiply(&next).negate());
        remainder = reduce_terms(remainder.into_iter().chain(subtracted));
        quotient.push(next);
    }

    if terms_are_zero(&remainder) {
        Some(Expression::from_terms(quotient))
    } else {
        None
    }
}

/// Evaluate a function call when all of its arguments are constant.
fn fold_function_call(
    function: Builtin,
    arguments: &[Expression],
) -> Option<Expression> {
    let mut values: Vec<f64> = Vec::with_capacity(arguments.len());

    for argument in arguments {
        let terms = flatten(argument)?;

        if !terms.iter().all(Term::is_constant) {
            return None;
        }

        values.push(terms.iter().map(Term::coefficient).sum());
    }

    Some(Expression::scalar(function.apply(&values)))
}

/// Evaluate an [`Expression`], using `lookup` to get the value of each
/// variable.
pub fn evaluate(
    expr: &Expression,
    lookup: &dyn Fn(&str) -> Option<f64>,
) -> Result<f64, EvaluationError> {
    match expr {
        Expression::Terms(terms) => {
            terms.iter().map(|term| term.value_at(lookup)).sum()
        },
        Expression::Binary { left, right, op } => {
            let left = evaluate(left, lookup)?;
            let right = evaluate(right, lookup)?;
            op.apply(left, right)
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => {
            let values = arguments
                .iter()
                .map(|argument| evaluate(argument, lookup))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(function.apply(&values))
        },
    }
}

/// Replace every variable `lookup` knows about with its value.
pub fn substitute(
    expr: &Expression,
    lookup: &dyn Fn(&str) -> Option<f64>,
) -> Expression {
    match expr {
        Expression::Terms(terms) => Expression::from_terms(
            terms.iter().map(|term| term.partially_evaluate(lookup)),
        ),
        Expression::Binary { left, right, op } => Expression::binary(
            *op,
            substitute(left, lookup),
            substitute(right, lookup),
        ),
        Expression::FunctionCall {
            function,
            arguments,
        } => Expression::FunctionCall {
            function: *function,
            arguments: arguments
                .iter()
                .map(|argument| substitute(argument, lookup))
                .collect(),
        },
    }
}

/// Replace every occurrence of `variable` with `replacement`, giving
/// `f(g)`.
///
/// Each power of `variable` becomes a product of copies of `replacement`
/// (or a [`BinaryOperation::Power`] node for fractional exponents), so
/// [`simplify()`] can expand the result.
pub fn compose(
    expr: &Expression,
    variable: &str,
    replacement: &Expression,
) -> Expression {
    match expr {
        Expression::Terms(terms) => {
            let mut untouched = Vec::new();
            let mut composed: Option<Expression> = None;

            for term in terms {
                let exponent = term.exponent(variable);
                if exponent == 0.0 {
                    untouched.push(term.clone());
                    continue;
                }

                let rest = term.partially_evaluate(|name| {
                    if name == variable {
                        Some(1.0)
                    } else {
                        None
                    }
                });
                let piece =
                    Expression::from(rest).multiply(raise(replacement, exponent));

                composed = Some(match composed {
                    Some(sum) => sum.add(piece),
                    None => piece,
                });
            }

            match composed {
                Some(composed) if untouched.is_empty() => composed,
                Some(composed) => {
                    Expression::from_terms(untouched).add(composed)
                },
                None => Expression::from_terms(untouched),
            }
        },
        Expression::Binary { left, right, op } => Expression::binary(
            *op,
            compose(left, variable, replacement),
            compose(right, variable, replacement),
        ),
        Expression::FunctionCall {
            function,
            arguments,
        } => Expression::FunctionCall {
            function: *function,
            arguments: arguments
                .iter()
                .map(|argument| compose(argument, variable, replacement))
                .collect(),
        },
    }
}

/// `base^exponent`, spelled out as repeated multiplication when the exponent
/// is a whole number.
fn raise(base: &Expression, exponent: f64) -> Expression {
    if exponent.fract() != 0.0 {
        return base.clone().power(Expression::scalar(exponent));
    }

    let count = exponent.abs() as usize;
    let product = (1..count)
        .fold(base.clone(), |product, _| product.multiply(base.clone()));

    if exponent < 0.0 {
        Expression::one().divide(product)
    } else {
        product
    }
}
