use crate::{ops::EvaluationError, Expression, Term, Vector};
use arrayvec::ArrayVec;
use smol_str::SmolStr;
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::RangeInclusive,
};
use thiserror::Error;

/// A single root and how far off it is.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// The value of each variable at the root.
    pub root: Vector,
    /// The absolute value of the expression at [`SolveResult::root`].
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("Evaluation failed")]
    Eval(#[from] EvaluationError),
    #[error("Unable to find anywhere to start searching for a root")]
    NoStartingPoint,
}

/// Find the roots of an [`Expression`].
///
/// Single-variable polynomials of degree 1 or 2 are solved exactly. Anything
/// else gets a coarse grid search for a starting point followed by
/// fixed-point iteration, which gives a single (possibly inaccurate) root.
#[derive(Debug, Clone, PartialEq)]
pub struct Solver {
    epsilon: f64,
    max_iterations: usize,
    search_range: RangeInclusive<i32>,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver {
            epsilon: 1e-6,
            max_iterations: 100,
            search_range: -100..=100,
        }
    }
}

impl Solver {
    pub fn new() -> Self { Solver::default() }

    /// Stop iterating once the expression is within `epsilon` of zero.
    pub fn with_epsilon(self, epsilon: f64) -> Self {
        Solver { epsilon, ..self }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Solver {
            max_iterations,
            ..self
        }
    }

    /// The integer points each variable is sampled at when looking for a
    /// starting point.
    pub fn with_search_range(self, search_range: RangeInclusive<i32>) -> Self {
        Solver {
            search_range,
            ..self
        }
    }

    pub fn solve(
        &self,
        expr: &Expression,
    ) -> Result<Vec<SolveResult>, SolveError> {
        let simplified = expr.simplify();
        let variables = simplified.variables();

        if let (Expression::Terms(terms), Some(variable)) =
            (&simplified, single(&variables))
        {
            let degrees = distinct_degrees(terms);

            if degrees.iter().all(|&d| d == 0.0 || d == 1.0) {
                tracing::debug!(%expr, "Solving with the linear formula");
                return Ok(solve_linear(terms, variable));
            }
            if degrees.iter().all(|&d| d == 0.0 || d == 1.0 || d == 2.0) {
                tracing::debug!(%expr, "Solving with the quadratic formula");
                return Ok(solve_quadratic(terms, variable));
            }
        }

        tracing::debug!(%expr, "Falling back to fixed-point iteration");
        self.solve_iteratively(&simplified, &variables)
            .map(|result| vec![result])
    }

    fn solve_iteratively(
        &self,
        expr: &Expression,
        variables: &BTreeSet<SmolStr>,
    ) -> Result<SolveResult, SolveError> {
        let (mut point, mut value) = self.starting_point(expr, variables)?;

        for iteration in 0..self.max_iterations {
            if value.abs() < self.epsilon {
                break;
            }

            let next: BTreeMap<SmolStr, f64> = point
                .iter()
                .map(|(name, x)| (name.clone(), x - value))
                .collect();

            match evaluate_at(expr, &next) {
                Ok(next_value) if next_value.is_finite() => {
                    tracing::trace!(
                        iteration,
                        value = next_value,
                        "Fixed-point step"
                    );
                    point = next;
                    value = next_value;
                },
                _ => {
                    tracing::debug!(iteration, "Fixed-point iteration diverged");
                    break;
                },
            }
        }

        Ok(SolveResult {
            root: Vector::from_scalars(point),
            error: value.abs(),
        })
    }

    /// Sweep each variable across the search range in turn, keeping the
    /// point where the expression is closest to zero.
    fn starting_point(
        &self,
        expr: &Expression,
        variables: &BTreeSet<SmolStr>,
    ) -> Result<(BTreeMap<SmolStr, f64>, f64), SolveError> {
        let start = f64::from(*self.search_range.start());
        let mut point: BTreeMap<SmolStr, f64> =
            variables.iter().map(|name| (name.clone(), start)).collect();
        let mut best: Option<f64> = None;
        let mut last_error = None;

        let mut consider = |candidate: &BTreeMap<SmolStr, f64>,
                            best: &mut Option<f64>|
         -> bool {
            match evaluate_at(expr, candidate) {
                Ok(value) if value.is_finite() => {
                    let better =
                        best.map_or(true, |current| value.abs() < current.abs());
                    if better {
                        *best = Some(value);
                    }
                    better
                },
                Ok(_) => false,
                Err(e) => {
                    last_error = Some(e);
                    false
                },
            }
        };

        consider(&point, &mut best);

        for variable in variables {
            let mut candidate = point.clone();

            for n in self.search_range.clone() {
                candidate.insert(variable.clone(), f64::from(n));

                if consider(&candidate, &mut best) {
                    point = candidate.clone();
                }
            }
        }

        match (best, last_error) {
            (Some(value), _) => {
                tracing::debug!(?point, value, "Found a starting point");
                Ok((point, value))
            },
            (None, Some(e)) => Err(SolveError::Eval(e)),
            (None, None) => Err(SolveError::NoStartingPoint),
        }
    }
}

fn single(variables: &BTreeSet<SmolStr>) -> Option<&SmolStr> {
    if variables.len() == 1 {
        variables.iter().next()
    } else {
        None
    }
}

fn distinct_degrees(terms: &[Term]) -> Vec<f64> {
    let mut degrees: Vec<f64> = Vec::new();

    for term in terms {
        let degree = term.degree();
        if !degrees.contains(&degree) {
            degrees.push(degree);
        }
    }

    degrees
}

fn evaluate_at(
    expr: &Expression,
    point: &BTreeMap<SmolStr, f64>,
) -> Result<f64, EvaluationError> {
    expr.value_at(|name| point.get(name).copied())
}

/// The coefficients of `x^0`, `x^1` and `x^2`.
fn coefficients(terms: &[Term], variable: &str) -> [f64; 3] {
    let mut coefficients = [0.0; 3];

    for term in terms {
        let exponent = term.exponent(variable);

        if exponent == 0.0 {
            coefficients[0] += term.coefficient();
        } else if exponent == 1.0 {
            coefficients[1] += term.coefficient();
        } else if exponent == 2.0 {
            coefficients[2] += term.coefficient();
        }
    }

    coefficients
}

fn root_at(variable: &SmolStr, x: f64, residual: f64) -> SolveResult {
    SolveResult {
        root: Vector::from_scalars(std::iter::once((variable.clone(), x))),
        error: residual.abs(),
    }
}

/// Solve `m*x + b = 0`.
fn solve_linear(terms: &[Term], variable: &SmolStr) -> Vec<SolveResult> {
    let [b, m, _] = coefficients(terms, variable);

    if m == 0.0 {
        return Vec::new();
    }

    let x = -b / m;
    vec![root_at(variable, x, m * x + b)]
}

/// Solve `a*x^2 + b*x + c = 0` using the quadratic formula. The roots are
/// returned in ascending order.
fn solve_quadratic(terms: &[Term], variable: &SmolStr) -> Vec<SolveResult> {
    let [c, b, a] = coefficients(terms, variable);
    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return Vec::new();
    }

    let sqrt = discriminant.sqrt();
    let mut roots: ArrayVec<[f64; 2]> = ArrayVec::new();
    roots.push((-b - sqrt) / (2.0 * a));

    let other = (-b + sqrt) / (2.0 * a);
    if !approx::relative_eq!(roots[0], other) {
        roots.push(other);
    }

    roots.sort_by(|left, right| {
        left.partial_cmp(right).unwrap_or(std::cmp::Ordering::Equal)
    });

    roots
        .into_iter()
        .map(|x| root_at(variable, x, a * x * x + b * x + c))
        .collect()
}
