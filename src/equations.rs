use crate::{
    solve::{SolveError, SolveResult, Solver},
    Expression, ParseError,
};
use std::str::FromStr;

/// An equation, `left = right`, stored as the expression `left - right`
/// so its roots are the equation's solutions.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub(crate) body: Expression,
}

impl Equation {
    pub fn new(left: Expression, right: Expression) -> Self {
        Equation {
            body: left.subtract(right),
        }
    }

    pub fn body(&self) -> &Expression { &self.body }

    pub fn solve(&self) -> Result<Vec<SolveResult>, SolveError> {
        self.solve_with(&Solver::default())
    }

    pub fn solve_with(
        &self,
        solver: &Solver,
    ) -> Result<Vec<SolveResult>, SolveError> {
        solver.solve(&self.body)
    }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.find('=') {
            Some(index) => {
                let (left, right) = s.split_at(index);
                let right = &right[1..];
                Ok(Equation::new(left.parse()?, right.parse()?))
            },
            None => Ok(Equation { body: s.parse()? }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_values(results: &[SolveResult]) -> Vec<f64> {
        results
            .iter()
            .map(|r| r.root.get("x").unwrap().value_at(|_| None).unwrap())
            .collect()
    }

    #[test]
    fn parse_an_equation() {
        let got: Equation = "2x + 1 = x - 3".parse().unwrap();

        let should_be: Expression = "(2x + 1) - (x - 3)".parse().unwrap();
        assert_eq!(got.body(), &should_be);
    }

    #[test]
    fn no_equals_sign_means_equal_to_zero() {
        let got: Equation = "x^2 - 4".parse().unwrap();

        assert_eq!(x_values(&got.solve().unwrap()), vec![-2.0, 2.0]);
    }

    #[test]
    fn solve_an_equation() {
        let equation: Equation = "x + 1 = 3".parse().unwrap();

        let got = equation.solve().unwrap();

        assert_eq!(x_values(&got), vec![2.0]);
    }

    #[test]
    fn either_side_can_be_invalid() {
        assert!("x + = 1".parse::<Equation>().is_err());
        assert!("x = ".parse::<Equation>().is_err());
    }
}
