//! Monomials, the building blocks of every polynomial.

use crate::ops::EvaluationError;
use euclid::approxeq::ApproxEq;
use smol_str::SmolStr;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

/// A single monomial, `coefficient * a^i * b^j * ...`.
///
/// A [`Term`] is always kept in its normalized form:
///
/// - a zero coefficient means the term has no powers at all, and
/// - no variable is ever stored with an exponent of `0`.
///
/// Equality is approximate. Two terms are equal when their coefficients and
/// the exponents of every variable either of them mentions are within
/// `1e-6` of each other.
#[derive(Debug, Clone)]
pub struct Term {
    coefficient: f64,
    powers: BTreeMap<SmolStr, f64>,
}

impl Term {
    pub fn new<I, S>(coefficient: f64, powers: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<SmolStr>,
    {
        if coefficient == 0.0 {
            return Term::zero();
        }

        let powers = powers
            .into_iter()
            .filter(|(_, exponent)| *exponent != 0.0)
            .map(|(name, exponent)| (name.into(), exponent))
            .collect();

        Term {
            coefficient,
            powers,
        }
    }

    /// The canonical zero term.
    pub fn zero() -> Self {
        Term {
            coefficient: 0.0,
            powers: BTreeMap::new(),
        }
    }

    /// A term with no variables.
    pub fn constant(value: f64) -> Self {
        Term::new(value, std::iter::empty::<(SmolStr, f64)>())
    }

    /// The term `1 * name`.
    pub fn variable(name: &str) -> Self {
        Term::new(1.0, std::iter::once((name, 1.0)))
    }

    pub fn coefficient(&self) -> f64 { self.coefficient }

    pub fn powers(&self) -> &BTreeMap<SmolStr, f64> { &self.powers }

    /// The exponent `name` is raised to, or `0` if the term doesn't mention
    /// it.
    pub fn exponent(&self, name: &str) -> f64 {
        self.powers.get(name).copied().unwrap_or(0.0)
    }

    pub fn variables(&self) -> impl Iterator<Item = &SmolStr> + '_ {
        self.powers.keys()
    }

    /// The largest exponent in this term, or `0` for constants.
    pub fn degree(&self) -> f64 {
        if self.powers.is_empty() {
            return 0.0;
        }

        self.powers
            .values()
            .copied()
            .fold(std::f64::NEG_INFINITY, f64::max)
    }

    /// The number of distinct variables.
    pub fn dimension(&self) -> usize { self.powers.len() }

    pub fn is_zero(&self) -> bool { self.coefficient == 0.0 }

    pub fn is_constant(&self) -> bool { self.powers.is_empty() }

    /// Do both terms raise exactly the same variables to exactly the same
    /// powers?
    pub fn has_same_powers(&self, other: &Term) -> bool {
        self.powers == other.powers
    }

    /// Add two like terms, returning `None` if their powers don't match.
    pub fn add(&self, other: &Term) -> Option<Term> {
        if self.has_same_powers(other) {
            Some(self.with_coefficient(self.coefficient + other.coefficient))
        } else {
            None
        }
    }

    /// Subtract two like terms, returning `None` if their powers don't
    /// match.
    pub fn subtract(&self, other: &Term) -> Option<Term> {
        if self.has_same_powers(other) {
            Some(self.with_coefficient(self.coefficient - other.coefficient))
        } else {
            None
        }
    }

    pub fn multiply(&self, other: &Term) -> Term {
        let mut powers = self.powers.clone();

        for (name, exponent) in &other.powers {
            *powers.entry(name.clone()).or_insert(0.0) += exponent;
        }

        Term::new(self.coefficient * other.coefficient, powers)
    }

    /// Divide one term by another.
    ///
    /// # Panics
    ///
    /// Dividing by a term with a zero coefficient is a programming error.
    pub fn divide(&self, divisor: &Term) -> Term {
        assert!(
            !divisor.is_zero(),
            "Attempted to divide \"{}\" by a zero term",
            self
        );

        let mut powers = self.powers.clone();

        for (name, exponent) in &divisor.powers {
            *powers.entry(name.clone()).or_insert(0.0) -= exponent;
        }

        Term::new(self.coefficient / divisor.coefficient, powers)
    }

    /// Multiply the coefficient by a constant.
    pub fn scale(&self, factor: f64) -> Term {
        self.with_coefficient(self.coefficient * factor)
    }

    pub fn negate(&self) -> Term { self.scale(-1.0) }

    /// Get the reciprocal, `1 / self`.
    pub fn invert(&self) -> Term {
        let powers = self
            .powers
            .iter()
            .map(|(name, exponent)| (name.clone(), -exponent));

        Term::new(1.0 / self.coefficient, powers)
    }

    /// Raise the whole term to a constant power.
    pub fn exponentiate(&self, power: f64) -> Term {
        let powers = self
            .powers
            .iter()
            .map(|(name, exponent)| (name.clone(), exponent * power));

        Term::new(self.coefficient.powf(power), powers)
    }

    /// The partial derivative with respect to `variable`, using the power
    /// rule.
    pub fn differentiate(&self, variable: &str) -> Term {
        match self.powers.get(variable) {
            Some(&exponent) if self.degree() != 0.0 => {
                let mut powers = self.powers.clone();
                powers.insert(variable.into(), exponent - 1.0);

                Term::new(self.coefficient * exponent, powers)
            },
            _ => Term::zero(),
        }
    }

    /// The indefinite integral with respect to `variable`, using the reverse
    /// power rule. No constant of integration is added.
    ///
    /// # Panics
    ///
    /// Integrating `x^-1` with respect to `x` would need a logarithm, which
    /// can't be represented as a [`Term`].
    pub fn integrate(&self, variable: &str) -> Term {
        let exponent = self.exponent(variable);
        assert!(
            exponent != -1.0,
            "Integrating \"{}\" with respect to {} requires a logarithm",
            self,
            variable
        );

        let raised = exponent + 1.0;
        let mut powers = self.powers.clone();
        powers.insert(variable.into(), raised);

        Term::new(self.coefficient / raised, powers)
    }

    /// Evaluate the term, looking up each variable's value with `lookup`.
    pub fn value_at<F>(&self, lookup: F) -> Result<f64, EvaluationError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut value = self.coefficient;

        for (name, exponent) in &self.powers {
            let x = lookup(name.as_str()).ok_or_else(|| {
                EvaluationError::UnboundVariable { name: name.clone() }
            })?;
            value *= x.powf(*exponent);
        }

        Ok(value)
    }

    /// Replace every variable `lookup` knows about with its value, leaving
    /// the rest symbolic.
    pub fn partially_evaluate<F>(&self, lookup: F) -> Term
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut coefficient = self.coefficient;
        let mut powers = BTreeMap::new();

        for (name, exponent) in &self.powers {
            match lookup(name.as_str()) {
                Some(x) => coefficient *= x.powf(*exponent),
                None => {
                    powers.insert(name.clone(), *exponent);
                },
            }
        }

        Term::new(coefficient, powers)
    }

    /// The order terms are displayed in: highest degree first, then fewest
    /// variables, then largest coefficient.
    ///
    /// This is only a sorting convenience. Terms which compare as
    /// [`Ordering::Equal`] aren't necessarily equal.
    pub fn display_order(&self, other: &Term) -> Ordering {
        other
            .degree()
            .partial_cmp(&self.degree())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.dimension().cmp(&other.dimension()))
            .then_with(|| {
                other
                    .coefficient
                    .partial_cmp(&self.coefficient)
                    .unwrap_or(Ordering::Equal)
            })
    }

    pub(crate) fn canonical_order(&self, other: &Term) -> Ordering {
        self.display_order(other)
            .then_with(|| self.powers.keys().cmp(other.powers.keys()))
    }

    fn with_coefficient(&self, coefficient: f64) -> Term {
        Term::new(
            coefficient,
            self.powers.iter().map(|(name, e)| (name.clone(), *e)),
        )
    }
}

impl Default for Term {
    fn default() -> Term { Term::zero() }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        if !self.coefficient.approx_eq(&other.coefficient) {
            return false;
        }

        let ours_match = self.powers.iter().all(|(name, exponent)| {
            other
                .powers
                .get(name)
                .map_or(false, |theirs| theirs.approx_eq(exponent))
        });
        let theirs_present =
            other.powers.keys().all(|name| self.powers.contains_key(name));

        ours_match && theirs_present
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.powers.is_empty() {
            return write!(f, "{}", self.coefficient);
        }

        if self.coefficient == -1.0 {
            write!(f, "-")?;
        } else if self.coefficient != 1.0 {
            write!(f, "{}", self.coefficient)?;
        }

        // a lone variable can be written inline, but "xy" would be read back
        // as a single variable so products get parenthesized
        let parenthesize = self.powers.len() > 1;

        for (name, exponent) in &self.powers {
            if parenthesize {
                write!(f, "(")?;
            }

            write!(f, "{}", name)?;

            if *exponent != 1.0 {
                write!(f, "^{}", exponent)?;
            }

            if parenthesize {
                write!(f, ")")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(coefficient: f64, powers: &[(&str, f64)]) -> Term {
        Term::new(coefficient, powers.iter().copied())
    }

    #[test]
    fn zero_coefficient_drops_all_powers() {
        let inputs = vec![
            term(0.0, &[]),
            term(0.0, &[("x", 2.0)]),
            term(0.0, &[("x", 1.0), ("y", -3.0), ("z", 0.5)]),
        ];

        for got in inputs {
            assert_eq!(got, Term::zero());
            assert!(got.powers().is_empty());
        }
    }

    #[test]
    fn zero_exponents_are_dropped() {
        let got = term(2.0, &[("x", 0.0), ("y", 1.0)]);

        assert_eq!(got.dimension(), 1);
        assert_eq!(got.exponent("x"), 0.0);
        assert_eq!(got, term(2.0, &[("y", 1.0)]));
    }

    #[test]
    fn degree_and_dimension() {
        let inputs = vec![
            (term(5.0, &[]), 0.0, 0),
            (term(1.0, &[("x", 1.0)]), 1.0, 1),
            (term(4.0, &[("x", 2.0), ("y", 1.0)]), 2.0, 2),
            (term(1.0, &[("x", -1.0)]), -1.0, 1),
        ];

        for (t, degree, dimension) in inputs {
            assert_eq!(t.degree(), degree, "{}", t);
            assert_eq!(t.dimension(), dimension, "{}", t);
        }
    }

    #[test]
    fn equality_is_approximate() {
        assert_eq!(term(1.0000001, &[("x", 2.0)]), term(1.0, &[("x", 2.0)]));
        assert_eq!(
            term(3.0, &[("x", 1.9999999)]),
            term(3.0, &[("x", 2.0)])
        );
        assert_ne!(term(1.001, &[("x", 2.0)]), term(1.0, &[("x", 2.0)]));
    }

    #[test]
    fn mismatched_variables_are_never_equal() {
        assert_ne!(term(1.0, &[("x", 1.0)]), term(1.0, &[("y", 1.0)]));
        assert_ne!(
            term(1.0, &[("x", 1.0)]),
            term(1.0, &[("x", 1.0), ("y", 1.0)])
        );
        assert_ne!(
            term(1.0, &[("x", 1.0), ("y", 1.0)]),
            term(1.0, &[("x", 1.0)])
        );
    }

    #[test]
    fn add_and_subtract_like_terms() {
        let x = term(1.0, &[("x", 1.0)]);
        let two_x = term(2.0, &[("x", 1.0)]);

        assert_eq!(x.add(&two_x), Some(term(3.0, &[("x", 1.0)])));
        assert_eq!(two_x.subtract(&x), Some(x.clone()));
        assert_eq!(x.subtract(&x), Some(Term::zero()));
    }

    #[test]
    fn adding_unlike_terms_fails() {
        let x = term(1.0, &[("x", 1.0)]);
        let x_squared = term(1.0, &[("x", 2.0)]);
        let y = term(1.0, &[("y", 1.0)]);

        assert_eq!(x.add(&x_squared), None);
        assert_eq!(x.subtract(&y), None);
        assert_eq!(x.add(&Term::constant(1.0)), None);
    }

    #[test]
    fn multiplication_adds_exponents() {
        let inputs = vec![
            (
                term(1.0, &[("x", 1.0)]),
                term(2.0, &[("x", 1.0)]),
                term(2.0, &[("x", 2.0)]),
            ),
            (
                term(2.0, &[("x", 1.0)]),
                term(3.0, &[("x", 2.0)]),
                term(6.0, &[("x", 3.0)]),
            ),
            (
                term(3.0, &[("x", 2.0)]),
                term(4.0, &[("x", 2.0), ("y", 1.0)]),
                term(12.0, &[("x", 4.0), ("y", 1.0)]),
            ),
            (
                term(2.0, &[("x", 1.0)]),
                term(0.5, &[("x", -1.0)]),
                Term::constant(1.0),
            ),
        ];

        for (left, right, should_be) in inputs {
            assert_eq!(left.multiply(&right), should_be);
            assert_eq!(right.multiply(&left), should_be);
        }
    }

    #[test]
    fn division_subtracts_exponents() {
        let x = term(1.0, &[("x", 1.0)]);
        let two_x = term(2.0, &[("x", 1.0)]);
        let three_x_squared = term(3.0, &[("x", 2.0)]);
        let four_x_squared_y = term(4.0, &[("x", 2.0), ("y", 1.0)]);

        assert_eq!(two_x.divide(&x), Term::constant(2.0));
        assert_eq!(x.divide(&two_x), Term::constant(0.5));
        assert_eq!(three_x_squared.divide(&x), term(3.0, &[("x", 1.0)]));
        assert_eq!(
            four_x_squared_y.divide(&x),
            term(4.0, &[("x", 1.0), ("y", 1.0)])
        );
        assert_eq!(
            x.divide(&four_x_squared_y),
            term(0.25, &[("x", -1.0), ("y", -1.0)])
        );
    }

    #[test]
    #[should_panic(expected = "zero term")]
    fn dividing_by_zero_term_is_a_bug() {
        let _ = Term::variable("x").divide(&Term::zero());
    }

    #[test]
    fn invert() {
        let inputs = vec![
            (term(1.0, &[("x", 1.0)]), term(1.0, &[("x", -1.0)])),
            (term(2.0, &[("x", 1.0)]), term(0.5, &[("x", -1.0)])),
            (term(3.0, &[("x", 2.0)]), term(1.0 / 3.0, &[("x", -2.0)])),
            (
                term(4.0, &[("x", 2.0), ("y", 1.0)]),
                term(0.25, &[("x", -2.0), ("y", -1.0)]),
            ),
        ];

        for (original, should_be) in inputs {
            assert_eq!(original.invert(), should_be);
        }
    }

    #[test]
    fn exponentiate_raises_coefficient_and_powers() {
        let got = term(2.0, &[("x", 1.0), ("y", 3.0)]).exponentiate(2.0);

        assert_eq!(got, term(4.0, &[("x", 2.0), ("y", 6.0)]));
    }

    #[test]
    fn differentiate_with_the_power_rule() {
        let four_x_squared_y = term(4.0, &[("x", 2.0), ("y", 1.0)]);
        let inputs = vec![
            (term(1.0, &[("x", 1.0)]), "x", Term::constant(1.0)),
            (term(2.0, &[("x", 1.0)]), "x", Term::constant(2.0)),
            (term(3.0, &[("x", 2.0)]), "x", term(6.0, &[("x", 1.0)])),
            (
                four_x_squared_y.clone(),
                "x",
                term(8.0, &[("x", 1.0), ("y", 1.0)]),
            ),
            (four_x_squared_y.clone(), "y", term(4.0, &[("x", 2.0)])),
            (four_x_squared_y, "a", Term::zero()),
            (Term::constant(7.0), "x", Term::zero()),
            (term(1.0, &[("x", -1.0)]), "x", term(-1.0, &[("x", -2.0)])),
        ];

        for (original, variable, should_be) in inputs {
            let got = original.differentiate(variable);
            assert_eq!(got, should_be, "d({})/d{}", original, variable);
        }
    }

    #[test]
    fn integrate_with_the_reverse_power_rule() {
        let inputs = vec![
            (term(1.0, &[("x", 1.0)]), "x", term(0.5, &[("x", 2.0)])),
            (term(2.0, &[("x", 1.0)]), "x", term(1.0, &[("x", 2.0)])),
            (term(3.0, &[("x", 2.0)]), "x", term(1.0, &[("x", 3.0)])),
            (
                term(4.0, &[("x", 2.0), ("y", 1.0)]),
                "x",
                term(4.0 / 3.0, &[("x", 3.0), ("y", 1.0)]),
            ),
            (
                term(2.0, &[("x", 1.0)]),
                "a",
                term(2.0, &[("x", 1.0), ("a", 1.0)]),
            ),
            (Term::constant(3.0), "t", term(3.0, &[("t", 1.0)])),
            (Term::zero(), "x", Term::zero()),
        ];

        for (original, variable, should_be) in inputs {
            let got = original.integrate(variable);
            assert_eq!(got, should_be, "integral of {} d{}", original, variable);
        }
    }

    #[test]
    #[should_panic(expected = "logarithm")]
    fn integrating_a_reciprocal_is_a_bug() {
        let _ = term(1.0, &[("x", -1.0)]).integrate("x");
    }

    #[test]
    fn evaluate() {
        let t = term(3.0, &[("x", 2.0), ("y", 1.0)]);

        let got = t
            .value_at(|name| match name {
                "x" => Some(2.0),
                "y" => Some(0.5),
                _ => None,
            })
            .unwrap();

        assert_eq!(got, 6.0);
    }

    #[test]
    fn evaluating_an_unknown_variable_fails() {
        let t = term(3.0, &[("x", 2.0), ("y", 1.0)]);

        let got = t.value_at(|name| if name == "x" { Some(1.0) } else { None });

        assert_eq!(
            got,
            Err(EvaluationError::UnboundVariable { name: "y".into() })
        );
    }

    #[test]
    fn partial_evaluation_keeps_unknowns() {
        let t = term(3.0, &[("x", 2.0), ("y", 1.0)]);

        let got =
            t.partially_evaluate(|name| if name == "x" { Some(2.0) } else { None });

        assert_eq!(got, term(12.0, &[("y", 1.0)]));
    }

    #[test]
    fn display_order() {
        let mut terms = vec![
            Term::constant(1.0),
            term(1.0, &[("x", 1.0), ("y", 1.0)]),
            term(2.0, &[("x", 1.0)]),
            term(3.0, &[("x", 2.0)]),
            term(5.0, &[("x", 1.0)]),
        ];

        terms.sort_by(Term::display_order);

        let got: Vec<_> = terms.iter().map(ToString::to_string).collect();
        assert_eq!(got, vec!["3x^2", "5x", "2x", "(x)(y)", "1"]);
    }

    #[test]
    fn display() {
        let inputs = vec![
            (Term::constant(1.0), "1"),
            (Term::zero(), "0"),
            (Term::constant(-2.5), "-2.5"),
            (term(1.0, &[("x", 1.0)]), "x"),
            (term(-1.0, &[("x", 1.0)]), "-x"),
            (term(2.0, &[("x", 1.0)]), "2x"),
            (term(3.0, &[("x", 2.0)]), "3x^2"),
            (term(0.5, &[("x", -1.0)]), "0.5x^-1"),
            (term(4.0, &[("x", 2.0), ("y", 1.0)]), "4(x^2)(y)"),
            (term(1.0, &[("str", 2.0)]), "str^2"),
        ];

        for (t, should_be) in inputs {
            assert_eq!(t.to_string(), should_be);
        }
    }
}
