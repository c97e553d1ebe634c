use crate::{
    calculus,
    ops::{self, EvaluationError},
    solve::{SolveError, SolveResult, Solver},
    Term, Vector,
};
use smol_str::SmolStr;
use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

/// An expression.
///
/// Combining expressions ([`Expression::add()`], [`Expression::power()`],
/// etc.) never does any algebra, it just builds a new
/// [`Expression::Binary`] node. Use [`Expression::simplify()`] to collapse
/// things back down to a sum of [`Term`]s.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A sum of terms. Use [`Expression::from_terms()`] to make sure like
    /// terms are merged and the sum is kept in canonical order.
    Terms(Vec<Term>),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Invoke a builtin function.
    FunctionCall {
        function: Builtin,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// The canonical zero, a sum containing just the zero term.
    pub fn zero() -> Self { Expression::Terms(vec![Term::zero()]) }

    pub fn one() -> Self { Expression::scalar(1.0) }

    pub fn scalar(value: f64) -> Self {
        Expression::from_terms(std::iter::once(Term::constant(value)))
    }

    pub fn variable(name: &str) -> Self {
        Expression::from_terms(std::iter::once(Term::variable(name)))
    }

    /// Create a sum of terms, merging like terms and dropping zeroes.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        Expression::Terms(reduce_terms(terms))
    }

    pub fn binary(
        op: BinaryOperation,
        left: Expression,
        right: Expression,
    ) -> Self {
        Expression::Binary {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// Apply a [`BinaryOperation`] to a list of operands.
    ///
    /// # Panics
    ///
    /// Every operator takes exactly two operands.
    pub fn from_operands(op: BinaryOperation, operands: Vec<Expression>) -> Self {
        assert_eq!(
            operands.len(),
            2,
            "The {} operator expects exactly 2 operands",
            op
        );

        let mut operands = operands.into_iter();
        match (operands.next(), operands.next()) {
            (Some(left), Some(right)) => Expression::binary(op, left, right),
            _ => unreachable!(),
        }
    }

    /// Invoke a builtin function.
    ///
    /// # Panics
    ///
    /// The number of arguments must match the function's arity.
    pub fn call(function: Builtin, arguments: Vec<Expression>) -> Self {
        assert_eq!(
            arguments.len(),
            function.arity(),
            "{} expects {} argument(s)",
            function,
            function.arity()
        );

        Expression::FunctionCall {
            function,
            arguments,
        }
    }

    /// The terms in this expression, if it is a sum of terms.
    pub fn terms(&self) -> Option<&[Term]> {
        match self {
            Expression::Terms(terms) => Some(terms),
            _ => None,
        }
    }

    /// The first term in canonical order, if this is a sum of terms.
    pub fn leading_term(&self) -> Option<&Term> {
        self.terms()?
            .iter()
            .min_by(|left, right| left.canonical_order(right))
    }

    /// Is this exactly the zero polynomial?
    pub fn is_zero(&self) -> bool {
        match self {
            Expression::Terms(terms) => terms_are_zero(terms),
            _ => false,
        }
    }

    /// The expression's degree.
    ///
    /// An operation which can be simplified has the degree of its simplified
    /// form, otherwise it's the larger degree of its operands.
    pub fn degree(&self) -> f64 {
        match self {
            Expression::Terms(terms) => degree_of(terms),
            Expression::Binary { left, right, .. } => {
                match self.try_simplify() {
                    Some(simplified) => simplified.degree(),
                    None => left.degree().max(right.degree()),
                }
            },
            Expression::FunctionCall { arguments, .. } => arguments
                .iter()
                .map(Expression::degree)
                .fold(0.0, f64::max),
        }
    }

    /// Every variable this expression mentions.
    pub fn variables(&self) -> BTreeSet<SmolStr> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, variables: &mut BTreeSet<SmolStr>) {
        match self {
            Expression::Terms(terms) => {
                for term in terms {
                    variables.extend(term.variables().cloned());
                }
            },
            Expression::Binary { left, right, .. } => {
                left.collect_variables(variables);
                right.collect_variables(variables);
            },
            Expression::FunctionCall { arguments, .. } => {
                for argument in arguments {
                    argument.collect_variables(variables);
                }
            },
        }
    }

    /// The number of distinct variables.
    pub fn dimension(&self) -> usize { self.variables().len() }

    /// Compare two expressions by degree.
    pub fn compare_degree(&self, other: &Expression) -> Option<Ordering> {
        self.degree().partial_cmp(&other.degree())
    }

    /// Try to collapse this expression into a sum of terms, returning `None`
    /// when there is no rule for doing so.
    pub fn try_simplify(&self) -> Option<Expression> { ops::try_simplify(self) }

    /// Simplify as much as possible. Operations which can't be collapsed are
    /// kept, but their operands are simplified.
    pub fn simplify(&self) -> Expression { ops::simplify(self) }

    /// Evaluate the expression, using `lookup` to find each variable's value.
    pub fn value_at<F>(&self, lookup: F) -> Result<f64, EvaluationError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        ops::evaluate(self, &lookup)
    }

    /// Replace the variables `lookup` knows about with their values.
    pub fn substitute<F>(&self, lookup: F) -> Expression
    where
        F: Fn(&str) -> Option<f64>,
    {
        ops::substitute(self, &lookup)
    }

    /// Replace `variable` with another expression, giving `f(g)`.
    pub fn compose(
        &self,
        variable: &str,
        replacement: &Expression,
    ) -> Expression {
        ops::compose(self, variable, replacement)
    }

    /// The partial derivative with respect to `variable`.
    pub fn differentiate(
        &self,
        variable: &str,
    ) -> Result<Expression, EvaluationError> {
        calculus::differentiate(self, variable)
    }

    /// The indefinite integral with respect to `variable`.
    pub fn integrate(
        &self,
        variable: &str,
    ) -> Result<Expression, EvaluationError> {
        calculus::integrate(self, variable)
    }

    /// Integrate with respect to `variable` between `start` and `end`. Any
    /// other variables are left symbolic.
    pub fn integrate_over(
        &self,
        variable: &str,
        start: f64,
        end: f64,
    ) -> Result<Expression, EvaluationError> {
        calculus::integrate_over(self, variable, start, end)
    }

    /// The partial derivative with respect to each variable.
    pub fn gradient(&self) -> Result<Vector, EvaluationError> {
        calculus::gradient(self)
    }

    /// Find the roots of this expression using the default [`Solver`].
    pub fn solve(&self) -> Result<Vec<SolveResult>, SolveError> {
        Solver::default().solve(self)
    }

    /// Render the expression as LaTeX.
    pub fn latex(&self) -> String {
        match self {
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Divide,
            } => format!("\\frac{{({})}}{{({})}}", left.latex(), right.latex()),
            Expression::Binary { left, right, op } => {
                format!("({}) {} ({})", left.latex(), op, right.latex())
            },
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                let arguments: Vec<_> =
                    arguments.iter().map(Expression::latex).collect();
                format!("{}({})", function, arguments.join(", "))
            },
            Expression::Terms(_) => self.to_string(),
        }
    }

    /// Render the expression as a function definition, `f(x, y) = ...`.
    pub fn describe(&self) -> String {
        let variables: Vec<_> =
            self.variables().iter().map(SmolStr::to_string).collect();

        format!("f({}) = {}", variables.join(", "), self)
    }
}

/// Merge like terms, drop zeroes and sort what's left into canonical order.
/// An empty sum becomes the zero term.
pub(crate) fn reduce_terms<I>(terms: I) -> Vec<Term>
where
    I: IntoIterator<Item = Term>,
{
    let mut reduced: Vec<Term> = Vec::new();

    for term in terms {
        if term.is_zero() {
            continue;
        }

        let merged = reduced
            .iter()
            .position(|existing| existing.has_same_powers(&term))
            .and_then(|ix| reduced[ix].add(&term).map(|sum| (ix, sum)));

        match merged {
            Some((ix, sum)) if sum.is_zero() => {
                reduced.remove(ix);
            },
            Some((ix, sum)) => reduced[ix] = sum,
            None => reduced.push(term),
        }
    }

    if reduced.is_empty() {
        reduced.push(Term::zero());
    }

    reduced.sort_by(Term::canonical_order);
    reduced
}

pub(crate) fn degree_of(terms: &[Term]) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }

    terms
        .iter()
        .map(Term::degree)
        .fold(std::f64::NEG_INFINITY, f64::max)
}

pub(crate) fn terms_are_zero(terms: &[Term]) -> bool {
    terms.iter().all(|term| *term == Term::zero())
}

impl Default for Expression {
    fn default() -> Expression { Expression::zero() }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Expression {
        Expression::from_terms(std::iter::once(term))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Expression { Expression::scalar(value) }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        match (self, other) {
            (Expression::Terms(left), Expression::Terms(right)) => {
                same_terms(left, right)
            },
            (
                Expression::Binary {
                    left: left_a,
                    right: right_a,
                    op: op_a,
                },
                Expression::Binary {
                    left: left_b,
                    right: right_b,
                    op: op_b,
                },
            ) => {
                op_a == op_b
                    && ((left_a == left_b && right_a == right_b)
                        || (op_a.is_commutative()
                            && left_a == right_b
                            && right_a == left_b))
            },
            (
                Expression::FunctionCall {
                    function: function_a,
                    arguments: arguments_a,
                },
                Expression::FunctionCall {
                    function: function_b,
                    arguments: arguments_b,
                },
            ) => function_a == function_b && arguments_a == arguments_b,
            _ => false,
        }
    }
}

/// Compare two sums of terms as multisets, ignoring order.
fn same_terms(left: &[Term], right: &[Term]) -> bool {
    let left: Vec<&Term> = left.iter().filter(|t| !t.is_zero()).collect();
    let mut right: Vec<&Term> =
        right.iter().filter(|t| !t.is_zero()).collect();

    if left.len() != right.len() {
        return false;
    }

    for term in left {
        match right.iter().position(|candidate| *candidate == term) {
            Some(ix) => {
                right.swap_remove(ix);
            },
            None => return false,
        }
    }

    right.is_empty()
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperation {
    pub fn is_commutative(self) -> bool {
        match self {
            BinaryOperation::Add | BinaryOperation::Multiply => true,
            _ => false,
        }
    }

    /// Apply this operation to two numbers.
    pub fn apply(self, left: f64, right: f64) -> Result<f64, EvaluationError> {
        match self {
            BinaryOperation::Add => Ok(left + right),
            BinaryOperation::Subtract => Ok(left - right),
            BinaryOperation::Multiply => Ok(left * right),
            BinaryOperation::Divide if right == 0.0 => {
                Err(EvaluationError::DivideByZero)
            },
            BinaryOperation::Divide => Ok(left / right),
            BinaryOperation::Power => Ok(left.powf(right)),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Add => "+",
            BinaryOperation::Subtract => "-",
            BinaryOperation::Multiply => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }
}

impl Display for BinaryOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Various builtin functions. Angles are in radians.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    /// The two-argument arctangent, `atan2(y, x)`.
    ArcTangent2,
    HyperbolicSine,
    HyperbolicCosine,
    HyperbolicTangent,
    InverseHyperbolicSine,
    InverseHyperbolicCosine,
    InverseHyperbolicTangent,
    NaturalLog,
    /// A logarithm with an arbitrary base, `log(base, value)`.
    Log,
}

impl Builtin {
    pub fn arity(self) -> usize {
        match self {
            Builtin::ArcTangent2 | Builtin::Log => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sine => "sin",
            Builtin::Cosine => "cos",
            Builtin::Tangent => "tan",
            Builtin::ArcSine => "asin",
            Builtin::ArcCosine => "acos",
            Builtin::ArcTangent => "atan",
            Builtin::ArcTangent2 => "atan2",
            Builtin::HyperbolicSine => "sinh",
            Builtin::HyperbolicCosine => "cosh",
            Builtin::HyperbolicTangent => "tanh",
            Builtin::InverseHyperbolicSine => "asinh",
            Builtin::InverseHyperbolicCosine => "acosh",
            Builtin::InverseHyperbolicTangent => "atanh",
            Builtin::NaturalLog => "ln",
            Builtin::Log => "log",
        }
    }

    /// Evaluate the function.
    ///
    /// # Panics
    ///
    /// The number of arguments must match [`Builtin::arity()`].
    pub fn apply(self, arguments: &[f64]) -> f64 {
        assert_eq!(
            arguments.len(),
            self.arity(),
            "{} expects {} argument(s)",
            self,
            self.arity()
        );

        match (self, arguments) {
            (Builtin::ArcTangent2, &[y, x]) => y.atan2(x),
            (Builtin::Log, &[base, value]) => value.ln() / base.ln(),
            (_, &[x]) => match self {
                Builtin::Sine => x.sin(),
                Builtin::Cosine => x.cos(),
                Builtin::Tangent => x.tan(),
                Builtin::ArcSine => x.asin(),
                Builtin::ArcCosine => x.acos(),
                Builtin::ArcTangent => x.atan(),
                Builtin::HyperbolicSine => x.sinh(),
                Builtin::HyperbolicCosine => x.cosh(),
                Builtin::HyperbolicTangent => x.tanh(),
                Builtin::InverseHyperbolicSine => x.asinh(),
                Builtin::InverseHyperbolicCosine => x.acosh(),
                Builtin::InverseHyperbolicTangent => x.atanh(),
                Builtin::NaturalLog => x.ln(),
                Builtin::ArcTangent2 | Builtin::Log => unreachable!(),
            },
            _ => unreachable!(),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// Named combinators. These never simplify, they just build a new node.
#[allow(clippy::should_implement_trait)]
impl Expression {
    pub fn add(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Add, self, rhs)
    }

    pub fn subtract(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Subtract, self, rhs)
    }

    pub fn multiply(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Multiply, self, rhs)
    }

    pub fn divide(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Divide, self, rhs)
    }

    pub fn power(self, exponent: Expression) -> Expression {
        Expression::binary(BinaryOperation::Power, self, exponent)
    }

    /// Negate the expression. A sum of terms is negated directly, anything
    /// else gets multiplied by `-1`.
    pub fn negate(self) -> Expression {
        match self {
            Expression::Terms(terms) => {
                Expression::from_terms(terms.iter().map(Term::negate))
            },
            other => Expression::scalar(-1.0).multiply(other),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Terms(terms) => write_terms(terms, f),
            Expression::Binary { left, right, op } => {
                write!(f, "({}) {} ({})", left, op, right)
            },
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;

                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }

                write!(f, ")")
            },
        }
    }
}

fn write_terms(terms: &[Term], f: &mut Formatter<'_>) -> fmt::Result {
    let mut sorted: Vec<&Term> =
        terms.iter().filter(|t| !t.is_zero()).collect();
    sorted.sort_by(|left, right| left.canonical_order(right));

    if sorted.is_empty() {
        return write!(f, "0");
    }

    for (i, term) in sorted.iter().enumerate() {
        if i == 0 {
            write!(f, "{}", term)?;
        } else if term.coefficient() < 0.0 {
            write!(f, " - {}", term.negate())?;
        } else {
            write!(f, " + {}", term)?;
        }
    }

    Ok(())
}
