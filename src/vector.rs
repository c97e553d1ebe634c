use crate::{ops::EvaluationError, Expression};
use smol_str::SmolStr;
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

/// A mapping from variable names to [`Expression`]s, used for gradients and
/// the roots returned by a [`crate::Solver`].
///
/// Like [`Expression`], every operation builds new expression nodes without
/// simplifying anything.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Vector {
    components: BTreeMap<SmolStr, Expression>,
}

impl Vector {
    pub fn new() -> Self { Vector::default() }

    /// Create a vector where every component is a constant.
    pub fn from_scalars<I, S>(scalars: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<SmolStr>,
    {
        scalars
            .into_iter()
            .map(|(name, value)| (name.into(), Expression::scalar(value)))
            .collect()
    }

    /// Add a component, returning the previous value (if any).
    pub fn insert<S>(&mut self, name: S, value: Expression) -> Option<Expression>
    where
        S: Into<SmolStr>,
    {
        self.components.insert(name.into(), value)
    }

    /// Builder-style version of [`Vector::insert()`].
    pub fn with<S>(mut self, name: S, value: Expression) -> Self
    where
        S: Into<SmolStr>,
    {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &Expression)> + '_ {
        self.components
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// The number of components.
    pub fn dimension(&self) -> usize { self.components.len() }

    pub fn is_empty(&self) -> bool { self.components.is_empty() }

    pub fn scalar_add(&self, scalar: &Expression) -> Vector {
        self.map(|value| value.add(scalar.clone()))
    }

    pub fn scalar_subtract(&self, scalar: &Expression) -> Vector {
        self.map(|value| value.subtract(scalar.clone()))
    }

    pub fn scalar_multiply(&self, scalar: &Expression) -> Vector {
        self.map(|value| value.multiply(scalar.clone()))
    }

    pub fn scalar_divide(&self, scalar: &Expression) -> Vector {
        self.map(|value| value.divide(scalar.clone()))
    }

    /// Add to a single component, inserting it if it doesn't exist yet.
    pub fn add_to(&self, name: &str, value: &Expression) -> Vector {
        self.update(name, value, |existing, value| existing.add(value), |v| v)
    }

    /// Subtract from a single component. A missing component is treated as
    /// zero, so it becomes the negated value.
    pub fn subtract_from(&self, name: &str, value: &Expression) -> Vector {
        self.update(
            name,
            value,
            |existing, value| existing.subtract(value),
            Expression::negate,
        )
    }

    /// Multiply a single component, inserting the value if the component
    /// doesn't exist yet.
    pub fn multiply_on(&self, name: &str, value: &Expression) -> Vector {
        self.update(
            name,
            value,
            |existing, value| existing.multiply(value),
            |v| v,
        )
    }

    /// Divide a single component. A missing component is treated as zero.
    pub fn divide_on(&self, name: &str, value: &Expression) -> Vector {
        self.update(
            name,
            value,
            |existing, value| existing.divide(value),
            |v| Expression::zero().divide(v),
        )
    }

    pub fn add(&self, other: &Vector) -> Vector {
        self.zip_with(other, |left, right| left.add(right))
    }

    pub fn subtract(&self, other: &Vector) -> Vector {
        self.zip_with(other, |left, right| left.subtract(right))
    }

    /// Element-wise multiplication.
    pub fn multiply(&self, other: &Vector) -> Vector {
        self.zip_with(other, |left, right| left.multiply(right))
    }

    /// The sum of the products of all components both vectors have in
    /// common.
    pub fn dot_product(&self, other: &Vector) -> Expression {
        self.components
            .iter()
            .filter_map(|(name, left)| {
                let right = other.components.get(name)?;
                Some(left.clone().multiply(right.clone()))
            })
            .fold(None::<Expression>, |sum, product| match sum {
                Some(sum) => Some(sum.add(product)),
                None => Some(product),
            })
            .unwrap_or_else(Expression::zero)
    }

    /// Simplify every component.
    pub fn simplify(&self) -> Vector { self.map(|value| value.simplify()) }

    /// Evaluate every component.
    pub fn evaluate<F>(
        &self,
        lookup: F,
    ) -> Result<BTreeMap<SmolStr, f64>, EvaluationError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.components
            .iter()
            .map(|(name, value)| {
                value.value_at(&lookup).map(|v| (name.clone(), v))
            })
            .collect()
    }

    fn map<F>(&self, mut func: F) -> Vector
    where
        F: FnMut(Expression) -> Expression,
    {
        self.components
            .iter()
            .map(|(name, value)| (name.clone(), func(value.clone())))
            .collect()
    }

    fn update<F, G>(
        &self,
        name: &str,
        value: &Expression,
        combine: F,
        missing: G,
    ) -> Vector
    where
        F: FnOnce(Expression, Expression) -> Expression,
        G: FnOnce(Expression) -> Expression,
    {
        let mut updated = self.clone();
        let new_value = match self.components.get(name) {
            Some(existing) => combine(existing.clone(), value.clone()),
            None => missing(value.clone()),
        };
        updated.insert(name, new_value);

        updated
    }

    /// Combine the components both vectors share, passing through any which
    /// only one side has.
    fn zip_with<F>(&self, other: &Vector, mut combine: F) -> Vector
    where
        F: FnMut(Expression, Expression) -> Expression,
    {
        let mut combined = other.clone();

        for (name, left) in &self.components {
            let value = match other.components.get(name) {
                Some(right) => combine(left.clone(), right.clone()),
                None => left.clone(),
            };
            combined.components.insert(name.clone(), value);
        }

        combined
    }
}

impl std::iter::FromIterator<(SmolStr, Expression)> for Vector {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (SmolStr, Expression)>,
    {
        Vector {
            components: iter.into_iter().collect(),
        }
    }
}

impl Display for Vector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;

        for (i, (name, value)) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }

        write!(f, "}}")
    }
}
