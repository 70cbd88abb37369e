//! # Points
//!
//! A [`Point`] is the state a Markov chain evolves: an assignment of a numeric
//! array to every free variable of the model.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::FromIterator;
use std::sync::Arc;

use nalgebra::DVector;

#[cfg(feature = "serde_support")]
use serde::Serialize;

/// Identifier of a free variable
pub type VarId = String;

/// Assignment of values to the free variables of a model.
///
/// Points are values: every operation which changes a variable returns a new
/// `Point`. Entries are reference counted, so a new point only allocates for
/// the variables which changed.
///
/// Discrete variables hold integral values (`0.0`/`1.0` for binary variables,
/// the category index for categorical ones).
///
/// # Example
/// ```rust
/// use compound_mcmc::Point;
/// use nalgebra::DVector;
///
/// let p = Point::new()
///     .with("mu", DVector::from_element(1, 0.5))
///     .with("z", DVector::from_vec(vec![0.0, 1.0]));
///
/// let q = p.set("mu", DVector::from_element(1, 1.5));
///
/// assert_eq!(p.scalar("mu"), Some(0.5));
/// assert_eq!(q.scalar("mu"), Some(1.5));
/// assert!(p.same_keys(&q));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct Point {
    values: BTreeMap<VarId, Arc<DVector<f64>>>,
}

impl Point {
    /// Create an empty point
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder style insert of `value` under `id`
    pub fn with<K: Into<VarId>>(mut self, id: K, value: DVector<f64>) -> Self {
        self.values.insert(id.into(), Arc::new(value));
        self
    }

    /// Builder style insert of a single scalar value under `id`
    pub fn with_scalar<K: Into<VarId>>(self, id: K, value: f64) -> Self {
        self.with(id, DVector::from_element(1, value))
    }

    /// Return a new point where `id` holds `value`.
    pub fn set(&self, id: &str, value: DVector<f64>) -> Self {
        let mut values = self.values.clone();
        values.insert(id.to_owned(), Arc::new(value));
        Self { values }
    }

    /// Return a new point with all `changes` applied.
    pub fn update<I>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (VarId, DVector<f64>)>,
    {
        let mut values = self.values.clone();
        for (id, value) in changes {
            values.insert(id, Arc::new(value));
        }
        Self { values }
    }

    /// Value of the variable `id`
    pub fn get(&self, id: &str) -> Option<&DVector<f64>> {
        self.values.get(id).map(|v| v.as_ref())
    }

    /// First element of the variable `id`, convenient for scalar variables.
    pub fn scalar(&self, id: &str) -> Option<f64> {
        self.get(id).and_then(|v| v.iter().next().copied())
    }

    /// Is `id` a variable of this point
    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Variable ids in canonical order
    pub fn keys(&self) -> impl Iterator<Item = &VarId> {
        self.values.keys()
    }

    /// Set of variable ids
    pub fn key_set(&self) -> BTreeSet<VarId> {
        self.values.keys().cloned().collect()
    }

    /// Iterate over `(id, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &DVector<f64>)> {
        self.values.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Does this point hold no variables
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total number of scalar elements across the given variables
    pub fn size_of(&self, ids: &[VarId]) -> usize {
        ids.iter()
            .filter_map(|id| self.get(id))
            .map(|v| v.len())
            .sum()
    }

    /// Do both points define the same variables
    pub fn same_keys(&self, other: &Point) -> bool {
        self.values.len() == other.values.len()
            && self.values.keys().zip(other.values.keys()).all(|(a, b)| a == b)
    }

    /// Do both points hold identical values for every variable not in `ids`
    pub fn agrees_outside(&self, other: &Point, ids: &[VarId]) -> bool {
        self.same_keys(other)
            && self
                .values
                .iter()
                .filter(|(k, _)| !ids.contains(*k))
                .all(|(k, v)| other.values.get(k).map_or(false, |o| o == v))
    }

    /// Concatenate the values of `ids` into one flat vector, in the given order.
    ///
    /// Missing variables contribute nothing.
    pub fn flatten(&self, ids: &[VarId]) -> DVector<f64> {
        let data: Vec<f64> = ids
            .iter()
            .filter_map(|id| self.get(id))
            .flat_map(|v| v.iter().copied())
            .collect();
        DVector::from_vec(data)
    }

    /// Inverse of [`Point::flatten`]: write consecutive slices of `flat` into `ids`,
    /// keeping each variable's current length.
    pub fn unflatten(&self, ids: &[VarId], flat: &DVector<f64>) -> Self {
        let mut offset = 0;
        let changes: Vec<(VarId, DVector<f64>)> = ids
            .iter()
            .filter_map(|id| {
                let len = self.get(id)?.len();
                let value = DVector::from_iterator(
                    len,
                    flat.iter().skip(offset).take(len).copied(),
                );
                offset += len;
                Some((id.clone(), value))
            })
            .collect();
        self.update(changes)
    }
}

impl<K: Into<VarId>> FromIterator<(K, DVector<f64>)> for Point {
    fn from_iter<I: IntoIterator<Item = (K, DVector<f64>)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v)))
                .collect(),
        }
    }
}
