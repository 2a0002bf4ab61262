//! Functional indexed updates
//!
//! `x.at().index(key).add(1.0)` returns a new array equal to `x` with `1.0` added at `key`,
//! leaving `x` untouched. Repeated indices accumulate for every operation except `set`.

use crate::array::Array;
use crate::index::Index;
use crate::ops::{GatherOptions, ScatterOp};
use crate::scalar::Operand;
use crate::Result;

pub struct IndexUpdateHelper<'a, A> {
    array: &'a A,
}

impl<'a, A: Array> IndexUpdateHelper<'a, A> {
    pub fn new(array: &'a A) -> Self {
        Self { array }
    }

    pub fn index(&self, key: impl Into<Index>) -> IndexUpdateRef<'a, A> {
        IndexUpdateRef {
            array: self.array,
            key: key.into(),
            options: GatherOptions::default(),
        }
    }
}

/// An array paired with an indexing key, awaiting an update.
pub struct IndexUpdateRef<'a, A> {
    array: &'a A,
    key: Index,
    options: GatherOptions,
}

impl<'a, A: Array> IndexUpdateRef<'a, A> {
    pub fn indices_are_sorted(mut self, sorted: bool) -> Self {
        self.options.indices_are_sorted = sorted;
        self
    }

    pub fn unique_indices(mut self, unique: bool) -> Self {
        self.options.unique_indices = unique;
        self
    }

    pub fn key(&self) -> &Index {
        &self.key
    }

    /// Same as `x[key]`.
    pub fn get(&self) -> Result<A> {
        self.array.get_item(&self.key, self.options)
    }

    pub fn set<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Set)
    }

    pub fn add<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Add)
    }

    pub fn multiply<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Multiply)
    }

    pub fn divide<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Divide)
    }

    pub fn power<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Power)
    }

    pub fn min<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Min)
    }

    pub fn max<'o>(&self, values: impl Into<Operand<'o, A>>) -> Result<A>
    where
        A: 'o,
    {
        self.scatter(values.into(), ScatterOp::Max)
    }

    /// Replaces `x[key]` with `f(x[key])`.
    pub fn apply<F>(&self, f: F) -> Result<A>
    where
        F: FnOnce(&A) -> Result<A>,
    {
        let updated = f(&self.get()?)?;
        self.scatter(Operand::Array(&updated), ScatterOp::Set)
    }

    fn scatter(&self, values: Operand<'_, A>, op: ScatterOp) -> Result<A> {
        self.array.scatter(&self.key, values, op, self.options)
    }
}
