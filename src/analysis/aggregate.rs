//! Generic aggregators.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use super::traits::{Aggregator, PartialResult, ResultOrder};

/// Keeps every partial value in input order.
pub struct ListAggregator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ListAggregator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ListAggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Aggregator<T, Vec<T>> for ListAggregator<T> {
    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn aggregate(&self, partials: Vec<PartialResult<T>>) -> Vec<T> {
        partials.into_iter().map(|p| p.value).collect()
    }
}

/// Deduplicates partial values and emits them sorted.
pub struct SetAggregator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SetAggregator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SetAggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Aggregator<T, Vec<T>> for SetAggregator<T> {
    fn order(&self) -> ResultOrder {
        ResultOrder::Unordered
    }

    fn aggregate(&self, partials: Vec<PartialResult<T>>) -> Vec<T> {
        partials
            .into_iter()
            .map(|p| p.value)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Concatenates list-valued partials in input order.
pub struct FlattenAggregator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FlattenAggregator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FlattenAggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Aggregator<Vec<T>, Vec<T>> for FlattenAggregator<T> {
    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn aggregate(&self, partials: Vec<PartialResult<Vec<T>>>) -> Vec<T> {
        partials.into_iter().flat_map(|p| p.value).collect()
    }
}
