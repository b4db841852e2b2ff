//! Batching of staged writes.
//!
//! Separates the size policy (`BatchLimit`) from what is being written
//! (`BatchPlan<T>`). A plan hands out its items in ordered groups that never
//! exceed the limit, and can be walked any number of times.
use crate::errors::ConfigError;

/// A validated upper bound on the number of writes in one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimit(usize);

impl BatchLimit {
    /// Creates a limit of `requested` writes for a store accepting at most `cap`.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidBatchSize` if `requested` is zero or above `cap`.
    pub fn new(requested: usize, cap: usize) -> Result<Self, ConfigError> {
        if requested == 0 || requested > cap {
            return Err(ConfigError::InvalidBatchSize { requested, cap });
        }
        Ok(Self(requested))
    }

    /// Creates the largest limit allowed by both the caller and the store.
    pub fn capped(requested: usize, cap: usize) -> Result<Self, ConfigError> {
        Self::new(requested.min(cap), cap)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// One group of items handed out by a `BatchPlan`.
#[derive(Debug, PartialEq, Eq)]
pub struct WriteBatch<'a, T> {
    /// Zero-based position of the batch within its plan.
    pub index: usize,
    pub items: &'a [T],
}

impl<T> WriteBatch<'_, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Staged items partitioned into batches of at most `limit` items.
#[derive(Debug, Clone)]
pub struct BatchPlan<T> {
    items: Vec<T>,
    limit: BatchLimit,
}

impl<T> BatchPlan<T> {
    pub fn new(items: Vec<T>, limit: BatchLimit) -> Self {
        Self { items, limit }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> BatchLimit {
        self.limit
    }

    /// Number of batches `batches()` yields.
    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.limit.get())
    }

    /// Iterates over the batches in order, starting from the first one.
    ///
    /// Every batch holds between one and `limit` items; an empty plan yields
    /// no batch at all.
    pub fn batches(&self) -> impl Iterator<Item = WriteBatch<'_, T>> {
        self.items
            .chunks(self.limit.get())
            .enumerate()
            .map(|(index, items)| WriteBatch { index, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_rejects_zero() {
        assert_eq!(
            BatchLimit::new(0, 500),
            Err(ConfigError::InvalidBatchSize { requested: 0, cap: 500 })
        );
    }

    #[test]
    fn test_limit_rejects_values_above_cap() {
        assert!(BatchLimit::new(501, 500).is_err());
        assert_eq!(BatchLimit::new(500, 500).map(BatchLimit::get), Ok(500));
    }

    #[test]
    fn test_capped_limit_uses_smaller_value() {
        assert_eq!(BatchLimit::capped(1000, 500).map(BatchLimit::get), Ok(500));
        assert_eq!(BatchLimit::capped(20, 500).map(BatchLimit::get), Ok(20));
    }

    #[test]
    fn test_batches_never_exceed_limit() {
        let plan = BatchPlan::new((0..1201).collect::<Vec<_>>(), BatchLimit::new(500, 500).unwrap());

        let sizes: Vec<usize> = plan.batches().map(|batch| batch.len()).collect();

        assert_eq!(sizes, vec![500, 500, 201]);
        assert_eq!(plan.batch_count(), 3);
    }

    #[test]
    fn test_batches_preserve_order_and_indices() {
        let plan = BatchPlan::new(vec!['a', 'b', 'c', 'd', 'e'], BatchLimit::new(2, 10).unwrap());

        let batches: Vec<(usize, Vec<char>)> = plan
            .batches()
            .map(|batch| (batch.index, batch.items.to_vec()))
            .collect();

        assert_eq!(
            batches,
            vec![(0, vec!['a', 'b']), (1, vec!['c', 'd']), (2, vec!['e'])]
        );
    }

    #[test]
    fn test_batches_restart_from_first_group() {
        let plan = BatchPlan::new(vec![1, 2, 3], BatchLimit::new(2, 2).unwrap());

        let first: Vec<usize> = plan.batches().map(|batch| batch.index).collect();
        let second: Vec<usize> = plan.batches().map(|batch| batch.index).collect();

        assert_eq!(first, second);
        assert_eq!(plan.batches().next().map(|batch| batch.items), Some(&[1, 2][..]));
    }

    #[test]
    fn test_empty_plan_yields_no_batches() {
        let plan: BatchPlan<u8> = BatchPlan::new(Vec::new(), BatchLimit::new(3, 3).unwrap());

        assert_eq!(plan.batches().count(), 0);
        assert_eq!(plan.batch_count(), 0);
    }
}
