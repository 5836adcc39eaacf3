//! Error types for dependency sorting.

/// Errors that can occur while ordering items.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// The registered rules require an item to come before itself.
    ///
    /// `target` is the item whose dependents were being gathered and
    /// `dependent` the item already on the work stack that `target` must
    /// follow. Both are indices into the input sequence.
    #[error("cyclic dependency: item {target} must follow item {dependent}, which is waiting on it")]
    CyclicDependency {
        /// Input index of the item being expanded.
        target: usize,
        /// Input index of the stacked item it depends on.
        dependent: usize,
    },
}

/// Convenience alias for sort results.
pub type SortResult<T> = Result<T, SortError>;
