//! Error types for skpdoc

use std::fmt;
use std::io;
use thiserror::Error;

use crate::types::PersistentId;

/// Main error type for model operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// A handle or identifier that is not (or no longer) valid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A semantically wrong value, e.g. a name collision or a layer
    /// that does not belong to the model
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity is already exclusively owned by another container
    #[error("Entity {0} is already owned")]
    AlreadyOwned(PersistentId),

    /// An empty batch where at least one element is required, or an
    /// index outside the allowed range
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Some elements of a batch succeeded and some failed; the succeeded
    /// subset is committed
    #[error("Partial success: {0}")]
    PartialSuccess(BatchFailures),

    /// Valid request, but there is legitimately nothing to return
    #[error("No data: {0}")]
    NoData(String),

    /// Format-level failure during load or save
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File content fails structural validation
    #[error("Invalid model: {0}")]
    ModelInvalid(String),

    /// File content or requested target version is not supported
    #[error("Unsupported model version: {0}")]
    ModelVersion(String),

    /// Unclassified failure
    #[error("{0}")]
    Generic(String),
}

/// Fieldless classification of [`ModelError`].
///
/// The order matches the numeric result table used by interop callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullInput,
    InvalidInput,
    NullOutput,
    Generic,
    Serialization,
    OutOfRange,
    NoData,
    ModelInvalid,
    ModelVersion,
    PartialSuccess,
    InvalidArgument,
}

impl ModelError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::InvalidInput(_) => ErrorKind::InvalidInput,
            ModelError::InvalidArgument(_) | ModelError::AlreadyOwned(_) => {
                ErrorKind::InvalidArgument
            }
            ModelError::OutOfRange(_) => ErrorKind::OutOfRange,
            ModelError::PartialSuccess(_) => ErrorKind::PartialSuccess,
            ModelError::NoData(_) => ErrorKind::NoData,
            ModelError::Serialization(_) | ModelError::Io(_) => ErrorKind::Serialization,
            ModelError::ModelInvalid(_) => ErrorKind::ModelInvalid,
            ModelError::ModelVersion(_) => ErrorKind::ModelVersion,
            ModelError::Generic(_) => ErrorKind::Generic,
        }
    }

    /// Failed elements of a batch, if this is a partial success
    pub fn batch_failures(&self) -> Option<&BatchFailures> {
        match self {
            ModelError::PartialSuccess(f) => Some(f),
            _ => None,
        }
    }
}

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Per-element failures of a batch operation.
///
/// Indices refer to positions in the caller's input slice.
#[derive(Debug, Default)]
pub struct BatchFailures {
    /// Number of elements that were applied
    pub succeeded: usize,
    /// Index and reason for every element that was rejected
    pub failures: Vec<(usize, ModelError)>,
}

impl BatchFailures {
    /// Indices of the rejected elements
    pub fn failed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.failures.iter().map(|(i, _)| *i)
    }

    /// Check whether the element at `index` was rejected
    pub fn is_failed(&self, index: usize) -> bool {
        self.failures.iter().any(|(i, _)| *i == index)
    }
}

impl fmt::Display for BatchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed",
            self.succeeded,
            self.failures.len()
        )?;
        if let Some((index, err)) = self.failures.first() {
            write!(f, " (first: #{index}: {err})")?;
        }
        Ok(())
    }
}

/// Accumulates per-element outcomes of a batch operation.
///
/// Batches never roll back; the tally only decides how the aggregate
/// outcome is reported.
#[derive(Debug, Default)]
pub(crate) struct BatchTally {
    inner: BatchFailures,
}

impl BatchTally {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, index: usize, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.inner.succeeded += 1,
            Err(e) => self.inner.failures.push((index, e)),
        }
    }

    pub(crate) fn succeeded(&self) -> usize {
        self.inner.succeeded
    }

    /// `Ok` when every element succeeded, `PartialSuccess` otherwise
    pub(crate) fn finish(self) -> Result<()> {
        if self.inner.failures.is_empty() {
            Ok(())
        } else {
            Err(ModelError::PartialSuccess(self.inner))
        }
    }

    /// Like [`finish`](Self::finish), but reports `NoData` when nothing
    /// succeeded at all
    pub(crate) fn finish_or_no_data(self, what: &str) -> Result<()> {
        if self.inner.succeeded == 0 && !self.inner.failures.is_empty() {
            Err(ModelError::NoData(format!("none of the inputs is a {what} of this model")))
        } else {
            self.finish()
        }
    }
}
