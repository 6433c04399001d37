//! Error types for the pool allocator.

use thiserror::Error;

use crate::report::Violation;

/// Result alias used throughout the crate.
pub type AllocResult<T> = Result<T, AllocError>;

/// Reasons a pool operation was rejected.
///
/// A rejected call never mutates the pool.
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
  // --- Allocation Errors ---
  #[error("zero-size allocation requested")]
  ZeroSizeRequest,

  #[error("out of memory: {requested} bytes requested ({needed} byte block needed)")]
  OutOfMemory { requested: usize, needed: usize },

  // --- Deallocation Errors ---
  #[error("handle at offset {offset} does not belong to this pool")]
  InvalidHandle { offset: usize },

  #[error("block behind handle at offset {offset} is already free")]
  DoubleFree { offset: usize },

  // --- Pool Errors ---
  #[error("pool corrupted: {0}")]
  Corruption(Violation),

  #[error("invalid configuration: {reason}")]
  InvalidConfig { reason: String },

  #[error("mapping {size} byte pool failed (errno {errno})")]
  MapFailed { size: usize, errno: i32 },
}

impl AllocError {
  /// Stable category string, suitable for metrics labels.
  #[must_use]
  pub fn code(&self) -> &'static str {
    match self {
      Self::ZeroSizeRequest => "POOL:ALLOC:ZERO",
      Self::OutOfMemory { .. } => "POOL:ALLOC:OOM",
      Self::InvalidHandle { .. } => "POOL:FREE:INVALID",
      Self::DoubleFree { .. } => "POOL:FREE:DOUBLE",
      Self::Corruption(_) => "POOL:SYSTEM:CORRUPTION",
      Self::InvalidConfig { .. } => "POOL:CONFIG:INVALID",
      Self::MapFailed { .. } => "POOL:SYSTEM:MAP",
    }
  }

  /// Whether the same call may succeed later, after other blocks are freed.
  #[must_use]
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::OutOfMemory { .. })
  }

  pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
    Self::InvalidConfig { reason: reason.into() }
  }
}

impl From<Violation> for AllocError {
  fn from(violation: Violation) -> Self {
    Self::Corruption(violation)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_codes_are_distinct() {
    let errors = [
      AllocError::ZeroSizeRequest,
      AllocError::OutOfMemory { requested: 1, needed: 32 },
      AllocError::InvalidHandle { offset: 0 },
      AllocError::DoubleFree { offset: 0 },
      AllocError::Corruption(Violation::CoverageMismatch { mapped: 0, capacity: 64 }),
      AllocError::invalid_config("bad"),
      AllocError::MapFailed { size: 64, errno: 12 },
    ];

    let mut codes: Vec<_> = errors.iter().map(AllocError::code).collect();
    codes.sort_unstable();
    codes.dedup();

    assert_eq!(codes.len(), errors.len());
  }

  #[test]
  fn test_only_oom_is_retryable() {
    assert!(AllocError::OutOfMemory { requested: 1, needed: 32 }.is_retryable());
    assert!(!AllocError::DoubleFree { offset: 0 }.is_retryable());
    assert!(!AllocError::ZeroSizeRequest.is_retryable());
  }

  #[test]
  fn test_display() {
    let err = AllocError::OutOfMemory { requested: 100, needed: 128 };

    assert_eq!(
      err.to_string(),
      "out of memory: 100 bytes requested (128 byte block needed)"
    );
  }
}
