//! Pool allocator configuration

use crate::{
  AllocError, AllocResult,
  align::is_aligned,
  block::{ALIGNMENT, MIN_BLOCK_SIZE},
};

/// Default pool capacity: 1 MiB.
pub const POOL_SIZE: usize = 1024 * 1024;

/// Configuration for [`PoolAllocator`](crate::PoolAllocator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  /// Total pool capacity in bytes, headers included
  pub pool_size: usize,

  /// Fill pattern byte for newly allocated memory (for debugging)
  pub alloc_pattern: Option<u8>,
  /// Fill pattern byte for deallocated memory (for debugging)
  pub dealloc_pattern: Option<u8>,

  /// Walk the pool to confirm a handle names a real block before trusting it
  pub verify_handles: bool,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      pool_size: POOL_SIZE,
      alloc_pattern: if cfg!(debug_assertions) {
        Some(0xBB)
      } else {
        None
      },
      dealloc_pattern: if cfg!(debug_assertions) {
        Some(0xDD)
      } else {
        None
      },
      verify_handles: false,
    }
  }
}

impl PoolConfig {
  /// Production configuration - no fill patterns, cheap handle checks
  #[must_use]
  pub fn production() -> Self {
    Self {
      pool_size: POOL_SIZE,
      alloc_pattern: None,
      dealloc_pattern: None,
      verify_handles: false,
    }
  }

  /// Debug configuration - fill patterns and strict handle checks
  #[must_use]
  pub fn debug() -> Self {
    Self {
      pool_size: POOL_SIZE,
      alloc_pattern: Some(0xBB),
      dealloc_pattern: Some(0xDD),
      verify_handles: true,
    }
  }

  #[must_use]
  pub fn with_pool_size(
    mut self,
    pool_size: usize,
  ) -> Self {
    self.pool_size = pool_size;
    self
  }

  pub fn validate(&self) -> AllocResult<()> {
    if self.pool_size < MIN_BLOCK_SIZE {
      return Err(AllocError::invalid_config(format!(
        "pool size {} is below the minimum block size {}",
        self.pool_size, MIN_BLOCK_SIZE
      )));
    }

    if !is_aligned(self.pool_size) {
      return Err(AllocError::invalid_config(format!(
        "pool size {} is not a multiple of {}",
        self.pool_size, ALIGNMENT
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_presets_are_valid() {
    assert!(PoolConfig::default().validate().is_ok());
    assert!(PoolConfig::production().validate().is_ok());
    assert!(PoolConfig::debug().validate().is_ok());
  }

  #[test]
  fn test_rejects_tiny_pool() {
    let config = PoolConfig::production().with_pool_size(MIN_BLOCK_SIZE - ALIGNMENT);

    assert!(matches!(config.validate(), Err(AllocError::InvalidConfig { .. })));
  }

  #[test]
  fn test_rejects_unaligned_pool() {
    let config = PoolConfig::production().with_pool_size(MIN_BLOCK_SIZE + 1);

    assert!(matches!(config.validate(), Err(AllocError::InvalidConfig { .. })));
  }

  #[test]
  fn test_single_block_pool_is_valid() {
    let config = PoolConfig::production().with_pool_size(MIN_BLOCK_SIZE);

    assert!(config.validate().is_ok());
  }
}
