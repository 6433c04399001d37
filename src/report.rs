//! Read-only diagnostics: a snapshot of the pool in address order and of the
//! free list in link order, plus every invariant violation found on the way.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::block::{Block, MIN_BLOCK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
  Free,
  Allocated,
}

/// One block, as met walking the pool by `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: usize,
  pub size: usize,
  pub status: BlockStatus,
}

/// One free-list entry, as met following `next_free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeEntry {
  pub offset: usize,
  pub size: usize,
}

/// A broken pool invariant.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  #[error("malformed header at offset {offset} (size {size})")]
  MalformedHeader { offset: usize, size: usize },

  #[error("blocks cover {mapped} of {capacity} bytes")]
  CoverageMismatch { mapped: usize, capacity: usize },

  #[error("free list entry at offset {offset} lies outside the pool")]
  FreeEntryOutOfPool { offset: usize },

  #[error("free list entry at offset {offset} is not a block start")]
  FreeEntryNotBlock { offset: usize },

  #[error("free list entry at offset {offset} is marked allocated")]
  FreeEntryAllocated { offset: usize },

  #[error("free block at offset {offset} is missing from the free list")]
  FreeBlockUnlisted { offset: usize },

  #[error("free list longer than {bound} entries, likely cyclic")]
  FreeListCycle { bound: usize },
}

/// Result of [`PoolAllocator::dump`](crate::PoolAllocator::dump).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
  pub capacity: usize,
  pub blocks: Vec<BlockInfo>,
  pub free_list: Vec<FreeEntry>,
  pub violations: Vec<Violation>,
}

impl PoolReport {
  /// Walks `pool` starting at offset 0 and the free list starting at `head`.
  pub(crate) fn scan(
    pool: &[u8],
    head: Option<usize>,
  ) -> Self {
    let capacity = pool.len();
    let mut violations = Vec::new();

    let blocks = walk_blocks(pool, &mut violations);
    let free_list = walk_free_list(pool, head, &blocks, &mut violations);

    let listed: BTreeSet<usize> = free_list.iter().map(|entry| entry.offset).collect();
    for block in &blocks {
      if block.status == BlockStatus::Free && !listed.contains(&block.offset) {
        violations.push(Violation::FreeBlockUnlisted { offset: block.offset });
      }
    }

    Self {
      capacity,
      blocks,
      free_list,
      violations,
    }
  }

  /// The state `init` produces: one free block spanning the pool.
  pub(crate) fn pristine(capacity: usize) -> Self {
    Self {
      capacity,
      blocks: vec![BlockInfo {
        offset: 0,
        size: capacity,
        status: BlockStatus::Free,
      }],
      free_list: vec![FreeEntry { offset: 0, size: capacity }],
      violations: Vec::new(),
    }
  }

  pub fn is_consistent(&self) -> bool {
    self.violations.is_empty()
  }

  pub fn block_count(&self) -> usize {
    self.blocks.len()
  }

  /// Bytes held by allocated blocks, headers included.
  pub fn used_bytes(&self) -> usize {
    self
      .blocks
      .iter()
      .filter(|block| block.status == BlockStatus::Allocated)
      .map(|block| block.size)
      .sum()
  }

  /// Bytes held by free blocks, headers included.
  pub fn free_bytes(&self) -> usize {
    self
      .blocks
      .iter()
      .filter(|block| block.status == BlockStatus::Free)
      .map(|block| block.size)
      .sum()
  }

  /// Size of the largest free block, headers included.
  pub fn largest_free_block(&self) -> usize {
    self.free_list.iter().map(|entry| entry.size).max().unwrap_or(0)
  }
}

fn walk_blocks(
  pool: &[u8],
  violations: &mut Vec<Violation>,
) -> Vec<BlockInfo> {
  let capacity = pool.len();
  let mut blocks = Vec::new();
  let mut offset = 0;

  while offset < capacity {
    let Some(block) = Block::read(pool, offset) else {
      violations.push(Violation::MalformedHeader { offset, size: 0 });
      break;
    };

    if !block.fits(offset, capacity) {
      violations.push(Violation::MalformedHeader {
        offset,
        size: block.size,
      });
      break;
    }

    blocks.push(BlockInfo {
      offset,
      size: block.size,
      status: if block.is_free {
        BlockStatus::Free
      } else {
        BlockStatus::Allocated
      },
    });

    offset += block.size;
  }

  if offset != capacity {
    violations.push(Violation::CoverageMismatch { mapped: offset, capacity });
  }

  blocks
}

fn walk_free_list(
  pool: &[u8],
  head: Option<usize>,
  blocks: &[BlockInfo],
  violations: &mut Vec<Violation>,
) -> Vec<FreeEntry> {
  let capacity = pool.len();
  // A simple chain can never hold more entries than the pool holds blocks.
  let bound = capacity / MIN_BLOCK_SIZE;
  let mut entries = Vec::new();
  let mut current = head;

  while let Some(offset) = current {
    if entries.len() >= bound {
      violations.push(Violation::FreeListCycle { bound });
      break;
    }

    let Some(block) = Block::read(pool, offset) else {
      violations.push(Violation::FreeEntryOutOfPool { offset });
      break;
    };

    if blocks.binary_search_by_key(&offset, |info| info.offset).is_err() {
      violations.push(Violation::FreeEntryNotBlock { offset });
      break;
    }

    if !block.is_free {
      violations.push(Violation::FreeEntryAllocated { offset });
      break;
    }

    entries.push(FreeEntry { offset, size: block.size });
    current = block.next_free;
  }

  entries
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn pool_of(blocks: &[(usize, bool, Option<usize>)]) -> Vec<u8> {
    let capacity = blocks.iter().map(|(size, _, _)| size).sum();
    let mut pool = vec![0u8; capacity];
    let mut offset = 0;

    for &(size, is_free, next_free) in blocks {
      Block::new(size, is_free, next_free).write(&mut pool, offset);
      offset += size;
    }

    pool
  }

  #[test]
  fn test_scan_consistent_pool() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(m, true, None), (2 * m, false, None), (m, true, Some(0))]);

    let report = PoolReport::scan(&pool, Some(3 * m));

    assert!(report.violations.is_empty(), "{:?}", report.violations);
    assert_eq!(
      report.blocks,
      vec![
        BlockInfo { offset: 0, size: m, status: BlockStatus::Free },
        BlockInfo { offset: m, size: 2 * m, status: BlockStatus::Allocated },
        BlockInfo { offset: 3 * m, size: m, status: BlockStatus::Free },
      ]
    );
    assert_eq!(
      report.free_list,
      vec![FreeEntry { offset: 3 * m, size: m }, FreeEntry { offset: 0, size: m }]
    );
    assert_eq!(report.used_bytes(), 2 * m);
    assert_eq!(report.free_bytes(), 2 * m);
    assert_eq!(report.largest_free_block(), m);
  }

  #[test]
  fn test_pristine_matches_scan_of_fresh_pool() {
    let pool = pool_of(&[(4 * MIN_BLOCK_SIZE, true, None)]);

    assert_eq!(PoolReport::scan(&pool, Some(0)), PoolReport::pristine(pool.len()));
  }

  #[test]
  fn test_detects_unlisted_free_block() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(m, true, None), (m, true, None)]);

    let report = PoolReport::scan(&pool, Some(0));

    assert_eq!(report.violations, vec![Violation::FreeBlockUnlisted { offset: m }]);
  }

  #[test]
  fn test_detects_allocated_entry() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(m, false, None), (m, true, None)]);

    let report = PoolReport::scan(&pool, Some(0));

    assert!(report.violations.contains(&Violation::FreeEntryAllocated { offset: 0 }));
    assert!(report.violations.contains(&Violation::FreeBlockUnlisted { offset: m }));
  }

  #[test]
  fn test_detects_cycle() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(m, true, Some(m)), (m, true, Some(0))]);

    let report = PoolReport::scan(&pool, Some(0));

    assert_eq!(report.violations, vec![Violation::FreeListCycle { bound: 2 }]);
    assert_eq!(report.free_list.len(), 2);
  }

  #[test]
  fn test_detects_zero_size_header() {
    let m = MIN_BLOCK_SIZE;
    let mut pool = pool_of(&[(m, false, None), (m, false, None)]);
    Block::new(0, false, None).write(&mut pool, m);

    let report = PoolReport::scan(&pool, None);

    assert_eq!(
      report.violations,
      vec![
        Violation::MalformedHeader { offset: m, size: 0 },
        Violation::CoverageMismatch { mapped: m, capacity: 2 * m },
      ]
    );
    assert_eq!(report.block_count(), 1);
  }

  #[test]
  fn test_detects_entry_inside_block() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(2 * m, true, None)]);

    let report = PoolReport::scan(&pool, Some(m));

    assert!(report.violations.contains(&Violation::FreeEntryNotBlock { offset: m }));
  }

  #[test]
  fn test_detects_entry_outside_pool() {
    let m = MIN_BLOCK_SIZE;
    let pool = pool_of(&[(m, true, Some(10 * m)), (m, false, None)]);

    let report = PoolReport::scan(&pool, Some(0));

    assert_eq!(report.violations, vec![Violation::FreeEntryOutOfPool { offset: 10 * m }]);
  }
}
