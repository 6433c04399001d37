use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::{
  AllocError, AllocResult, PoolConfig,
  align::{checked_align, is_aligned},
  block::{ALIGNMENT, Block, HEADER_SIZE, MIN_BLOCK_SIZE},
  region::Region,
  report::{PoolReport, Violation},
};

// Source of per-allocator ids; handles carry the id of the pool that issued them.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to the user-data region of an allocated block.
///
/// Holds the offset of the first data byte, i.e. the byte right after the
/// block's header, tagged with the allocator that issued it. It must be
/// passed back unchanged to [`PoolAllocator::deallocate`] of that allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
  pool: u64,
  offset: usize,
}

impl Handle {
  pub fn offset(&self) -> usize {
    self.offset
  }

  fn block_offset(&self) -> Option<usize> {
    self.offset.checked_sub(HEADER_SIZE)
  }
}

/// Size of the block that serves a request of `requested` user bytes:
/// header included, word aligned, never below [`MIN_BLOCK_SIZE`].
pub fn needed_size(requested: usize) -> Option<usize> {
  let total = checked_align(requested.checked_add(HEADER_SIZE)?)?;

  Some(total.max(MIN_BLOCK_SIZE))
}

/// First-fit allocator over one fixed pool.
///
/// The pool is partitioned into contiguous blocks, each starting with an
/// in-band header. Free blocks are threaded into a singly linked list by
/// offset. Allocation splits the first large enough free block when the
/// remainder can stand on its own; deallocation pushes the block on the head
/// of the list and never merges neighbours.
pub struct PoolAllocator {
  id: u64,
  region: Region,
  config: PoolConfig,
  free_head: Option<usize>,
  initialized: bool,
}

impl PoolAllocator {
  pub fn new() -> AllocResult<Self> {
    Self::with_config(PoolConfig::default())
  }

  pub fn with_config(config: PoolConfig) -> AllocResult<Self> {
    config.validate()?;

    let region = Region::map(config.pool_size)?;

    Ok(Self {
      id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
      region,
      config,
      free_head: None,
      initialized: false,
    })
  }

  pub fn capacity(&self) -> usize {
    self.region.len()
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  pub fn config(&self) -> &PoolConfig {
    &self.config
  }

  /// Rebuilds a handle of this pool from a raw data offset, e.g. one that
  /// went through foreign code. The offset is validated on use.
  pub fn handle_at(
    &self,
    offset: usize,
  ) -> Handle {
    Handle { pool: self.id, offset }
  }

  /// Turns the whole pool into one free block. Does nothing the second time.
  pub fn init(&mut self) {
    if self.initialized {
      return;
    }

    let capacity = self.capacity();
    Block::new(capacity, true, None).write(self.region.as_mut_slice(), 0);

    self.free_head = Some(0);
    self.initialized = true;

    debug!(capacity, "pool initialized");
  }

  pub fn allocate(
    &mut self,
    size: usize,
  ) -> AllocResult<Handle> {
    if size == 0 {
      debug!("rejected zero-size allocation");
      return Err(AllocError::ZeroSizeRequest);
    }

    self.init();

    let Some(needed) = needed_size(size) else {
      debug!(size, "rejected allocation, size overflows");
      return Err(AllocError::OutOfMemory {
        requested: size,
        needed: usize::MAX,
      });
    };

    let Some((prev, offset, block)) = self.find_free_block(needed)? else {
      debug!(size, needed, "out of memory");
      return Err(AllocError::OutOfMemory { requested: size, needed });
    };

    let pool = self.region.as_mut_slice();

    // Whatever pointed at `block` now points at `replacement`.
    let (allocated, replacement) = if block.size >= needed + HEADER_SIZE + ALIGNMENT {
      let remainder = offset + needed;
      Block::new(block.size - needed, true, block.next_free).write(pool, remainder);
      (Block::new(needed, false, None), Some(remainder))
    } else {
      (Block::new(block.size, false, None), block.next_free)
    };

    allocated.write(pool, offset);
    self.relink(prev, replacement);

    let data = offset + HEADER_SIZE;
    if let Some(pattern) = self.config.alloc_pattern {
      self.region.as_mut_slice()[data..data + allocated.data_len()].fill(pattern);
    }

    trace!(
      offset,
      size = allocated.size,
      requested = size,
      split = allocated.size < block.size,
      "allocated block"
    );

    Ok(self.handle_at(data))
  }

  /// Returns the block behind `handle` to the free list.
  ///
  /// `None` is accepted and ignored. A rejected handle leaves the pool
  /// untouched.
  pub fn deallocate(
    &mut self,
    handle: Option<Handle>,
  ) -> AllocResult<()> {
    let Some(handle) = handle else {
      trace!("ignored null handle");
      return Ok(());
    };

    let (offset, block) = self.resolve(handle)?;

    if block.is_free {
      debug!(offset, "rejected double free");
      return Err(AllocError::DoubleFree { offset: handle.offset() });
    }

    let pool = self.region.as_mut_slice();
    Block::new(block.size, true, self.free_head).write(pool, offset);

    if let Some(pattern) = self.config.dealloc_pattern {
      let data = offset + HEADER_SIZE;
      pool[data..data + block.data_len()].fill(pattern);
    }

    self.free_head = Some(offset);

    trace!(offset, size = block.size, "freed block");

    Ok(())
  }

  /// User-data region of a live allocation. It may be longer than requested
  /// when the whole block was handed out.
  pub fn data(
    &self,
    handle: Handle,
  ) -> AllocResult<&[u8]> {
    let (offset, block) = self.resolve_live(handle)?;
    let data = offset + HEADER_SIZE;

    Ok(&self.region.as_slice()[data..data + block.data_len()])
  }

  pub fn data_mut(
    &mut self,
    handle: Handle,
  ) -> AllocResult<&mut [u8]> {
    let (offset, block) = self.resolve_live(handle)?;
    let data = offset + HEADER_SIZE;

    Ok(&mut self.region.as_mut_slice()[data..data + block.data_len()])
  }

  /// Snapshot of every block and free-list entry. Never mutates the pool.
  ///
  /// Before `init` has run, the report describes the single free block `init`
  /// would create.
  pub fn dump(&self) -> PoolReport {
    if !self.initialized {
      return PoolReport::pristine(self.capacity());
    }

    PoolReport::scan(self.region.as_slice(), self.free_head)
  }

  /// First invariant violation found by [`dump`](Self::dump), if any.
  pub fn validate(&self) -> AllocResult<()> {
    match self.dump().violations.into_iter().next() {
      Some(violation) => Err(violation.into()),
      None => Ok(()),
    }
  }

  /// First fit in link order. Yields the predecessor link, the block offset
  /// and its header.
  fn find_free_block(
    &self,
    needed: usize,
  ) -> AllocResult<Option<(Option<usize>, usize, Block)>> {
    let bound = self.capacity() / MIN_BLOCK_SIZE;
    let mut prev = None;
    let mut current = self.free_head;
    let mut steps = 0;

    while let Some(offset) = current {
      if steps == bound {
        warn!(bound, "free list longer than the pool allows");
        return Err(Violation::FreeListCycle { bound }.into());
      }
      steps += 1;

      let block = self.header(offset)?;

      if block.is_free && block.size >= needed {
        return Ok(Some((prev, offset, block)));
      }

      prev = Some(offset);
      current = block.next_free;
    }

    Ok(None)
  }

  /// Points the head, or the `next_free` of `prev`, at `target`.
  fn relink(
    &mut self,
    prev: Option<usize>,
    target: Option<usize>,
  ) {
    let Some(prev) = prev else {
      self.free_head = target;
      return;
    };

    let pool = self.region.as_mut_slice();
    if let Some(mut block) = Block::read(pool, prev) {
      block.next_free = target;
      block.write(pool, prev);
    }
  }

  fn header(
    &self,
    offset: usize,
  ) -> AllocResult<Block> {
    let pool = self.region.as_slice();

    match Block::read(pool, offset) {
      Some(block) if block.fits(offset, pool.len()) => Ok(block),
      other => {
        let size = other.map_or(0, |block| block.size);
        warn!(offset, size, "malformed block header");
        Err(Violation::MalformedHeader { offset, size }.into())
      },
    }
  }

  /// Maps a handle back to its block, rejecting anything that cannot be one.
  fn resolve(
    &self,
    handle: Handle,
  ) -> AllocResult<(usize, Block)> {
    let reject = |reason: &'static str| {
      debug!(offset = handle.offset(), reason, "rejected handle");
      AllocError::InvalidHandle { offset: handle.offset() }
    };

    if handle.pool != self.id {
      return Err(reject("issued by another pool"));
    }

    if !self.initialized {
      return Err(reject("pool not initialized"));
    }

    let Some(offset) = handle.block_offset() else {
      return Err(reject("below pool start"));
    };

    if offset >= self.capacity() {
      return Err(reject("past pool end"));
    }

    if !is_aligned(offset) {
      return Err(reject("misaligned"));
    }

    if self.config.verify_handles && !self.is_block_start(offset) {
      return Err(reject("not a block start"));
    }

    let pool = self.region.as_slice();
    match Block::read(pool, offset) {
      Some(block) if block.fits(offset, pool.len()) => Ok((offset, block)),
      _ => Err(reject("malformed header")),
    }
  }

  fn resolve_live(
    &self,
    handle: Handle,
  ) -> AllocResult<(usize, Block)> {
    let (offset, block) = self.resolve(handle)?;

    if block.is_free {
      debug!(offset, "rejected access to free block");
      return Err(AllocError::InvalidHandle { offset: handle.offset() });
    }

    Ok((offset, block))
  }

  fn is_block_start(
    &self,
    target: usize,
  ) -> bool {
    let pool = self.region.as_slice();
    let mut offset = 0;

    while offset < target {
      match Block::read(pool, offset) {
        Some(block) if block.fits(offset, pool.len()) => offset += block.size,
        _ => return false,
      }
    }

    offset == target
  }
}
