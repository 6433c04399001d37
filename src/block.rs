use std::mem;

/// Width of one header field.
pub const WORD: usize = mem::size_of::<usize>();

/// Every block start and every block size is a multiple of this.
pub const ALIGNMENT: usize = mem::size_of::<usize>();

/// Header fields, in pool order: `size`, `is_free`, `next_free`.
pub const HEADER_SIZE: usize = 3 * WORD;

/// Smallest legal block: a header plus one alignment unit of data.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + ALIGNMENT;

const SIZE_FIELD: usize = 0;
const FREE_FIELD: usize = WORD;
const NEXT_FIELD: usize = 2 * WORD;

// Stored in `next_free` for the last free block.
const NIL: usize = usize::MAX;

/// Decoded block header.
///
/// The header lives in-band at the start of its block; the user-data region
/// follows it immediately. `next_free` is the offset of the next free block
/// and is meaningless while the block is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub is_free: bool,
  pub next_free: Option<usize>,
}

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next_free: Option<usize>,
  ) -> Self {
    Self { size, is_free, next_free }
  }

  /// Decodes the header stored at `offset`, or `None` if the header itself
  /// would run past the end of the pool.
  pub fn read(
    pool: &[u8],
    offset: usize,
  ) -> Option<Self> {
    let end = offset.checked_add(HEADER_SIZE)?;
    let header = pool.get(offset..end)?;

    let size = read_word(header, SIZE_FIELD);
    let is_free = read_word(header, FREE_FIELD) != 0;
    let next_free = match read_word(header, NEXT_FIELD) {
      NIL => None,
      next => Some(next),
    };

    Some(Self { size, is_free, next_free })
  }

  /// Encodes this header at `offset`.
  ///
  /// Callers only write at offsets of blocks they have already validated, so
  /// the header always fits.
  pub fn write(
    &self,
    pool: &mut [u8],
    offset: usize,
  ) {
    let header = &mut pool[offset..offset + HEADER_SIZE];

    write_word(header, SIZE_FIELD, self.size);
    write_word(header, FREE_FIELD, self.is_free as usize);
    write_word(header, NEXT_FIELD, self.next_free.unwrap_or(NIL));
  }

  /// Whether a block with this header can legally start at `offset` in a pool
  /// of `capacity` bytes.
  pub fn fits(
    &self,
    offset: usize,
    capacity: usize,
  ) -> bool {
    self.size >= MIN_BLOCK_SIZE
      && crate::align::is_aligned(self.size)
      && crate::align::is_aligned(offset)
      && offset
        .checked_add(self.size)
        .is_some_and(|end| end <= capacity)
  }

  /// Bytes available to the caller.
  pub fn data_len(&self) -> usize {
    self.size - HEADER_SIZE
  }
}

fn read_word(
  header: &[u8],
  field: usize,
) -> usize {
  let mut bytes = [0u8; WORD];
  bytes.copy_from_slice(&header[field..field + WORD]);
  usize::from_ne_bytes(bytes)
}

fn write_word(
  header: &mut [u8],
  field: usize,
  value: usize,
) {
  header[field..field + WORD].copy_from_slice(&value.to_ne_bytes());
}
