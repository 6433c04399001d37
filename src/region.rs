use std::{io, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::{AllocError, AllocResult};

/// The pool's backing storage: one private anonymous mapping, acquired once
/// and released on drop.
///
/// The mapping is page aligned, so every offset that is a multiple of
/// [`ALIGNMENT`](crate::block::ALIGNMENT) is also an aligned address. The
/// kernel hands the pages over zeroed.
pub struct Region {
  base: NonNull<u8>,
  len: usize,
}

impl Region {
  pub fn map(len: usize) -> AllocResult<Self> {
    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
      return Err(AllocError::MapFailed { size: len, errno });
    }

    let base = NonNull::new(address as *mut u8).ok_or(AllocError::MapFailed { size: len, errno: 0 })?;

    tracing::debug!(len, base = ?base, "mapped pool region");

    Ok(Self { base, len })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn as_slice(&self) -> &[u8] {
    // SAFETY: `base` points at `len` mapped, readable bytes owned by `self`.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    // SAFETY: as above, and `&mut self` guarantees exclusive access.
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    let result = unsafe { munmap(self.base.as_ptr() as *mut c_void, self.len) };

    if result != 0 {
      tracing::warn!(len = self.len, error = %io::Error::last_os_error(), "unmapping pool region failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::ALIGNMENT;

  #[test]
  fn test_map_zeroed_and_aligned() {
    let region = Region::map(4096).unwrap();

    assert_eq!(region.len(), 4096);
    assert_eq!(region.as_slice().as_ptr() as usize % ALIGNMENT, 0);
    assert!(region.as_slice().iter().all(|&b| b == 0));
  }

  #[test]
  fn test_map_writable() {
    let mut region = Region::map(256).unwrap();

    region.as_mut_slice()[255] = 0xAB;

    assert_eq!(region.as_slice()[255], 0xAB);
  }

  #[test]
  fn test_map_zero_length_fails() {
    assert!(matches!(Region::map(0), Err(AllocError::MapFailed { size: 0, .. })));
  }
}
