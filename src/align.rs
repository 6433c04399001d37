/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use rpool::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, ::core::mem::size_of::<usize>())
  };
}

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
///
/// ```rust
/// use rpool::align_to;
///
/// assert_eq!(align_to!(5, 4), 8);
/// assert_eq!(align_to!(64, 16), 64);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $alignment:expr) => {
    ($value + $alignment - 1) & !($alignment - 1)
  };
}

/// Word alignment that reports overflow instead of wrapping.
pub fn checked_align(value: usize) -> Option<usize> {
  let mask = crate::block::ALIGNMENT - 1;
  value.checked_add(mask).map(|v| v & !mask)
}

pub fn is_aligned(value: usize) -> bool {
  value & (crate::block::ALIGNMENT - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::mem;

  #[test]
  fn test_align() {
    let ptr_size = mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ptr_size * i + 1)..=(ptr_size * (i + 1));

      let expected_alignment = ptr_size * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), checked_align(size));
      }
    }
  }

  #[test]
  fn test_align_to() {
    assert_eq!(align_to!(0usize, 4usize), 0);
    assert_eq!(align_to!(1usize, 4usize), 4);
    assert_eq!(align_to!(4usize, 4usize), 4);
    assert_eq!(align_to!(17usize, 16usize), 32);
  }

  #[test]
  fn test_checked_align_overflow() {
    assert_eq!(checked_align(usize::MAX), None);
    assert_eq!(checked_align(0), Some(0));
  }

  #[test]
  fn test_is_aligned() {
    let word = mem::size_of::<usize>();

    assert!(is_aligned(0));
    assert!(is_aligned(word * 3));
    assert!(!is_aligned(word + 1));
  }
}
