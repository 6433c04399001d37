//! # rpool - A Fixed Pool Memory Allocator
//!
//! This crate provides a **first-fit free-list allocator** over a single,
//! fixed-size pool of memory. Block metadata lives in-band, right in front of
//! the bytes handed to the caller.
//!
//! ## Overview
//!
//! The pool is always partitioned into contiguous blocks. Free blocks are
//! threaded together into a singly linked list; allocated blocks are only
//! reachable by walking the pool.
//!
//! ```text
//!   Pool Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              POOL                                    │
//!   │                                                                      │
//!   │   ┌────────┬──────────────┬────────┬──────────────┬───────────────┐  │
//!   │   │ Alloc  │    Free      │ Alloc  │    Free      │     Free      │  │
//!   │   └────────┴──────────────┴────────┴──────────────┴───────────────┘  │
//!   │               ▲    │                  ▲    │         ▲               │
//!   │   head ───────┼────┼──────────────────┘    │         │               │
//!   │               └────┼───────────────────────┘         │               │
//!   │                    └─────────────────────────────────┘               │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Free list order is link order, not address order.
//!   Adjacent free blocks are never merged.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rpool
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - In-band block header layout
//!   ├── region     - mmap-backed pool storage (internal)
//!   ├── allocator  - PoolAllocator and Handle
//!   ├── report     - Read-only pool diagnostics
//!   ├── config     - PoolConfig
//!   └── error      - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rpool::{PoolAllocator, PoolConfig};
//!
//! let config = PoolConfig::production().with_pool_size(4096);
//! let mut pool = PoolAllocator::with_config(config)?;
//!
//! // Allocate 64 bytes and use them
//! let handle = pool.allocate(64)?;
//! pool.data_mut(handle)?[..5].copy_from_slice(b"hello");
//! assert_eq!(&pool.data(handle)?[..5], b"hello");
//!
//! // Give them back
//! pool.deallocate(Some(handle))?;
//! assert!(pool.dump().is_consistent());
//! # Ok::<(), rpool::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! Each block starts with a header of three machine words:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ is_free: 0 / 1  │  │  │                          │  │
//!   │  │ next_free: off  │  │  │  N - header bytes usable │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Handle returned to user
//! ```
//!
//! `size` counts the header. Links are offsets into the pool, so nothing
//! dangles and two pools never share state.
//!
//! Allocating `n` bytes needs a block of `align!(n + header)` bytes (at least
//! header plus one word). The free list is scanned from its head and the
//! first block that is large enough wins:
//!
//! ```text
//!   Split (remainder can hold a header and a word):
//!
//!   ┌─────────────────────────────────────┐       ┌──────────┬──────────────┐
//!   │             Free (S)                │  ──►  │ Alloc(n) │  Free (S-n)  │
//!   └─────────────────────────────────────┘       └──────────┴──────────────┘
//!
//!   Consume (remainder too small):
//!
//!   ┌──────────────┐                              ┌──────────────┐
//!   │   Free (S)   │  ──►                         │  Alloc (S)   │
//!   └──────────────┘                              └──────────────┘
//! ```
//!
//! Freeing pushes the block on the head of the free list.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `PoolAllocator` is neither `Send` nor `Sync`
//! - **No coalescing**: fragmentation grows under churn
//! - **Fixed size**: the pool never grows
//! - **Unix-only**: the pool is an anonymous `mmap` mapping
//!
//! ## Errors
//!
//! Every rejected call returns an [`AllocError`] and leaves the pool exactly
//! as it was. Freeing `None` is not an error.

pub mod align;
pub mod allocator;
pub mod block;
pub mod config;
pub mod error;
mod region;
pub mod report;

pub use allocator::{Handle, PoolAllocator, needed_size};
pub use block::{ALIGNMENT, HEADER_SIZE, MIN_BLOCK_SIZE};
pub use config::{POOL_SIZE, PoolConfig};
pub use error::{AllocError, AllocResult};
pub use report::{BlockInfo, BlockStatus, FreeEntry, PoolReport, Violation};
