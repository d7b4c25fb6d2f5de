//! # vsalloc - A Variable-Size Allocator
//!
//! This crate manages a caller-supplied memory region as a chain of
//! variable-size blocks. Allocation is **first fit**, and adjacent free
//! blocks are merged lazily while the chain is searched.
//!
//! ## Overview
//!
//! Every block is one header word followed by its payload. Headers are laid
//! out back to back, so the next header is always found `8 + size` bytes
//! after the current one. A zero word ends the chain:
//!
//! ```text
//!   Arena Layout:
//!
//!   base                                                       base + capacity
//!   │                                                                       │
//!   ▼                                                                       ▼
//!   ┌──────┬───────────┬──────┬──────────────┬──────┬────────────────┬──────┐
//!   │ hdr  │ payload   │ hdr  │ payload      │ hdr  │ payload        │  0   │
//!   │taken │ 16 bytes  │ free │ 32 bytes     │taken │ N bytes        │      │
//!   └──────┴───────────┴──────┴──────────────┴──────┴────────────────┴──────┘
//!          ▲                                                          ▲
//!          └── pointer returned to the user                           │
//!                                                               sentinel
//! ```
//!
//! A header packs the block status and the payload size into one `u64`:
//!
//! ```text
//!   Header Word:
//!
//!    63  62                                                        0
//!   ┌───┬───────────────────────────────────────────────────────────┐
//!   │ T │                    payload size (bytes)                   │
//!   └───┴───────────────────────────────────────────────────────────┘
//!     │
//!     └── 1 = taken, 0 = free
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   vsalloc
//!   ├── align      - Word size and alignment macros (align!, align_down!)
//!   ├── header     - Header word encoding (internal)
//!   ├── block      - Walking, merging and splitting blocks (internal)
//!   ├── vsa        - Vsa: the allocator over one region
//!   ├── error      - VsaError
//!   ├── config     - AllocatorConfig
//!   ├── allocator  - Process-wide arena behind a lock
//!   ├── vec        - ArenaVec, a growable array in the arena
//!   ├── table      - Table, an open-addressing hash map in the arena
//!   └── string     - StringBuilder, a NUL-terminated string in the arena
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use vsalloc::Vsa;
//!
//! let mut memory = [0u64; 64];
//! let bytes = unsafe {
//!     std::slice::from_raw_parts_mut(memory.as_mut_ptr().cast::<u8>(), 512)
//! };
//! let mut vsa = Vsa::new(bytes).unwrap();
//!
//! let ptr = vsa.alloc(24).unwrap();
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 24);
//!     vsa.free(Some(ptr)).unwrap();
//! }
//!
//! vsa.dump(|_, args| println!("{}", args), "QUICK START");
//! ```
//!
//! Or through the process-wide allocator:
//!
//! ```rust
//! use vsalloc::{allocator, ArenaVec};
//!
//! allocator::init(64 * 1024);
//!
//! let mut v = ArenaVec::new().unwrap();
//! v.extend_from_slice(&[1u32, 2, 3]).unwrap();
//! assert_eq!(v.iter().sum::<u32>(), 6);
//! drop(v);
//!
//! allocator::finalize();
//! ```
//!
//! ## Limitations
//!
//! - **Word alignment only**: payloads are aligned to 8 bytes, never more
//! - **No eager merging**: `free` only marks the block; neighbours merge on
//!   the next search that walks over them
//! - **Interior pointers**: a pointer into the middle of a payload cannot be
//!   told apart from a block start and is undefined behaviour
//! - **Fixed capacity**: the arena never grows
//!
//! ## Safety
//!
//! Freeing and reallocating take raw pointers and are `unsafe`: the pointer
//! must have been returned by the same arena and not released since.

pub mod align;
mod block;
mod header;

pub mod allocator;
pub mod config;
pub mod error;
pub mod string;
pub mod table;
pub mod vec;
pub mod vsa;

pub use align::WORD_SIZE;
pub use config::AllocatorConfig;
pub use error::VsaError;
pub use header::{MAX_BLOCK_SIZE, Status};
pub use string::StringBuilder;
pub use table::Table;
pub use vec::ArenaVec;
pub use vsa::{BlockInfo, Blocks, MIN_ARENA_SIZE, Vsa, log_sink, trace_sink};
