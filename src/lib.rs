//! Boundary-tag memory regions with stealable allocations.
//!
//! A [`MemoryRegion`] manages one fixed arena. Every block carries a 4 byte
//! header before its payload and an identical footer after it, so neighbours
//! can be inspected and merged in constant time:
//!
//! ```text
//! +------+------+------------------+------+------+-----------+------+------+
//! | sent | hdr  |  payload (Alloc) | ftr  | hdr  |  (Empty)  | ftr  | sent |
//! +------+------+------------------+------+------+-----------+------+------+
//! ```
//!
//! Free blocks are kept in an index sorted by size, which makes allocation
//! best fit. Blocks can also be allocated as *stealable*: the owner registers
//! an object implementing [`Stealable`], and when nothing free fits a
//! request the region reclaims such objects, lowest queue first, possibly
//! merging several adjacent ones with free space in between.
//!
//! [`GeneralMemoryAllocator`] puts a small internal and a large external
//! region behind one interface and routes by address.
//!
//! ```no_run
//! use memregion::{AllocOptions, AllocatorConfig, GeneralMemoryAllocator};
//!
//! let mut gma = GeneralMemoryAllocator::new(&AllocatorConfig::default()).unwrap();
//! let block = gma.alloc(1000, AllocOptions::new()).unwrap();
//! gma.shorten_right(block.address, 500).unwrap();
//! gma.dealloc(block.address).unwrap();
//! ```

mod allocator;
mod arena;
mod block;
mod config;
mod empty_space;
mod error;
mod list;
mod platform;
mod reclaim;
mod region;
mod stats;
mod stealable;

pub mod utils;

pub use allocator::{GeneralMemoryAllocator, RegionId};
pub use block::{BLOCK_OVERHEAD, BlockKind, BlockTag, MAX_PAYLOAD, MIN_PAYLOAD, TAG_SIZE};
pub use config::{AllocatorConfig, REGION_OVERHEAD, RegionConfig};
pub use empty_space::{EmptySpaceIndex, EmptySpaceRecord};
pub use error::{AllocError, ConfigError, IntegrityError};
pub use reclaim::ReclaimScope;
pub use region::{AllocOptions, Allocation, BlockInfo, Blocks, Extension, MemoryRegion};
pub use stats::RegionStats;
pub use stealable::{ExcludeTarget, Stealable};
