use tracing::{debug, error, warn};

use crate::{
    arena::Arena,
    block::{BLOCK_OVERHEAD, BlockKind, BlockTag, MAX_PAYLOAD, TAG_SIZE, pad_size, word_align},
    config::{REGION_OVERHEAD, RegionConfig},
    empty_space::{EmptySpaceIndex, EmptySpaceRecord},
    error::{AllocError, ConfigError, IntegrityError},
    reclaim::GrabTarget,
    stats::RegionStats,
    stealable::{ExcludeTarget, Stealable, StealableRegistry},
};

/// Options for an allocation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocOptions {
    /// Tag the block as stealable. The caller is expected to register an
    /// object for it right away; until then it is never reclaimed.
    pub stealable: bool,
    /// Client on whose behalf the request is made.
    pub exclude: Option<ExcludeTarget>,
    /// Take the largest free span whole, whatever the request.
    pub biggest: bool,
    /// Try the internal region first. Only meaningful to
    /// [`crate::GeneralMemoryAllocator`].
    pub on_chip: bool,
}

impl AllocOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stealable(mut self) -> Self {
        self.stealable = true;
        self
    }

    pub fn exclude(mut self, target: ExcludeTarget) -> Self {
        self.exclude = Some(target);
        self
    }

    pub fn biggest(mut self) -> Self {
        self.biggest = true;
        self
    }

    pub fn on_chip(mut self) -> Self {
        self.on_chip = true;
        self
    }
}

/// A block handed out by an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Payload address.
    pub address: u32,
    /// Actual payload size, at least what was asked for.
    pub size: u32,
}

/// How far an in-place extension grew a block on each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extension {
    pub left: u32,
    pub right: u32,
}

impl Extension {
    pub fn total(&self) -> u32 {
        self.left + self.right
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Payload address of the block after growing, given where it was.
    pub fn new_address(&self, original: u32) -> u32 {
        original - self.left
    }
}

/// One block as seen by a walk over the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub address: u32,
    pub kind: BlockKind,
    pub size: u32,
}

/// A single contiguous arena managed with boundary tags.
///
/// ```text
///  base                                                      base + size
///  |                                                                   |
///  +------+------+---------+------+------+---------+------+-----+------+
///  | sent | hdr  | payload | ftr  | hdr  | payload | ftr  | ... | sent |
///  +------+------+---------+------+------+---------+------+-----+------+
/// ```
///
/// Blocks tile the arena with no gaps. Free blocks are tracked in an
/// [`EmptySpaceIndex`] sorted by size, so allocation is best fit. Adjacent
/// free blocks are merged on release. Stealable blocks are tracked in a
/// registry and reclaimed when nothing free fits.
pub struct MemoryRegion {
    pub(crate) name: String,
    pub(crate) arena: Arena,
    pub(crate) empty_spaces: EmptySpaceIndex,
    pub(crate) stealables: StealableRegistry,
    pub(crate) stats: RegionStats,
    pub(crate) bypass_culling: bool,
}

impl MemoryRegion {
    /// Maps the arena described by `config` and lays it out as a single free
    /// block between two sentinels.
    pub fn new(config: &RegionConfig, num_queues: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        if num_queues == 0 {
            return Err(ConfigError::NoQueues);
        }

        let arena =
            Arena::new(config.base, config.size).ok_or_else(|| ConfigError::MappingFailed {
                name: config.name.clone(),
                size: config.size,
            })?;

        let mut region = Self {
            name: config.name.clone(),
            arena,
            empty_spaces: EmptySpaceIndex::new(config.index_capacity),
            stealables: StealableRegistry::new(num_queues),
            stats: RegionStats::default(),
            bypass_culling: false,
        };
        region.setup();

        debug!(
            region = %region.name,
            base = format_args!("{:#010x}", config.base),
            usable = region.usable_size(),
            "region ready"
        );
        Ok(region)
    }

    fn setup(&mut self) {
        let base = self.arena.base();
        let end = self.arena.end();

        self.arena.write_tag(base, BlockTag::sentinel());
        self.arena.write_tag(end - TAG_SIZE, BlockTag::sentinel());

        let usable = self.usable_size();
        let address = self.start();
        self.write_tags(address, BlockTag::empty(usable));
        // A fresh index always has room for one record.
        let _ = self.empty_spaces.insert(EmptySpaceRecord::new(usable, address));
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.arena.base()
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.arena.size()
    }

    /// Payload bytes available when the region is completely free.
    #[inline]
    pub fn usable_size(&self) -> u32 {
        self.arena.size() - REGION_OVERHEAD
    }

    /// Payload address of the first block.
    #[inline]
    pub(crate) fn start(&self) -> u32 {
        self.arena.base() + BLOCK_OVERHEAD
    }

    /// Address of the trailing sentinel.
    #[inline]
    fn limit(&self) -> u32 {
        self.arena.end() - TAG_SIZE
    }

    /// Whether `address` can be the payload address of a block here.
    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        address >= self.start() && address < self.limit() - TAG_SIZE
    }

    #[inline]
    pub(crate) fn header_of(&self, address: u32) -> BlockTag {
        self.arena.read_tag(address - TAG_SIZE)
    }

    /// Writes identical header and footer tags around the payload at
    /// `address`.
    #[inline]
    pub(crate) fn write_tags(&mut self, address: u32, tag: BlockTag) {
        self.arena.write_tag(address - TAG_SIZE, tag);
        self.arena.write_tag(address + tag.size, tag);
    }

    /// Best fit allocation, falling back to reclaiming stealable memory.
    ///
    /// The request is rounded up to a whole number of words. With
    /// `options.biggest` the largest free span is taken whole, provided it
    /// fits the request.
    pub fn alloc(&mut self, size: u32, options: AllocOptions) -> Result<Allocation, AllocError> {
        if size > MAX_PAYLOAD {
            return Err(self.out_of_memory(size));
        }
        let required = pad_size(size);
        let kind = if options.stealable {
            BlockKind::Stealable
        } else {
            BlockKind::Allocated
        };

        let found = if options.biggest {
            self.empty_spaces
                .last()
                .filter(|record| record.length >= required)
                .map(|_| self.empty_spaces.len() - 1)
        } else {
            let i = self.empty_spaces.search(required);
            (i < self.empty_spaces.len()).then_some(i)
        };

        let (address, size) = match found {
            Some(i) => self.carve(i, required, options.biggest),
            None => match self.free_some_stealable_memory(required, options.exclude) {
                Some((address, got)) if !options.biggest && got > required + BLOCK_OVERHEAD => {
                    let extra = got - required - BLOCK_OVERHEAD;
                    self.mark_space_as_empty(
                        address + required + BLOCK_OVERHEAD,
                        extra as i64,
                        false,
                        true,
                    );
                    (address, required)
                }
                Some((address, got)) => (address, got),
                None => return Err(self.out_of_memory(required)),
            },
        };

        self.write_tags(address, BlockTag::new(kind, size));
        self.stats.record_allocation();
        Ok(Allocation { address, size })
    }

    fn out_of_memory(&mut self, requested: u32) -> AllocError {
        self.stats.record_failure();
        warn!(region = %self.name, requested, "out of memory");
        AllocError::OutOfMemory {
            requested,
            region: self.name.clone(),
        }
    }

    /// Takes the record at `index`, either whole or by splitting `required`
    /// bytes off its low end.
    fn carve(&mut self, index: usize, required: u32, whole: bool) -> (u32, u32) {
        let record = self.empty_spaces.as_slice()[index];
        let extra = record.length as i64 - required as i64 - BLOCK_OVERHEAD as i64;

        if whole || extra <= 0 {
            self.empty_spaces.delete_at_index(index);
            return (record.address, record.length);
        }

        let extra = extra as u32;
        let extra_address = record.address + required + BLOCK_OVERHEAD;
        self.write_tags(extra_address, BlockTag::empty(extra));
        self.empty_spaces
            .replace(index, EmptySpaceRecord::new(extra, extra_address));

        (record.address, required)
    }

    /// Releases a block. Adjacent free blocks merge with it.
    ///
    /// Releasing a stealable block drops its registered object without
    /// stealing it. Returns false, and changes nothing, if `address` is not
    /// a live block of this region.
    pub fn dealloc(&mut self, address: u32) -> bool {
        if !self.contains(address) {
            error!(region = %self.name, address, "dealloc outside region");
            return false;
        }

        let tag = self.header_of(address);
        match tag.kind {
            BlockKind::Empty => {
                error!(region = %self.name, address, "dealloc of free block");
                return false;
            }
            BlockKind::Stealable => drop(self.stealables.take(address)),
            BlockKind::Allocated => {}
        }

        self.mark_space_as_empty(address, tag.size as i64, true, true);
        self.stats.record_release();
        true
    }

    /// Payload size of the block at `address`.
    #[inline]
    pub fn allocated_size(&self, address: u32) -> u32 {
        self.header_of(address).size
    }

    /// Records `space_size` bytes at `address` as free, merging with free
    /// neighbours on the permitted sides, and writes its tags.
    ///
    /// `space_size` may be zero or negative when the caller knows a merge
    /// will make up the difference, e.g. when a block shrinks by a single
    /// word next to free space.
    pub(crate) fn mark_space_as_empty(
        &mut self,
        address: u32,
        space_size: i64,
        look_left: bool,
        look_right: bool,
    ) {
        let mut address = address;
        let mut size = space_size;
        let mut left = None;
        let mut right = None;

        if look_left {
            let tag = self.arena.read_tag(address - BLOCK_OVERHEAD);
            if tag.kind == BlockKind::Empty {
                let record = EmptySpaceRecord::new(tag.size, address - BLOCK_OVERHEAD - tag.size);
                address = record.address;
                size += (tag.size + BLOCK_OVERHEAD) as i64;
                left = Some(record);
            }
        }

        if look_right {
            let header = (address as i64 + size) as u32 + TAG_SIZE;
            let tag = self.arena.read_tag(header);
            if tag.kind == BlockKind::Empty {
                right = Some(EmptySpaceRecord::new(tag.size, header + TAG_SIZE));
                size += (tag.size + BLOCK_OVERHEAD) as i64;
            }
        }

        debug_assert!(size >= 0, "negative empty space at {address:#010x}");
        let size = size.max(0) as u32;
        let merged = EmptySpaceRecord::new(size, address);

        let existing = match (left, right) {
            (Some(left), Some(right)) => {
                // Keep whichever record sorts later, it is closer to where
                // the merged one belongs.
                let (keep, gone) = if right > left { (right, left) } else { (left, right) };
                let from = match self.empty_spaces.search_exact(&gone) {
                    Some(i) => {
                        self.empty_spaces.delete_at_index(i);
                        i
                    }
                    None => {
                        self.found_orphan(&gone);
                        self.empty_spaces.search_key(&gone, 0..self.empty_spaces.len())
                    }
                };
                self.empty_spaces
                    .search_exact_from(&keep, from)
                    .or_else(|| self.found_orphan(&keep))
            }
            (Some(record), None) | (None, Some(record)) => self
                .empty_spaces
                .search_exact(&record)
                .or_else(|| self.found_orphan(&record)),
            (None, None) => None,
        };

        match existing {
            Some(i) => {
                self.empty_spaces.replace(i, merged);
            }
            None => {
                debug_assert!(
                    self.empty_spaces.search_exact(&merged).is_none(),
                    "free span {address:#010x} recorded twice"
                );
                if self.empty_spaces.insert(merged).is_none() {
                    warn!(region = %self.name, address, size, "lost track of empty space");
                    self.stats.record_orphan();
                }
            }
        }

        self.write_tags(address, BlockTag::empty(size));
    }

    fn found_orphan(&self, record: &EmptySpaceRecord) -> Option<usize> {
        warn!(
            region = %self.name,
            address = record.address,
            size = record.length,
            "found orphaned empty space"
        );
        None
    }

    /// Gives back the tail of a block, keeping at least `new_size` bytes.
    ///
    /// Refuses, returning the unchanged size, when the freed tail would be
    /// too small to stand on its own and there is no free neighbour on the
    /// right to absorb it.
    pub fn shorten_right(&mut self, address: u32, new_size: u32) -> u32 {
        let tag = self.header_of(address);
        let new_size = pad_size(new_size);

        let right = self.arena.read_tag(address + tag.size + TAG_SIZE);
        let limit = if right.kind == BlockKind::Empty {
            tag.size as i64
        } else {
            tag.size as i64 - BLOCK_OVERHEAD as i64
        };
        if new_size as i64 >= limit {
            return tag.size;
        }

        self.write_tags(address, BlockTag::new(tag.kind, new_size));
        self.mark_space_as_empty(
            address + new_size + BLOCK_OVERHEAD,
            tag.size as i64 - new_size as i64 - BLOCK_OVERHEAD as i64,
            false,
            true,
        );
        new_size
    }

    /// Gives back `amount` bytes from the front of a block, moving the first
    /// `bytes_to_preserve` bytes of payload along with the new start.
    ///
    /// Returns how many bytes the block actually shrank by, 0 if refused.
    /// The payload address grows by that amount.
    pub fn shorten_left(&mut self, address: u32, amount: u32, bytes_to_preserve: u32) -> u32 {
        let tag = self.header_of(address);
        let new_size = pad_size(tag.size.saturating_sub(amount));

        let left = self.arena.read_tag(address - BLOCK_OVERHEAD);
        let limit = if left.kind == BlockKind::Empty {
            tag.size as i64
        } else {
            tag.size as i64 - BLOCK_OVERHEAD as i64
        };
        if new_size as i64 >= limit {
            return 0;
        }

        let shortened = tag.size - new_size;
        let new_address = address + shortened;

        let preserve = bytes_to_preserve.min(new_size);
        if preserve > 0 {
            self.arena.copy_within(address, new_address, preserve);
        }

        self.write_tags(new_address, BlockTag::new(tag.kind, new_size));
        if tag.kind == BlockKind::Stealable {
            self.stealables.relocate(address, new_address);
        }
        self.mark_space_as_empty(
            address,
            shortened as i64 - BLOCK_OVERHEAD as i64,
            true,
            false,
        );
        shortened
    }

    /// Grows a block into its right neighbour if that costs nothing more
    /// than unlinking a free span or reclaiming a willing stealable. Returns
    /// the new payload size.
    pub fn extend_right_as_much_as_easily_possible(&mut self, address: u32) -> u32 {
        let tag = self.header_of(address);
        let right_header = address + tag.size + TAG_SIZE;
        let right = self.arena.read_tag(right_header);
        let right_address = right_header + TAG_SIZE;

        match right.kind {
            BlockKind::Allocated => return tag.size,
            BlockKind::Empty => {
                self.empty_spaces
                    .delete_at_key_exact(&EmptySpaceRecord::new(right.size, right_address));
            }
            BlockKind::Stealable => {
                let willing = self
                    .stealables
                    .get(right_address)
                    .is_some_and(|object| object.may_be_stolen(None));
                if !willing {
                    return tag.size;
                }
                self.steal_block(
                    right_address,
                    address..right_address + right.size,
                    "extend-right",
                );
            }
        }

        let size = tag.size + right.size + BLOCK_OVERHEAD;
        self.write_tags(address, BlockTag::new(tag.kind, size));
        size
    }

    /// Grows a block in place by at least `min_amount` and ideally
    /// `ideal_amount` bytes, taking free neighbours first and willing
    /// stealable ones after. Either side may grow.
    ///
    /// All or nothing: if `min_amount` can't be reached nothing changes and
    /// a zero extension is returned.
    pub fn extend(
        &mut self,
        address: u32,
        min_amount: u32,
        ideal_amount: u32,
        exclude: Option<ExcludeTarget>,
    ) -> Extension {
        let tag = self.header_of(address);
        let min = word_align(min_amount);
        let ideal = word_align(ideal_amount).max(min);

        let target = GrabTarget {
            address,
            size: tag.size,
            kind: tag.kind,
            min,
            ideal,
            exclude,
            steal_original: false,
        };
        let Ok(grabbed) = self.grab_neighbouring_memory(&target, None) else {
            return Extension::default();
        };

        let (mut left, mut right) = (grabbed.left, grabbed.right);
        let mut new_address = grabbed.address;
        let mut surplus = (left + right) as i64 - ideal as i64;

        if surplus > BLOCK_OVERHEAD as i64 && right > BLOCK_OVERHEAD {
            let cut = (surplus.max(12) as u32).min(right);
            right -= cut;
            surplus -= cut as i64;
            self.mark_space_as_empty(
                address + tag.size + right + BLOCK_OVERHEAD,
                cut as i64 - BLOCK_OVERHEAD as i64,
                false,
                true,
            );
        }

        if surplus > BLOCK_OVERHEAD as i64 && left > BLOCK_OVERHEAD {
            let cut = (surplus.max(12) as u32).min(left);
            left -= cut;
            self.mark_space_as_empty(new_address, cut as i64 - BLOCK_OVERHEAD as i64, true, false);
            new_address += cut;
        }

        let size = tag.size + left + right;
        self.write_tags(new_address, BlockTag::new(tag.kind, size));
        if tag.kind == BlockKind::Stealable {
            self.stealables.relocate(address, new_address);
        }

        Extension { left, right }
    }

    /// Attaches `object` to a block allocated with
    /// [`AllocOptions::stealable`] and files it in its appropriate queue.
    pub fn register_stealable(
        &mut self,
        address: u32,
        object: Box<dyn Stealable>,
    ) -> Result<(), AllocError> {
        if !self.contains(address) {
            return Err(AllocError::UnknownAddress(address));
        }
        if self.header_of(address).kind != BlockKind::Stealable {
            return Err(AllocError::NotStealable(address));
        }

        if self.stealables.register(address, object).is_some() {
            warn!(region = %self.name, address, "replaced registered stealable");
        }
        self.stealables.queue_appropriately(address);
        Ok(())
    }

    /// Moves a registered stealable to the end of `queue`. Returns false if
    /// nothing is registered at `address`.
    pub fn put_stealable_in_queue(&mut self, address: u32, queue: usize) -> bool {
        self.stealables.queue(address, queue)
    }

    /// Moves a registered stealable to the end of the queue it reports as
    /// appropriate.
    pub fn put_stealable_in_appropriate_queue(&mut self, address: u32) -> bool {
        self.stealables.queue_appropriately(address)
    }

    /// Queue the stealable at `address` currently sits in.
    pub fn stealable_queue(&self, address: u32) -> Option<usize> {
        self.stealables.queue_of(address)
    }

    /// Payload addresses of the stealables in `queue`, oldest first.
    pub fn queued_stealables(&self, queue: usize) -> Vec<u32> {
        self.stealables.queued(queue)
    }

    /// Longest run the last reclamation pass found reachable from `queue`.
    /// `u32::MAX` means unknown.
    pub fn queue_longest_run(&self, queue: usize) -> u32 {
        self.stealables.longest_run(queue)
    }

    /// Set once a reclamation pass has seen so many refusals that the
    /// caller should start shedding load on its own.
    #[inline]
    pub fn bypass_culling(&self) -> bool {
        self.bypass_culling
    }

    pub fn clear_bypass_culling(&mut self) {
        self.bypass_culling = false;
    }

    pub fn payload(&self, address: u32) -> &[u8] {
        let size = self.allocated_size(address);
        self.arena.bytes(address, size)
    }

    pub fn payload_mut(&mut self, address: u32) -> &mut [u8] {
        let size = self.allocated_size(address);
        self.arena.bytes_mut(address, size)
    }

    /// Tracked free spans, smallest first.
    pub fn empty_spaces(&self) -> &[EmptySpaceRecord] {
        self.empty_spaces.as_slice()
    }

    /// Walks every block from low to high address.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            region: self,
            header: self.arena.base() + TAG_SIZE,
        }
    }

    pub fn stats(&self) -> RegionStats {
        let mut stats = self.stats.clone();
        stats.free_bytes = self
            .blocks()
            .filter(|block| block.kind == BlockKind::Empty)
            .map(|block| block.size as u64)
            .sum();
        stats.empty_spaces = self.empty_spaces.len();
        stats.largest_empty_space = self.empty_spaces.last().map_or(0, |r| r.length);
        stats
    }

    /// Walks the whole arena and index looking for structural damage.
    pub fn check_consistency(&self) -> Result<(), IntegrityError> {
        let sentinel = BlockTag::sentinel().to_raw();
        for address in [self.arena.base(), self.limit()] {
            let raw = self.arena.read_raw(address);
            if raw != sentinel {
                return Err(IntegrityError::BadSentinel { address, raw });
            }
        }

        let limit = self.limit();
        let mut header = self.arena.base() + TAG_SIZE;
        while header < limit {
            let raw = self.arena.read_raw(header);
            let address = header + TAG_SIZE;
            if !BlockTag::is_valid_raw(raw) {
                return Err(IntegrityError::InvalidTag { address, raw });
            }

            let tag = BlockTag::from_raw(raw);
            let footer = address as u64 + tag.size as u64;
            if footer + TAG_SIZE as u64 > limit as u64 {
                return Err(IntegrityError::Overrun {
                    address,
                    size: tag.size,
                });
            }

            let footer_raw = self.arena.read_raw(footer as u32);
            if footer_raw != raw {
                return Err(IntegrityError::TagMismatch {
                    address,
                    header: raw,
                    footer: footer_raw,
                });
            }
            header = footer as u32 + TAG_SIZE;
        }

        let records = self.empty_spaces.as_slice();
        if let Some(i) = records.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(IntegrityError::IndexUnsorted { index: i + 1 });
        }

        for record in records {
            let stale = IntegrityError::StaleRecord {
                address: record.address,
                length: record.length,
            };
            let in_bounds = self.contains(record.address)
                && record.address as u64 + record.length as u64 + TAG_SIZE as u64 <= limit as u64;
            if !in_bounds {
                return Err(stale);
            }
            let expected = BlockTag::empty(record.length).to_raw();
            if self.arena.read_raw(record.address - TAG_SIZE) != expected
                || self.arena.read_raw(record.address + record.length) != expected
            {
                return Err(stale);
            }
        }

        for address in self.stealables.addresses() {
            if !self.contains(address) || self.header_of(address).kind != BlockKind::Stealable {
                return Err(IntegrityError::OrphanedStealable { address });
            }
        }

        Ok(())
    }

    /// Fails if any byte of `address..address + size` lies in a tracked free
    /// span.
    pub fn verify_memory_not_free(&self, address: u32, size: u32) -> Result<(), IntegrityError> {
        let end = address as u64 + size as u64;
        for record in self.empty_spaces.iter() {
            let free_end = record.address as u64 + record.length as u64;
            if (address as u64) < free_end && (record.address as u64) < end {
                return Err(IntegrityError::OverlapsFreeSpace {
                    address,
                    size,
                    free: record.address,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("name", &self.name)
            .field("arena", &self.arena)
            .field("empty_spaces", &self.empty_spaces.len())
            .field("stealables", &self.stealables.len())
            .finish()
    }
}

/// Iterator over the blocks of a region, see [`MemoryRegion::blocks`].
pub struct Blocks<'a> {
    region: &'a MemoryRegion,
    header: u32,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let limit = self.region.limit();
        if self.header >= limit {
            return None;
        }

        let tag = self.region.arena.read_tag(self.header);
        let address = self.header + TAG_SIZE;
        let footer = address as u64 + tag.size as u64;
        if footer + TAG_SIZE as u64 > limit as u64 {
            // Damaged arena, stop rather than read past the end.
            self.header = limit;
            return None;
        }

        self.header = footer as u32 + TAG_SIZE;
        Some(BlockInfo {
            address,
            kind: tag.kind,
            size: tag.size,
        })
    }
}
