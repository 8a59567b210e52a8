//! Reclaiming stealable memory.
//!
//! Two entry points build on one neighbour walk:
//!
//! * growing a block in place into free and stealable neighbours
//!   ([`MemoryRegion::extend`] and reclamation around a stolen block), and
//! * [`MemoryRegion::free_some_stealable_memory`], which scans the stealable
//!   queues for a block, alone or together with its neighbours, large
//!   enough to satisfy an allocation.
//!
//! Every grab runs twice. The planning pass only reads (and stamps traversal
//! numbers) and decides whether enough memory is reachable. Only then does
//! the commit pass unlink free spans and steal objects. A failed plan
//! therefore leaves the region untouched.

use std::ops::Range;

use tracing::{debug, warn};

use crate::{
    block::{BLOCK_OVERHEAD, BlockKind, BlockTag, TAG_SIZE},
    empty_space::EmptySpaceRecord,
    region::MemoryRegion,
    stealable::ExcludeTarget,
};

/// Refusals in one pass after which callers are told to shed load.
const REFUSAL_LIMIT: u32 = 512;

/// Objects whose queue is re-checked per pass.
const MAX_REASSESSMENTS: u32 = 4;

/// A block and how much its neighbours should give up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrabTarget {
    pub address: u32,
    pub size: u32,
    pub kind: BlockKind,
    pub min: u32,
    pub ideal: u32,
    pub exclude: Option<ExcludeTarget>,
    /// The target is itself a stealable that must be reclaimed first.
    pub steal_original: bool,
}

/// Outcome of a planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GrabPlan {
    pub found: u32,
    pub enough: bool,
    /// Contiguous bytes reachable around the target, target included.
    pub longest_run: u32,
}

/// Memory actually taken by a commit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grabbed {
    /// Payload address of the combined run.
    pub address: u32,
    pub right: u32,
    pub left: u32,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    Plan { mark: Option<u32> },
    Commit,
}

impl MemoryRegion {
    /// Walks outwards from the target, free neighbours before stealable
    /// ones, until `ideal` bytes are found or both sides hit a wall.
    ///
    /// After every grab made while stealing, the walk starts over without
    /// stealing, so free space exposed on the far side is always preferred.
    fn walk_neighbours(&mut self, target: &GrabTarget, pass: Pass) -> (u32, Grabbed) {
        let commit = matches!(pass, Pass::Commit);
        let mut found = 0u32;
        let mut grabbed = Grabbed {
            address: target.address,
            right: 0,
            left: 0,
        };
        let mut right_header = target.address + target.size + TAG_SIZE;
        let mut left_footer = target.address - BLOCK_OVERHEAD;

        'explore: loop {
            for stealing in [false, true] {
                if stealing && found >= target.ideal {
                    break 'explore;
                }

                for side in [Side::Right, Side::Left] {
                    let at = match side {
                        Side::Right => right_header,
                        Side::Left => left_footer,
                    };
                    let tag = self.arena.read_tag(at);
                    if tag.kind == BlockKind::Allocated {
                        continue;
                    }

                    let block = match side {
                        Side::Right => at + TAG_SIZE,
                        Side::Left => at - tag.size,
                    };

                    if tag.kind == BlockKind::Stealable {
                        if !stealing {
                            continue;
                        }
                        let willing = self
                            .stealables
                            .get(block)
                            .is_some_and(|object| object.may_be_stolen(target.exclude));
                        if !willing {
                            continue;
                        }
                        if let Pass::Plan { mark: Some(traversal_no) } = pass {
                            self.stealables.set_last_traversal_no(block, traversal_no);
                        }
                    }

                    let span = tag.size + BLOCK_OVERHEAD;
                    found += span;
                    match side {
                        Side::Right => right_header += span,
                        Side::Left => left_footer -= span,
                    }

                    if commit {
                        if tag.kind == BlockKind::Empty {
                            self.empty_spaces
                                .delete_at_key_exact(&EmptySpaceRecord::new(tag.size, block));
                        } else {
                            // Wall off what we hold so far before handing
                            // control to the owner.
                            let held = target.size + grabbed.left + grabbed.right;
                            self.write_tags(grabbed.address, BlockTag::new(BlockKind::Allocated, held));
                            let claimed = grabbed.address.min(block)
                                ..(grabbed.address + held).max(block + tag.size);
                            self.steal_block(block, claimed, "grab-neighbour");
                        }

                        match side {
                            Side::Right => grabbed.right += span,
                            Side::Left => {
                                grabbed.left += span;
                                grabbed.address = block;
                            }
                        }
                    }

                    if found >= target.ideal {
                        break 'explore;
                    }
                    if stealing {
                        continue 'explore;
                    }
                }
            }
            break;
        }

        (found, grabbed)
    }

    /// Dry run. Nothing but traversal stamps (with `mark`) changes.
    pub(crate) fn plan_grab(&mut self, target: &GrabTarget, mark: Option<u32>) -> GrabPlan {
        let (found, _) = self.walk_neighbours(target, Pass::Plan { mark });
        GrabPlan {
            found,
            enough: found >= target.min,
            longest_run: target.size + found,
        }
    }

    /// Takes the memory a successful plan promised. Returns `None`, with all
    /// claimed memory handed back as free space, if owners reacting to being
    /// stolen changed the neighbourhood so much that `min` is out of reach.
    pub(crate) fn commit_grab(&mut self, target: &GrabTarget) -> Option<Grabbed> {
        if target.steal_original {
            self.steal_block(
                target.address,
                target.address..target.address + target.size,
                "reclaim",
            );
        }

        let (found, grabbed) = self.walk_neighbours(target, Pass::Commit);
        if found >= target.min {
            return Some(grabbed);
        }

        warn!(
            region = %self.name,
            address = target.address,
            found,
            min = target.min,
            "neighbourhood shrank while stealing"
        );

        if target.steal_original {
            let total = target.size + grabbed.left + grabbed.right;
            self.mark_space_as_empty(grabbed.address, total as i64, true, true);
        } else {
            self.write_tags(target.address, BlockTag::new(target.kind, target.size));
            if grabbed.right > 0 {
                self.mark_space_as_empty(
                    target.address + target.size + BLOCK_OVERHEAD,
                    grabbed.right as i64 - BLOCK_OVERHEAD as i64,
                    false,
                    true,
                );
            }
            if grabbed.left > 0 {
                self.mark_space_as_empty(
                    grabbed.address,
                    grabbed.left as i64 - BLOCK_OVERHEAD as i64,
                    true,
                    false,
                );
            }
        }
        None
    }

    /// Plan then commit. On failure, the longest run found is returned.
    pub(crate) fn grab_neighbouring_memory(
        &mut self,
        target: &GrabTarget,
        mark: Option<u32>,
    ) -> Result<Grabbed, u32> {
        let plan = self.plan_grab(target, mark);
        if !plan.enough {
            return Err(plan.longest_run);
        }
        self.commit_grab(target).ok_or(plan.longest_run)
    }

    /// Unregisters the stealable at `address`, lets it react and drops it.
    /// Blocks in `claimed` are off limits to the owner meanwhile.
    pub(crate) fn steal_block(&mut self, address: u32, claimed: Range<u32>, tag: &'static str) {
        let Some(mut object) = self.stealables.take(address) else {
            return;
        };

        debug!(region = %self.name, address, tag, "stealing");
        {
            let mut scope = ReclaimScope {
                region: self,
                claimed,
            };
            object.steal(tag, &mut scope);
        }
        drop(object);
        self.stats.record_steal();
    }

    /// Reclaims at least `total_needed` contiguous bytes from stealable
    /// objects, scanning the queues in order. Returns the payload address
    /// and size of the reclaimed run, whose tags the caller must rewrite.
    ///
    /// A candidate too small on its own is combined with free and willing
    /// stealable neighbours. Objects already considered as somebody's
    /// neighbour are skipped for the rest of the pass, and each queue
    /// remembers the longest run it could offer so later passes can skip it
    /// outright.
    pub(crate) fn free_some_stealable_memory(
        &mut self,
        total_needed: u32,
        exclude: Option<ExcludeTarget>,
    ) -> Option<(u32, u32)> {
        let num_queues = self.stealables.num_queues();
        let before = self.stealables.current_traversal_no.wrapping_add(1);
        self.stealables.current_traversal_no = before.wrapping_add(num_queues as u32);

        let mut reassessed = 0;
        let mut refused = 0;

        for queue in 0..num_queues {
            let traversal_no = before.wrapping_add(queue as u32);
            if self.stealables.longest_run(queue) < total_needed {
                continue;
            }

            let mut longest_seen = 0;
            let mut interrupted = false;
            let mut cursor = self.stealables.first_in(queue);

            while let Some(address) = cursor {
                cursor = self.stealables.next_of(address);

                let last_queue = self
                    .stealables
                    .last_traversal_no(address)
                    .map_or(u32::MAX, |no| no.wrapping_sub(before)) as usize;
                if last_queue <= queue {
                    // Already weighed this pass as someone's neighbour.
                    if last_queue < queue {
                        longest_seen = longest_seen.max(self.stealables.longest_run(last_queue));
                    }
                    continue;
                }

                let willing = self
                    .stealables
                    .get(address)
                    .is_some_and(|object| object.may_be_stolen(exclude));
                if !willing {
                    // What others could get here still counts towards the
                    // watermark, the refusal may be specific to `exclude`.
                    longest_seen = longest_seen.max(self.run_around(address, total_needed));
                    refused += 1;
                    self.stats.record_refusal();
                    if refused >= REFUSAL_LIMIT && !self.bypass_culling {
                        warn!(region = %self.name, refused, "stealables keep refusing, bypassing culling");
                        self.bypass_culling = true;
                    }
                    continue;
                }

                if queue + 1 < num_queues && reassessed < MAX_REASSESSMENTS {
                    reassessed += 1;
                    let appropriate = self
                        .stealables
                        .get(address)
                        .map_or(queue, |object| self.stealables.clamp_queue(object.appropriate_queue()));
                    if appropriate > queue {
                        debug!(region = %self.name, address, from = queue, to = appropriate, "requeueing stealable");
                        self.stealables.queue(address, appropriate);
                        continue;
                    }
                }

                self.stealables.set_last_traversal_no(address, traversal_no);
                let size = self.allocated_size(address);

                if size >= total_needed {
                    self.steal_block(address, address..address + size, "reclaim");
                    return Some((address, size));
                }

                let amount = total_needed - size;
                let target = GrabTarget {
                    address,
                    size,
                    kind: BlockKind::Stealable,
                    min: amount,
                    ideal: amount,
                    exclude,
                    steal_original: true,
                };
                let plan = self.plan_grab(&target, Some(traversal_no));
                if !plan.enough {
                    longest_seen = longest_seen.max(plan.longest_run);
                    continue;
                }

                match self.commit_grab(&target) {
                    Some(grabbed) => {
                        return Some((grabbed.address, size + grabbed.left + grabbed.right));
                    }
                    None => {
                        // The owners may have reshuffled this queue, so its
                        // links are stale. Move on to the next one.
                        interrupted = true;
                        break;
                    }
                }
            }

            let watermark = if interrupted { u32::MAX } else { longest_seen };
            self.stealables.set_longest_run(queue, watermark);
        }

        None
    }

    /// Contiguous bytes a request made on nobody's behalf could reclaim
    /// around the stealable at `address`, looking no further than `needed`.
    fn run_around(&mut self, address: u32, needed: u32) -> u32 {
        let size = self.allocated_size(address);
        if size >= needed {
            return size;
        }
        let target = GrabTarget {
            address,
            size,
            kind: BlockKind::Stealable,
            min: needed - size,
            ideal: needed - size,
            exclude: None,
            steal_original: true,
        };
        self.plan_grab(&target, None).longest_run
    }
}

/// What a stealable object may do to its region while being stolen.
///
/// Releasing and shrinking other blocks is allowed. Allocating is not, and
/// neither is touching the memory being reclaimed right now.
pub struct ReclaimScope<'a> {
    region: &'a mut MemoryRegion,
    claimed: Range<u32>,
}

impl ReclaimScope<'_> {
    pub fn region_name(&self) -> &str {
        self.region.name()
    }

    #[inline]
    fn is_claimed(&self, address: u32) -> bool {
        self.claimed.contains(&address)
    }

    pub fn allocated_size(&self, address: u32) -> u32 {
        self.region.allocated_size(address)
    }

    pub fn payload(&self, address: u32) -> &[u8] {
        self.region.payload(address)
    }

    /// See [`MemoryRegion::dealloc`]. Refused for memory being reclaimed.
    pub fn dealloc(&mut self, address: u32) -> bool {
        if self.is_claimed(address) {
            warn!(region = %self.region.name, address, "dealloc of memory being reclaimed");
            return false;
        }
        self.region.dealloc(address)
    }

    /// See [`MemoryRegion::shorten_right`].
    pub fn shorten_right(&mut self, address: u32, new_size: u32) -> u32 {
        if self.is_claimed(address) {
            return self.region.allocated_size(address);
        }
        self.region.shorten_right(address, new_size)
    }

    /// See [`MemoryRegion::shorten_left`].
    pub fn shorten_left(&mut self, address: u32, amount: u32, bytes_to_preserve: u32) -> u32 {
        if self.is_claimed(address) {
            return 0;
        }
        self.region.shorten_left(address, amount, bytes_to_preserve)
    }

    /// Takes another stealable out of its queue so no later pass considers
    /// it. It stays registered.
    pub fn remove_from_queue(&mut self, address: u32) -> bool {
        self.region.stealables.dequeue(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::Cell, rc::Rc};

    use crate::{
        AllocOptions, Stealable,
        config::{REGION_OVERHEAD, RegionConfig},
        stealable::tests::Dummy,
    };

    const BASE: u32 = 0x1000_0000;

    fn region(usable: u32) -> MemoryRegion {
        let config = RegionConfig::new("test", BASE, usable + REGION_OVERHEAD, 64);
        MemoryRegion::new(&config, 4).unwrap()
    }

    fn stealable(region: &mut MemoryRegion, size: u32, object: impl Stealable + 'static) -> u32 {
        let a = region.alloc(size, AllocOptions::new().stealable()).unwrap();
        region.register_stealable(a.address, Box::new(object)).unwrap();
        a.address
    }

    fn wall(region: &mut MemoryRegion) -> u32 {
        region.alloc(16, AllocOptions::new()).unwrap().address
    }

    #[test]
    fn plan_changes_nothing() {
        let mut region = region(1024);
        let a = region.alloc(100, AllocOptions::new()).unwrap().address;
        let s = stealable(&mut region, 100, Dummy::new(0));
        wall(&mut region);
        let before: Vec<_> = region.blocks().collect();

        let target = GrabTarget {
            address: a,
            size: 100,
            kind: BlockKind::Allocated,
            min: 108,
            ideal: 108,
            exclude: None,
            steal_original: false,
        };
        let plan = region.plan_grab(&target, None);

        assert!(plan.enough);
        assert_eq!(plan.found, 108);
        assert_eq!(region.blocks().collect::<Vec<_>>(), before);
        assert!(region.stealables.contains(s));
    }

    #[test]
    fn free_neighbours_are_taken_before_stealing() {
        let mut region = region(1024);
        wall(&mut region);
        let free_left = region.alloc(40, AllocOptions::new()).unwrap().address;
        let a = region.alloc(100, AllocOptions::new()).unwrap().address;
        let dummy = Dummy::new(0);
        let steals = dummy.steals.clone();
        stealable(&mut region, 100, dummy);
        wall(&mut region);
        region.dealloc(free_left);

        let ext = region.extend(a, 48, 48, None);

        assert_eq!(ext.left, 48);
        assert_eq!(ext.right, 0);
        assert_eq!(steals.get(), 0);
        region.check_consistency().unwrap();
    }

    #[test]
    fn commit_failure_leaves_region_consistent() {
        let mut region = region(1024);
        let a = region.alloc(100, AllocOptions::new()).unwrap().address;
        let s = stealable(&mut region, 100, Dummy::new(0));
        wall(&mut region);

        // Plan sees the stealable, but it is gone by the time we commit.
        let target = GrabTarget {
            address: a,
            size: 100,
            kind: BlockKind::Allocated,
            min: 108,
            ideal: 108,
            exclude: None,
            steal_original: false,
        };
        assert!(region.plan_grab(&target, None).enough);
        drop(region.stealables.take(s));

        assert_eq!(region.commit_grab(&target), None);
        assert_eq!(region.allocated_size(a), 100);
        assert_eq!(region.header_of(a).kind, BlockKind::Allocated);
        region.check_consistency().unwrap();
    }

    #[test]
    fn whole_stealable_satisfies_request() {
        let mut region = region(1024);
        let dummy = Dummy::new(0);
        let (steals, drops) = (dummy.steals.clone(), dummy.drops.clone());
        let s = stealable(&mut region, 1024, dummy);

        let a = region.alloc(50, AllocOptions::new()).unwrap();

        assert_eq!(a.address, s);
        assert_eq!(a.size, 52);
        assert_eq!((steals.get(), drops.get()), (1, 1));
        assert_eq!(region.stats().steals, 1);
        region.check_consistency().unwrap();
    }

    #[test]
    fn stealable_combines_with_free_neighbour() {
        let mut region = region(1024);
        let s = stealable(&mut region, 100, Dummy::new(0));
        let gap = region.alloc(100, AllocOptions::new()).unwrap().address;
        let _rest = region.alloc(808, AllocOptions::new()).unwrap();
        assert!(region.empty_spaces().is_empty());
        region.dealloc(gap);

        // Only 100 bytes free anywhere, so the stealable and its free
        // neighbour have to be merged.
        let a = region.alloc(200, AllocOptions::new()).unwrap();

        assert_eq!(a.address, s);
        assert_eq!(a.size, 208);
        region.check_consistency().unwrap();
    }

    #[test]
    fn refusal_is_respected() {
        let mut region = region(1024);
        let mut dummy = Dummy::new(0);
        dummy.stealable = false;
        let steals = dummy.steals.clone();
        stealable(&mut region, 1024, dummy);

        let err = region.alloc(50, AllocOptions::new()).unwrap_err();

        assert!(matches!(err, crate::AllocError::OutOfMemory { .. }));
        assert_eq!(steals.get(), 0);
        assert_eq!(region.stats().refused_thefts, 1);
    }

    struct Owned {
        owner: usize,
    }

    impl Stealable for Owned {
        fn may_be_stolen(&self, exclude: Option<ExcludeTarget>) -> bool {
            exclude != Some(ExcludeTarget(self.owner))
        }

        fn appropriate_queue(&self) -> usize {
            0
        }

        fn steal(&mut self, _tag: &'static str, _scope: &mut ReclaimScope<'_>) {}
    }

    #[test]
    fn exclude_target_protects_owner() {
        let mut region = region(1024);
        stealable(&mut region, 1024, Owned { owner: 7 });

        let options = AllocOptions::new().exclude(ExcludeTarget(7));
        assert!(region.alloc(50, options).is_err());

        let options = AllocOptions::new().exclude(ExcludeTarget(8));
        assert!(region.alloc(50, options).is_ok());
    }

    #[test]
    fn watermark_skips_hopeless_queue() {
        let mut region = region(1024);
        stealable(&mut region, 100, Dummy::new(0));
        wall(&mut region);
        stealable(&mut region, 100, Dummy::new(0));
        wall(&mut region);
        region.alloc(1024 - 2 * 108 - 2 * 24 - 8, AllocOptions::new()).unwrap();
        assert!(region.empty_spaces().is_empty());

        assert!(region.alloc(500, AllocOptions::new()).is_err());
        assert_eq!(region.queue_longest_run(0), 100);

        // Larger than the watermark: queue 0 is not even walked.
        let refused = region.stats().refused_thefts;
        assert!(region.alloc(400, AllocOptions::new()).is_err());
        assert_eq!(region.stats().refused_thefts, refused);
    }

    #[test]
    fn refusing_queue_is_skipped_once_known_hopeless() {
        let mut region = region(1024);
        let mut dummy = Dummy::new(0);
        dummy.stealable = false;
        stealable(&mut region, 100, dummy);
        region.alloc(1032 - 108 - 8, AllocOptions::new()).unwrap();
        assert!(region.empty_spaces().is_empty());

        assert!(region.alloc(500, AllocOptions::new()).is_err());
        assert_eq!(region.stats().refused_thefts, 1);
        assert_eq!(region.queue_longest_run(0), 100);

        for _ in 0..4 {
            assert!(region.alloc(500, AllocOptions::new()).is_err());
        }
        assert_eq!(region.stats().refused_thefts, 1);

        // Small enough to be worth asking again.
        assert!(region.alloc(64, AllocOptions::new()).is_err());
        assert_eq!(region.stats().refused_thefts, 2);
    }

    /// Counts how often it is asked whether it may be stolen.
    struct Counted {
        queue: usize,
        asked: Rc<Cell<u32>>,
    }

    impl Stealable for Counted {
        fn may_be_stolen(&self, _exclude: Option<ExcludeTarget>) -> bool {
            self.asked.set(self.asked.get() + 1);
            true
        }

        fn appropriate_queue(&self) -> usize {
            self.queue
        }

        fn steal(&mut self, _tag: &'static str, _scope: &mut ReclaimScope<'_>) {}
    }

    #[test]
    fn neighbour_weighed_earlier_in_pass_is_not_revisited() {
        let mut region = region(1024);
        let (first, second) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        stealable(&mut region, 100, Counted { queue: 0, asked: first.clone() });
        stealable(&mut region, 100, Counted { queue: 1, asked: second.clone() });
        wall(&mut region);
        region.alloc(1032 - 2 * 108 - 24 - 8, AllocOptions::new()).unwrap();
        assert!(region.empty_spaces().is_empty());

        assert!(region.alloc(300, AllocOptions::new()).is_err());

        // The second was only looked at as the first one's neighbour.
        assert_eq!((first.get(), second.get()), (1, 1));
        assert_eq!(region.queue_longest_run(0), 208);
        // Its queue inherits what was seen from the earlier one.
        assert_eq!(region.queue_longest_run(1), 208);

        assert!(region.alloc(300, AllocOptions::new()).is_err());
        assert_eq!((first.get(), second.get()), (1, 1));
    }

    /// Willing until told otherwise. Stealing it can turn another one
    /// unwilling.
    struct Switching {
        queue: usize,
        willing: Rc<Cell<bool>>,
        on_steal: Option<Rc<Cell<bool>>>,
    }

    impl Stealable for Switching {
        fn may_be_stolen(&self, _exclude: Option<ExcludeTarget>) -> bool {
            self.willing.get()
        }

        fn appropriate_queue(&self) -> usize {
            self.queue
        }

        fn steal(&mut self, _tag: &'static str, _scope: &mut ReclaimScope<'_>) {
            if let Some(other) = &self.on_steal {
                other.set(false);
            }
        }
    }

    #[test]
    fn failed_commit_moves_on_to_next_queue() {
        let mut region = region(1024);
        let second_willing = Rc::new(Cell::new(true));
        let first = stealable(
            &mut region,
            100,
            Switching {
                queue: 0,
                willing: Rc::new(Cell::new(true)),
                on_steal: Some(second_willing.clone()),
            },
        );
        let second = stealable(
            &mut region,
            100,
            Switching {
                queue: 1,
                willing: second_willing,
                on_steal: None,
            },
        );
        wall(&mut region);
        let third = stealable(
            &mut region,
            1032 - 2 * 108 - 24 - 8,
            Switching {
                queue: 2,
                willing: Rc::new(Cell::new(true)),
                on_steal: None,
            },
        );
        assert!(region.empty_spaces().is_empty());

        // The first plans to take the second along, but stealing it makes
        // the second refuse, so the commit falls short.
        let a = region.alloc(200, AllocOptions::new()).unwrap();

        assert_eq!(a.address, third);
        assert_eq!(a.size, 200);
        assert_eq!(region.header_of(first).kind, BlockKind::Empty);
        assert_eq!(region.allocated_size(first), 100);
        assert_eq!(region.stealable_queue(second), Some(1));
        assert_eq!(region.queue_longest_run(0), u32::MAX);
        region.check_consistency().unwrap();
    }

    #[test]
    fn requeued_stealable_still_reclaimed() {
        let mut region = region(1024);
        let s = stealable(&mut region, 1024, Dummy::new(2));
        region.put_stealable_in_queue(s, 0);
        assert_eq!(region.stealable_queue(s), Some(0));

        let a = region.alloc(50, AllocOptions::new()).unwrap();

        assert_eq!(a.address, s);
        assert_eq!(region.stats().steals, 1);
    }

    #[test]
    fn reassessment_moves_to_appropriate_queue() {
        let mut region = region(1024);
        let s = stealable(&mut region, 100, Dummy::new(3));
        region.put_stealable_in_queue(s, 0);
        wall(&mut region);
        region.alloc(1024 - 108 - 24 - 8, AllocOptions::new()).unwrap();

        assert!(region.alloc(500, AllocOptions::new()).is_err());
        assert_eq!(region.stealable_queue(s), Some(3));
    }

    #[test]
    fn many_refusals_set_bypass_flag() {
        // 600 blocks of 4 bytes fill the region exactly.
        let mut region = region(600 * 12 - 8);
        for _ in 0..600 {
            let mut dummy = Dummy::new(0);
            dummy.stealable = false;
            stealable(&mut region, 4, dummy);
        }
        assert!(region.empty_spaces().is_empty());

        assert!(region.alloc(64, AllocOptions::new()).is_err());
        assert!(region.bypass_culling());

        region.clear_bypass_culling();
        assert!(!region.bypass_culling());
    }

    /// Releases another block when stolen.
    struct Releaser {
        victim: u32,
        released: Rc<Cell<bool>>,
    }

    impl Stealable for Releaser {
        fn may_be_stolen(&self, _exclude: Option<ExcludeTarget>) -> bool {
            true
        }

        fn appropriate_queue(&self) -> usize {
            0
        }

        fn steal(&mut self, _tag: &'static str, scope: &mut ReclaimScope<'_>) {
            self.released.set(scope.dealloc(self.victim));
        }
    }

    #[test]
    fn steal_callback_may_release_others() {
        let mut region = region(1024);
        let victim = region.alloc(100, AllocOptions::new()).unwrap().address;
        wall(&mut region);
        let released = Rc::new(Cell::new(false));
        let s = stealable(
            &mut region,
            100,
            Releaser {
                victim,
                released: released.clone(),
            },
        );
        region.alloc(1024 - 2 * 108 - 24, AllocOptions::new()).unwrap();

        let a = region.alloc(100, AllocOptions::new()).unwrap();

        assert_eq!(a.address, s);
        assert!(released.get());
        assert_eq!(region.allocated_size(victim), 100);
        assert_eq!(region.header_of(victim).kind, BlockKind::Empty);
        region.check_consistency().unwrap();
    }

    #[test]
    fn steal_callback_cannot_release_claimed_memory() {
        let mut region = region(1024);
        let released = Rc::new(Cell::new(true));
        let s = region.alloc(1024, AllocOptions::new().stealable()).unwrap().address;
        region
            .register_stealable(
                s,
                Box::new(Releaser {
                    victim: s,
                    released: released.clone(),
                }),
            )
            .unwrap();

        let a = region.alloc(64, AllocOptions::new()).unwrap();

        assert_eq!(a.address, s);
        assert!(!released.get());
        region.check_consistency().unwrap();
    }
}
