use crate::{
    list::{List, Node, Nodes},
    reclaim::ReclaimScope,
};

/// Opaque token naming the client a request is made on behalf of.
///
/// Stealable objects compare it against whatever they belong to and refuse
/// to be reclaimed for their own owner, so that e.g. growing a sample cache
/// never evicts another piece of that same sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExcludeTarget(pub usize);

/// An allocation whose memory the allocator may take back at any time.
///
/// The object itself lives outside the arena, in the region's registry, and
/// describes the block it was registered for. Reclaiming goes like this:
/// the object is unlinked from its queue, [`Stealable::steal`] runs, and the
/// object is dropped. Its `Drop` impl is the last thing it gets to run.
///
/// If the owner deallocates a stealable block itself, the object is dropped
/// without `steal` being called.
pub trait Stealable {
    /// Whether the allocator may reclaim this object while serving a request
    /// made on behalf of `exclude`. `None` means no particular client.
    fn may_be_stolen(&self, exclude: Option<ExcludeTarget>) -> bool;

    /// Queue this object should live in. Lower queues are reclaimed first.
    /// Values past the last queue are clamped to it.
    fn appropriate_queue(&self) -> usize;

    /// Tells the owner its memory is being taken.
    ///
    /// `tag` is a short diagnostic string identifying the call site. The
    /// scope gives restricted access to the region: the object may release
    /// or shrink *other* blocks but can never allocate.
    fn steal(&mut self, tag: &'static str, scope: &mut ReclaimScope<'_>);
}

pub(crate) struct Entry {
    pub object: Box<dyn Stealable>,
    pub queue: Option<usize>,
    /// Reclamation pass that last considered this entry.
    pub last_traversal_no: u32,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("queue", &self.queue)
            .field("last_traversal_no", &self.last_traversal_no)
            .finish_non_exhaustive()
    }
}

/// Side table of the stealable objects of one region, keyed by payload
/// address, plus the reclamation queues threaded through it.
///
/// Each queue carries a watermark: the longest contiguous run the last full
/// reclamation pass found reachable from that queue. A request larger than
/// the watermark skips the queue entirely. Filing anything into a queue
/// resets its watermark to "unknown".
#[derive(Debug)]
pub(crate) struct StealableRegistry {
    entries: Nodes<Entry>,
    queues: Vec<List>,
    longest_runs: Vec<u32>,
    pub current_traversal_no: u32,
}

impl StealableRegistry {
    pub fn new(num_queues: usize) -> Self {
        Self {
            entries: Nodes::new(),
            queues: (0..num_queues).map(|_| List::new()).collect(),
            longest_runs: vec![u32::MAX; num_queues],
            current_traversal_no: 0,
        }
    }

    #[inline]
    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        self.entries.contains_key(&address)
    }

    pub fn get(&self, address: u32) -> Option<&dyn Stealable> {
        self.entries.get(&address).map(|node| node.data.object.as_ref())
    }

    pub fn addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Registers `object` for the block at `address`, not yet queued. Any
    /// object previously registered there is returned.
    pub fn register(&mut self, address: u32, object: Box<dyn Stealable>) -> Option<Box<dyn Stealable>> {
        let previous = self.take(address);
        let entry = Entry {
            object,
            queue: None,
            // Anything below the next pass's starting number counts as
            // "not seen this pass".
            last_traversal_no: self.current_traversal_no,
        };
        self.entries.insert(address, Node::new(entry));
        previous
    }

    #[inline]
    pub fn clamp_queue(&self, queue: usize) -> usize {
        queue.min(self.queues.len().saturating_sub(1))
    }

    /// Files the entry at `address` at the end of `queue`, unlinking it from
    /// wherever it was.
    pub fn queue(&mut self, address: u32, queue: usize) -> bool {
        let queue = self.clamp_queue(queue);
        if !self.dequeue(address) && !self.contains(address) {
            return false;
        }

        self.queues[queue].append(address, &mut self.entries);
        if let Some(node) = self.entries.get_mut(&address) {
            node.data.queue = Some(queue);
        }
        self.longest_runs[queue] = u32::MAX;
        true
    }

    pub fn queue_appropriately(&mut self, address: u32) -> bool {
        match self.get(address).map(|object| object.appropriate_queue()) {
            Some(queue) => self.queue(address, queue),
            None => false,
        }
    }

    /// Unlinks the entry from its queue but keeps it registered. Returns
    /// whether it was queued.
    pub fn dequeue(&mut self, address: u32) -> bool {
        let Some(queue) = self.entries.get(&address).and_then(|n| n.data.queue) else {
            return false;
        };
        self.queues[queue].remove(address, &mut self.entries);
        if let Some(node) = self.entries.get_mut(&address) {
            node.data.queue = None;
        }
        true
    }

    /// Unlinks and removes the entry, handing the object back.
    pub fn take(&mut self, address: u32) -> Option<Box<dyn Stealable>> {
        self.dequeue(address);
        self.entries.remove(&address).map(|node| node.data.object)
    }

    /// Moves the entry to a new payload address, keeping its place in its
    /// queue.
    pub fn relocate(&mut self, from: u32, to: u32) {
        if from == to || !self.contains(from) {
            return;
        }

        match self.queue_of(from) {
            Some(queue) => self.queues[queue].rekey(from, to, &mut self.entries),
            None => {
                if let Some(node) = self.entries.remove(&from) {
                    self.entries.insert(to, node);
                }
            }
        }
    }

    #[inline]
    pub fn queue_of(&self, address: u32) -> Option<usize> {
        self.entries.get(&address).and_then(|n| n.data.queue)
    }

    #[inline]
    pub fn first_in(&self, queue: usize) -> Option<u32> {
        self.queues.get(queue).and_then(List::first)
    }

    #[inline]
    pub fn next_of(&self, address: u32) -> Option<u32> {
        List::next(address, &self.entries)
    }

    pub fn queued(&self, queue: usize) -> Vec<u32> {
        self.queues
            .get(queue)
            .map(|list| list.iter(&self.entries).map(|(address, _)| address).collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn last_traversal_no(&self, address: u32) -> Option<u32> {
        self.entries.get(&address).map(|n| n.data.last_traversal_no)
    }

    pub fn set_last_traversal_no(&mut self, address: u32, traversal_no: u32) {
        if let Some(node) = self.entries.get_mut(&address) {
            node.data.last_traversal_no = traversal_no;
        }
    }

    #[inline]
    pub fn longest_run(&self, queue: usize) -> u32 {
        self.longest_runs.get(queue).copied().unwrap_or(0)
    }

    #[inline]
    pub fn set_longest_run(&mut self, queue: usize, run: u32) {
        if let Some(slot) = self.longest_runs.get_mut(queue) {
            *slot = run;
        }
    }
}
