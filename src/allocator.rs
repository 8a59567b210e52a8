use tracing::debug;

use crate::{
    config::AllocatorConfig,
    error::{AllocError, ConfigError, IntegrityError},
    region::{AllocOptions, Allocation, Extension, MemoryRegion},
    stats::RegionStats,
    stealable::{ExcludeTarget, Stealable},
};

/// Names one of the two regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    /// Small and fast. Only used by requests that opt in.
    Internal,
    /// Large. Every request may land here.
    External,
}

impl RegionId {
    const fn index(self) -> usize {
        match self {
            RegionId::Internal => 0,
            RegionId::External => 1,
        }
    }
}

/// Set while an operation runs, cleared on drop.
struct LockGuard<'a> {
    lock: &'a mut bool,
}

impl<'a> LockGuard<'a> {
    fn acquire(lock: &'a mut bool) -> Result<Self, AllocError> {
        if *lock {
            return Err(AllocError::Busy);
        }
        *lock = true;
        Ok(Self { lock })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        *self.lock = false;
    }
}

/// Front end over an internal and an external [`MemoryRegion`].
///
/// Requests that allow it try the internal region first and fall back to
/// the external one. Everything that takes an address is routed by
/// comparing it against the internal region's base: at or above goes
/// internal, below goes external.
///
/// Allocation and extension are guarded by a non-blocking lock: if one is
/// already running they fail with [`AllocError::Busy`] instead of waiting.
#[derive(Debug)]
pub struct GeneralMemoryAllocator {
    regions: [MemoryRegion; 2],
    lock: bool,
}

impl GeneralMemoryAllocator {
    pub fn new(config: &AllocatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let internal = MemoryRegion::new(&config.internal, config.num_queues)?;
        let external = MemoryRegion::new(&config.external, config.num_queues)?;

        debug!(
            internal = internal.usable_size(),
            external = external.usable_size(),
            "allocator ready"
        );
        Ok(Self {
            regions: [internal, external],
            lock: false,
        })
    }

    #[inline]
    pub fn region(&self, id: RegionId) -> &MemoryRegion {
        &self.regions[id.index()]
    }

    #[inline]
    pub fn region_mut(&mut self, id: RegionId) -> &mut MemoryRegion {
        &mut self.regions[id.index()]
    }

    /// Region an address would belong to, without checking it is inside.
    #[inline]
    pub fn region_id_for(&self, address: u32) -> RegionId {
        if address >= self.regions[RegionId::Internal.index()].base() {
            RegionId::Internal
        } else {
            RegionId::External
        }
    }

    fn routed(&self, address: u32) -> Result<RegionId, AllocError> {
        let id = self.region_id_for(address);
        if self.region(id).contains(address) {
            Ok(id)
        } else {
            Err(AllocError::UnknownAddress(address))
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock
    }

    /// Allocates at least `size` bytes. See [`MemoryRegion::alloc`].
    pub fn alloc(&mut self, size: u32, options: AllocOptions) -> Result<Allocation, AllocError> {
        let _guard = LockGuard::acquire(&mut self.lock)?;

        if options.on_chip {
            match self.regions[RegionId::Internal.index()].alloc(size, options) {
                Ok(allocation) => return Ok(allocation),
                Err(e) => debug!(size, error = %e, "falling back to external region"),
            }
        }

        self.regions[RegionId::External.index()].alloc(size, options)
    }

    /// Allocates a stealable block and registers the object built for it
    /// by `make`, which receives the block's address and size.
    pub fn alloc_stealable<F>(
        &mut self,
        size: u32,
        options: AllocOptions,
        make: F,
    ) -> Result<Allocation, AllocError>
    where
        F: FnOnce(Allocation) -> Box<dyn Stealable>,
    {
        let allocation = self.alloc(size, options.stealable())?;
        self.register_stealable(allocation.address, make(allocation))?;
        Ok(allocation)
    }

    pub fn dealloc(&mut self, address: u32) -> Result<(), AllocError> {
        let id = self.routed(address)?;
        if self.region_mut(id).dealloc(address) {
            Ok(())
        } else {
            Err(AllocError::UnknownAddress(address))
        }
    }

    pub fn allocated_size(&self, address: u32) -> Result<u32, AllocError> {
        let id = self.routed(address)?;
        Ok(self.region(id).allocated_size(address))
    }

    pub fn shorten_right(&mut self, address: u32, new_size: u32) -> Result<u32, AllocError> {
        let id = self.routed(address)?;
        Ok(self.region_mut(id).shorten_right(address, new_size))
    }

    pub fn shorten_left(
        &mut self,
        address: u32,
        amount: u32,
        bytes_to_preserve: u32,
    ) -> Result<u32, AllocError> {
        let id = self.routed(address)?;
        Ok(self.region_mut(id).shorten_left(address, amount, bytes_to_preserve))
    }

    pub fn extend_right_as_much_as_easily_possible(&mut self, address: u32) -> Result<u32, AllocError> {
        let id = self.routed(address)?;
        Ok(self
            .region_mut(id)
            .extend_right_as_much_as_easily_possible(address))
    }

    /// See [`MemoryRegion::extend`].
    pub fn extend(
        &mut self,
        address: u32,
        min_amount: u32,
        ideal_amount: u32,
        exclude: Option<ExcludeTarget>,
    ) -> Result<Extension, AllocError> {
        let id = self.routed(address)?;
        let _guard = LockGuard::acquire(&mut self.lock)?;
        Ok(self.regions[id.index()].extend(address, min_amount, ideal_amount, exclude))
    }

    pub fn register_stealable(
        &mut self,
        address: u32,
        object: Box<dyn Stealable>,
    ) -> Result<(), AllocError> {
        let id = self.routed(address)?;
        self.region_mut(id).register_stealable(address, object)
    }

    pub fn put_stealable_in_queue(&mut self, address: u32, queue: usize) -> Result<bool, AllocError> {
        let id = self.routed(address)?;
        Ok(self.region_mut(id).put_stealable_in_queue(address, queue))
    }

    pub fn put_stealable_in_appropriate_queue(&mut self, address: u32) -> Result<bool, AllocError> {
        let id = self.routed(address)?;
        Ok(self.region_mut(id).put_stealable_in_appropriate_queue(address))
    }

    pub fn payload(&self, address: u32) -> Result<&[u8], AllocError> {
        let id = self.routed(address)?;
        Ok(self.region(id).payload(address))
    }

    pub fn payload_mut(&mut self, address: u32) -> Result<&mut [u8], AllocError> {
        let id = self.routed(address)?;
        Ok(self.region_mut(id).payload_mut(address))
    }

    /// Whether either region saw too many refusals while reclaiming.
    pub fn bypass_culling(&self) -> bool {
        self.regions.iter().any(MemoryRegion::bypass_culling)
    }

    pub fn clear_bypass_culling(&mut self) {
        self.regions
            .iter_mut()
            .for_each(MemoryRegion::clear_bypass_culling);
    }

    pub fn stats(&self, id: RegionId) -> RegionStats {
        self.region(id).stats()
    }

    pub fn check_consistency(&self) -> Result<(), IntegrityError> {
        self.regions
            .iter()
            .try_for_each(MemoryRegion::check_consistency)
    }
}
