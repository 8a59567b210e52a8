use std::{cell::Cell, rc::Rc};

use memregion::{
    AllocOptions, AllocatorConfig, ExcludeTarget, GeneralMemoryAllocator, ReclaimScope, RegionId,
    Stealable,
};

/// A cached chunk of something that can be reloaded later.
struct CachedChunk {
    name: &'static str,
    evicted: Rc<Cell<u32>>,
}

impl Stealable for CachedChunk {
    fn may_be_stolen(&self, _exclude: Option<ExcludeTarget>) -> bool {
        true
    }

    fn appropriate_queue(&self) -> usize {
        0
    }

    fn steal(&mut self, tag: &'static str, scope: &mut ReclaimScope<'_>) {
        println!("Evicting {} from {} ({tag})", self.name, scope.region_name());
        self.evicted.set(self.evicted.get() + 1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .init();

    let mut config = AllocatorConfig::default();
    config.external.size = 64 * 1024;
    let mut gma = GeneralMemoryAllocator::new(&config).unwrap();

    let a = gma.alloc(1000, AllocOptions::new()).unwrap();
    println!("Requested 1000 bytes, received {} at {:#010x}", a.size, a.address);

    let fast = gma.alloc(256, AllocOptions::new().on_chip()).unwrap();
    println!("On chip: {} bytes at {:#010x}", fast.size, fast.address);

    gma.payload_mut(a.address).unwrap()[..5].copy_from_slice(b"hello");
    let kept = gma.shorten_right(a.address, 100).unwrap();
    println!("Shortened to {kept}, payload starts with {:?}", &gma.payload(a.address).unwrap()[..5]);

    // Fill the rest of the external region with evictable chunks.
    let evicted = Rc::new(Cell::new(0));
    let names = ["alpha", "beta", "gamma", "delta"];
    for name in names {
        let evicted = evicted.clone();
        gma.alloc_stealable(14 * 1024, AllocOptions::new(), move |_| {
            Box::new(CachedChunk { name, evicted })
        })
        .unwrap();
    }

    let big = gma.alloc(20 * 1024, AllocOptions::new()).unwrap();
    println!(
        "Got {} bytes at {:#010x} after {} evictions",
        big.size,
        big.address,
        evicted.get()
    );

    println!("External: {}", gma.stats(RegionId::External).summary());
    println!("Internal: {}", gma.stats(RegionId::Internal).summary());

    gma.dealloc(big.address).unwrap();
    gma.dealloc(fast.address).unwrap();
    gma.dealloc(a.address).unwrap();
    gma.check_consistency().unwrap();
}
