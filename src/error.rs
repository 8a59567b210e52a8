use thiserror::Error;

/// Errors returned by allocation entry points.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator is in the middle of another operation.
    #[error("allocator is busy")]
    Busy,

    /// Neither free space nor reclamation could produce the request.
    #[error("out of memory in region '{region}': requested {requested} bytes")]
    OutOfMemory { requested: u32, region: String },

    /// The address does not fall inside any region.
    #[error("address {0:#010x} does not belong to any region")]
    UnknownAddress(u32),

    /// A stealable object was registered for a block not allocated as
    /// stealable.
    #[error("block at {0:#010x} is not tagged stealable")]
    NotStealable(u32),
}

/// Errors raised while validating or applying a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("region '{name}' size {size} is outside {min}..={max}")]
    BadSize {
        name: String,
        size: u32,
        min: u32,
        max: u32,
    },

    #[error("region '{name}' base {base:#010x} is not 16 byte aligned")]
    Misaligned { name: String, base: u32 },

    #[error("region '{name}' wraps past the end of the address space")]
    Wraps { name: String },

    #[error("external region must lie entirely below the internal one")]
    Overlap,

    #[error("region '{name}' needs room for at least one empty space record")]
    NoIndexCapacity { name: String },

    #[error("at least one stealable queue is required")]
    NoQueues,

    #[error("could not map {size} bytes of backing memory for region '{name}'")]
    MappingFailed { name: String, size: u32 },
}

/// Structural damage found by a consistency check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("sentinel at {address:#010x} reads {raw:#010x}")]
    BadSentinel { address: u32, raw: u32 },

    #[error("tag at {address:#010x} uses the reserved type pattern ({raw:#010x})")]
    InvalidTag { address: u32, raw: u32 },

    #[error("block at {address:#010x}: header {header:#010x} differs from footer {footer:#010x}")]
    TagMismatch {
        address: u32,
        header: u32,
        footer: u32,
    },

    #[error("block at {address:#010x} of size {size} runs past the arena end")]
    Overrun { address: u32, size: u32 },

    #[error("empty space index not strictly ordered at position {index}")]
    IndexUnsorted { index: usize },

    #[error("index record ({length} bytes at {address:#010x}) does not match an empty block")]
    StaleRecord { address: u32, length: u32 },

    #[error("stealable object registered at {address:#010x} has no stealable block")]
    OrphanedStealable { address: u32 },

    #[error("range {address:#010x}+{size} overlaps free space at {free:#010x}")]
    OverlapsFreeSpace { address: u32, size: u32, free: u32 },
}
