/// Size in bytes of one boundary tag. Every block carries two of them.
pub const TAG_SIZE: u32 = 4;

/// Header plus footer overhead of one block.
pub const BLOCK_OVERHEAD: u32 = 2 * TAG_SIZE;

/// Smallest payload ever handed out. Requests below this are rounded up.
pub const MIN_PAYLOAD: u32 = 4;

const TYPE_MASK: u32 = 0xC000_0000;
const SIZE_MASK: u32 = 0x3FFF_FFFF;

const TYPE_EMPTY: u32 = 0x0000_0000;
const TYPE_STEALABLE: u32 = 0x4000_0000;
const TYPE_ALLOCATED: u32 = 0x8000_0000;

/// Largest payload a tag can describe.
pub const MAX_PAYLOAD: u32 = SIZE_MASK;

/// What currently lives in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Free space, normally tracked by the empty space index.
    Empty,
    /// Allocated memory the allocator may reclaim under pressure.
    Stealable,
    /// Allocated memory owned by the caller until it is deallocated.
    Allocated,
}

impl BlockKind {
    const fn bits(self) -> u32 {
        match self {
            BlockKind::Empty => TYPE_EMPTY,
            BlockKind::Stealable => TYPE_STEALABLE,
            BlockKind::Allocated => TYPE_ALLOCATED,
        }
    }
}

/// The 4 byte boundary tag written both immediately before a payload (header)
/// and immediately after it (footer).
///
/// ```text
///  31 30 29                                              0
/// +-----+-------------------------------------------------+
/// |kind |                 payload size                    |
/// +-----+-------------------------------------------------+
/// ```
///
/// Header and footer of a live block are always bit-identical, which is what
/// lets a block find out about its neighbours in O(1): the left neighbour's
/// footer sits 8 bytes before our payload, the right neighbour's header 4
/// bytes after our footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTag {
    pub kind: BlockKind,
    pub size: u32,
}

impl BlockTag {
    pub const fn new(kind: BlockKind, size: u32) -> Self {
        Self { kind, size }
    }

    pub const fn empty(size: u32) -> Self {
        Self::new(BlockKind::Empty, size)
    }

    /// The tag written at both ends of an arena so that neighbour probes
    /// never walk off the edge.
    pub const fn sentinel() -> Self {
        Self::new(BlockKind::Allocated, 0)
    }

    /// Decodes a raw tag. The unused type pattern `0b11` reads as allocated,
    /// so that a corrupted tag acts as a wall rather than as free space.
    pub const fn from_raw(raw: u32) -> Self {
        let kind = match raw & TYPE_MASK {
            TYPE_EMPTY => BlockKind::Empty,
            TYPE_STEALABLE => BlockKind::Stealable,
            _ => BlockKind::Allocated,
        };
        Self { kind, size: raw & SIZE_MASK }
    }

    pub const fn to_raw(self) -> u32 {
        self.kind.bits() | (self.size & SIZE_MASK)
    }

    /// Whether `raw` uses one of the three defined type patterns.
    pub const fn is_valid_raw(raw: u32) -> bool {
        raw & TYPE_MASK != TYPE_MASK
    }
}

/// Rounds `size` up to the next 4 byte boundary.
#[inline]
pub(crate) fn word_align(size: u32) -> u32 {
    size.saturating_add(3) & !3
}

/// Rounds a payload request up to a whole number of words, with a floor of
/// [`MIN_PAYLOAD`].
#[inline]
pub(crate) fn pad_size(size: u32) -> u32 {
    word_align(size.max(MIN_PAYLOAD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_survive_encoding() {
        for kind in [BlockKind::Empty, BlockKind::Stealable, BlockKind::Allocated] {
            let tag = BlockTag::new(kind, 1234);
            assert_eq!(BlockTag::from_raw(tag.to_raw()), tag);
        }
    }

    #[test]
    fn reserved_pattern_reads_as_wall() {
        let raw = 0xC000_0010;
        assert!(!BlockTag::is_valid_raw(raw));
        assert_eq!(BlockTag::from_raw(raw).kind, BlockKind::Allocated);
        assert_eq!(BlockTag::from_raw(raw).size, 16);
    }

    #[test]
    fn empty_tag_is_plain_size() {
        assert_eq!(BlockTag::empty(100).to_raw(), 100);
        assert_eq!(BlockTag::sentinel().to_raw(), 0x8000_0000);
    }

    #[test]
    fn pad_rounds_to_words() {
        assert_eq!(pad_size(0), 4);
        assert_eq!(pad_size(1), 4);
        assert_eq!(pad_size(4), 4);
        assert_eq!(pad_size(5), 8);
        assert_eq!(pad_size(50), 52);
        assert_eq!(pad_size(100), 100);
        assert_eq!(word_align(0), 0);
        assert_eq!(word_align(13), 16);
    }
}
