use std::ptr::NonNull;

use crate::{
    block::{BlockTag, TAG_SIZE},
    platform, utils,
};

/// A fixed window of bytes addressed by 32 bit region addresses.
///
/// The allocator never hands out raw pointers. Every address it deals with is
/// `base + offset` into the mapping owned here, which keeps tag arithmetic
/// bounds checked and lets regions live at the same addresses they would
/// occupy on the device.
pub(crate) struct Arena {
    /// Start of the mapping. Owned, returned to the kernel on drop.
    ptr: NonNull<u8>,
    /// Length of the mapping, a multiple of the page size.
    mapped: usize,
    /// Region address of the first byte.
    base: u32,
    /// Number of addressable bytes.
    size: u32,
}

impl Arena {
    /// Maps `size` zeroed bytes and exposes them at `base`. Returns `None`
    /// when the kernel refuses the mapping.
    pub fn new(base: u32, size: u32) -> Option<Self> {
        let mapped = utils::align(size as usize, platform::page_size());
        let ptr = unsafe { platform::request_memory(mapped)? };

        Some(Self {
            ptr,
            mapped,
            base,
            size,
        })
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// One past the last addressable byte.
    #[inline]
    pub fn end(&self) -> u32 {
        self.base + self.size
    }

    #[inline]
    fn offset(&self, address: u32) -> usize {
        debug_assert!(
            address >= self.base && address <= self.end(),
            "address {address:#010x} outside arena"
        );
        (address - self.base) as usize
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points to a live mapping of `mapped >= size` bytes
        // that only this arena references.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size as usize) }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: see `as_slice`, and we hold `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size as usize) }
    }

    pub fn read_raw(&self, address: u32) -> u32 {
        let offset = self.offset(address);
        let mut word = [0u8; TAG_SIZE as usize];
        word.copy_from_slice(&self.as_slice()[offset..offset + TAG_SIZE as usize]);
        u32::from_ne_bytes(word)
    }

    pub fn write_raw(&mut self, address: u32, value: u32) {
        let offset = self.offset(address);
        self.as_mut_slice()[offset..offset + TAG_SIZE as usize]
            .copy_from_slice(&value.to_ne_bytes());
    }

    #[inline]
    pub fn read_tag(&self, address: u32) -> BlockTag {
        BlockTag::from_raw(self.read_raw(address))
    }

    #[inline]
    pub fn write_tag(&mut self, address: u32, tag: BlockTag) {
        self.write_raw(address, tag.to_raw());
    }

    pub fn bytes(&self, address: u32, len: u32) -> &[u8] {
        let offset = self.offset(address);
        &self.as_slice()[offset..offset + len as usize]
    }

    pub fn bytes_mut(&mut self, address: u32, len: u32) -> &mut [u8] {
        let offset = self.offset(address);
        &mut self.as_mut_slice()[offset..offset + len as usize]
    }

    /// `memmove` semantics: the ranges may overlap.
    pub fn copy_within(&mut self, from: u32, to: u32, len: u32) {
        let src = self.offset(from);
        let dst = self.offset(to);
        self.as_mut_slice()
            .copy_within(src..src + len as usize, dst);
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { platform::return_memory(self.ptr, self.mapped) }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("base", &format_args!("{:#010x}", self.base))
            .field("size", &self.size)
            .field("mapped", &self.mapped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;

    #[test]
    fn tags_land_at_region_addresses() {
        let mut arena = Arena::new(0x1000_0000, 256).unwrap();
        assert_eq!(arena.end(), 0x1000_0100);

        arena.write_tag(0x1000_0004, BlockTag::new(BlockKind::Stealable, 40));
        assert_eq!(
            arena.read_tag(0x1000_0004),
            BlockTag::new(BlockKind::Stealable, 40)
        );
        assert_eq!(arena.read_raw(0x1000_0000), 0);
    }

    #[test]
    fn copy_within_handles_overlap() {
        let mut arena = Arena::new(0x2000, 64).unwrap();
        for (i, b) in arena.bytes_mut(0x2000, 16).iter_mut().enumerate() {
            *b = i as u8;
        }

        arena.copy_within(0x2000, 0x2004, 8);

        assert_eq!(arena.bytes(0x2004, 8), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(arena.bytes(0x2000, 4), &[0, 1, 2, 3]);
    }

    #[test]
    fn mapping_rounds_to_pages() {
        let arena = Arena::new(0, 10).unwrap();
        assert_eq!(arena.size(), 10);
        assert_eq!(arena.mapped % platform::page_size(), 0);
    }
}
