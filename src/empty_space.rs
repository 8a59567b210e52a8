use std::ops::Range;

/// One free span: `length` payload bytes starting at region address
/// `address`.
///
/// Field order matters. The derived ordering compares `length` first and
/// `address` second, which is exactly the order the index keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmptySpaceRecord {
    pub length: u32,
    pub address: u32,
}

impl EmptySpaceRecord {
    pub const fn new(length: u32, address: u32) -> Self {
        Self { length, address }
    }
}

/// Ordered set of free spans, sorted ascending by `(length, address)`.
///
/// Capacity is fixed at construction and never grows. When it is full,
/// inserts fail softly: the span stays marked empty in the arena but can no
/// longer be found by allocation until a neighbouring release merges it
/// back in.
#[derive(Debug)]
pub struct EmptySpaceIndex {
    records: Vec<EmptySpaceRecord>,
    capacity: usize,
}

impl EmptySpaceIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&EmptySpaceRecord> {
        self.records.get(index)
    }

    #[inline]
    pub fn last(&self) -> Option<&EmptySpaceRecord> {
        self.records.last()
    }

    #[inline]
    pub fn as_slice(&self) -> &[EmptySpaceRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmptySpaceRecord> {
        self.records.iter()
    }

    /// Index of the first record whose length is at least `min_length`, or
    /// `len()` if there is none. This is the best-fit lookup.
    pub fn search(&self, min_length: u32) -> usize {
        self.records.partition_point(|r| r.length < min_length)
    }

    /// Lower bound of `key` within `range`.
    pub fn search_key(&self, key: &EmptySpaceRecord, range: Range<usize>) -> usize {
        let start = range.start;
        start + self.records[range].partition_point(|r| r < key)
    }

    /// Exact lookup restricted to indexes `from..`.
    pub fn search_exact_from(&self, key: &EmptySpaceRecord, from: usize) -> Option<usize> {
        let from = from.min(self.records.len());
        self.records[from..]
            .binary_search(key)
            .ok()
            .map(|i| from + i)
    }

    #[inline]
    pub fn search_exact(&self, key: &EmptySpaceRecord) -> Option<usize> {
        self.search_exact_from(key, 0)
    }

    /// Inserts `record` at its sorted position. Returns the position, or
    /// `None` when the index is full.
    pub fn insert(&mut self, record: EmptySpaceRecord) -> Option<usize> {
        if self.is_full() {
            return None;
        }

        let at = self.search_key(&record, 0..self.records.len());
        self.records.insert(at, record);
        Some(at)
    }

    pub fn delete_at_index(&mut self, index: usize) -> EmptySpaceRecord {
        self.records.remove(index)
    }

    /// Removes `record` if present, returning the index it occupied.
    pub fn delete_at_key_exact(&mut self, record: &EmptySpaceRecord) -> Option<usize> {
        let index = self.search_exact(record)?;
        self.records.remove(index);
        Some(index)
    }

    /// Moves the records in `begin..end` down by `distance` slots,
    /// overwriting whatever was there. The `distance` slots before `end`
    /// are left holding stale copies for the caller to fill.
    pub fn move_elements_left(&mut self, begin: usize, end: usize, distance: usize) {
        if begin < end {
            self.records.copy_within(begin..end, begin - distance);
        }
    }

    /// Moves the records in `begin..end` up by `distance` slots. The
    /// `distance` slots starting at `begin` are left for the caller to fill.
    pub fn move_elements_right(&mut self, begin: usize, end: usize, distance: usize) {
        if begin < end {
            self.records.copy_within(begin..end, begin + distance);
        }
    }

    /// Overwrites the record at `index` with `record` and slides it to its
    /// sorted position. Only the records it passes over are moved. Returns
    /// the final index.
    pub fn replace(&mut self, index: usize, record: EmptySpaceRecord) -> usize {
        let len = self.records.len();
        let mut index = index;

        if index + 1 < len && self.records[index + 1] < record {
            let insert_before = self.search_key(&record, index + 2..len);
            self.move_elements_left(index + 1, insert_before, 1);
            index = insert_before - 1;
        } else if index > 0 && self.records[index - 1] > record {
            let insert_at = self.search_key(&record, 0..index);
            self.move_elements_right(insert_at, index, 1);
            index = insert_at;
        }

        self.records[index] = record;
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(records: &[(u32, u32)]) -> EmptySpaceIndex {
        let mut index = EmptySpaceIndex::new(16);
        for &(length, address) in records {
            index.insert(EmptySpaceRecord::new(length, address)).unwrap();
        }
        index
    }

    fn pairs(index: &EmptySpaceIndex) -> Vec<(u32, u32)> {
        index.iter().map(|r| (r.length, r.address)).collect()
    }

    #[test]
    fn insert_keeps_length_then_address_order() {
        let index = index_of(&[(300, 10), (100, 50), (200, 30), (100, 20)]);
        assert_eq!(
            pairs(&index),
            vec![(100, 20), (100, 50), (200, 30), (300, 10)]
        );
    }

    #[test]
    fn search_finds_best_fit() {
        let index = index_of(&[(100, 0), (300, 1000), (200, 500)]);
        assert_eq!(index.search(150), 1);
        assert_eq!(index.get(1).unwrap().length, 200);
        assert_eq!(index.search(100), 0);
        assert_eq!(index.search(301), 3);
    }

    #[test]
    fn full_index_refuses_inserts() {
        let mut index = EmptySpaceIndex::new(2);
        assert!(index.insert(EmptySpaceRecord::new(4, 0)).is_some());
        assert!(index.insert(EmptySpaceRecord::new(8, 100)).is_some());
        assert!(index.is_full());
        assert_eq!(index.insert(EmptySpaceRecord::new(12, 200)), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn exact_delete() {
        let mut index = index_of(&[(100, 0), (100, 500), (200, 300)]);
        assert_eq!(
            index.delete_at_key_exact(&EmptySpaceRecord::new(100, 500)),
            Some(1)
        );
        assert_eq!(index.delete_at_key_exact(&EmptySpaceRecord::new(100, 500)), None);
        assert_eq!(pairs(&index), vec![(100, 0), (200, 300)]);
    }

    #[test]
    fn exact_search_from_skips_prefix() {
        let index = index_of(&[(4, 0), (8, 100), (12, 200)]);
        let key = EmptySpaceRecord::new(8, 100);
        assert_eq!(index.search_exact_from(&key, 0), Some(1));
        assert_eq!(index.search_exact_from(&key, 2), None);
        assert_eq!(index.search_exact_from(&key, 99), None);
    }

    #[test]
    fn replace_slides_growing_record_right() {
        let mut index = index_of(&[(10, 0), (20, 100), (30, 200), (40, 300)]);
        let at = index.replace(0, EmptySpaceRecord::new(35, 0));
        assert_eq!(at, 2);
        assert_eq!(pairs(&index), vec![(20, 100), (30, 200), (35, 0), (40, 300)]);
    }

    #[test]
    fn replace_slides_shrinking_record_left() {
        let mut index = index_of(&[(10, 0), (20, 100), (30, 200), (40, 300)]);
        let at = index.replace(3, EmptySpaceRecord::new(15, 312));
        assert_eq!(at, 1);
        assert_eq!(pairs(&index), vec![(10, 0), (15, 312), (20, 100), (30, 200)]);
    }

    #[test]
    fn replace_in_place_when_still_ordered() {
        let mut index = index_of(&[(10, 0), (20, 100), (30, 200)]);
        assert_eq!(index.replace(1, EmptySpaceRecord::new(24, 96)), 1);
        assert_eq!(pairs(&index), vec![(10, 0), (24, 96), (30, 200)]);
    }

    #[test]
    fn bulk_moves() {
        let mut index = index_of(&[(1, 0), (2, 0), (3, 0), (4, 0)]);
        index.move_elements_right(1, 3, 1);
        assert_eq!(pairs(&index), vec![(1, 0), (2, 0), (2, 0), (3, 0)]);
        index.move_elements_left(2, 4, 1);
        assert_eq!(pairs(&index), vec![(1, 0), (2, 0), (3, 0), (3, 0)]);
    }
}
