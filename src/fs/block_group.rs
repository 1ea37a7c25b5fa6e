use bitvec::prelude::*;

/// the allocation bitmaps of the single block group
///
/// indices are absolute: bit `i` of `data_bitmap` is region block `i`,
/// bit `i` of `inode_bitmap` is inode `i`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Group {
    pub data_bitmap: BitVec<u8, Lsb0>,
    pub inode_bitmap: BitVec<u8, Lsb0>,
    next_inode: Option<usize>,
    next_data_block: Option<usize>,
}
/// for serialize and deserialize
impl Group {
    /// raw bytes of the inode bitmap, padding bits are always clear
    pub fn inode_bitmap_bytes(&self) -> &[u8] {
        self.inode_bitmap.as_raw_slice()
    }

    /// raw bytes of the data bitmap
    pub fn data_bitmap_bytes(&self) -> &[u8] {
        self.data_bitmap.as_raw_slice()
    }

    /// rebuild a group from raw bitmap bytes
    /// # Params
    /// - `inode_count`,`block_count`: how many bits of each slice are meaningful
    pub fn from_raw(
        inode_bytes: &[u8],
        data_bytes: &[u8],
        inode_count: usize,
        block_count: usize,
    ) -> Self {
        let mut inode_bitmap = BitVec::<u8, Lsb0>::from_slice(inode_bytes);
        inode_bitmap.truncate(inode_count);
        let mut data_bitmap = BitVec::<u8, Lsb0>::from_slice(data_bytes);
        data_bitmap.truncate(block_count);
        Group::new(inode_bitmap, data_bitmap)
    }
}
impl Group {
    pub fn new(inode_bitmap: BitVec<u8, Lsb0>, data_bitmap: BitVec<u8, Lsb0>) -> Self {
        let mut group = Group {
            inode_bitmap,
            data_bitmap,
            ..Default::default()
        };

        group.next_data_block = group.next_free_data_block();
        group.next_inode = group.next_free_inode();

        group
    }

    /// an empty group whose first `reserved_blocks` blocks are permanently in use
    pub fn with_reserved(inode_count: usize, block_count: usize, reserved_blocks: usize) -> Self {
        let inode_bitmap = BitVec::<u8, Lsb0>::repeat(false, inode_count);
        let mut data_bitmap = BitVec::<u8, Lsb0>::repeat(false, block_count);
        data_bitmap[..reserved_blocks.min(block_count)].fill(true);
        Group::new(inode_bitmap, data_bitmap)
    }
}
/// for inode and data block allocation
impl Group {
    /// check if inode exists
    /// # Params
    /// - `i`: inode index,start at 0
    pub fn has_inode(&self, i: usize) -> bool {
        self.inode_bitmap.get(i).as_deref().unwrap_or(&false) == &true
    }

    /// check if data block is in use
    /// # Params
    /// - `i`: absolute block index,start at 0
    pub fn has_data_block(&self, i: usize) -> bool {
        self.data_bitmap.get(i).as_deref().unwrap_or(&false) == &true
    }

    /// calculate the number of free inodes
    pub fn free_inodes(&self) -> usize {
        self.inode_bitmap.count_zeros()
    }

    /// calculate the number of free data blocks
    pub fn free_data_blocks(&self) -> usize {
        self.data_bitmap.count_zeros()
    }

    /// allocate a free inode
    pub fn allocate_inode(&mut self) -> Option<usize> {
        self.next_inode.map(|index| {
            self.inode_bitmap.set(index, true);
            self.next_inode = self.next_free_inode();
            index
        })
    }

    /// allocate a free data block
    pub fn allocate_data_block(&mut self) -> Option<usize> {
        self.next_data_block.map(|index| {
            self.data_bitmap.set(index, true);
            self.next_data_block = self.next_free_data_block();
            index
        })
    }

    /// release data block
    /// # Returns
    /// `false` if the block was already free
    pub fn release_data_block(&mut self, index: usize) -> bool {
        if !self.has_data_block(index) {
            return false;
        }
        self.data_bitmap.set(index, false);
        self.next_data_block = self.next_free_data_block();
        true
    }

    /// release inode
    /// # Returns
    /// `false` if the inode was already free
    pub fn release_inode(&mut self, index: usize) -> bool {
        if !self.has_inode(index) {
            return false;
        }
        self.inode_bitmap.set(index, false);
        self.next_inode = self.next_free_inode();
        true
    }

    // lowest clear bit, reserved system blocks are set so they are never handed out
    fn next_free_data_block(&self) -> Option<usize> {
        self.data_bitmap.first_zero()
    }

    fn next_free_inode(&self) -> Option<usize> {
        self.inode_bitmap.first_zero()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    // test `has_inode`
    #[test]
    fn test_has_inode() {
        let mut inode_bitmap = BitVec::<u8, Lsb0>::with_capacity(10);
        for _ in 0..10 {
            inode_bitmap.push(true);
        }
        let block_datamap = BitVec::<u8, Lsb0>::new();
        let group = super::Group::new(inode_bitmap, block_datamap);
        assert!(group.has_inode(0));
        assert!(group.has_inode(9));
        assert!(!group.has_inode(10));
    }

    // test reserved blocks are never allocated
    #[test]
    fn test_with_reserved() {
        let mut group = Group::with_reserved(4, 16, 5);
        assert!(group.has_data_block(4));
        assert!(!group.has_data_block(5));
        assert_eq!(group.free_data_blocks(), 11);
        assert_eq!(group.allocate_data_block(), Some(5));
        assert_eq!(group.free_inodes(), 4);
    }

    // test free space in the middle is found first
    #[test]
    fn test_allocate_reuses_lowest_hole() {
        let mut inode_bitmap = BitVec::<u8, Lsb0>::with_capacity(15);
        for _ in 0..15 {
            inode_bitmap.push(true);
        }
        inode_bitmap.set(9, false);
        inode_bitmap.set(12, false);
        let mut group = Group::new(inode_bitmap, BitVec::new());
        assert_eq!(group.allocate_inode(), Some(9));
        assert_eq!(group.allocate_inode(), Some(12));
        assert_eq!(group.allocate_inode(), None);
        assert!(group.release_inode(3));
        assert_eq!(group.allocate_inode(), Some(3));
    }

    // test exhausting data blocks
    #[test]
    fn test_allocate_data_block_until_full() {
        let mut group = Group::with_reserved(1, 4, 2);
        assert_eq!(group.allocate_data_block(), Some(2));
        assert_eq!(group.allocate_data_block(), Some(3));
        assert_eq!(group.allocate_data_block(), None);
        assert_eq!(group.free_data_blocks(), 0);
    }

    // test double release leaves the bitmap alone
    #[test]
    fn test_release_twice() {
        let mut group = Group::with_reserved(2, 8, 1);
        let block = group.allocate_data_block();
        assert_eq!(block, Some(1));
        assert!(group.release_data_block(1));
        assert!(!group.release_data_block(1));
        assert_eq!(group.free_data_blocks(), 7);
    }

    // test raw bytes survive a rebuild
    #[test]
    fn test_from_raw_roundtrip() {
        let mut group = Group::with_reserved(100, 1024, 28);
        group.allocate_inode();
        group.allocate_inode();
        group.allocate_data_block();
        let rebuilt = Group::from_raw(
            group.inode_bitmap_bytes(),
            group.data_bitmap_bytes(),
            100,
            1024,
        );
        assert_eq!(rebuilt, group);
        assert_eq!(rebuilt.inode_bitmap.len(), 100);
        assert_eq!(group.inode_bitmap_bytes().len(), 13);
        assert_eq!(group.data_bitmap_bytes().len(), 128);
    }
}
