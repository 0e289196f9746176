//! Byte-level layout of a single 4096-byte page.
//!
//! This module is pure: it only knows how to read and write fields at fixed
//! offsets inside a page buffer. It has no notion of a file, a cache, or a
//! tree, that's `pager.rs` and `btree.rs`.

use super::row::ROW_SIZE;
use crate::errors::{err, Error};

pub const PAGE_SIZE: usize = 4096;

/// Sentinel meaning "no such page", used for a fresh root's parent pointer
/// and for an internal node's right child before it has one.
pub const INVALID_PAGE_NUM: u32 = u32::MAX;

// Common header, present on every node.
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_OFFSET: usize = 1;
const PARENT_OFFSET: usize = 2;
const COMMON_HEADER_SIZE: usize = 6;

// Leaf header, follows the common header.
const LEAF_NUM_CELLS_OFFSET: usize = COMMON_HEADER_SIZE;
const LEAF_NEXT_LEAF_OFFSET: usize = LEAF_NUM_CELLS_OFFSET + 4;
const LEAF_HEADER_SIZE: usize = LEAF_NEXT_LEAF_OFFSET + 4;

const LEAF_KEY_SIZE: usize = 4;
pub const LEAF_CELL_SIZE: usize = LEAF_KEY_SIZE + ROW_SIZE;
const LEAF_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_HEADER_SIZE;
pub const LEAF_MAX_CELLS: usize = LEAF_SPACE_FOR_CELLS / LEAF_CELL_SIZE;

// Internal header, follows the common header.
const INTERNAL_NUM_KEYS_OFFSET: usize = COMMON_HEADER_SIZE;
const INTERNAL_RIGHT_CHILD_OFFSET: usize = INTERNAL_NUM_KEYS_OFFSET + 4;
const INTERNAL_HEADER_SIZE: usize = INTERNAL_RIGHT_CHILD_OFFSET + 4;

const INTERNAL_CHILD_SIZE: usize = 4;
const INTERNAL_KEY_SIZE: usize = 4;
const INTERNAL_CELL_SIZE: usize = INTERNAL_CHILD_SIZE + INTERNAL_KEY_SIZE;
const INTERNAL_SPACE_FOR_CELLS: usize = PAGE_SIZE - INTERNAL_HEADER_SIZE;
pub const INTERNAL_MAX_CELLS: usize = INTERNAL_SPACE_FOR_CELLS / INTERNAL_CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

#[derive(Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn zeroed() -> Self {
        Page {
            data: [0u8; PAGE_SIZE],
        }
    }

    // --- common header ---

    pub fn node_type(&self) -> Result<NodeType, Error> {
        match self.data[NODE_TYPE_OFFSET] {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => Err(err!(Storage, "invalid node type tag {}", other)),
        }
    }

    pub fn set_node_type(&mut self, ty: NodeType) {
        self.data[NODE_TYPE_OFFSET] = match ty {
            NodeType::Internal => 0,
            NodeType::Leaf => 1,
        };
    }

    pub fn is_root(&self) -> bool {
        self.data[IS_ROOT_OFFSET] != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.data[IS_ROOT_OFFSET] = is_root as u8;
    }

    pub fn parent(&self) -> u32 {
        read_u32(&self.data, PARENT_OFFSET)
    }

    pub fn set_parent(&mut self, parent: u32) {
        write_u32(&mut self.data, PARENT_OFFSET, parent);
    }

    /// For a leaf, the true max key in the node. For an internal node this
    /// is only its last keyed boundary, *not* the max key reachable through
    /// its `right_child` subtree; finding that requires following pages the
    /// way `btree::subtree_max_key` does. Callers that know they're holding
    /// a leaf (e.g. mid-split) can use this directly; anything that might
    /// be handed an internal node should go through `btree::subtree_max_key`
    /// instead.
    pub fn node_max_key(&self) -> Result<u32, Error> {
        match self.node_type()? {
            NodeType::Leaf => {
                let n = self.leaf_num_cells();
                if n == 0 {
                    return Err(err!(Storage, "max key requested of an empty leaf"));
                }
                self.leaf_key(n - 1)
            }
            NodeType::Internal => {
                let n = self.internal_num_keys();
                if n == 0 {
                    return Err(err!(Storage, "max key requested of a keyless internal node"));
                }
                self.internal_key(n - 1)
            }
        }
    }

    // --- leaf body ---

    pub fn init_leaf(&mut self) {
        self.data = [0u8; PAGE_SIZE];
        self.set_node_type(NodeType::Leaf);
        self.set_root(false);
        self.set_leaf_num_cells(0);
        self.set_leaf_next_leaf(0);
        self.set_parent(INVALID_PAGE_NUM);
    }

    pub fn leaf_num_cells(&self) -> u32 {
        read_u32(&self.data, LEAF_NUM_CELLS_OFFSET)
    }

    pub fn set_leaf_num_cells(&mut self, n: u32) {
        write_u32(&mut self.data, LEAF_NUM_CELLS_OFFSET, n);
    }

    /// 0 means "no sibling": page 0 can never legitimately be a sibling
    /// leaf, since a leaf only occupies page 0 while it is also the root.
    pub fn leaf_next_leaf(&self) -> u32 {
        read_u32(&self.data, LEAF_NEXT_LEAF_OFFSET)
    }

    pub fn set_leaf_next_leaf(&mut self, next: u32) {
        write_u32(&mut self.data, LEAF_NEXT_LEAF_OFFSET, next);
    }

    fn leaf_cell_offset(&self, cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= LEAF_MAX_CELLS {
            return Err(err!(
                Storage,
                "leaf cell {} exceeds capacity {}",
                cell_num,
                LEAF_MAX_CELLS
            ));
        }
        Ok(LEAF_HEADER_SIZE + cell_num as usize * LEAF_CELL_SIZE)
    }

    pub fn leaf_key(&self, cell_num: u32) -> Result<u32, Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        Ok(read_u32(&self.data, offset))
    }

    pub fn set_leaf_key(&mut self, cell_num: u32, key: u32) -> Result<(), Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        write_u32(&mut self.data, offset, key);
        Ok(())
    }

    pub fn leaf_value(&self, cell_num: u32) -> Result<&[u8; ROW_SIZE], Error> {
        let offset = self.leaf_cell_offset(cell_num)? + LEAF_KEY_SIZE;
        Ok(self.data[offset..offset + ROW_SIZE].try_into().unwrap())
    }

    pub fn set_leaf_value(&mut self, cell_num: u32, row: &[u8; ROW_SIZE]) -> Result<(), Error> {
        let offset = self.leaf_cell_offset(cell_num)? + LEAF_KEY_SIZE;
        self.data[offset..offset + ROW_SIZE].copy_from_slice(row);
        Ok(())
    }

    pub fn leaf_cell(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + LEAF_CELL_SIZE])
    }

    pub fn copy_leaf_cell_within(&mut self, from: u32, to: u32) -> Result<(), Error> {
        let src = self.leaf_cell_offset(from)?;
        let dst = self.leaf_cell_offset(to)?;
        self.data.copy_within(src..src + LEAF_CELL_SIZE, dst);
        Ok(())
    }

    // --- internal body ---

    pub fn init_internal(&mut self) {
        self.data = [0u8; PAGE_SIZE];
        self.set_node_type(NodeType::Internal);
        self.set_root(false);
        self.set_internal_num_keys(0);
        // 0 is a valid page number (the root), so an empty internal node must
        // mark its right child invalid rather than defaulting to page 0.
        self.set_internal_right_child(INVALID_PAGE_NUM);
        self.set_parent(INVALID_PAGE_NUM);
    }

    pub fn internal_num_keys(&self) -> u32 {
        read_u32(&self.data, INTERNAL_NUM_KEYS_OFFSET)
    }

    pub fn set_internal_num_keys(&mut self, n: u32) {
        write_u32(&mut self.data, INTERNAL_NUM_KEYS_OFFSET, n);
    }

    pub fn internal_right_child(&self) -> u32 {
        read_u32(&self.data, INTERNAL_RIGHT_CHILD_OFFSET)
    }

    pub fn set_internal_right_child(&mut self, page_num: u32) {
        write_u32(&mut self.data, INTERNAL_RIGHT_CHILD_OFFSET, page_num);
    }

    fn internal_cell_offset(&self, cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= INTERNAL_MAX_CELLS {
            return Err(err!(
                Storage,
                "internal cell {} exceeds capacity {}",
                cell_num,
                INTERNAL_MAX_CELLS
            ));
        }
        Ok(INTERNAL_HEADER_SIZE + cell_num as usize * INTERNAL_CELL_SIZE)
    }

    /// `child(i)` for `i == num_keys` returns the right child; `i > num_keys`
    /// is the fatal edge case called out in spec.md §4.2.
    pub fn internal_child(&self, i: u32) -> Result<u32, Error> {
        let num_keys = self.internal_num_keys();
        if i > num_keys {
            return Err(err!(
                Storage,
                "internal child index {} exceeds num_keys {}",
                i,
                num_keys
            ));
        }
        if i == num_keys {
            Ok(self.internal_right_child())
        } else {
            let offset = self.internal_cell_offset(i)?;
            Ok(read_u32(&self.data, offset))
        }
    }

    pub fn set_internal_child(&mut self, i: u32, page_num: u32) -> Result<(), Error> {
        let num_keys = self.internal_num_keys();
        if i > num_keys {
            return Err(err!(
                Storage,
                "internal child index {} exceeds num_keys {}",
                i,
                num_keys
            ));
        }
        if i == num_keys {
            self.set_internal_right_child(page_num);
        } else {
            let offset = self.internal_cell_offset(i)?;
            write_u32(&mut self.data, offset, page_num);
        }
        Ok(())
    }

    pub fn internal_key(&self, i: u32) -> Result<u32, Error> {
        let offset = self.internal_cell_offset(i)? + INTERNAL_CHILD_SIZE;
        Ok(read_u32(&self.data, offset))
    }

    pub fn set_internal_key(&mut self, i: u32, key: u32) -> Result<(), Error> {
        let offset = self.internal_cell_offset(i)? + INTERNAL_CHILD_SIZE;
        write_u32(&mut self.data, offset, key);
        Ok(())
    }

    pub fn copy_internal_cell_within(&mut self, from: u32, to: u32) -> Result<(), Error> {
        let src = self.internal_cell_offset(from)?;
        let dst = self.internal_cell_offset(to)?;
        self.data.copy_within(src..src + INTERNAL_CELL_SIZE, dst);
        Ok(())
    }
}

fn read_u32(buf: &[u8; PAGE_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn write_u32(buf: &mut [u8; PAGE_SIZE], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_capacity_matches_spec() {
        assert_eq!(LEAF_MAX_CELLS, 13);
    }

    #[test]
    fn internal_capacity_is_page_derived() {
        assert_eq!(INTERNAL_MAX_CELLS, 510);
    }

    #[test]
    fn leaf_header_roundtrip() {
        let mut page = Page::zeroed();
        page.init_leaf();
        assert_eq!(page.node_type().unwrap(), NodeType::Leaf);
        assert_eq!(page.leaf_num_cells(), 0);
        assert_eq!(page.leaf_next_leaf(), 0);

        page.set_leaf_num_cells(3);
        page.set_leaf_next_leaf(9);
        assert_eq!(page.leaf_num_cells(), 3);
        assert_eq!(page.leaf_next_leaf(), 9);
    }

    #[test]
    fn internal_child_edge_case_is_fatal_past_num_keys() {
        let mut page = Page::zeroed();
        page.init_internal();
        page.set_internal_num_keys(1);
        page.set_internal_right_child(5);
        assert_eq!(page.internal_child(1).unwrap(), 5);
        assert!(page.internal_child(2).is_err());
    }
}
