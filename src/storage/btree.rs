//! The B+-tree: key search, ordered insertion, and the split/promote chain
//! that keeps the tree balanced as it grows past a single page.
//!
//! Every routine here takes a `&mut Pager` and page numbers rather than
//! holding onto borrowed `Page`s across calls, since a split routinely needs
//! to touch three or four pages (old node, new sibling, parent, grandparent)
//! that the borrow checker won't let us hold open simultaneously.

use super::page::{NodeType, INVALID_PAGE_NUM, INTERNAL_MAX_CELLS, LEAF_MAX_CELLS};
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;

/// Finds the leaf cell where `key` belongs: either the cell holding it, or
/// the cell it should be inserted before. Returns `(page_num, cell_num)`.
pub fn find(pager: &mut Pager, root_page_num: u32, key: u32) -> Result<(u32, u32), Error> {
    let node_type = pager.get_page(root_page_num)?.node_type()?;
    match node_type {
        NodeType::Leaf => leaf_find(pager, root_page_num, key),
        NodeType::Internal => internal_find(pager, root_page_num, key),
    }
}

fn leaf_find(pager: &mut Pager, page_num: u32, key: u32) -> Result<(u32, u32), Error> {
    let page = pager.get_page(page_num)?;
    let mut min = 0u32;
    let mut max = page.leaf_num_cells();
    while min < max {
        let mid = min + (max - min) / 2;
        let mid_key = page.leaf_key(mid)?;
        if mid_key == key {
            return Ok((page_num, mid));
        }
        if key < mid_key {
            max = mid;
        } else {
            min = mid + 1;
        }
    }
    Ok((page_num, min))
}

fn internal_find(pager: &mut Pager, page_num: u32, key: u32) -> Result<(u32, u32), Error> {
    let child_page_num = {
        let page = pager.get_page(page_num)?;
        let mut min = 0u32;
        let mut max = page.internal_num_keys();
        while min < max {
            let mid = min + (max - min) / 2;
            if key <= page.internal_key(mid)? {
                max = mid;
            } else {
                min = mid + 1;
            }
        }
        page.internal_child(min)?
    };
    let child_type = pager.get_page(child_page_num)?.node_type()?;
    match child_type {
        NodeType::Leaf => leaf_find(pager, child_page_num, key),
        NodeType::Internal => internal_find(pager, child_page_num, key),
    }
}

/// Inserts `row` at `cell_num` in the leaf at `page_num`, splitting first if
/// the leaf is already full.
pub fn insert(pager: &mut Pager, page_num: u32, cell_num: u32, row: &Row) -> Result<(), Error> {
    let num_cells = pager.get_page(page_num)?.leaf_num_cells();
    if (num_cells as usize) < LEAF_MAX_CELLS {
        leaf_insert(pager, page_num, cell_num, row)
    } else {
        leaf_split_and_insert(pager, page_num, cell_num, row)
    }
}

fn leaf_insert(pager: &mut Pager, page_num: u32, cell_num: u32, row: &Row) -> Result<(), Error> {
    let page = pager.get_page(page_num)?;
    let num_cells = page.leaf_num_cells();
    for i in (cell_num + 1..=num_cells).rev() {
        page.copy_leaf_cell_within(i - 1, i)?;
    }
    page.set_leaf_key(cell_num, row.id)?;
    page.set_leaf_value(cell_num, &row.serialize())?;
    page.set_leaf_num_cells(num_cells + 1);
    Ok(())
}

/// Splits a full leaf in two and inserts `row` into whichever half it now
/// belongs to, then promotes the new sibling into the parent (creating a new
/// root if the leaf being split had none).
fn leaf_split_and_insert(
    pager: &mut Pager,
    old_page_num: u32,
    cell_num: u32,
    row: &Row,
) -> Result<(), Error> {
    let old_snapshot = pager.get_page(old_page_num)?.clone();
    let was_root = old_snapshot.is_root();
    let old_parent = old_snapshot.parent();

    let total = LEAF_MAX_CELLS as u32 + 1;
    let right_count = (total + 1) / 2;
    let left_count = total - right_count;

    let new_page_num = pager.unused_page_num();
    pager.get_page(new_page_num)?.init_leaf();

    for i in (0..total).rev() {
        let dest_page_num = if i >= left_count { new_page_num } else { old_page_num };
        let dest_idx = i % left_count;

        let (key, value) = if i == cell_num {
            (row.id, row.serialize())
        } else if i > cell_num {
            (old_snapshot.leaf_key(i - 1)?, *old_snapshot.leaf_value(i - 1)?)
        } else {
            (old_snapshot.leaf_key(i)?, *old_snapshot.leaf_value(i)?)
        };

        let dest = pager.get_page(dest_page_num)?;
        dest.set_leaf_key(dest_idx, key)?;
        dest.set_leaf_value(dest_idx, &value)?;
    }

    {
        let new_leaf = pager.get_page(new_page_num)?;
        new_leaf.set_leaf_num_cells(right_count);
        new_leaf.set_leaf_next_leaf(old_snapshot.leaf_next_leaf());
        new_leaf.set_parent(old_parent);
    }
    {
        let old_leaf = pager.get_page(old_page_num)?;
        old_leaf.set_leaf_num_cells(left_count);
        old_leaf.set_leaf_next_leaf(new_page_num);
    }

    if was_root {
        create_new_root(pager, new_page_num)
    } else {
        let pre_split_max = old_snapshot.node_max_key()?;
        let new_left_max = pager.get_page(old_page_num)?.node_max_key()?;
        update_internal_key(pager, old_parent, pre_split_max, new_left_max)?;
        internal_node_insert(pager, old_parent, new_page_num)
    }
}

/// Inserts `child_page_num` as a child of the internal node at
/// `parent_page_num`, splitting the parent first if it is full.
fn internal_node_insert(pager: &mut Pager, parent_page_num: u32, child_page_num: u32) -> Result<(), Error> {
    let child_max = subtree_max_key(pager, child_page_num)?;
    pager.get_page(child_page_num)?.set_parent(parent_page_num);

    let num_keys = pager.get_page(parent_page_num)?.internal_num_keys();
    if num_keys as usize >= INTERNAL_MAX_CELLS {
        return internal_node_split_and_insert(pager, parent_page_num, child_page_num);
    }

    let right_child_page_num = pager.get_page(parent_page_num)?.internal_right_child();
    if right_child_page_num == INVALID_PAGE_NUM {
        pager.get_page(parent_page_num)?.set_internal_right_child(child_page_num);
        return Ok(());
    }

    let right_child_max = subtree_max_key(pager, right_child_page_num)?;

    if child_max > right_child_max {
        let parent = pager.get_page(parent_page_num)?;
        parent.set_internal_num_keys(num_keys + 1);
        parent.set_internal_child(num_keys, right_child_page_num)?;
        parent.set_internal_key(num_keys, right_child_max)?;
        parent.set_internal_right_child(child_page_num);
        return Ok(());
    }

    let mut index = 0u32;
    {
        let parent = pager.get_page(parent_page_num)?;
        while index < num_keys {
            if parent.internal_key(index)? >= child_max {
                break;
            }
            index += 1;
        }
    }

    let parent = pager.get_page(parent_page_num)?;
    parent.set_internal_num_keys(num_keys + 1);
    for i in (index..num_keys).rev() {
        parent.copy_internal_cell_within(i, i + 1)?;
    }
    parent.set_internal_child(index, child_page_num)?;
    parent.set_internal_key(index, child_max)?;
    Ok(())
}

/// Splits a full internal node, redistributing its children (plus the one
/// being inserted) across the old page and a new sibling, then recurses the
/// same way `leaf_split_and_insert` does.
fn internal_node_split_and_insert(
    pager: &mut Pager,
    old_page_num: u32,
    child_page_num: u32,
) -> Result<(), Error> {
    let pre_split_max = subtree_max_key(pager, old_page_num)?;
    let was_root = pager.get_page(old_page_num)?.is_root();
    let old_parent = pager.get_page(old_page_num)?.parent();

    let mut entries: Vec<(u32, u32)> = {
        let page = pager.get_page(old_page_num)?;
        let num_keys = page.internal_num_keys();
        let mut entries = Vec::with_capacity(num_keys as usize + 2);
        for i in 0..num_keys {
            entries.push((page.internal_child(i)?, page.internal_key(i)?));
        }
        entries
    };
    let old_right_child = pager.get_page(old_page_num)?.internal_right_child();
    let old_right_max = subtree_max_key(pager, old_right_child)?;
    entries.push((old_right_child, old_right_max));

    let child_max = subtree_max_key(pager, child_page_num)?;
    let insert_at = entries.partition_point(|&(_, k)| k < child_max);
    entries.insert(insert_at, (child_page_num, child_max));

    let total = entries.len();
    let right_count = (total + 1) / 2;
    let left_count = total - right_count;

    let new_page_num = pager.unused_page_num();
    pager.get_page(new_page_num)?.init_internal();

    {
        let old_page = pager.get_page(old_page_num)?;
        old_page.init_internal();
        old_page.set_parent(old_parent);
        old_page.set_internal_num_keys((left_count - 1) as u32);
        for (i, &(child, key)) in entries[..left_count - 1].iter().enumerate() {
            old_page.set_internal_child(i as u32, child)?;
            old_page.set_internal_key(i as u32, key)?;
        }
        old_page.set_internal_right_child(entries[left_count - 1].0);
    }
    {
        let new_page = pager.get_page(new_page_num)?;
        new_page.set_parent(old_parent);
        new_page.set_internal_num_keys((right_count - 1) as u32);
        for (j, &(child, key)) in entries[left_count..total - 1].iter().enumerate() {
            new_page.set_internal_child(j as u32, child)?;
            new_page.set_internal_key(j as u32, key)?;
        }
        new_page.set_internal_right_child(entries[total - 1].0);
    }

    for &(child, _) in &entries[..left_count] {
        pager.get_page(child)?.set_parent(old_page_num);
    }
    for &(child, _) in &entries[left_count..] {
        pager.get_page(child)?.set_parent(new_page_num);
    }

    if was_root {
        create_new_root(pager, new_page_num)
    } else {
        let new_left_max = subtree_max_key(pager, old_page_num)?;
        update_internal_key(pager, old_parent, pre_split_max, new_left_max)?;
        internal_node_insert(pager, old_parent, new_page_num)
    }
}

/// Relocates the current root's contents into a fresh left-child page and
/// rebuilds page 0 as a new internal root pointing at `(left, right)`.
fn create_new_root(pager: &mut Pager, right_child_page_num: u32) -> Result<(), Error> {
    const ROOT_PAGE_NUM: u32 = 0;
    let left_child_page_num = pager.unused_page_num();

    let root_snapshot = pager.get_page(ROOT_PAGE_NUM)?.clone();
    {
        let left_child = pager.get_page(left_child_page_num)?;
        *left_child = root_snapshot;
        left_child.set_root(false);
        left_child.set_parent(ROOT_PAGE_NUM);
    }
    reparent_children(pager, left_child_page_num)?;

    let left_max_key = subtree_max_key(pager, left_child_page_num)?;
    pager.get_page(right_child_page_num)?.set_parent(ROOT_PAGE_NUM);

    let root = pager.get_page(ROOT_PAGE_NUM)?;
    root.init_internal();
    root.set_root(true);
    root.set_internal_num_keys(1);
    root.set_internal_child(0, left_child_page_num)?;
    root.set_internal_key(0, left_max_key)?;
    root.set_internal_right_child(right_child_page_num);
    Ok(())
}

/// After a node moves to a different page number, its children's stored
/// parent pointers are stale and must be fixed up.
fn reparent_children(pager: &mut Pager, page_num: u32) -> Result<(), Error> {
    let page = pager.get_page(page_num)?;
    if page.node_type()? != NodeType::Internal {
        return Ok(());
    }
    let num_keys = page.internal_num_keys();
    let mut children = Vec::with_capacity(num_keys as usize + 1);
    for i in 0..=num_keys {
        children.push(page.internal_child(i)?);
    }
    for child in children {
        pager.get_page(child)?.set_parent(page_num);
    }
    Ok(())
}

/// The max key reachable under `page_num`, following `right_child` down to a
/// leaf if necessary. Unlike `Page::node_max_key`, this is correct for an
/// internal node regardless of tree depth.
fn subtree_max_key(pager: &mut Pager, page_num: u32) -> Result<u32, Error> {
    let node_type = pager.get_page(page_num)?.node_type()?;
    match node_type {
        NodeType::Leaf => pager.get_page(page_num)?.node_max_key(),
        NodeType::Internal => {
            let right_child = pager.get_page(page_num)?.internal_right_child();
            subtree_max_key(pager, right_child)
        }
    }
}

/// Finds the parent's keyed cell that used to bound `old_key` and rewrites
/// it to `new_key`. A no-op if `old_key` was the parent's right child's max,
/// since the right child is addressed by page number, not by key.
fn update_internal_key(pager: &mut Pager, parent_page_num: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
    let parent = pager.get_page(parent_page_num)?;
    let num_keys = parent.internal_num_keys();
    for i in 0..num_keys {
        if parent.internal_key(i)? == old_key {
            parent.set_internal_key(i, new_key)?;
            return Ok(());
        }
    }
    Ok(())
}

/// Renders the tree as indented text, leaves listing their keys and
/// internal nodes listing their key boundaries, for the `.btree` command.
pub fn dump(pager: &mut Pager, page_num: u32, indent: usize, out: &mut String) -> Result<(), Error> {
    let pad = "  ".repeat(indent);
    let node_type = pager.get_page(page_num)?.node_type()?;
    match node_type {
        NodeType::Leaf => {
            let num_cells = pager.get_page(page_num)?.leaf_num_cells();
            out.push_str(&format!("{pad}- leaf (size {num_cells})\n"));
            for i in 0..num_cells {
                let key = pager.get_page(page_num)?.leaf_key(i)?;
                out.push_str(&format!("{pad}  - {key}\n"));
            }
        }
        NodeType::Internal => {
            let num_keys = pager.get_page(page_num)?.internal_num_keys();
            out.push_str(&format!("{pad}- internal (size {num_keys})\n"));
            for i in 0..num_keys {
                let child = pager.get_page(page_num)?.internal_child(i)?;
                dump(pager, child, indent + 1, out)?;
                let key = pager.get_page(page_num)?.internal_key(i)?;
                out.push_str(&format!("{pad}- key {key}\n"));
            }
            let right_child = pager.get_page(page_num)?.internal_right_child();
            dump(pager, right_child, indent + 1, out)?;
        }
    }
    Ok(())
}
