//! The in-memory document reconstruction: an ordered sequence of items with
//! tri-state visibility, advanced and retreated one operation at a time.

use std::collections::HashMap;

use crate::walker::WalkerError;
use crate::{Frontier, ListOp, ListOpLog, LV};

/// The state of an item at some moment of the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemState {
    /// The item's insert hasn't been applied (or has been retreated).
    NotYetInserted,
    Inserted,
    /// Deleted n times. n > 1 when concurrent branches deleted the same
    /// item.
    Deleted(u32),
}

impl ItemState {
    pub(crate) fn is_inserted(&self) -> bool {
        *self == ItemState::Inserted
    }

    fn delete(&mut self) -> Result<(), ()> {
        match *self {
            ItemState::NotYetInserted => Err(()),
            ItemState::Inserted => {
                *self = ItemState::Deleted(1);
                Ok(())
            }
            ItemState::Deleted(n) => {
                *self = ItemState::Deleted(n.checked_add(1).expect("delete count overflow"));
                Ok(())
            }
        }
    }

    fn undelete(&mut self) -> Result<(), ()> {
        match *self {
            ItemState::Deleted(1) => {
                *self = ItemState::Inserted;
                Ok(())
            }
            ItemState::Deleted(n) => {
                *self = ItemState::Deleted(n - 1);
                Ok(())
            }
            _ => Err(()),
        }
    }
}

/// One originally-inserted element. Items are created when their insert is
/// first applied and never removed; advance / retreat only flip their states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Item {
    pub(crate) op_id: LV,

    /// State at the current traversal frontier.
    pub(crate) cur_state: ItemState,
    /// State once every operation seen so far has been applied. Unlike
    /// cur_state this is never rolled back by retreat.
    pub(crate) end_state: ItemState,

    /// The item immediately to the left when this item was inserted. None
    /// means the start of the document.
    pub(crate) origin_left: Option<LV>,
    /// Tie-breaker for concurrent inserts: the next item that existed at
    /// insertion time, if it shared our origin_left. None sorts as infinity.
    pub(crate) right_parent: Option<LV>,
}

/// A reconstructed document view at `cur_version`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EditContext {
    /// All known items, in document order. The single owner of item state.
    pub(crate) items: Vec<Item>,
    /// Insert LV -> index into items. Kept current as items are spliced in.
    pub(crate) items_by_lv: HashMap<LV, usize>,
    /// Delete LV -> the item it removed, or None for a tombstone no-op.
    /// Records persist across retreat so re-application is frame
    /// independent.
    pub(crate) del_targets: HashMap<LV, Option<LV>>,
    pub(crate) cur_version: Frontier,
}

impl EditContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// The item index at which a new insert at visible position `target_pos`
    /// starts looking for its place: just after the target_pos'th visible
    /// item.
    fn find_by_cur_pos(&self, target_pos: usize, lv: LV) -> Result<usize, WalkerError> {
        let mut remaining = target_pos;
        let mut idx = 0;
        while remaining > 0 {
            let item = self
                .items
                .get(idx)
                .ok_or(WalkerError::StateMismatch { lv })?;
            if item.cur_state.is_inserted() {
                remaining -= 1;
            }
            idx += 1;
        }
        Ok(idx)
    }

    fn sibling_key(item: &Item) -> (LV, LV) {
        // right_parent of None sorts as infinity.
        (item.right_parent.unwrap_or(LV::MAX), item.op_id)
    }

    /// Where to splice a new item, starting from `idx`. Walks the window of
    /// concurrent (not-yet-inserted) items, ordering siblings which share our
    /// origin_left by ascending (right_parent, insert LV) and skipping the
    /// subtrees of siblings we sort after. The first item that exists at the
    /// current moment closes the window.
    fn integrate_dest(&self, new_item: &Item, idx: usize) -> usize {
        let left_idx = idx as isize - 1;
        let mut scan = idx;

        while scan < self.items.len() {
            let other = &self.items[scan];
            if other.cur_state != ItemState::NotYetInserted {
                break;
            }
            debug_assert_ne!(other.op_id, new_item.op_id);

            let other_left = match other.origin_left {
                None => -1,
                Some(lv) => self.items_by_lv[&lv] as isize,
            };
            if other_left < left_idx {
                break;
            }
            if other_left == left_idx && Self::sibling_key(new_item) < Self::sibling_key(other) {
                break;
            }
            scan += 1;
        }
        scan
    }

    /// Apply the operation with the given LV.
    ///
    /// First application must happen with the context positioned at the
    /// operation's parent version; it computes origins, integrates or scans
    /// for the delete target, and records the outcome. Re-application (after
    /// a retreat) is a pure state flip using those records, valid at any
    /// frontier.
    pub(crate) fn apply_op<T>(&mut self, oplog: &ListOpLog<T>, lv: LV) -> Result<(), WalkerError> {
        let op = oplog
            .get(lv)
            .ok_or(WalkerError::InconsistentState { lv })?;

        match op {
            ListOp::Ins { pos, .. } => {
                if let Some(&idx) = self.items_by_lv.get(&lv) {
                    // Seen before: flip it back on.
                    let item = &mut self.items[idx];
                    if item.cur_state != ItemState::NotYetInserted {
                        return Err(WalkerError::StateMismatch { lv });
                    }
                    item.cur_state = ItemState::Inserted;
                    return Ok(());
                }

                let idx = self.find_by_cur_pos(*pos, lv)?;
                debug_assert!(idx == 0 || self.items[idx - 1].cur_state.is_inserted());
                let origin_left = if idx == 0 {
                    None
                } else {
                    Some(self.items[idx - 1].op_id)
                };

                // The right parent is the next item which exists right now,
                // if it's a sibling (same origin_left).
                let mut right_parent = None;
                for other in &self.items[idx..] {
                    if other.cur_state != ItemState::NotYetInserted {
                        if other.origin_left == origin_left {
                            right_parent = Some(other.op_id);
                        }
                        break;
                    }
                }

                let new_item = Item {
                    op_id: lv,
                    cur_state: ItemState::Inserted,
                    end_state: ItemState::Inserted,
                    origin_left,
                    right_parent,
                };
                let dest = self.integrate_dest(&new_item, idx);
                self.items.insert(dest, new_item);

                let items = &self.items;
                let items_by_lv = &mut self.items_by_lv;
                for item in &items[dest + 1..] {
                    *items_by_lv.get_mut(&item.op_id).unwrap() += 1;
                }
                items_by_lv.insert(lv, dest);
                Ok(())
            }
            ListOp::Del { pos } => {
                if let Some(&target) = self.del_targets.get(&lv) {
                    // Seen before: re-delete the recorded target.
                    if let Some(t) = target {
                        let idx = *self
                            .items_by_lv
                            .get(&t)
                            .ok_or(WalkerError::InconsistentState { lv })?;
                        self.items[idx]
                            .cur_state
                            .delete()
                            .map_err(|_| WalkerError::StateMismatch { lv })?;
                    }
                    return Ok(());
                }

                let mut remaining = *pos;
                let mut target = None;
                for (i, item) in self.items.iter().enumerate() {
                    if item.cur_state.is_inserted() {
                        if remaining == 0 {
                            target = Some(i);
                            break;
                        }
                        remaining -= 1;
                    }
                }

                match target {
                    Some(i) => {
                        let item = &mut self.items[i];
                        item.cur_state
                            .delete()
                            .map_err(|_| WalkerError::StateMismatch { lv })?;
                        let _ = item.end_state.delete();
                        let target_id = item.op_id;
                        self.del_targets.insert(lv, Some(target_id));
                    }
                    None => {
                        // Deleting past the end of the document: a no-op
                        // tombstone.
                        self.del_targets.insert(lv, None);
                    }
                }
                Ok(())
            }
        }
    }

    /// Un-apply the operation with the given LV. The operation must
    /// currently be applied.
    pub(crate) fn retreat_op<T>(&mut self, oplog: &ListOpLog<T>, lv: LV) -> Result<(), WalkerError> {
        let op = oplog
            .get(lv)
            .ok_or(WalkerError::InconsistentState { lv })?;

        match op {
            ListOp::Ins { .. } => {
                let idx = *self
                    .items_by_lv
                    .get(&lv)
                    .ok_or(WalkerError::StateMismatch { lv })?;
                let item = &mut self.items[idx];
                if item.cur_state != ItemState::Inserted {
                    return Err(WalkerError::StateMismatch { lv });
                }
                item.cur_state = ItemState::NotYetInserted;
                Ok(())
            }
            ListOp::Del { .. } => match self.del_targets.get(&lv) {
                None => Err(WalkerError::StateMismatch { lv }),
                Some(None) => Ok(()),
                Some(Some(t)) => {
                    let idx = *self
                        .items_by_lv
                        .get(t)
                        .ok_or(WalkerError::InconsistentState { lv })?;
                    self.items[idx]
                        .cur_state
                        .undelete()
                        .map_err(|_| WalkerError::StateMismatch { lv })
                }
            },
        }
    }

    /// Deep consistency check, for tests and fuzzing.
    pub(crate) fn dbg_check(&self) {
        assert_eq!(self.items.len(), self.items_by_lv.len());
        for (idx, item) in self.items.iter().enumerate() {
            assert_eq!(self.items_by_lv.get(&item.op_id), Some(&idx));
            if item.cur_state != ItemState::NotYetInserted {
                assert_ne!(item.end_state, ItemState::NotYetInserted);
            }
        }
        for (del, target) in self.del_targets.iter() {
            if let Some(t) = target {
                assert!(self.items_by_lv.contains_key(t), "delete {del} targets unknown item");
            }
        }
        self.cur_version.debug_check_sorted();
    }
}
