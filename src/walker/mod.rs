//! The walker: the public engine which owns an operation log and an edit
//! context, integrates local and remote operations, and moves the document
//! view between versions.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::causalgraph::AddRawResult;
use crate::walker::editctx::EditContext;
use crate::walker::merge::{apply_missing, merge_into, reposition};
use crate::{Branch, CausalGraph, CGError, Frontier, ListOp, ListOpLog, RawVersion, LV};

pub(crate) mod editctx;
mod merge;
#[cfg(test)]
mod fuzzer;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WalkerError {
    /// A causal graph operation failed.
    Graph(CGError),
    /// The retreat target is not an ancestor of the current frontier.
    InvalidRetreat { target: LV },
    /// The edit context is not in a state where the operation can be applied
    /// or retreated.
    StateMismatch { lv: LV },
    /// An internal invariant was violated. This indicates a bug or external
    /// mutation of shared state.
    InconsistentState { lv: LV },
}

impl Display for WalkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WalkerError::Graph(e) => write!(f, "Causal graph error: {e}"),
            WalkerError::InvalidRetreat { target } => {
                write!(f, "Retreat target {target} is not an ancestor of the current version")
            }
            WalkerError::StateMismatch { lv } => {
                write!(f, "Edit context state mismatch at version {lv}")
            }
            WalkerError::InconsistentState { lv } => {
                write!(f, "Inconsistent internal state at version {lv}")
            }
        }
    }
}

impl Error for WalkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WalkerError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CGError> for WalkerError {
    fn from(e: CGError) -> Self {
        WalkerError::Graph(e)
    }
}

/// An eg-walker instance: an operation log (with its causal graph) plus the
/// edit context reconstructing the document at the current frontier.
#[derive(Debug, Clone)]
pub struct Walker<T> {
    oplog: ListOpLog<T>,
    ctx: EditContext,
}

impl<T> Default for Walker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Walker<T> {
    pub fn new() -> Self {
        Self {
            oplog: ListOpLog::new(),
            ctx: EditContext::new(),
        }
    }

    /// The operation log. Persistence layers read this (and [`Self::cg`])
    /// to write a document out; rehydrate by replaying `integrate_remote`
    /// in any topological order.
    pub fn oplog(&self) -> &ListOpLog<T> {
        &self.oplog
    }

    pub fn cg(&self) -> &CausalGraph {
        &self.oplog.cg
    }

    /// The frontier the edit context currently represents.
    pub fn get_version(&self) -> &[LV] {
        self.ctx.cur_version.as_ref()
    }

    pub fn get_ops(&self) -> &[ListOp<T>] {
        self.oplog.ops()
    }

    /// The item removed by the given delete operation, if that delete has
    /// been applied in this context. `Some(None)` is a delete which found no
    /// visible target (a tombstone no-op).
    pub fn delete_target(&self, lv: LV) -> Option<Option<LV>> {
        self.ctx.del_targets.get(&lv).copied()
    }

    /// The visible document at the current frontier, in order.
    pub fn active_items(&self) -> impl Iterator<Item = &T> {
        self.ctx.items.iter().filter_map(|item| {
            if !item.cur_state.is_inserted() {
                return None;
            }
            match self.oplog.get(item.op_id) {
                Some(ListOp::Ins { content, .. }) => Some(content),
                _ => {
                    debug_assert!(false, "visible item {} is not an insert", item.op_id);
                    None
                }
            }
        })
    }

    pub fn get_active_items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.active_items().cloned().collect()
    }

    /// Create and integrate a local operation: its parents are the current
    /// frontier and the edit context advances over it immediately.
    pub fn local_insert(&mut self, agent: &str, pos: usize, content: T) -> Result<LV, WalkerError> {
        self.integrate(ListOp::insert(pos, content), agent, None)
    }

    pub fn local_delete(&mut self, agent: &str, pos: usize) -> Result<LV, WalkerError> {
        self.integrate(ListOp::delete(pos), agent, None)
    }

    /// Integrate an operation authored by `agent` with the agent's next
    /// sequence number.
    ///
    /// With `raw_parents: None` this is a local edit: parents default to the
    /// current frontier and the context advances over the new operation.
    /// With explicit parents the operation is only recorded; call
    /// [`Self::merge`] or [`Self::advance`] to bring it into view.
    pub fn integrate(
        &mut self,
        op: ListOp<T>,
        agent: &str,
        raw_parents: Option<&[RawVersion]>,
    ) -> Result<LV, WalkerError> {
        let seq = self.oplog.cg.next_seq_for(agent);
        let id = RawVersion::new(agent, seq);
        self.integrate_remote(op, &id, raw_parents)
    }

    /// Integrate an operation with an explicit identity, as delivered by a
    /// network or persistence layer. All parents must already be known.
    ///
    /// Integration is idempotent: re-delivering a known identity returns the
    /// existing LV and leaves the log untouched, which makes replay in any
    /// topological order safe.
    pub fn integrate_remote(
        &mut self,
        op: ListOp<T>,
        id: &RawVersion,
        raw_parents: Option<&[RawVersion]>,
    ) -> Result<LV, WalkerError> {
        // The log append is the first step; everything after rolls it back
        // on failure.
        self.oplog.push_op(op);

        let local_parents;
        let parents: Option<&[RawVersion]> = match raw_parents {
            Some(p) => Some(p),
            None => {
                match self.oplog.cg.lv_list_to_raw(self.ctx.cur_version.as_ref()) {
                    Ok(raw) => {
                        local_parents = raw;
                        Some(local_parents.as_slice())
                    }
                    Err(e) => {
                        self.oplog.rollback_last_op();
                        return Err(e.into());
                    }
                }
            }
        };

        match self.oplog.cg.add_raw(id, 1, parents) {
            Ok(AddRawResult::Assigned(span)) => {
                let lv = span.start;
                debug_assert_eq!(lv + 1, self.oplog.len());
                if raw_parents.is_none() {
                    // A local op: the context is already at its parents.
                    self.ctx.apply_op(&self.oplog, lv)?;
                    self.ctx.cur_version = Frontier::new_1(lv);
                }
                Ok(lv)
            }
            Ok(AddRawResult::Duplicate(lv)) => {
                self.oplog.rollback_last_op();
                Ok(lv)
            }
            Err(e) => {
                self.oplog.rollback_last_op();
                Err(e.into())
            }
        }
    }

    /// Advance the context over `history(target) \ history(current)`. The
    /// new frontier is the union of the old frontier and the target. A
    /// target already in view is a no-op.
    pub fn advance(&mut self, target: LV) -> Result<(), WalkerError> {
        let cg = &self.oplog.cg;
        if cg.version_contains_lv(self.ctx.cur_version.as_ref(), target)? {
            return Ok(());
        }

        let mut frontier: Vec<LV> = Vec::with_capacity(self.ctx.cur_version.len() + 1);
        for &head in self.ctx.cur_version.iter() {
            if !cg.version_contains_lv(&[target], head)? {
                frontier.push(head);
            }
        }
        frontier.push(target);
        let frontier = Frontier::from_unsorted(&frontier);

        apply_missing(&mut self.ctx, &self.oplog, frontier.as_ref())?;
        reposition(&mut self.ctx, &self.oplog, frontier.as_ref())?;
        self.ctx.cur_version = frontier;
        Ok(())
    }

    /// Retreat the context to exactly `[target]`, un-applying
    /// `history(current) \ history(target)` newest first. The target must be
    /// an ancestor of (or in) the current frontier.
    pub fn retreat(&mut self, target: LV) -> Result<(), WalkerError> {
        let cg = &self.oplog.cg;
        cg.check_lv(target)?;
        if !cg.version_contains_lv(self.ctx.cur_version.as_ref(), target)? {
            return Err(WalkerError::InvalidRetreat { target });
        }
        if self.ctx.cur_version.as_ref() == [target].as_slice() {
            return Ok(());
        }

        let (only_cur, _) = cg.diff_rev(self.ctx.cur_version.as_ref(), &[target]);
        for span in only_cur.iter() {
            for lv in span.iter().rev() {
                self.ctx.retreat_op(&self.oplog, lv)?;
            }
        }
        self.ctx.cur_version = Frontier::new_1(target);
        Ok(())
    }

    /// Retreat all the way to the root, resetting the edit context. The
    /// resulting frontier is empty.
    pub fn retreat_to_root(&mut self) {
        self.ctx.reset();
    }

    /// Move the context to represent exactly the target frontier.
    pub fn merge(&mut self, target: &[LV]) -> Result<(), WalkerError> {
        merge_into(&mut self.ctx, &self.oplog, target)
    }

    /// Materialize the document at an arbitrary frontier, without touching
    /// this walker's state. The merge runs on a disposable context sharing
    /// the log read-only.
    pub fn checkout(&self, target: &[LV]) -> Result<Branch<T>, WalkerError>
    where
        T: Clone,
    {
        let mut ctx = EditContext::new();
        merge_into(&mut ctx, &self.oplog, target)?;

        let mut snapshot = Vec::new();
        for item in ctx.items.iter() {
            if item.cur_state.is_inserted() {
                match self.oplog.get(item.op_id) {
                    Some(ListOp::Ins { content, .. }) => snapshot.push(content.clone()),
                    _ => return Err(WalkerError::InconsistentState { lv: item.op_id }),
                }
            }
        }

        Ok(Branch {
            snapshot,
            version: Frontier::from_unsorted(target),
        })
    }

    /// Check cross-structure invariants. Used in testing and fuzzing; panics
    /// on violation.
    pub fn dbg_check(&self, deep: bool) {
        assert_eq!(self.oplog.len(), self.oplog.cg.next_lv());
        self.oplog.cg.dbg_check(deep);
        self.ctx.dbg_check();
        self.oplog
            .cg
            .check_frontier(self.ctx.cur_version.as_ref())
            .unwrap();
    }
}
