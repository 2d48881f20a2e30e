//! Frontier walks: moving an edit context between arbitrary versions by
//! retreating and applying operations in causal order.

use crate::walker::editctx::EditContext;
use crate::walker::WalkerError;
use crate::{Frontier, ListOpLog, LV};

/// Move the context to exactly `target` using only state flips: every
/// operation on both sides must have been applied at least once before.
/// Retreats run newest-first, re-applications oldest-first.
pub(crate) fn reposition<T>(
    ctx: &mut EditContext,
    oplog: &ListOpLog<T>,
    target: &[LV],
) -> Result<(), WalkerError> {
    if ctx.cur_version.as_ref() == target {
        return Ok(());
    }

    let (only_cur, only_target) = oplog.cg.diff_rev(ctx.cur_version.as_ref(), target);

    for span in only_cur.iter() {
        for lv in span.iter().rev() {
            ctx.retreat_op(oplog, lv)?;
        }
    }
    for span in only_target.iter().rev() {
        for lv in span.iter() {
            ctx.apply_op(oplog, lv)?;
        }
    }

    ctx.cur_version = Frontier::from_unsorted(target);
    Ok(())
}

/// Apply every operation in `history(target) \ history(ctx)`, oldest first.
/// Before each first-time application the context is repositioned to the
/// operation's parents, so origins and delete targets are computed in the
/// frame the operation was created in. Leaves the context at the last
/// applied version; callers reposition to their final frontier afterwards.
pub(crate) fn apply_missing<T>(
    ctx: &mut EditContext,
    oplog: &ListOpLog<T>,
    target: &[LV],
) -> Result<(), WalkerError> {
    let (missing, _) = oplog.cg.diff_rev(target, ctx.cur_version.as_ref());

    for span in missing.iter().rev() {
        for lv in span.iter() {
            let parents = oplog.cg.parents_at(lv)?;
            reposition(ctx, oplog, parents.as_ref())?;
            ctx.apply_op(oplog, lv)?;
            ctx.cur_version = Frontier::new_1(lv);
        }
    }
    Ok(())
}

/// Move the context to represent exactly `target`:
///
/// 1. An empty target resets the context to the root.
/// 2. Retreat (newest first) down to the common base shared by the current
///    and target frontiers.
/// 3. Apply the target's missing history oldest-first, repositioning per
///    operation.
/// 4. Reposition to the full target frontier and adopt it.
///
/// On a mid-walk failure the error propagates; the context is left at an
/// intermediate but internally consistent frontier.
pub(crate) fn merge_into<T>(
    ctx: &mut EditContext,
    oplog: &ListOpLog<T>,
    target: &[LV],
) -> Result<(), WalkerError> {
    oplog.cg.check_frontier(target)?;

    if target.is_empty() {
        ctx.reset();
        return Ok(());
    }

    let common = oplog.cg.common_ancestry(ctx.cur_version.as_ref(), target)?;

    let (only_cur, only_common) = oplog.cg.diff_rev(ctx.cur_version.as_ref(), common.as_ref());
    debug_assert!(only_common.is_empty());
    for span in only_cur.iter() {
        for lv in span.iter().rev() {
            ctx.retreat_op(oplog, lv)?;
        }
    }
    ctx.cur_version = common;

    apply_missing(ctx, oplog, target)?;
    reposition(ctx, oplog, target)
}
