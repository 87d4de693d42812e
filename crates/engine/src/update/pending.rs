use core::cmp::Reverse;

use tracing::{debug, warn};

use super::primitive::{UpdateOp, UpdatePrimitive, merge_seams};
use crate::data::NodeTable;
use crate::error::{Error, Result};

/// Primitives collected during the read phase of a query.
///
/// Primitives on the same target and of the same kind are merged as they
/// arrive. A merge conflict poisons the batch: `apply` then fails without
/// touching the table.
#[derive(Debug, Clone, Default)]
pub struct PendingUpdates {
    prims: Vec<UpdatePrimitive>,
    conflict: Option<Error>,
}

impl PendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, prim: UpdatePrimitive) -> Result<()> {
        let target = prim.target();
        // a replaced node is detached anyway, deleting it as well is a no-op
        let replaced = |p: &UpdatePrimitive| p.target() == target && matches!(p.op(), UpdateOp::ReplaceNode(_));
        match prim.op() {
            UpdateOp::DeleteNode if self.prims.iter().any(replaced) => return Ok(()),
            UpdateOp::ReplaceNode(_) => {
                self.prims.retain(|p| !(p.target() == target && matches!(p.op(), UpdateOp::DeleteNode)));
            }
            _ => {}
        }
        let existing = self.prims.iter_mut().find(|p| p.target() == target && p.op().same_kind(prim.op()));
        match existing {
            Some(existing) => existing.merge(prim).inspect_err(|e| {
                if e.code.is_update_conflict() && self.conflict.is_none() {
                    self.conflict = Some(e.clone());
                }
            }),
            None => {
                self.prims.push(prim);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    pub fn primitives(&self) -> &[UpdatePrimitive] {
        &self.prims
    }

    /// First conflict raised while collecting, if any.
    pub fn conflict(&self) -> Option<&Error> {
        self.conflict.as_ref()
    }

    /// Applies all primitives in descending target order, then merges the
    /// text nodes they left adjacent. Targets and capacity are validated up
    /// front; if a primitive still fails, the table is restored to its state
    /// before the batch.
    pub fn apply(mut self, table: &mut NodeTable) -> Result<usize> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }
        for prim in &self.prims {
            match table.record(prim.target()) {
                Some(rec) if rec.kind() == prim.kind() => {}
                _ => return Err(Error::invalid_position(prim.target(), table.len())),
            }
        }
        let added: usize = self.prims.iter().map(|p| p.op().payload_len()).sum();
        let max = table.options().max_nodes.min(u32::MAX as usize);
        if table.len().saturating_add(added) > max {
            return Err(Error::capacity_exceeded(table.len().saturating_add(added), max));
        }

        self.prims.sort_by_key(|p| (Reverse(p.target()), p.op().rank()));
        let backup = table.clone();
        let mut splices = Vec::with_capacity(self.prims.len());
        for prim in &mut self.prims {
            match prim.apply_deferred(table) {
                Ok(splice) => splices.extend(splice),
                Err(err) => {
                    warn!(primitive = %prim, error = %err, "update failed, restoring table");
                    *table = backup;
                    return Err(err);
                }
            }
        }
        // texts merge once every primitive is in place
        let merged = match merge_seams(table, &splices) {
            Ok(merged) => merged,
            Err(err) => {
                warn!(error = %err, "merging texts failed, restoring table");
                *table = backup;
                return Err(err);
            }
        };
        debug!(applied = self.prims.len(), merged, nodes = table.len(), "applied pending updates");
        Ok(self.prims.len())
    }
}
