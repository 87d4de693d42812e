use core::fmt;

use tracing::trace;

use crate::data::NodeTable;
use crate::error::{Error, ErrorCode, Result};
use crate::model::NodeKind;

/// Structural change recorded by an update expression. Payloads are fragment
/// tables ("node copies") detached from the target table.
#[derive(Debug, Clone)]
pub enum UpdateOp {
    ReplaceNode(NodeTable),
    DeleteNode,
    /// Insert as last children.
    InsertInto(NodeTable),
    InsertAttributes(NodeTable),
    InsertBefore(NodeTable),
    ReplaceValue(String),
    Rename(String),
}

impl UpdateOp {
    pub fn name(&self) -> &'static str {
        match self {
            UpdateOp::ReplaceNode(_) => "replace node",
            UpdateOp::DeleteNode => "delete node",
            UpdateOp::InsertInto(_) => "insert into",
            UpdateOp::InsertAttributes(_) => "insert attributes",
            UpdateOp::InsertBefore(_) => "insert before",
            UpdateOp::ReplaceValue(_) => "replace value",
            UpdateOp::Rename(_) => "rename",
        }
    }

    /// Application order of primitives sharing a target.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            UpdateOp::Rename(_) => 0,
            UpdateOp::ReplaceValue(_) => 1,
            UpdateOp::InsertInto(_) => 2,
            UpdateOp::InsertAttributes(_) => 3,
            UpdateOp::ReplaceNode(_) | UpdateOp::DeleteNode => 4,
            UpdateOp::InsertBefore(_) => 5,
        }
    }

    pub fn same_kind(&self, other: &UpdateOp) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Number of records the payload adds to the table.
    pub fn payload_len(&self) -> usize {
        match self {
            UpdateOp::ReplaceNode(f) | UpdateOp::InsertInto(f) | UpdateOp::InsertAttributes(f) | UpdateOp::InsertBefore(f) => {
                f.len()
            }
            UpdateOp::ReplaceValue(v) => usize::from(!v.is_empty()),
            UpdateOp::DeleteNode | UpdateOp::Rename(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Pending,
    Applied,
    Failed,
}

/// One deferred mutation of a node table.
#[derive(Debug, Clone)]
pub struct UpdatePrimitive {
    target: usize,
    kind: NodeKind,
    // parent at creation time; stays valid while primitives are applied in
    // descending target order
    parent: Option<usize>,
    info: String,
    op: UpdateOp,
    state: UpdateState,
}

impl UpdatePrimitive {
    /// Validates `op` against the target node and records it.
    pub fn new(table: &NodeTable, target: usize, op: UpdateOp) -> Result<Self> {
        let kind = table.record(target).ok_or_else(|| Error::invalid_position(target, table.len()))?.kind();
        let invalid = |what: &str| Err(Error::from_code(ErrorCode::XUTY0008, format!("{what}: invalid target {kind} at {target}")));
        match &op {
            UpdateOp::ReplaceNode(_) | UpdateOp::DeleteNode | UpdateOp::ReplaceValue(_) if kind == NodeKind::Document => {
                return invalid(op.name());
            }
            UpdateOp::ReplaceNode(payload) => {
                let attrs = payload.roots().all(|r| payload.kind(r) == NodeKind::Attribute);
                let any_attr = payload.roots().any(|r| payload.kind(r) == NodeKind::Attribute);
                if kind == NodeKind::Attribute && !attrs || kind != NodeKind::Attribute && any_attr {
                    return invalid("replace node with incompatible payload");
                }
            }
            UpdateOp::InsertInto(_) if kind.is_leaf() => return invalid(op.name()),
            UpdateOp::InsertAttributes(_) if kind != NodeKind::Element => return invalid(op.name()),
            UpdateOp::InsertBefore(_) if matches!(kind, NodeKind::Document | NodeKind::Attribute) => {
                return invalid(op.name());
            }
            UpdateOp::Rename(_) if !kind.is_named() => return invalid(op.name()),
            _ => {}
        }
        Ok(Self {
            target,
            kind,
            parent: table.parent(target),
            info: format!("{} at {target}", op.name()),
            op,
            state: UpdateState::Pending,
        })
    }

    /// Replaces the diagnostic text reported with failures.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn op(&self) -> &UpdateOp {
        &self.op
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Folds `other` (same target, same kind of operation) into this
    /// primitive.
    pub fn merge(&mut self, other: UpdatePrimitive) -> Result<()> {
        if self.state != UpdateState::Pending || other.state != UpdateState::Pending {
            return Err(Error::from_code(ErrorCode::XDB0003, format!("{} is no longer pending", self.info)));
        }
        if self.target != other.target || !self.op.same_kind(&other.op) {
            return Err(Error::from_code(ErrorCode::FOER0000, format!("cannot merge {} into {}", other.info, self.info)));
        }
        match (&mut self.op, other.op) {
            (UpdateOp::ReplaceNode(_), _) => Err(Error::from_code(
                ErrorCode::XUDY0016,
                format!("node at {} is replaced more than once", self.target),
            )),
            (UpdateOp::ReplaceValue(_), _) => Err(Error::from_code(
                ErrorCode::XUDY0017,
                format!("value of node at {} is replaced more than once", self.target),
            )),
            (UpdateOp::Rename(_), _) => Err(Error::from_code(
                ErrorCode::XUDY0015,
                format!("node at {} is renamed more than once", self.target),
            )),
            (UpdateOp::DeleteNode, _) => Ok(()),
            (
                UpdateOp::InsertInto(payload) | UpdateOp::InsertAttributes(payload) | UpdateOp::InsertBefore(payload),
                UpdateOp::InsertInto(more) | UpdateOp::InsertAttributes(more) | UpdateOp::InsertBefore(more),
            ) => payload.append(&more).map(|_| ()),
            _ => Err(Error::from_code(ErrorCode::FOER0000, "incompatible primitives")),
        }
    }

    /// Applies the primitive and merges the text nodes it made adjacent. A
    /// primitive is applied at most once; after a failure it stays `Failed`.
    pub fn apply(&mut self, table: &mut NodeTable) -> Result<()> {
        if let Some(splice) = self.apply_deferred(table)? {
            merge_seams(table, &[splice])?;
        }
        Ok(())
    }

    /// Applies the primitive without merging texts. The returned splice tells
    /// the batch where to merge once every primitive is applied.
    pub(crate) fn apply_deferred(&mut self, table: &mut NodeTable) -> Result<Option<Splice>> {
        if self.state != UpdateState::Pending {
            return Err(Error::from_code(ErrorCode::XDB0003, format!("{} is no longer pending", self.info)));
        }
        let result = self.apply_op(table);
        self.state = if result.is_ok() { UpdateState::Applied } else { UpdateState::Failed };
        result
    }

    fn apply_op(&self, table: &mut NodeTable) -> Result<Option<Splice>> {
        let pre = self.target;
        let in_place = match self.op {
            UpdateOp::InsertBefore(_) => pre <= table.len(),
            _ => table.record(pre).is_some_and(|r| r.kind() == self.kind),
        };
        if !in_place {
            return Err(Error::invalid_position(pre, table.len()));
        }
        let texts = self.kind != NodeKind::Attribute;
        match &self.op {
            UpdateOp::ReplaceNode(payload) => self.replace_node(table, payload),
            UpdateOp::DeleteNode => {
                let removed = table.delete(pre)?;
                Ok(Some(Splice { at: pre, removed, added: 0, texts }))
            }
            UpdateOp::InsertInto(payload) => {
                let at = pre + table.size(pre);
                let added = table.insert(at, Some(pre), payload)?;
                Ok(Some(Splice { at, removed: 0, added, texts: true }))
            }
            UpdateOp::InsertAttributes(payload) => {
                let at = pre + table.attr_size(pre);
                let added = table.insert_attr(at, pre, payload)?;
                Ok(Some(Splice { at, removed: 0, added, texts: false }))
            }
            UpdateOp::InsertBefore(payload) => {
                let added = table.insert(pre, self.parent, payload)?;
                Ok(Some(Splice { at: pre, removed: 0, added, texts: true }))
            }
            UpdateOp::ReplaceValue(value) => {
                if self.kind.is_leaf() {
                    table.update_text(pre, value)?;
                    return Ok(None);
                }
                let first = pre + table.attr_size(pre);
                let removed = table.size(pre) - table.attr_size(pre);
                while table.size(pre) > table.attr_size(pre) {
                    table.delete(first)?;
                }
                let mut added = 0;
                if !value.is_empty() {
                    table.insert_node(first, Some(pre), NodeKind::Text, 0, 0, value)?;
                    added = 1;
                }
                Ok(Some(Splice { at: first, removed, added, texts: false }))
            }
            UpdateOp::Rename(name) => {
                let prefix = |n: &str| n.split_once(':').map(|(p, _)| p.to_string());
                let keep_uri = table.node_name(pre).map(prefix) == Some(prefix(name.as_str()));
                let uri = if keep_uri { table.uri(pre).map(str::to_string) } else { None };
                table.rename(pre, name, uri.as_deref())?;
                Ok(None)
            }
        }
    }

    fn replace_node(&self, table: &mut NodeTable, payload: &NodeTable) -> Result<Option<Splice>> {
        let pre = self.target;
        let old = table.size(pre);
        if self.kind == NodeKind::Text && payload.len() == 1 && payload.kind(0) == NodeKind::Text {
            trace!(pre, "replaced text in place");
            table.update_text(pre, payload.text(0))?;
            return Ok(None);
        }
        if !table.subtree_has_namespaces(pre) && !payload.has_namespaces() {
            table.replace(pre, payload)?;
        } else {
            table.delete(pre)?;
            match (self.kind, self.parent) {
                (NodeKind::Attribute, Some(owner)) => table.insert_attr(pre, owner, payload)?,
                _ => table.insert(pre, self.parent, payload)?,
            };
        }
        trace!(pre, delta = payload.len() as isize - old as isize, "replaced node");
        Ok(Some(Splice { at: pre, removed: old, added: payload.len(), texts: self.kind != NodeKind::Attribute }))
    }
}

/// Region rewritten by one applied primitive: `removed` records starting at
/// `at` were replaced by `added` records. `texts` marks splices whose edges
/// may leave two text nodes side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Splice {
    pub at: usize,
    pub removed: usize,
    pub added: usize,
    pub texts: bool,
}

impl Splice {
    /// Position of `pre` after this splice, `None` if the splice removed it.
    fn shift(&self, pre: usize) -> Option<usize> {
        if self.removed > 0 && (self.at..self.at + self.removed).contains(&pre) {
            None
        } else if pre > self.at {
            Some(pre - self.removed + self.added)
        } else {
            Some(pre)
        }
    }
}

/// Merges adjacent texts at the edges of every splice, in table coordinates
/// after the last splice. Each position is carried through the splices
/// applied after its own; seams inside removed regions are dropped. Returns
/// the number of seams that merged.
pub(crate) fn merge_seams(table: &mut NodeTable, splices: &[Splice]) -> Result<usize> {
    let mut seams: Vec<(usize, usize)> = Vec::new();
    for (i, splice) in splices.iter().enumerate().filter(|(_, s)| s.texts) {
        let pre = splices[i + 1..].iter().try_fold(splice.at, |pre, later| later.shift(pre));
        seams.extend(pre.map(|pre| (pre, splice.added)));
    }
    // back to front, so merges never move a seam still to be visited
    seams.sort_unstable_by(|a, b| b.cmp(a));
    let mut merged = 0;
    for (pre, n) in seams {
        if adjacent_texts(table, pre, n)? {
            merged += 1;
        }
    }
    Ok(merged)
}

impl fmt::Display for UpdatePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info)
    }
}

/// Merges text nodes that became neighbours through a change of `n` records
/// at `pre`: the pair around the end of the change first, then the pair at
/// its start. Returns `true` if anything was merged.
pub fn adjacent_texts(table: &mut NodeTable, pre: usize, n: usize) -> Result<bool> {
    let mut merged = false;
    if n > 0 {
        merged |= table.merge_texts(pre + n - 1, pre + n)?;
    }
    if pre > 0 {
        merged |= table.merge_texts(pre - 1, pre)?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_carry_positions_forward() {
        let delete = Splice { at: 3, removed: 2, added: 0, texts: true };
        assert_eq!(delete.shift(2), Some(2));
        assert_eq!(delete.shift(4), None);
        assert_eq!(delete.shift(6), Some(4));
        let insert = Splice { at: 3, removed: 0, added: 2, texts: true };
        assert_eq!(insert.shift(3), Some(3));
        assert_eq!(insert.shift(4), Some(6));
    }
}
