use super::context::QueryContext;
use super::expr::{Axis, NodeTest};
use super::iter::Iter;
use crate::data::NodeTable;
use crate::error::{Error, Result};
use crate::model::NodeKind;
use crate::xdm::Item;

/// Position cursor over the nodes one context node reaches on an axis.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    pending: Option<usize>,
    next: usize,
    end: usize,
    by_subtree: bool,
    skip_attrs: bool,
}

impl Cursor {
    fn new(table: &NodeTable, pre: usize, axis: Axis) -> Self {
        let first_child = pre + table.attr_size(pre);
        let end = pre + table.size(pre);
        let empty = Cursor { pending: None, next: 0, end: 0, by_subtree: false, skip_attrs: false };
        match axis {
            Axis::SelfAxis => Cursor { pending: Some(pre), ..empty },
            Axis::Parent => Cursor { pending: table.parent(pre), ..empty },
            Axis::Child => Cursor { next: first_child, end, by_subtree: true, ..empty },
            Axis::Attribute => Cursor { next: pre + 1, end: first_child, ..empty },
            Axis::Descendant => Cursor { next: first_child, end, skip_attrs: true, ..empty },
            Axis::DescendantOrSelf => Cursor { pending: Some(pre), next: first_child, end, skip_attrs: true, ..empty },
        }
    }

    fn advance(&mut self, table: &NodeTable) -> Option<usize> {
        if let Some(pre) = self.pending.take() {
            return Some(pre);
        }
        while self.next < self.end {
            let pre = self.next;
            self.next += if self.by_subtree { table.size(pre) } else { 1 };
            if self.skip_attrs && table.kind(pre) == NodeKind::Attribute {
                continue;
            }
            return Some(pre);
        }
        None
    }
}

enum AxisState {
    Init,
    // single context node: results are produced in document order as they
    // are found
    Stream(Option<Cursor>),
    // several context nodes: results are collected, sorted and deduplicated
    Sorted { pres: Vec<usize>, pos: usize },
}

/// Axis step `input/axis::test`.
pub struct StepIter<'e> {
    input: Iter<'e>,
    axis: Axis,
    test: &'e NodeTest,
    state: AxisState,
}

impl<'e> StepIter<'e> {
    pub fn new(input: Iter<'e>, axis: Axis, test: &'e NodeTest) -> Self {
        Self { input, axis, test, state: AxisState::Init }
    }

    pub fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        let table = ctx.table();
        if let AxisState::Init = self.state {
            self.state = if self.input.size() == Some(1) {
                AxisState::Stream(None)
            } else {
                let mut pres = Vec::new();
                while let Some(pre) = self.context_node(ctx)? {
                    let mut cursor = Cursor::new(table, pre, self.axis);
                    while let Some(p) = cursor.advance(table) {
                        if matches(table, p, self.axis, self.test) {
                            pres.push(p);
                        }
                    }
                }
                pres.sort_unstable();
                pres.dedup();
                AxisState::Sorted { pres, pos: 0 }
            };
        }
        loop {
            match &mut self.state {
                AxisState::Sorted { pres, pos } => {
                    let item = pres.get(*pos).map(|p| Item::node(*p));
                    *pos += usize::from(item.is_some());
                    return Ok(item);
                }
                AxisState::Stream(Some(cursor)) => match cursor.advance(table) {
                    Some(p) if matches(table, p, self.axis, self.test) => return Ok(Some(Item::node(p))),
                    Some(_) => {}
                    None => self.state = AxisState::Stream(None),
                },
                AxisState::Stream(None) => match self.context_node(ctx)? {
                    Some(pre) => self.state = AxisState::Stream(Some(Cursor::new(table, pre, self.axis))),
                    None => return Ok(None),
                },
                AxisState::Init => return Ok(None),
            }
        }
    }

    pub fn reset(&mut self, ctx: &mut QueryContext<'_>) -> bool {
        self.state = AxisState::Init;
        self.input.reset(ctx)
    }

    fn context_node(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<usize>> {
        match self.input.next(ctx)? {
            None => Ok(None),
            Some(Item::Node(n)) => Ok(Some(n.pre)),
            Some(Item::Atomic(a)) => Err(Error::type_error(format!("axis step applied to atomic value {a}"))),
        }
    }
}

fn matches(table: &NodeTable, pre: usize, axis: Axis, test: &NodeTest) -> bool {
    match test {
        NodeTest::Any => true,
        NodeTest::Kind(kind) => table.kind(pre) == *kind,
        NodeTest::Name(name) => {
            let principal = if axis == Axis::Attribute { NodeKind::Attribute } else { NodeKind::Element };
            if table.kind(pre) != principal {
                return false;
            }
            let name: &str = name;
            table.node_name(pre) == Some(name) || !name.contains(':') && table.local_name(pre) == Some(name)
        }
    }
}
