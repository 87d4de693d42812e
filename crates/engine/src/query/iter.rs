//! Lazy pull iterators.
//!
//! Every expression evaluates to an [`Iter`]: one tagged enum with a single
//! capability set (`next`, `get`, `size`, `reset`). Exhaustion is signalled
//! by `Ok(None)`; errors are reserved for evaluation failures.

use super::axis::StepIter;
use super::context::{Focus, QueryContext};
use super::flwor::{FlworIter, ForIter, LetIter};
use super::updating;
use super::vars::Parked;
use crate::error::{Error, ErrorCode, Result};
use crate::ft;
use crate::query::Expr;
use crate::xdm::{AtomicValue, Item, Sequence, ebv};

pub enum Iter<'e> {
    Empty,
    /// Items borrowed from a literal.
    Slice { items: &'e [Item], pos: usize },
    Seq { items: Sequence, pos: usize },
    /// Inclusive integer range.
    Range { start: i64, end: i64, next: i64 },
    Step(Box<StepIter<'e>>),
    Concat { exprs: &'e [Expr], idx: usize, cur: Option<Box<Iter<'e>>> },
    Filter(Box<FilterIter<'e>>),
    For(Box<ForIter<'e>>),
    Let(Box<LetIter<'e>>),
    Flwor(Box<FlworIter<'e>>),
}

impl<'e> Iter<'e> {
    pub fn new(expr: &'e Expr, ctx: &mut QueryContext<'_>) -> Result<Self> {
        let iter = match expr {
            Expr::Value(items) => Iter::Slice { items, pos: 0 },
            Expr::Var(name) => {
                let value = ctx
                    .vars
                    .lookup(name)
                    .ok_or_else(|| Error::from_code(ErrorCode::XPST0008, format!("undeclared variable ${name}")))?;
                Iter::from(value.clone())
            }
            Expr::Context => {
                let focus = ctx.focus().ok_or_else(|| Error::type_error("context item is undefined"))?;
                Iter::from(vec![focus.item.clone()])
            }
            Expr::Root => {
                let table = ctx.table();
                let mut pre = match ctx.focus().map(|f| &f.item) {
                    Some(Item::Node(n)) => n.pre,
                    _ => 0,
                };
                if table.is_empty() {
                    return Ok(Iter::Empty);
                }
                while let Some(parent) = table.parent(pre) {
                    pre = parent;
                }
                Iter::from(vec![Item::node(pre)])
            }
            Expr::Step { input, axis, test } => {
                let input = Iter::new(input, ctx)?;
                Iter::Step(Box::new(StepIter::new(input, *axis, test)))
            }
            Expr::Range(lo, hi) => {
                let lo = integer(ctx, lo)?;
                let hi = integer(ctx, hi)?;
                match (lo, hi) {
                    (Some(start), Some(end)) => Iter::Range { start, end, next: start },
                    _ => Iter::Empty,
                }
            }
            Expr::Concat(exprs) => Iter::Concat { exprs, idx: 0, cur: None },
            Expr::Filter { input, predicate } => {
                let input = Iter::new(input, ctx)?;
                Iter::Filter(Box::new(FilterIter { input, predicate, pos: 0, parked: Parked::new() }))
            }
            Expr::Contains { input, query } => Iter::from(vec![ft::contains(ctx, input, query)?]),
            Expr::Flwor(flwor) => Iter::Flwor(Box::new(FlworIter::new(flwor))),
            Expr::Fragment(_) => {
                return Err(Error::type_error("constructed nodes are only supported as update sources"));
            }
            Expr::ReplaceNode { .. }
            | Expr::Delete(_)
            | Expr::Insert { .. }
            | Expr::ReplaceValue { .. }
            | Expr::Rename { .. } => {
                updating::collect(expr, ctx)?;
                Iter::Empty
            }
        };
        Ok(iter)
    }

    pub fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        match self {
            Iter::Empty => Ok(None),
            Iter::Slice { items, pos } => {
                let item = items.get(*pos).cloned();
                *pos += usize::from(item.is_some());
                Ok(item)
            }
            Iter::Seq { items, pos } => {
                let item = items.get(*pos).cloned();
                *pos += usize::from(item.is_some());
                Ok(item)
            }
            Iter::Range { end, next, .. } => {
                if *next > *end {
                    return Ok(None);
                }
                let v = *next;
                *next += 1;
                Ok(Some(Item::integer(v)))
            }
            Iter::Step(step) => step.next(ctx),
            Iter::Concat { exprs, idx, cur } => loop {
                if let Some(it) = cur {
                    if let Some(item) = it.next(ctx)? {
                        return Ok(Some(item));
                    }
                    *cur = None;
                    *idx += 1;
                }
                let Some(expr) = exprs.get(*idx) else {
                    return Ok(None);
                };
                *cur = Some(Box::new(Iter::new(expr, ctx)?));
            },
            Iter::Filter(filter) => filter.next(ctx),
            Iter::For(f) => f.next(ctx),
            Iter::Let(l) => l.next(ctx),
            Iter::Flwor(f) => f.next(ctx),
        }
    }

    /// Pulls the next item with the bindings this iterator made on earlier
    /// pulls restored from `parked`, then parks them again, so the caller's
    /// scope never sees them.
    pub fn next_parked(&mut self, ctx: &mut QueryContext<'_>, parked: &mut Parked) -> Result<Option<Item>> {
        let base = ctx.vars.mark();
        ctx.vars.unpark(parked);
        let next = self.next(ctx);
        ctx.vars.park(base, parked);
        next
    }

    /// Item at position `i` (0-based). Streaming variants are fully
    /// materialized first; later calls to `next` start over at the first
    /// item.
    pub fn get(&mut self, ctx: &mut QueryContext<'_>, i: usize) -> Result<Option<Item>> {
        match self {
            Iter::Empty => Ok(None),
            Iter::Slice { items, .. } => Ok(items.get(i).cloned()),
            Iter::Seq { items, .. } => Ok(items.get(i).cloned()),
            Iter::Range { start, end, .. } => {
                let (start, end) = (*start, *end);
                let v = i64::try_from(i).ok().and_then(|i| start.checked_add(i));
                Ok(v.filter(|v| *v <= end).map(Item::integer))
            }
            _ => {
                self.reset(ctx);
                let items = self.drain(ctx)?;
                let item = items.get(i).cloned();
                *self = Iter::Seq { items, pos: 0 };
                Ok(item)
            }
        }
    }

    /// Declared number of items, if known without evaluation.
    pub fn size(&self) -> Option<usize> {
        match self {
            Iter::Empty => Some(0),
            Iter::Slice { items, .. } => Some(items.len()),
            Iter::Seq { items, .. } => Some(items.len()),
            Iter::Range { start, end, .. } => {
                Some(if end < start { 0 } else { usize::try_from(end - start).ok()?.checked_add(1)? })
            }
            Iter::For(f) => f.size(),
            Iter::Let(_) => Some(1),
            Iter::Step(_) | Iter::Concat { .. } | Iter::Filter(_) | Iter::Flwor(_) => None,
        }
    }

    /// Rewinds the iterator to its first item and releases every variable
    /// binding it made. Returns `true` if the iterator supports restarting.
    pub fn reset(&mut self, ctx: &mut QueryContext<'_>) -> bool {
        match self {
            Iter::Empty => true,
            Iter::Slice { pos, .. } | Iter::Seq { pos, .. } => {
                *pos = 0;
                true
            }
            Iter::Range { start, next, .. } => {
                *next = *start;
                true
            }
            Iter::Step(step) => step.reset(ctx),
            Iter::Concat { idx, cur, .. } => {
                if let Some(mut it) = cur.take() {
                    it.reset(ctx);
                }
                *idx = 0;
                true
            }
            Iter::Filter(filter) => {
                filter.pos = 0;
                ctx.vars.unpark(&mut filter.parked);
                let restarted = filter.input.reset(ctx);
                filter.parked.clear();
                restarted
            }
            Iter::For(f) => f.reset(ctx),
            Iter::Let(l) => l.reset(ctx),
            Iter::Flwor(f) => f.reset(ctx),
        }
    }

    /// Pulls all remaining items.
    pub fn drain(&mut self, ctx: &mut QueryContext<'_>) -> Result<Sequence> {
        let mut out = Sequence::with_capacity(self.size().unwrap_or(0));
        while let Some(item) = self.next(ctx)? {
            out.push(item);
        }
        Ok(out)
    }
}

impl From<Sequence> for Iter<'_> {
    fn from(items: Sequence) -> Self {
        Iter::Seq { items, pos: 0 }
    }
}

/// Filter expression `input[predicate]`. A single numeric predicate value
/// selects by position; otherwise the effective boolean value decides. Scores
/// of the predicate result are carried over to the selected item.
pub struct FilterIter<'e> {
    input: Iter<'e>,
    predicate: &'e Expr,
    pos: usize,
    // bindings of the input, hidden from the predicate
    parked: Parked,
}

impl FilterIter<'_> {
    fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        loop {
            let Some(item) = self.input.next_parked(ctx, &mut self.parked)? else {
                return Ok(None);
            };
            self.pos += 1;
            let previous = ctx.replace_focus(Some(Focus { item: item.clone(), position: self.pos }));
            let result = ctx.evaluate(self.predicate);
            ctx.replace_focus(previous);
            let result = result?;
            let keep = match result.as_slice() {
                [Item::Atomic(AtomicValue::Integer(n))] => usize::try_from(*n).is_ok_and(|n| n == self.pos),
                [Item::Atomic(AtomicValue::Double(d))] => *d == self.pos as f64,
                other => ebv(other)?,
            };
            if keep {
                let score: f64 = result.iter().map(Item::score).sum();
                return Ok(Some(if score > 0.0 { item.with_score(score) } else { item }));
            }
        }
    }
}

/// Evaluates `expr` to at most one integer.
fn integer(ctx: &mut QueryContext<'_>, expr: &Expr) -> Result<Option<i64>> {
    let items = ctx.evaluate(expr)?;
    match items.as_slice() {
        [] => Ok(None),
        [item] => item.as_integer().map(Some).ok_or_else(|| Error::type_error("range bound is not an integer")),
        _ => Err(Error::type_error("range bound is a sequence of several items")),
    }
}
