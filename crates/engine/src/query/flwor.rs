//! FLWOR clauses.
//!
//! `For` and `Let` are iterators that bind onto the variable stack: every
//! successful `next` leaves the clause's variables bound, exhaustion resets
//! the clause and removes them again. A [`FlworIter`] drives its clauses like
//! an odometer, re-evaluating the inner clauses for every binding of the
//! outer ones. Bindings made inside a `for` source are parked between pulls
//! and never leak into the clause's scope.

use smallvec::SmallVec;

use super::context::QueryContext;
use super::expr::{Clause, Flwor, ForClause, LetClause};
use super::iter::Iter;
use super::vars::Parked;
use crate::error::Result;
use crate::xdm::{Item, ebv};

/// `for $x at $pos score $s in expr`.
pub struct ForIter<'e> {
    clause: &'e ForClause,
    source: Option<Iter<'e>>,
    // stack size captured at the first `next`
    mark: Option<usize>,
    slot: usize,
    pos: i64,
    parked: Parked,
}

impl<'e> ForIter<'e> {
    pub fn new(clause: &'e ForClause) -> Self {
        Self { clause, source: None, mark: None, slot: 0, pos: 0, parked: Parked::new() }
    }

    pub fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        if self.source.is_none() {
            let source = Iter::new(&self.clause.expr, ctx)?;
            self.source = Some(source);
            self.mark = Some(ctx.vars.mark());
            // slots are reserved once and overwritten per item: variable,
            // position, score
            self.slot = ctx.vars.push(self.clause.var.clone(), Vec::new());
            if let Some(pos) = &self.clause.pos {
                ctx.vars.push(pos.clone(), Vec::new());
            }
            if let Some(score) = &self.clause.score {
                ctx.vars.push(score.clone(), Vec::new());
            }
        }
        let next = match self.source.as_mut() {
            Some(source) => source.next_parked(ctx, &mut self.parked)?,
            None => None,
        };
        let Some(item) = next else {
            self.reset(ctx);
            return Ok(None);
        };
        self.pos += 1;
        let mut slot = self.slot;
        ctx.vars.set(slot, vec![item.clone()]);
        if self.clause.pos.is_some() {
            slot += 1;
            ctx.vars.set(slot, vec![Item::integer(self.pos)]);
        }
        if self.clause.score.is_some() {
            ctx.vars.set(slot + 1, vec![Item::double(item.score())]);
        }
        Ok(Some(item))
    }

    pub fn size(&self) -> Option<usize> {
        self.source.as_ref().and_then(Iter::size)
    }

    pub fn reset(&mut self, ctx: &mut QueryContext<'_>) -> bool {
        ctx.vars.unpark(&mut self.parked);
        if let Some(mut source) = self.source.take() {
            source.reset(ctx);
        }
        if let Some(mark) = self.mark.take() {
            ctx.vars.restore(mark);
        }
        self.parked.clear();
        self.pos = 0;
        true
    }
}

/// `let $x := expr` / `let score $x := expr`. Binds once, then reports the
/// end of the sequence.
pub struct LetIter<'e> {
    clause: &'e LetClause,
    mark: Option<usize>,
}

impl<'e> LetIter<'e> {
    pub fn new(clause: &'e LetClause) -> Self {
        Self { clause, mark: None }
    }

    /// The returned item only signals the binding event; the bound value is
    /// on the variable stack.
    pub fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        if self.mark.is_some() {
            self.reset(ctx);
            return Ok(None);
        }
        let items = ctx.evaluate(&self.clause.expr)?;
        let value = if self.clause.score {
            vec![Item::double(average_score(&items))]
        } else {
            items
        };
        self.mark = Some(ctx.vars.mark());
        ctx.vars.push(self.clause.var.clone(), value);
        Ok(Some(Item::boolean(true)))
    }

    pub fn reset(&mut self, ctx: &mut QueryContext<'_>) -> bool {
        if let Some(mark) = self.mark.take() {
            ctx.vars.restore(mark);
        }
        true
    }
}

/// Average relevance over all items, zero-score items included; 0 for the
/// empty sequence.
pub fn average_score(items: &[Item]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(Item::score).sum::<f64>() / items.len() as f64
}

pub struct FlworIter<'e> {
    flwor: &'e Flwor,
    clauses: SmallVec<[Iter<'e>; 4]>,
    ret: Option<Iter<'e>>,
    started: bool,
    // exhausted; stays set until `reset`
    done: bool,
}

impl<'e> FlworIter<'e> {
    pub fn new(flwor: &'e Flwor) -> Self {
        let clauses = flwor
            .clauses
            .iter()
            .map(|c| match c {
                Clause::For(f) => Iter::For(Box::new(ForIter::new(f))),
                Clause::Let(l) => Iter::Let(Box::new(LetIter::new(l))),
            })
            .collect();
        Self { flwor, clauses, ret: None, started: false, done: false }
    }

    pub fn next(&mut self, ctx: &mut QueryContext<'_>) -> Result<Option<Item>> {
        loop {
            if let Some(ret) = self.ret.as_mut() {
                if let Some(item) = ret.next(ctx)? {
                    return Ok(Some(item));
                }
                self.ret = None;
            }
            if !self.advance(ctx)? {
                return Ok(None);
            }
            if let Some(cond) = &self.flwor.where_clause {
                let value = ctx.evaluate(cond)?;
                if !ebv(&value)? {
                    continue;
                }
            }
            self.ret = Some(Iter::new(&self.flwor.ret, ctx)?);
        }
    }

    /// Moves to the next tuple of bindings. The innermost clause advances
    /// first; an exhausted clause has already reset itself, so the clause
    /// before it advances and the exhausted one starts over.
    fn advance(&mut self, ctx: &mut QueryContext<'_>) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let n = self.clauses.len();
        if n == 0 {
            self.done = self.started;
            self.started = true;
            return Ok(!self.done);
        }
        let mut i = if self.started { n - 1 } else { 0 };
        self.started = true;
        loop {
            if self.clauses[i].next(ctx)?.is_some() {
                if i + 1 == n {
                    return Ok(true);
                }
                i += 1;
            } else if i == 0 {
                self.started = false;
                self.done = true;
                return Ok(false);
            } else {
                i -= 1;
            }
        }
    }

    pub fn reset(&mut self, ctx: &mut QueryContext<'_>) -> bool {
        if let Some(mut ret) = self.ret.take() {
            ret.reset(ctx);
        }
        for clause in self.clauses.iter_mut().rev() {
            clause.reset(ctx);
        }
        self.started = false;
        self.done = false;
        true
    }
}
