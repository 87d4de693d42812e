//! Compiled expression tree.
//!
//! Expressions arrive already built; there is no parser in this crate. The
//! helpers at the bottom keep hand-built trees short in host code and tests.

use std::sync::Arc;

use string_cache::DefaultAtom;

use crate::data::NodeTable;
use crate::ft::FtExpr;
use crate::model::NodeKind;
use crate::xdm::{Item, Sequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    SelfAxis,
    Child,
    Attribute,
    Descendant,
    DescendantOrSelf,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    Any,
    Kind(NodeKind),
    /// Name test against the principal node kind of the axis (attributes on
    /// the attribute axis, elements otherwise). Matches the full lexical
    /// name or, for unprefixed tests, the local name.
    Name(DefaultAtom),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Into,
    Before,
}

#[derive(Debug, Clone)]
pub struct ForClause {
    pub var: DefaultAtom,
    pub pos: Option<DefaultAtom>,
    pub score: Option<DefaultAtom>,
    pub expr: Expr,
}

/// `let $var := expr` or, with `score`, `let score $var := expr`.
#[derive(Debug, Clone)]
pub struct LetClause {
    pub var: DefaultAtom,
    pub score: bool,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub enum Clause {
    For(ForClause),
    Let(LetClause),
}

#[derive(Debug, Clone)]
pub struct Flwor {
    pub clauses: Vec<Clause>,
    pub where_clause: Option<Box<Expr>>,
    pub ret: Box<Expr>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Value(Sequence),
    Var(DefaultAtom),
    Context,
    Root,
    Step { input: Box<Expr>, axis: Axis, test: NodeTest },
    Range(Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
    Filter { input: Box<Expr>, predicate: Box<Expr> },
    Contains { input: Box<Expr>, query: Box<FtExpr> },
    Flwor(Flwor),
    /// Constructed nodes (a fragment table); only valid as an update source.
    Fragment(Arc<NodeTable>),
    ReplaceNode { target: Box<Expr>, with: Box<Expr> },
    Delete(Box<Expr>),
    Insert { source: Box<Expr>, target: Box<Expr>, position: InsertPosition },
    ReplaceValue { target: Box<Expr>, value: Box<Expr> },
    Rename { target: Box<Expr>, name: Box<Expr> },
}

impl Expr {
    pub fn value(items: Sequence) -> Self {
        Expr::Value(items)
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(DefaultAtom::from(name))
    }

    pub fn step(self, axis: Axis, test: NodeTest) -> Self {
        Expr::Step { input: Box::new(self), axis, test }
    }

    pub fn child(self, name: &str) -> Self {
        self.step(Axis::Child, NodeTest::Name(name.into()))
    }

    pub fn descendant(self, name: &str) -> Self {
        self.step(Axis::Descendant, NodeTest::Name(name.into()))
    }

    pub fn range(lo: i64, hi: i64) -> Self {
        Expr::Range(Box::new(Expr::Value(vec![Item::integer(lo)])), Box::new(Expr::Value(vec![Item::integer(hi)])))
    }

    pub fn filter(self, predicate: Expr) -> Self {
        Expr::Filter { input: Box::new(self), predicate: Box::new(predicate) }
    }

    pub fn contains_text(self, query: FtExpr) -> Self {
        Expr::Contains { input: Box::new(self), query: Box::new(query) }
    }

    /// True for expressions that collect update primitives.
    pub fn is_updating(&self) -> bool {
        match self {
            Expr::ReplaceNode { .. }
            | Expr::Delete(_)
            | Expr::Insert { .. }
            | Expr::ReplaceValue { .. }
            | Expr::Rename { .. } => true,
            Expr::Concat(exprs) => exprs.iter().any(Expr::is_updating),
            Expr::Flwor(f) => f.ret.is_updating(),
            _ => false,
        }
    }
}

impl Flwor {
    pub fn new(ret: Expr) -> Self {
        Self { clauses: Vec::new(), where_clause: None, ret: Box::new(ret) }
    }

    pub fn for_in(mut self, var: &str, expr: Expr) -> Self {
        self.clauses.push(Clause::For(ForClause { var: var.into(), pos: None, score: None, expr }));
        self
    }

    /// `for $var at $pos score $score in expr`; either extra variable may be
    /// omitted.
    pub fn for_at(mut self, var: &str, pos: Option<&str>, score: Option<&str>, expr: Expr) -> Self {
        self.clauses.push(Clause::For(ForClause {
            var: var.into(),
            pos: pos.map(DefaultAtom::from),
            score: score.map(DefaultAtom::from),
            expr,
        }));
        self
    }

    pub fn let_bind(mut self, var: &str, expr: Expr) -> Self {
        self.clauses.push(Clause::Let(LetClause { var: var.into(), score: false, expr }));
        self
    }

    pub fn let_score(mut self, var: &str, expr: Expr) -> Self {
        self.clauses.push(Clause::Let(LetClause { var: var.into(), score: true, expr }));
        self
    }

    pub fn where_(mut self, cond: Expr) -> Self {
        self.where_clause = Some(Box::new(cond));
        self
    }

    pub fn build(self) -> Expr {
        Expr::Flwor(self)
    }
}
