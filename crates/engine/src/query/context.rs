use string_cache::DefaultAtom;
use tracing::debug;

use super::iter::Iter;
use super::vars::VarStack;
use crate::data::NodeTable;
use crate::error::Result;
use crate::ft::{FtLexer, FtSink};
use crate::options::FtOptions;
use crate::query::Expr;
use crate::update::PendingUpdates;
use crate::xdm::{Item, Sequence};

/// Context item and its 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub item: Item,
    pub position: usize,
}

/// State of one running query: the table it reads, its variable bindings,
/// the full-text lexer pool and the updates collected so far.
pub struct QueryContext<'d> {
    table: &'d NodeTable,
    pub(crate) vars: VarStack,
    focus: Option<Focus>,
    ft_options: FtOptions,
    lexers: Vec<FtLexer>,
    sink: Option<Box<dyn FtSink + 'd>>,
    updates: PendingUpdates,
}

impl<'d> QueryContext<'d> {
    pub fn new(table: &'d NodeTable) -> Self {
        QueryContextBuilder::new(table).build()
    }

    pub fn builder(table: &'d NodeTable) -> QueryContextBuilder<'d> {
        QueryContextBuilder::new(table)
    }

    pub fn table(&self) -> &'d NodeTable {
        self.table
    }

    pub fn vars(&self) -> &VarStack {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStack {
        &mut self.vars
    }

    pub fn focus(&self) -> Option<&Focus> {
        self.focus.as_ref()
    }

    /// Installs a new focus and returns the previous one.
    pub fn replace_focus(&mut self, focus: Option<Focus>) -> Option<Focus> {
        core::mem::replace(&mut self.focus, focus)
    }

    pub fn ft_options(&self) -> &FtOptions {
        &self.ft_options
    }

    pub fn sink_mut(&mut self) -> Option<&mut (dyn FtSink + 'd)> {
        self.sink.as_deref_mut()
    }

    pub fn updates(&self) -> &PendingUpdates {
        &self.updates
    }

    pub(crate) fn updates_mut(&mut self) -> &mut PendingUpdates {
        &mut self.updates
    }

    /// Ends the read phase and hands the collected primitives to the caller,
    /// which applies them to the table once no reader is left.
    pub fn into_updates(self) -> PendingUpdates {
        debug!(primitives = self.updates.len(), "query finished");
        self.updates
    }

    /// Creates the lazy iterator for `expr`.
    pub fn iter<'e>(&mut self, expr: &'e Expr) -> Result<Iter<'e>> {
        Iter::new(expr, self)
    }

    /// Evaluates `expr` to a materialized sequence.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Sequence> {
        let mut iter = Iter::new(expr, self)?;
        iter.drain(self)
    }

    /// Runs `f` with a lexer taken from the pool. The lexer goes back to the
    /// pool whether `f` succeeds or fails.
    pub fn with_lexer<T>(&mut self, f: impl FnOnce(&mut Self, &mut FtLexer) -> Result<T>) -> Result<T> {
        let mut lexer = self.lexers.pop().unwrap_or_else(|| FtLexer::new(self.ft_options.clone()));
        let result = f(self, &mut lexer);
        lexer.reset();
        self.lexers.push(lexer);
        result
    }

    /// Number of idle lexers in the pool.
    pub fn idle_lexers(&self) -> usize {
        self.lexers.len()
    }
}

pub struct QueryContextBuilder<'d> {
    table: &'d NodeTable,
    vars: VarStack,
    focus: Option<Focus>,
    ft_options: FtOptions,
    sink: Option<Box<dyn FtSink + 'd>>,
}

impl<'d> QueryContextBuilder<'d> {
    pub fn new(table: &'d NodeTable) -> Self {
        Self { table, vars: VarStack::new(), focus: None, ft_options: FtOptions::default(), sink: None }
    }

    /// Binds an external variable for the whole query.
    pub fn variable(mut self, name: &str, value: Sequence) -> Self {
        self.vars.push(DefaultAtom::from(name), value);
        self
    }

    pub fn context_item(mut self, item: Item) -> Self {
        self.focus = Some(Focus { item, position: 1 });
        self
    }

    pub fn ft_options(mut self, options: FtOptions) -> Self {
        self.ft_options = options;
        self
    }

    pub fn sink(mut self, sink: impl FtSink + 'd) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> QueryContext<'d> {
        QueryContext {
            table: self.table,
            vars: self.vars,
            focus: self.focus,
            ft_options: self.ft_options,
            lexers: Vec::new(),
            sink: self.sink,
            updates: PendingUpdates::new(),
        }
    }
}
