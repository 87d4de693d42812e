//! Lazy query evaluation over a node table.

mod axis;
mod context;
mod expr;
mod flwor;
mod iter;
mod updating;
mod vars;

pub use axis::StepIter;
pub use context::{Focus, QueryContext, QueryContextBuilder};
pub use expr::{Axis, Clause, Expr, Flwor, ForClause, InsertPosition, LetClause, NodeTest};
pub use flwor::{FlworIter, ForIter, LetIter, average_score};
pub use iter::{FilterIter, Iter};
pub use vars::{Binding, Parked, VarStack};
