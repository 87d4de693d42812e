//! Embeddable XML database core.
//!
//! Documents live in a flat [`NodeTable`] addressed by pre-order position.
//! A [`Builder`] fills tables from event streams or XML input, queries run as
//! lazy [`Iter`]ators over a [`QueryContext`], full-text predicates score
//! their matches, and update expressions collect [`UpdatePrimitive`]s that
//! are applied to the table in a separate phase.

pub mod build;
pub mod consts;
pub mod data;
pub mod error;
pub mod ft;
pub mod model;
pub mod options;
pub mod query;
pub mod update;
pub mod xdm;

pub use build::{BuildEvent, Builder, EventParser, Parser, TextKind, XmlParser};
pub use data::{NodeRecord, NodeTable};
pub use error::{Error, ErrorCode, Result};
pub use ft::{FtExpr, FtMode, FtPositions, FtSink};
pub use model::NodeKind;
pub use options::{FtCase, FtOptions, Options};
pub use query::{Expr, Flwor, Iter, QueryContext, QueryContextBuilder, VarStack};
pub use update::{PendingUpdates, UpdateOp, UpdatePrimitive};
pub use xdm::{AtomicValue, Item, Sequence};

