//! Full-text matching: tokenization, predicate evaluation, relevance scoring
//! and the highlight side channel.

mod contains;
mod expr;
mod lexer;
pub mod scoring;
mod sink;

pub use contains::contains;
pub use expr::{FtExpr, FtMatch, FtMode};
pub use lexer::{FtLexer, Token};
pub use sink::{FtHit, FtPositions, FtSink, FtSpan};
