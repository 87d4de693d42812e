use tracing::trace;

use super::expr::FtExpr;
use super::scoring;
use crate::error::Result;
use crate::query::{Expr, Iter, Parked, QueryContext};
use crate::xdm::Item;

/// `input contains text query`.
///
/// Every item of `input` is tokenized and matched on its own. Scores of the
/// matching items are folded with the AND combinator; a match without a
/// score counts as 1. The result is a boolean carrying the aggregate score,
/// true iff that score is positive.
pub fn contains(ctx: &mut QueryContext<'_>, input: &Expr, query: &FtExpr) -> Result<Item> {
    ctx.with_lexer(|ctx, lexer| {
        let mut iter = Iter::new(input, ctx)?;
        let mut parked = Parked::new();
        let mut score = 0.0;
        while let Some(item) = iter.next_parked(ctx, &mut parked)? {
            let text = item.string_value(ctx.table());
            lexer.init(&text);
            let m = query.eval(ctx, lexer)?;
            if !m.matched {
                continue;
            }
            let item_score = scoring::normalize(m.score);
            score = scoring::combine(score, item_score);
            if let Item::Node(node) = &item {
                let doc = ctx.table().doc_name();
                if let Some(sink) = ctx.sink_mut() {
                    sink.record(doc, node.pre, &m.spans);
                }
            }
            trace!(score = item_score, hits = m.spans.len(), "full-text match");
        }
        Ok(Item::scored_boolean(score > 0.0, score))
    })
}
