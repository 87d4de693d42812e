use super::lexer::{FtLexer, Token};
use super::scoring;
use super::sink::FtSpan;
use crate::error::{Error, ErrorCode, Result};
use crate::query::{Expr, QueryContext};
use crate::xdm::Item;

/// How the strings of a `Words` selection are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtMode {
    /// Some string occurs as a phrase.
    #[default]
    Any,
    /// Every string occurs as a phrase.
    All,
    /// All strings together form a single phrase.
    Phrase,
    /// Some word of any string occurs.
    AnyWord,
    /// Every word of every string occurs.
    AllWords,
}

/// Full-text predicate tree.
#[derive(Debug, Clone)]
pub enum FtExpr {
    Words { query: Box<Expr>, mode: FtMode },
    And(Vec<FtExpr>),
    Or(Vec<FtExpr>),
    Not(Box<FtExpr>),
}

/// Outcome of matching a predicate against the tokens of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FtMatch {
    pub matched: bool,
    pub score: f64,
    pub spans: Vec<FtSpan>,
}

impl FtMatch {
    fn none() -> Self {
        Self::default()
    }
}

impl FtExpr {
    /// `contains text "text"` with the default mode.
    pub fn words(text: &str) -> Self {
        FtExpr::Words { query: Box::new(Expr::Value(vec![Item::string(text)])), mode: FtMode::Any }
    }

    pub fn words_mode(texts: &[&str], mode: FtMode) -> Self {
        let items = texts.iter().map(|t| Item::string(*t)).collect();
        FtExpr::Words { query: Box::new(Expr::Value(items)), mode }
    }

    pub fn and(self, other: FtExpr) -> Self {
        match self {
            FtExpr::And(mut ops) => {
                ops.push(other);
                FtExpr::And(ops)
            }
            first => FtExpr::And(vec![first, other]),
        }
    }

    pub fn or(self, other: FtExpr) -> Self {
        match self {
            FtExpr::Or(mut ops) => {
                ops.push(other);
                FtExpr::Or(ops)
            }
            first => FtExpr::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        FtExpr::Not(Box::new(self))
    }

    /// Matches the predicate against the tokens currently held by `lexer`.
    pub fn eval(&self, ctx: &mut QueryContext<'_>, lexer: &FtLexer) -> Result<FtMatch> {
        match self {
            FtExpr::Words { query, mode } => words(ctx, lexer, query, *mode),
            FtExpr::And(ops) => {
                if ops.is_empty() {
                    return Err(Error::from_code(ErrorCode::FTDY0020, "ftand without operands"));
                }
                let mut result = FtMatch { matched: true, ..FtMatch::none() };
                for op in ops {
                    let m = op.eval(ctx, lexer)?;
                    if !m.matched {
                        return Ok(FtMatch::none());
                    }
                    result.score = scoring::combine(result.score, m.score);
                    result.spans.extend(m.spans);
                }
                Ok(result)
            }
            FtExpr::Or(ops) => {
                if ops.is_empty() {
                    return Err(Error::from_code(ErrorCode::FTDY0020, "ftor without operands"));
                }
                let mut result = FtMatch::none();
                for op in ops {
                    let m = op.eval(ctx, lexer)?;
                    if m.matched {
                        result.matched = true;
                        result.score = scoring::or(result.score, m.score);
                        result.spans.extend(m.spans);
                    }
                }
                Ok(result)
            }
            FtExpr::Not(op) => {
                let m = op.eval(ctx, lexer)?;
                Ok(if m.matched {
                    FtMatch::none()
                } else {
                    FtMatch { matched: true, score: scoring::not(m.score), spans: Vec::new() }
                })
            }
        }
    }
}

fn words(ctx: &mut QueryContext<'_>, lexer: &FtLexer, query: &Expr, mode: FtMode) -> Result<FtMatch> {
    let items = ctx.evaluate(query)?;
    let table = ctx.table();
    let strings: Vec<Vec<String>> = items.iter().map(|i| lexer.query_tokens(&i.string_value(table))).collect();
    let phrases: Vec<Vec<String>> = match mode {
        FtMode::Any | FtMode::All => strings.into_iter().filter(|p| !p.is_empty()).collect(),
        FtMode::Phrase => {
            let phrase: Vec<String> = strings.into_iter().flatten().collect();
            if phrase.is_empty() { Vec::new() } else { vec![phrase] }
        }
        FtMode::AnyWord | FtMode::AllWords => strings.into_iter().flatten().map(|w| vec![w]).collect(),
    };
    if phrases.is_empty() {
        return Ok(FtMatch::none());
    }
    let require_all = matches!(mode, FtMode::All | FtMode::AllWords);
    let tokens = lexer.tokens();
    let mut spans = Vec::new();
    for phrase in &phrases {
        let before = spans.len();
        spans.extend(occurrences(tokens, phrase));
        if require_all && spans.len() == before {
            return Ok(FtMatch::none());
        }
    }
    if spans.is_empty() {
        return Ok(FtMatch::none());
    }
    spans.sort_by_key(|s| (s.first, s.last));
    Ok(FtMatch { matched: true, score: scoring::word(spans.len(), tokens.len()), spans })
}

fn occurrences<'a>(tokens: &'a [Token], phrase: &'a [String]) -> impl Iterator<Item = FtSpan> + 'a {
    tokens.windows(phrase.len()).filter(move |w| w.iter().zip(phrase).all(|(t, p)| &t.text == p)).map(|w| {
        let (first, last) = (&w[0], &w[w.len() - 1]);
        FtSpan { first: first.pos, last: last.pos, start: first.span.start, end: last.span.end }
    })
}
