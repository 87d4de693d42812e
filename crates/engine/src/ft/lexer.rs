use core::ops::Range;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::options::{FtCase, FtOptions};

/// One word of an input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized form used for matching.
    pub text: String,
    /// 0-based word position.
    pub pos: usize,
    /// Byte range in the input string.
    pub span: Range<usize>,
}

/// Splits strings into normalized words.
///
/// A lexer is borrowed from the query's pool for the evaluation of one
/// `contains text` expression and keeps the tokens of the item currently
/// being matched.
#[derive(Debug, Clone)]
pub struct FtLexer {
    options: FtOptions,
    tokens: Vec<Token>,
}

impl FtLexer {
    pub fn new(options: FtOptions) -> Self {
        Self { options, tokens: Vec::new() }
    }

    pub fn options(&self) -> &FtOptions {
        &self.options
    }

    /// Tokenizes the string value of the current item.
    pub fn init(&mut self, text: &str) {
        self.tokens.clear();
        for (pos, span) in words(text).enumerate() {
            let token = self.normalize(&text[span.clone()], false);
            self.tokens.push(Token { text: token, pos, span });
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Normalized words of a query string.
    pub fn query_tokens(&self, text: &str) -> Vec<String> {
        words(text).map(|span| self.normalize(&text[span], true)).collect()
    }

    pub fn reset(&mut self) {
        self.tokens.clear();
    }

    /// Applies case and diacritics handling. `lowercase`/`uppercase` modes
    /// convert the query side only, so they match text in that case.
    pub fn normalize(&self, word: &str, query: bool) -> String {
        let folded: String = if self.options.diacritics_sensitive {
            word.to_string()
        } else {
            word.nfd().filter(|c| !is_combining_mark(*c)).collect()
        };
        match (self.options.case, query) {
            (FtCase::Insensitive, _) => folded.to_lowercase(),
            (FtCase::Lower, true) => folded.to_lowercase(),
            (FtCase::Upper, true) => folded.to_uppercase(),
            _ => folded,
        }
    }
}

/// Byte ranges of the words of `text`: maximal runs of alphanumeric
/// characters and combining marks.
fn words(text: &str) -> impl Iterator<Item = Range<usize>> + '_ {
    let is_word = |c: char| c.is_alphanumeric() || is_combining_mark(c);
    let mut chars = text.char_indices().peekable();
    core::iter::from_fn(move || {
        while chars.next_if(|&(_, c)| !is_word(c)).is_some() {}
        let (start, first) = chars.next()?;
        let mut end = start + first.len_utf8();
        while let Some((i, c)) = chars.next_if(|&(_, c)| is_word(c)) {
            end = i + c.len_utf8();
        }
        Some(start..end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_word_characters() {
        let mut lexer = FtLexer::new(FtOptions::default());
        lexer.init("Hello, wörld! 42x");
        let words: Vec<_> = lexer.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, ["hello", "world", "42x"]);
        assert_eq!(lexer.tokens()[1].span, 7..13);
    }

    #[test]
    fn case_modes() {
        let sensitive = FtLexer::new(FtOptions::default().with_case(FtCase::Sensitive));
        assert_eq!(sensitive.normalize("Word", false), "Word");
        let upper = FtLexer::new(FtOptions::default().with_case(FtCase::Upper));
        assert_eq!(upper.normalize("word", true), "WORD");
        assert_eq!(upper.normalize("word", false), "word");
    }

    #[test]
    fn diacritics_sensitive_keeps_marks() {
        let lexer = FtLexer::new(FtOptions::default().with_diacritics_sensitive(true));
        assert_eq!(lexer.normalize("Café", false), "cafe\u{301}".nfc().collect::<String>());
    }
}
