use std::collections::HashMap;

use crate::lexer::LanguageLexer;

/// Placeholder substituted for identifier/literal text in fuzzy mode, so
/// that duplicates are detected independent of naming.
pub const FUZZY_TOKEN_TEXT: &str = "#fuzzy#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Comment,
    Keyword,
    Name,
    /// A name introduced by a declaration keyword (`class Foo`, `fn bar`).
    DeclName,
    Literal,
    Punct,
}

/// One lexical token. Immutable once produced; owned by the `TokenStream`
/// that produced it and referenced by the rolling hash and match store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line of the token's first character.
    pub line: u32,
    /// Byte offset of the token's first character within the file.
    pub offset: usize,
    /// Byte length of the token in the source. Fuzzy substitution swaps
    /// `text` for a placeholder but leaves the source span intact.
    source_len: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, line: u32, offset: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            line,
            offset,
            source_len: text.len(),
        }
    }

    /// One past the token's last source byte.
    pub fn end_offset(&self) -> usize {
        self.offset + self.source_len
    }
}

/// Decides which raw tokens survive into the matchable stream and how
/// their kinds are adjusted based on the preceding significant token.
/// Composed into tokenization rather than inherited.
pub trait TokenFilterPolicy {
    fn should_ignore(&self, token: &Token) -> bool;

    fn reclassify(&self, token: &Token, prev: Option<&Token>) -> TokenKind;
}

/// Policy used for duplication detection: comments are dropped, and a name
/// counts as a declared name only when the immediately preceding
/// significant token is a declaration keyword. A bare `Base` in
/// `class Derived(Base)` stays a generic name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DupTokenPolicy;

const DECL_KEYWORDS: &[&str] = &[
    "class", "def", "enum", "fn", "function", "impl", "interface", "module", "struct", "trait",
];

impl TokenFilterPolicy for DupTokenPolicy {
    fn should_ignore(&self, token: &Token) -> bool {
        token.kind == TokenKind::Comment || token.text.is_empty()
    }

    fn reclassify(&self, token: &Token, prev: Option<&Token>) -> TokenKind {
        match token.kind {
            TokenKind::Name | TokenKind::DeclName => {
                let declared = prev.is_some_and(|p| {
                    p.kind == TokenKind::Keyword && DECL_KEYWORDS.contains(&p.text.as_str())
                });
                if declared {
                    TokenKind::DeclName
                } else {
                    TokenKind::Name
                }
            }
            kind => kind,
        }
    }
}

fn is_fuzzy_kind(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name | TokenKind::DeclName | TokenKind::Literal
    )
}

/// The ordered token sequence of one file, materialized once per run and
/// replayed many times during verification. Offsets index back into the
/// sequence so a verifier can resume from any previously seen token
/// without re-tokenizing from the file start.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    by_offset: HashMap<usize, usize>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let by_offset = tokens
            .iter()
            .enumerate()
            .map(|(idx, tok)| (tok.offset, idx))
            .collect();
        Self { tokens, by_offset }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at the given byte offset, if one starts there.
    pub fn at_offset(&self, offset: usize) -> Option<&Token> {
        self.by_offset.get(&offset).map(|&idx| &self.tokens[idx])
    }

    /// Resume the stream at a previously seen offset.
    pub fn from_offset(&self, offset: usize) -> Option<&[Token]> {
        self.by_offset.get(&offset).map(|&idx| &self.tokens[idx..])
    }
}

/// Lex `source`, apply the filter policy, and substitute the fuzzy
/// placeholder if requested.
pub fn tokenize_source(
    source: &str,
    lexer: &dyn LanguageLexer,
    policy: &dyn TokenFilterPolicy,
    fuzzy: bool,
) -> TokenStream {
    let raw = lexer.lex(source);
    let mut tokens: Vec<Token> = Vec::with_capacity(raw.len());
    for mut tok in raw {
        if policy.should_ignore(&tok) {
            continue;
        }
        tok.kind = policy.reclassify(&tok, tokens.last());
        if fuzzy && is_fuzzy_kind(tok.kind) {
            tok.text = FUZZY_TOKEN_TEXT.to_string();
        }
        tokens.push(tok);
    }
    TokenStream::new(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::CLikeLexer;

    fn stream(source: &str, fuzzy: bool) -> TokenStream {
        tokenize_source(source, &CLikeLexer::c_family(), &DupTokenPolicy, fuzzy)
    }

    #[test]
    fn comments_are_stripped_from_stream() {
        let s = stream("a; // note\n/* gone */ b;\n", false);
        let texts: Vec<&str> = s.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", ";", "b", ";"]);
    }

    #[test]
    fn fuzzy_mode_replaces_names_and_literals_but_keeps_kind() {
        let s = stream("count = count + 10;\n", true);
        let texts: Vec<&str> = s.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![FUZZY_TOKEN_TEXT, "=", FUZZY_TOKEN_TEXT, "+", FUZZY_TOKEN_TEXT, ";"]
        );
        assert_eq!(s.tokens()[0].kind, TokenKind::Name);
        assert_eq!(s.tokens()[4].kind, TokenKind::Literal);
        // Structural tokens keep their text.
        assert_eq!(s.tokens()[1].text, "=");
    }

    #[test]
    fn end_offset_tracks_source_span_under_fuzzy_substitution() {
        let source = "a_rather_long_name = 1 ;\n";
        let s = stream(source, true);
        let name = &s.tokens()[0];
        assert_eq!(name.text, FUZZY_TOKEN_TEXT);
        assert_eq!(name.end_offset(), "a_rather_long_name".len());
        // The next token starts where the source identifier ended.
        assert!(s.tokens()[1].offset >= name.end_offset());
    }

    #[test]
    fn name_after_class_keyword_is_a_declared_name() {
        let s = stream("class Widget { }\nWidget w;\n", false);
        let widget_decl = &s.tokens()[1];
        assert_eq!(widget_decl.text, "Widget");
        assert_eq!(widget_decl.kind, TokenKind::DeclName);

        // The later use of the same name is not a declaration.
        let widget_use = s
            .tokens()
            .iter()
            .skip(2)
            .find(|t| t.text == "Widget")
            .unwrap();
        assert_eq!(widget_use.kind, TokenKind::Name);
    }

    #[test]
    fn from_offset_resumes_mid_stream() {
        let s = stream("a b c d\n", false);
        let c_offset = s.tokens()[2].offset;
        let rest = s.from_offset(c_offset).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].text, "c");
        assert!(s.from_offset(c_offset + 1).is_none());
    }
}
