use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::token::{Token, TokenKind};

/// Lexical tokenizer for one language family. Implementations produce the
/// raw token sequence (comments included); filtering and reclassification
/// are applied afterwards by a `TokenFilterPolicy`.
pub trait LanguageLexer: Send + Sync {
    fn lex(&self, text: &str) -> Vec<Token>;
}

const C_FAMILY_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "do", "else", "enum",
    "finally", "fn", "for", "function", "if", "impl", "interface", "let", "match", "new",
    "private", "protected", "public", "return", "static", "struct", "switch", "throw", "trait",
    "try", "var", "void", "while",
];

const SCRIPT_KEYWORDS: &[&str] = &[
    "and", "break", "class", "continue", "def", "del", "elif", "else", "end", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "module", "not", "or", "pass",
    "raise", "return", "try", "while", "with", "yield",
];

/// Hand-rolled byte-loop lexer covering C-family syntax (slash comments,
/// `#` preprocessor lines) and, in the script configuration, `#` comments
/// anywhere on a line.
pub struct CLikeLexer {
    keywords: HashSet<&'static str>,
    slash_comments: bool,
    hash_comments: bool,
}

impl CLikeLexer {
    pub fn c_family() -> Self {
        Self {
            keywords: C_FAMILY_KEYWORDS.iter().copied().collect(),
            slash_comments: true,
            hash_comments: false,
        }
    }

    pub fn script() -> Self {
        Self {
            keywords: SCRIPT_KEYWORDS.iter().copied().collect(),
            slash_comments: false,
            hash_comments: true,
        }
    }
}

fn utf8_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

impl LanguageLexer for CLikeLexer {
    fn lex(&self, text: &str) -> Vec<Token> {
        let bytes = text.as_bytes();
        let mut i = 0usize;
        let mut line: u32 = 1;
        let mut at_line_start = true;
        let mut tokens = Vec::new();

        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\n' {
                line = line.saturating_add(1);
                i += 1;
                at_line_start = true;
                continue;
            }
            if b.is_ascii_whitespace() {
                i += 1;
                continue;
            }

            let was_at_line_start = at_line_start;
            at_line_start = false;

            if self.slash_comments && b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                let start = i;
                let start_line = line;
                i += 2;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                tokens.push(Token::new(
                    TokenKind::Comment,
                    &text[start..i],
                    start_line,
                    start,
                ));
                continue;
            }
            if self.slash_comments && b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
                let start = i;
                let start_line = line;
                i += 2;
                // Advance whole characters so an unterminated comment ending
                // in a multibyte character still slices on a char boundary.
                while i < bytes.len() {
                    if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    if bytes[i] == b'\n' {
                        line = line.saturating_add(1);
                        at_line_start = true;
                    }
                    i += utf8_len(bytes[i]);
                }
                tokens.push(Token::new(
                    TokenKind::Comment,
                    &text[start..i],
                    start_line,
                    start,
                ));
                continue;
            }
            // Preprocessor lines in C-family sources, full comments in the
            // script configuration.
            if b == b'#' && (self.hash_comments || was_at_line_start) {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                tokens.push(Token::new(TokenKind::Comment, &text[start..i], line, start));
                continue;
            }

            if b == b'"' || b == b'\'' {
                let quote = b;
                let start = i;
                let start_line = line;
                i += 1;
                while i < bytes.len() {
                    let c = bytes[i];
                    if c == b'\n' {
                        line = line.saturating_add(1);
                    }
                    if c == b'\\' && i + 1 < bytes.len() {
                        i += 2;
                        continue;
                    }
                    if c == quote {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                tokens.push(Token::new(
                    TokenKind::Literal,
                    &text[start..i],
                    start_line,
                    start,
                ));
                continue;
            }

            if b.is_ascii_alphabetic() || b == b'_' {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let ident = &text[start..i];
                let kind = if self.keywords.contains(ident) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Name
                };
                tokens.push(Token::new(kind, ident, line, start));
                continue;
            }

            if b.is_ascii_digit() {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                tokens.push(Token::new(TokenKind::Literal, &text[start..i], line, start));
                continue;
            }

            let width = utf8_len(b).min(bytes.len() - i);
            tokens.push(Token::new(TokenKind::Punct, &text[i..i + width], line, i));
            i += width;
        }

        tokens
    }
}

/// Extension-to-lexer mapping, owned as an explicit value and passed to the
/// detector rather than held as hidden global state. Files whose extension
/// has no registered lexer tokenize to an empty stream and are excluded
/// from the run.
pub struct TokenizerRegistry {
    lexers: HashMap<String, Arc<dyn LanguageLexer>>,
}

impl Default for TokenizerRegistry {
    fn default() -> Self {
        Self::with_default_languages()
    }
}

impl TokenizerRegistry {
    pub fn empty() -> Self {
        Self {
            lexers: HashMap::new(),
        }
    }

    pub fn with_default_languages() -> Self {
        let mut registry = Self::empty();
        let c_family: Arc<dyn LanguageLexer> = Arc::new(CLikeLexer::c_family());
        for ext in [
            "c", "cc", "cpp", "cs", "cxx", "go", "h", "hh", "hpp", "java", "js", "jsx", "kt",
            "php", "rs", "scala", "swift", "ts", "tsx",
        ] {
            registry.lexers.insert(ext.to_string(), Arc::clone(&c_family));
        }
        let script: Arc<dyn LanguageLexer> = Arc::new(CLikeLexer::script());
        for ext in ["pl", "py", "rb", "sh"] {
            registry.lexers.insert(ext.to_string(), Arc::clone(&script));
        }
        registry
    }

    pub fn register(&mut self, extension: &str, lexer: Arc<dyn LanguageLexer>) {
        self.lexers
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), lexer);
    }

    pub fn lexer_for_path(&self, path: &Path) -> Option<Arc<dyn LanguageLexer>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.lexers.get(&ext).cloned()
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.lexer_for_path(path).is_some()
    }
}
