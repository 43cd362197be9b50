mod filelist;
mod lexer;
mod matcher;
mod report;
mod rolling;
mod store;
mod token;
mod types;
mod util;


pub use filelist::{default_ignore_dirs, list_source_files};

pub use lexer::{CLikeLexer, LanguageLexer, TokenizerRegistry};

pub use matcher::DupDetector;

pub use report::{insert_duplicate_markers, sort_match_sets, write_text_report};

pub use token::{
    DupTokenPolicy, FUZZY_TOKEN_TEXT, Token, TokenFilterPolicy, TokenKind, TokenStream,
    tokenize_source,
};

pub use types::{
    DEFAULT_CHUNK_TOKENS, DEFAULT_MIN_LINES, DetectOptions, DetectOutcome, DetectStats, Error,
    MAX_SINGLE_FILE_MATCHES, Match, MatchSet,
};
