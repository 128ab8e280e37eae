//! Lightweight CSS block tree
//!
//! A tolerant model of plain CSS used by the normalize and format stages:
//! blocks (rules and block at-rules) holding declarations, nested blocks,
//! comments and at-statements. It does not interpret selectors or values;
//! it only needs to know where things begin and end.

mod parser;
mod printer;

pub use parser::parse;
pub use printer::Formatter;

/// Error while splitting CSS into blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct CssError {
    /// 1-indexed line where the problem was detected
    pub line: usize,
    /// Description of the problem
    pub message: String,
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level nodes in source order
    pub nodes: Vec<Node>,
}

/// One item inside a stylesheet or block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A comment including its `/*` and `*/` delimiters
    Comment(String),
    /// `property: value`
    Declaration(Declaration),
    /// A statement at-rule without its trailing semicolon, e.g. `@import "a.css"`
    AtStatement(String),
    /// A rule or block at-rule
    Block(Block),
}

/// A `property: value` pair. `!important` stays part of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self { property: property.into(), value: value.into() }
    }

    /// Custom properties (`--name`) are case-sensitive and never reordered.
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

/// A selector or at-rule prelude followed by a `{ ... }` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub prelude: String,
    pub children: Vec<Node>,
}

impl Block {
    /// Whether this is an at-rule block (`@media`, `@font-face`, ...).
    pub fn is_at_rule(&self) -> bool {
        self.prelude.starts_with('@')
    }

    /// Whether the body holds nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Collapse runs of whitespace to a single space, leaving quoted strings alone.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for c in text.trim().chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

/// Split on commas that are not inside parentheses, brackets or strings.
pub fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace_keeps_strings() {
        assert_eq!(collapse_whitespace("  1px\n  solid\t red "), "1px solid red");
        assert_eq!(collapse_whitespace("\"a   b\"  c"), "\"a   b\" c");
        assert_eq!(collapse_whitespace("'it\\'s  x'   y"), "'it\\'s  x' y");
    }

    #[test]
    fn test_split_top_level_commas() {
        assert_eq!(split_top_level_commas("a, b,c"), vec!["a", " b", "c"]);
        assert_eq!(split_top_level_commas(":is(a, b), c"), vec![":is(a, b)", " c"]);
        assert_eq!(split_top_level_commas("[title=\"x,y\"], p"), vec!["[title=\"x,y\"]", " p"]);
    }
}
