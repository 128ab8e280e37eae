//! Splits CSS text into a [`Stylesheet`] block tree.

use super::{collapse_whitespace, Block, CssError, Declaration, Node, Stylesheet};

/// Parse CSS text into a block tree.
///
/// Comments between items are kept as [`Node::Comment`]; comments inside a
/// selector or declaration are dropped. Unbalanced braces, unterminated
/// strings or comments, and statements without a `:` are errors.
pub fn parse(input: &str) -> Result<Stylesheet, CssError> {
    let mut parser = Parser { src: input, pos: 0 };
    let nodes = parser.parse_nodes(None)?;
    Ok(Stylesheet { nodes })
}

/// How a chunk of text ended.
enum Terminator {
    Semicolon,
    OpenBrace,
    CloseBrace,
    Eof,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn line_at(&self, pos: usize) -> usize {
        self.src[..pos].matches('\n').count() + 1
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> CssError {
        CssError { line: self.line_at(pos), message: message.into() }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Parse items until end of input (top level) or the closing brace of the
    /// block opened at `opened_at`.
    fn parse_nodes(&mut self, opened_at: Option<usize>) -> Result<Vec<Node>, CssError> {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();
            let rest = self.rest();

            if rest.is_empty() {
                return match opened_at {
                    Some(start) => Err(self.error(start, "unclosed block")),
                    None => Ok(nodes),
                };
            }

            if rest.starts_with("/*") {
                let comment = self.read_comment()?;
                nodes.push(Node::Comment(comment.to_string()));
                continue;
            }

            if rest.starts_with('}') {
                if opened_at.is_none() {
                    return Err(self.error(self.pos, "unexpected '}'"));
                }
                self.pos += 1;
                return Ok(nodes);
            }

            let chunk_start = self.pos;
            let (chunk, terminator) = self.read_chunk()?;
            match terminator {
                Terminator::OpenBrace => {
                    let children = self.parse_nodes(Some(chunk_start))?;
                    nodes.push(Node::Block(Block { prelude: collapse_whitespace(&chunk), children }));
                }
                Terminator::Semicolon | Terminator::CloseBrace | Terminator::Eof => {
                    if let Some(node) = self.statement(&chunk, chunk_start)? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    fn read_comment(&mut self) -> Result<&'a str, CssError> {
        let start = self.pos;
        match self.src[start + 2..].find("*/") {
            Some(end) => {
                self.pos = start + 2 + end + 2;
                Ok(&self.src[start..self.pos])
            }
            None => Err(self.error(start, "unterminated comment")),
        }
    }

    /// Read text up to a top-level `;`, `{` or `}`. A `;` or `{` is consumed,
    /// a `}` is left for the caller.
    fn read_chunk(&mut self) -> Result<(String, Terminator), CssError> {
        let mut chunk = String::new();
        let mut depth = 0usize;

        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("/*") {
                self.read_comment()?;
                chunk.push(' ');
                continue;
            }

            let Some(c) = rest.chars().next() else { break };
            match c {
                '"' | '\'' => {
                    let literal = self.read_string(c)?;
                    chunk.push_str(literal);
                    continue;
                }
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    self.pos += 1;
                    return Ok((chunk, Terminator::Semicolon));
                }
                '{' if depth == 0 => {
                    self.pos += 1;
                    return Ok((chunk, Terminator::OpenBrace));
                }
                '}' if depth == 0 => return Ok((chunk, Terminator::CloseBrace)),
                _ => {}
            }
            chunk.push(c);
            self.pos += c.len_utf8();
        }

        Ok((chunk, Terminator::Eof))
    }

    fn read_string(&mut self, quote: char) -> Result<&'a str, CssError> {
        let start = self.pos;
        let mut escaped = false;
        for (i, c) in self.src[start + 1..].char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                self.pos = start + 1 + i + 1;
                return Ok(&self.src[start..self.pos]);
            } else if c == '\n' {
                break;
            }
        }
        Err(self.error(start, "unterminated string"))
    }

    fn statement(&self, chunk: &str, start: usize) -> Result<Option<Node>, CssError> {
        let text = chunk.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if text.starts_with('@') {
            return Ok(Some(Node::AtStatement(collapse_whitespace(text))));
        }
        match text.split_once(':') {
            Some((property, value)) if !property.trim().is_empty() => Ok(Some(Node::Declaration(
                Declaration::new(property.trim(), value.trim()),
            ))),
            _ => Err(self.error(start, format!("expected declaration, found '{}'", text))),
        }
    }
}
