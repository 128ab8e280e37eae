//! Pretty printer for the CSS block tree.

use super::{collapse_whitespace, split_top_level_commas, Block, Node, Stylesheet};

/// Prints a [`Stylesheet`] with one declaration per line and a fixed indent
/// per nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    indent: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new("  ")
    }
}

impl Formatter {
    /// Create a formatter using `indent` for each nesting level.
    pub fn new(indent: impl Into<String>) -> Self {
        Self { indent: indent.into() }
    }

    /// The indent unit.
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Render a stylesheet. Non-empty output ends with a newline.
    pub fn print(&self, sheet: &Stylesheet) -> String {
        let mut out = String::new();
        let mut previous: Option<&Node> = None;

        for node in &sheet.nodes {
            if let Some(prev) = previous {
                // Blank line around top-level blocks
                if matches!(prev, Node::Block(_)) || matches!(node, Node::Block(_)) {
                    out.push('\n');
                }
            }
            self.write_node(&mut out, node, 0);
            previous = Some(node);
        }
        out
    }

    fn write_node(&self, out: &mut String, node: &Node, depth: usize) {
        let pad = self.indent.repeat(depth);
        match node {
            Node::Comment(text) => {
                out.push_str(&pad);
                out.push_str(text);
                out.push('\n');
            }
            Node::AtStatement(text) => {
                out.push_str(&pad);
                out.push_str(text);
                out.push_str(";\n");
            }
            Node::Declaration(decl) => {
                out.push_str(&pad);
                out.push_str(&decl.property);
                out.push_str(": ");
                out.push_str(&collapse_whitespace(&decl.value));
                out.push_str(";\n");
            }
            Node::Block(block) => self.write_block(out, block, depth),
        }
    }

    fn write_block(&self, out: &mut String, block: &Block, depth: usize) {
        let pad = self.indent.repeat(depth);
        out.push_str(&pad);
        out.push_str(&format_prelude(block));
        out.push_str(" {\n");
        for child in &block.children {
            self.write_node(out, child, depth + 1);
        }
        out.push_str(&pad);
        out.push_str("}\n");
    }
}

fn format_prelude(block: &Block) -> String {
    let prelude = collapse_whitespace(&block.prelude);
    if block.is_at_rule() {
        return prelude;
    }
    split_top_level_commas(&prelude).iter().map(|s| s.trim()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse;

    fn format(css: &str, indent: &str) -> String {
        Formatter::new(indent).print(&parse(css).unwrap())
    }

    #[test]
    fn test_format_single_rule() {
        assert_eq!(format(".btn { color: red; }", "  "), ".btn {\n  color: red;\n}\n");
    }

    #[test]
    fn test_format_nested_with_custom_indent() {
        let css = "@media screen{a,b{color:red;margin:0 auto}}";
        let expected = "@media screen {\n    a, b {\n        color: red;\n        margin: 0 auto;\n    }\n}\n";
        assert_eq!(format(css, "    "), expected);
    }

    #[test]
    fn test_format_separates_top_level_blocks() {
        let css = "@import \"a.css\";a{b:c}d{e:f}";
        assert_eq!(format(css, "  "), "@import \"a.css\";\n\na {\n  b: c;\n}\n\nd {\n  e: f;\n}\n");
    }

    #[test]
    fn test_format_is_a_fixed_point() {
        let css = "/* c */\na{x:1}\n@media print{b{y:2}}";
        let once = format(css, "  ");
        let twice = format(&once, "  ");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_format_empty_block() {
        assert_eq!(format("a {}", "\t"), "a {\n}\n");
    }
}
