//! Declaration normalization (a csscomb-style pass).
//!
//! Rewrites each CSS record through the block tree: property names are
//! lowercased, values are tidied, declarations are put in a fixed order and
//! empty rulesets disappear. Output formatting is left to [`super::FormatStage`].

use super::{map_css, Stage, StageError};
use crate::css::{self, collapse_whitespace, Declaration, Formatter, Node, Stylesheet};
use crate::record::RecordStream;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Property order groups. Properties not listed sort after these,
/// alphabetically.
const PROPERTY_ORDER: &[&str] = &[
    // Positioning
    "position",
    "z-index",
    "top",
    "right",
    "bottom",
    "left",
    "inset",
    // Display and box model
    "display",
    "visibility",
    "float",
    "clear",
    "overflow",
    "overflow-x",
    "overflow-y",
    "clip",
    "box-sizing",
    "flex",
    "flex-direction",
    "flex-wrap",
    "flex-flow",
    "flex-grow",
    "flex-shrink",
    "flex-basis",
    "justify-content",
    "align-items",
    "align-content",
    "align-self",
    "order",
    "grid",
    "grid-template",
    "grid-template-columns",
    "grid-template-rows",
    "grid-template-areas",
    "grid-area",
    "grid-column",
    "grid-row",
    "gap",
    "row-gap",
    "column-gap",
    "width",
    "min-width",
    "max-width",
    "height",
    "min-height",
    "max-height",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    // Typography
    "font",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "font-variant",
    "line-height",
    "letter-spacing",
    "word-spacing",
    "color",
    "text-align",
    "text-decoration",
    "text-indent",
    "text-overflow",
    "text-transform",
    "text-shadow",
    "white-space",
    "word-break",
    "word-wrap",
    "overflow-wrap",
    "vertical-align",
    "list-style",
    "content",
    "quotes",
    // Visual
    "background",
    "background-color",
    "background-image",
    "background-repeat",
    "background-position",
    "background-size",
    "border",
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "border-width",
    "border-style",
    "border-color",
    "border-radius",
    "outline",
    "box-shadow",
    "opacity",
    "filter",
    // Misc
    "transform",
    "transform-origin",
    "transition",
    "animation",
    "cursor",
    "pointer-events",
    "user-select",
];

/// Length units whose zero value can drop the unit.
const ZERO_LENGTH: &str = r"(^|[\s,(/])-?0+(?:\.0+)?(?:px|em|ex|ch|rem|vh|vw|vmin|vmax|cm|mm|in|pt|pc)\b";

/// Functions where a unitless zero is a number, not a length.
const MATH_FUNCTIONS: &[&str] = &["calc", "min", "max", "clamp"];

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([0-9a-fA-F]{3,8})\b").expect("valid hex color regex"))
}

fn zero_length_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ZERO_LENGTH).expect("valid zero length regex"))
}

/// Which normalizations to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Sort declarations by the fixed property order
    pub sort_properties: bool,
    /// Lowercase hex colors and use 3-digit form where possible
    pub color_case: bool,
    /// Drop the unit from zero lengths
    pub unitless_zero: bool,
    /// Remove rulesets with no declarations
    pub remove_empty_rules: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { sort_properties: true, color_case: true, unitless_zero: true, remove_empty_rules: true }
    }
}

/// Normalizes declarations in CSS records.
#[derive(Debug, Clone, Default)]
pub struct NormalizeStage {
    options: NormalizeOptions,
}

impl NormalizeStage {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalize a single stylesheet in place.
    pub fn normalize(&self, sheet: &mut Stylesheet) {
        self.normalize_nodes(&mut sheet.nodes);
    }

    fn normalize_nodes(&self, nodes: &mut Vec<Node>) {
        for node in nodes.iter_mut() {
            match node {
                Node::Declaration(decl) => self.normalize_declaration(decl),
                Node::Block(block) => self.normalize_nodes(&mut block.children),
                Node::Comment(_) | Node::AtStatement(_) => {}
            }
        }

        if self.options.remove_empty_rules {
            nodes.retain(|node| !matches!(node, Node::Block(block) if block.is_empty()));
        }

        if self.options.sort_properties {
            sort_declarations(nodes);
        }
    }

    fn normalize_declaration(&self, decl: &mut Declaration) {
        if !decl.is_custom_property() {
            decl.property = decl.property.to_ascii_lowercase();
        }
        decl.value = collapse_whitespace(&decl.value);

        if decl.is_custom_property() || decl.value.contains(['"', '\'']) || decl.value.contains("url(")
        {
            return;
        }
        if self.options.color_case {
            decl.value = normalize_hex_colors(&decl.value);
        }
        if self.options.unitless_zero {
            decl.value = drop_zero_units(&decl.value);
        }
    }
}

impl Stage for NormalizeStage {
    fn name(&self) -> &str {
        "normalize"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        map_css(records, |record, text| {
            let mut sheet = css::parse(text).map_err(|e| StageError::Syntax {
                file: record.source_path(),
                message: e.to_string(),
            })?;
            self.normalize(&mut sheet);
            Ok(Formatter::default().print(&sheet))
        })
    }
}

fn normalize_hex_colors(value: &str) -> String {
    hex_color_re()
        .replace_all(value, |caps: &Captures| {
            let hex = caps[1].to_ascii_lowercase();
            let bytes = hex.as_bytes();
            let short = match hex.len() {
                6 if bytes[0] == bytes[1] && bytes[2] == bytes[3] && bytes[4] == bytes[5] => {
                    format!("{}{}{}", bytes[0] as char, bytes[2] as char, bytes[4] as char)
                }
                _ => hex,
            };
            format!("#{}", short)
        })
        .into_owned()
}

/// `0px` to `0`, except inside math functions where `calc(0 + 10%)` is
/// invalid.
fn drop_zero_units(value: &str) -> String {
    zero_length_re()
        .replace_all(value, |caps: &Captures| {
            let lead = caps.get(1).map_or(0, |m| m.end());
            if inside_math_function(value, lead) {
                caps[0].to_string()
            } else {
                format!("{}0", &caps[1])
            }
        })
        .into_owned()
}

/// Whether byte offset `pos` of `value` sits within the parentheses of a
/// math function, at any depth.
fn inside_math_function(value: &str, pos: usize) -> bool {
    let mut open: Vec<bool> = Vec::new();
    for (i, c) in value[..pos].char_indices() {
        match c {
            '(' => {
                let start = value[..i]
                    .char_indices()
                    .rev()
                    .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '-')
                    .last()
                    .map_or(i, |(p, _)| p);
                let name = value[start..i].to_ascii_lowercase();
                open.push(MATH_FUNCTIONS.contains(&strip_vendor_prefix(&name)));
            }
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }
    open.contains(&true)
}

fn property_rank(decl: &Declaration) -> (usize, String) {
    let unprefixed = strip_vendor_prefix(&decl.property);
    match PROPERTY_ORDER.iter().position(|p| *p == unprefixed) {
        Some(index) => (index, String::new()),
        None => (PROPERTY_ORDER.len(), unprefixed.to_string()),
    }
}

fn strip_vendor_prefix(property: &str) -> &str {
    for prefix in ["-webkit-", "-moz-", "-ms-", "-o-"] {
        if let Some(rest) = property.strip_prefix(prefix) {
            return rest;
        }
    }
    property
}

/// Sort each run of consecutive declarations. Comments, statements and nested
/// blocks stay where they are and split runs; custom properties keep their
/// position at the front of a run.
fn sort_declarations(nodes: &mut [Node]) {
    let mut start = 0;
    while start < nodes.len() {
        if !matches!(nodes[start], Node::Declaration(_)) {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < nodes.len() && matches!(nodes[end], Node::Declaration(_)) {
            end += 1;
        }
        nodes[start..end].sort_by_cached_key(|node| match node {
            Node::Declaration(decl) if decl.is_custom_property() => (0, 0, String::new()),
            Node::Declaration(decl) => {
                let (rank, name) = property_rank(decl);
                (1, rank, name)
            }
            _ => (2, 0, String::new()),
        });
        start = end;
    }
}
