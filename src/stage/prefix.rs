//! Vendor prefixing through lightningcss browser targets.

use super::{map_css, Stage, StageError};
use crate::css::{self, Declaration, Formatter, Node, Stylesheet};
use crate::record::RecordStream;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::collections::BTreeMap;

/// Browser names accepted in `[prefix.browsers]`.
pub const BROWSER_NAMES: &[&str] =
    &["android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung"];

/// Parse `major[.minor[.patch]]` into lightningcss' packed version format.
pub fn parse_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || major > 0xffff || minor > 0xff || patch > 0xff {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

/// Adds vendor-prefixed declarations required by the configured browsers,
/// then re-prints the result with the pipeline's formatter.
///
/// Each declaration goes through lightningcss on its own, so comments, rule
/// boundaries, longhands and value spelling are left as written. Only
/// declarations that gain prefixed variants are replaced.
#[derive(Debug, Clone)]
pub struct PrefixStage {
    browsers: Browsers,
    formatter: Formatter,
}

impl PrefixStage {
    pub fn new(browsers: Browsers, formatter: Formatter) -> Self {
        Self { browsers, formatter }
    }

    /// Build browser targets from a `name -> version` map.
    pub fn browsers_from_map(map: &BTreeMap<String, String>) -> Result<Browsers, String> {
        let mut browsers = Browsers::default();
        for (name, version) in map {
            let parsed = parse_version(version)
                .ok_or_else(|| format!("invalid version '{}' for browser '{}'", version, name))?;
            let slot = match name.as_str() {
                "android" => &mut browsers.android,
                "chrome" => &mut browsers.chrome,
                "edge" => &mut browsers.edge,
                "firefox" => &mut browsers.firefox,
                "ie" => &mut browsers.ie,
                "ios_saf" => &mut browsers.ios_saf,
                "opera" => &mut browsers.opera,
                "safari" => &mut browsers.safari,
                "samsung" => &mut browsers.samsung,
                other => return Err(format!("unknown browser '{}'", other)),
            };
            *slot = Some(parsed);
        }
        Ok(browsers)
    }

    /// Prefix every declaration of a stylesheet in place.
    pub fn prefix(&self, sheet: &mut Stylesheet) -> Result<(), String> {
        self.prefix_nodes(&mut sheet.nodes)
    }

    fn prefix_nodes(&self, nodes: &mut Vec<Node>) -> Result<(), String> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes.drain(..) {
            match node {
                Node::Block(mut block) => {
                    self.prefix_nodes(&mut block.children)?;
                    out.push(Node::Block(block));
                }
                Node::Declaration(decl) => match self.expand(&decl)? {
                    Some(expanded) => out.extend(expanded.into_iter().map(Node::Declaration)),
                    None => out.push(Node::Declaration(decl)),
                },
                other => out.push(other),
            }
        }
        *nodes = out;
        Ok(())
    }

    /// The declarations that replace `decl` for the configured browsers, or
    /// `None` when it stays as written.
    fn expand(&self, decl: &Declaration) -> Result<Option<Vec<Declaration>>, String> {
        if decl.is_custom_property() {
            return Ok(None);
        }

        let source = format!("a{{{}: {}}}", decl.property, decl.value);
        let mut sheet = StyleSheet::parse(&source, ParserOptions::default())
            .map_err(|e| format!("{}: {}", decl.property, e))?;
        sheet
            .minify(MinifyOptions { targets: Targets::from(self.browsers), ..MinifyOptions::default() })
            .map_err(|e| format!("{}: {}", decl.property, e))?;
        let printed = sheet
            .to_css(PrinterOptions { targets: Targets::from(self.browsers), ..PrinterOptions::default() })
            .map_err(|e| format!("{}: {}", decl.property, e))?;

        let tree = css::parse(&printed.code).map_err(|e| e.to_string())?;
        let expanded: Vec<Declaration> = tree
            .nodes
            .into_iter()
            .flat_map(|node| match node {
                Node::Block(block) => block.children,
                other => vec![other],
            })
            .filter_map(|node| match node {
                Node::Declaration(decl) => Some(decl),
                _ => None,
            })
            .collect();

        let unchanged = match expanded.as_slice() {
            [] => true,
            [only] => only.property.eq_ignore_ascii_case(&decl.property),
            _ => false,
        };
        Ok(if unchanged { None } else { Some(expanded) })
    }
}

impl Stage for PrefixStage {
    fn name(&self) -> &str {
        "prefix"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        map_css(records, |record, text| {
            let syntax_error =
                |message: String| StageError::Syntax { file: record.source_path(), message };

            let mut sheet = css::parse(text).map_err(|e| syntax_error(e.to_string()))?;
            self.prefix(&mut sheet).map_err(syntax_error)?;
            Ok(self.formatter.print(&sheet))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileRecord;

    fn safari(major: u32) -> Browsers {
        Browsers { safari: Some(major << 16), ..Browsers::default() }
    }

    fn prefix(css: &str, browsers: Browsers, indent: &str) -> String {
        let stage = PrefixStage::new(browsers, Formatter::new(indent));
        let out = stage.transform(vec![FileRecord::new("/", "a.css", css)].into()).unwrap();
        out.get("a.css").unwrap().text().unwrap().to_string()
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("13"), Some(13 << 16));
        assert_eq!(parse_version("13.1"), Some((13 << 16) | (1 << 8)));
        assert_eq!(parse_version("4.4.3"), Some((4 << 16) | (4 << 8) | 3));
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("x"), None);
        assert_eq!(parse_version("1.2.3.4"), None);
    }

    #[test]
    fn test_browsers_from_map() {
        let mut map = BTreeMap::new();
        map.insert("safari".to_string(), "13".to_string());
        map.insert("chrome".to_string(), "80".to_string());
        let browsers = PrefixStage::browsers_from_map(&map).unwrap();
        assert_eq!(browsers.safari, Some(13 << 16));
        assert_eq!(browsers.chrome, Some(80 << 16));
        assert_eq!(browsers.firefox, None);

        map.insert("netscape".to_string(), "4".to_string());
        assert!(PrefixStage::browsers_from_map(&map).unwrap_err().contains("netscape"));
    }

    #[test]
    fn test_adds_webkit_prefix_for_old_safari() {
        let out = prefix(".a {\n  user-select: none;\n}\n", safari(13), "  ");
        assert!(out.contains("-webkit-user-select: none;"), "got {}", out);
        assert!(out.contains("  user-select: none;"));
    }

    #[test]
    fn test_keeps_plain_rules_and_indent() {
        let out = prefix(".btn {\n    color: red;\n}\n", safari(13), "    ");
        assert_eq!(out, ".btn {\n    color: red;\n}\n");
    }

    #[test]
    fn test_comments_rules_and_longhands_survive() {
        let css = "/* Header */\n\n.a {\n  color: red;\n}\n\n.b {\n  color: red;\n}\n\n\
                   .c {\n  margin-top: 1px;\n  margin-right: 1px;\n  margin-bottom: 1px;\n  margin-left: 1px;\n}\n\n\
                   .d {\n  background: #ff0000;\n}\n";
        assert_eq!(prefix(css, safari(13), "  "), css);
    }

    #[test]
    fn test_prefixed_variant_replaces_declaration_in_place() {
        let out = prefix(".a {\n  color: red;\n  user-select: none;\n  margin: 0;\n}\n", safari(13), "  ");
        let color = out.find("color: red;").unwrap();
        let webkit = out.find("-webkit-user-select: none;").unwrap();
        let margin = out.find("margin: 0;").unwrap();
        assert!(color < webkit && webkit < margin, "got {}", out);
        assert_eq!(out.matches("user-select: none;").count(), 2);
    }

    #[test]
    fn test_nested_blocks_and_custom_properties() {
        let out = prefix(
            "@media print {\n  .a {\n    --Gap: 0PX;\n    user-select: none;\n  }\n}\n",
            safari(13),
            "  ",
        );
        assert!(out.contains("    --Gap: 0PX;"), "got {}", out);
        assert!(out.contains("    -webkit-user-select: none;"), "got {}", out);
    }

    #[test]
    fn test_invalid_css_is_a_syntax_error() {
        let stage = PrefixStage::new(safari(13), Formatter::default());
        let err = stage
            .transform(vec![FileRecord::new("/", "a.css", ".a { color: red;")].into())
            .unwrap_err();
        assert!(matches!(err, StageError::Syntax { .. }));
    }
}
