//! Template parsing and block structure.
//!
//! Templates are handlebars sources with three extra markers that are
//! handled before handlebars ever sees the text:
//!
//! - `{{#block "name"}} ... {{/block}}` delimits a named, nestable block
//! - `{{extends "base.html"}}` (first token only) inherits from another template
//! - `{{super}}` inside a block inserts the parent's version of that block
//!
//! Markers accept handlebars whitespace control (`{{~#block "a"~}}`), and
//! `{{{super}}}` is read as `{{super}}`. Markers inside comments and raw
//! blocks are left alone.

use crate::{Result, SliverError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::OnceLock;

/// Pattern for matching structural markers.
/// Format: {{#block "name"}}, {{/block}}, {{extends "name"}}, {{super}},
/// each with optional `~` on either side.
const TAG_PATTERN: &str =
    r#"\{\{(\{)?(~)?\s*(#block|/block|extends|super)\b\s*(?:"([^"]*)")?\s*(~)?\}\}"#;

/// Pattern for handlebars regions whose contents are not template markup:
/// `{{!-- ... --}}`, `{{! ... }}` and the opening tag of a `{{{{raw}}}}` block.
const OPAQUE_PATTERN: &str = r"\{\{~?!--[\s\S]*?--~?\}\}|\{\{~?![\s\S]*?\}\}|\{\{\{\{~?\s*([A-Za-z0-9_.\-]+)[^}]*\}\}\}\}";

/// Pattern for valid block names.
const BLOCK_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_\-]*$";

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static OPAQUE_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(TAG_PATTERN).expect("Invalid tag pattern regex"))
}

fn opaque_regex() -> &'static Regex {
    OPAQUE_REGEX.get_or_init(|| Regex::new(OPAQUE_PATTERN).expect("Invalid opaque pattern regex"))
}

/// Byte ranges of comments and raw blocks, in order.
///
/// An unterminated raw block runs to the end of the source.
fn opaque_spans(source: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(cap) = opaque_regex().captures_at(source, pos) {
        let Some(whole) = cap.get(0) else { break };
        let end = match cap.get(1) {
            Some(helper) => {
                let close = format!("{{{{{{{{/{}}}}}}}}}", helper.as_str());
                source[whole.end()..]
                    .find(&close)
                    .map_or(source.len(), |i| whole.end() + i + close.len())
            }
            None => whole.end(),
        };
        spans.push(whole.start()..end);
        pos = end;
    }

    spans
}

fn valid_block_name(name: &str) -> bool {
    BLOCK_NAME_REGEX
        .get_or_init(|| Regex::new(BLOCK_NAME_PATTERN).expect("Invalid block name regex"))
        .is_match(name)
}

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Handlebars source passed through untouched.
    Text(String),

    /// A named block.
    Block(Block),

    /// Placeholder for the parent's version of the enclosing block.
    Super,
}

/// A named region within a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub nodes: Vec<Node>,
}

/// A parsed template as written, before inheritance is applied.
#[derive(Debug, Clone)]
pub struct Template {
    /// Name the template is registered under.
    pub name: String,

    /// Template this one extends, if any.
    pub parent: Option<String>,

    /// Top-level nodes.
    pub nodes: Vec<Node>,
}

impl Template {
    /// Parse a template source.
    ///
    /// # Example
    ///
    /// ```
    /// use sliver_core::Template;
    ///
    /// let template = Template::parse("page.html", r#"<main>{{#block "content"}}Hi{{/block}}</main>"#).unwrap();
    /// assert_eq!(template.block_names(), vec!["content"]);
    /// ```
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let mut root: Vec<Node> = Vec::new();
        let mut open: Vec<Block> = Vec::new();
        let mut seen = HashSet::new();
        let mut parent: Option<String> = None;
        let mut cursor = 0;
        let mut trim_next = false;
        let opaque = opaque_spans(source);

        for cap in tag_regex().captures_iter(source) {
            let Some(whole) = cap.get(0) else { continue };
            if opaque
                .iter()
                .any(|span| whole.start() < span.end && span.start < whole.end())
            {
                continue;
            }

            let kind = &cap[3];
            let mut end = whole.end();
            if cap.get(1).is_some() {
                if kind != "super" {
                    return Err(SliverError::parse(
                        &name,
                        format!("{{{{{{{}}}}}}} is not a valid marker", kind),
                    ));
                }
                if !source[end..].starts_with('}') {
                    return Err(SliverError::parse(&name, "unterminated {{{super}}}"));
                }
                end += 1;
            }

            let mut text = &source[cursor..whole.start()];
            if trim_next {
                text = text.trim_start();
            }
            if cap.get(2).is_some() {
                text = text.trim_end();
            }
            push_text(current(&mut open, &mut root), text);
            cursor = end;
            trim_next = cap.get(5).is_some();

            let arg = cap.get(4).map(|m| m.as_str());
            match kind {
                "#block" => {
                    let block_name = match arg {
                        Some(n) if valid_block_name(n) => n.to_string(),
                        Some(n) => {
                            return Err(SliverError::parse(&name, format!("invalid block name '{}'", n)))
                        }
                        None => return Err(SliverError::parse(&name, "block without a name")),
                    };
                    if !seen.insert(block_name.clone()) {
                        return Err(SliverError::parse(
                            &name,
                            format!("block '{}' defined more than once", block_name),
                        ));
                    }
                    open.push(Block {
                        name: block_name,
                        nodes: Vec::new(),
                    });
                }
                "/block" => {
                    let block = open
                        .pop()
                        .ok_or_else(|| SliverError::parse(&name, "unexpected {{/block}}"))?;
                    current(&mut open, &mut root).push(Node::Block(block));
                }
                "extends" => {
                    let target = arg
                        .filter(|t| !t.is_empty())
                        .ok_or_else(|| SliverError::parse(&name, "extends without a template name"))?;
                    let leading_only = open.is_empty()
                        && parent.is_none()
                        && root
                            .iter()
                            .all(|n| matches!(n, Node::Text(t) if t.trim().is_empty()));
                    if !leading_only {
                        return Err(SliverError::parse(&name, "extends must be the first tag"));
                    }
                    root.clear();
                    parent = Some(target.to_string());
                }
                _ => {
                    if open.is_empty() {
                        return Err(SliverError::parse(&name, "{{super}} outside of a block"));
                    }
                    current(&mut open, &mut root).push(Node::Super);
                }
            }
        }

        let tail = &source[cursor..];
        push_text(
            current(&mut open, &mut root),
            if trim_next { tail.trim_start() } else { tail },
        );

        if let Some(block) = open.last() {
            return Err(SliverError::parse(
                &name,
                format!("block '{}' is never closed", block.name),
            ));
        }

        Ok(Self { name, parent, nodes: root })
    }

    /// Names of all blocks in document order, nested ones included.
    pub fn block_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.nodes, &mut names);
        names
    }

    /// Every block of this template by name, at any depth.
    pub fn blocks(&self) -> HashMap<&str, &Block> {
        let mut blocks = HashMap::new();
        collect_blocks(&self.nodes, &mut blocks);
        blocks
    }
}

/// A template with its inheritance chain applied.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    name: String,
    nodes: Vec<Node>,
    source: String,
}

impl ResolvedTemplate {
    pub(crate) fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        let mut source = String::new();
        write_nodes(&nodes, &mut source);
        Self {
            name: name.into(),
            nodes,
            source,
        }
    }

    /// Name of the template that was resolved.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handlebars source of the whole document, block markers removed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Find a block by name at any depth.
    pub fn find_block(&self, name: &str) -> Option<&Block> {
        find_block(&self.nodes, name)
    }

    /// Handlebars source of a single block, nested markers removed.
    pub fn block_source(&self, name: &str) -> Option<String> {
        self.find_block(name).map(|block| {
            let mut out = String::new();
            write_nodes(&block.nodes, &mut out);
            out
        })
    }

    /// Names of all blocks in document order.
    pub fn block_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.nodes, &mut names);
        names
    }
}

/// Resolve `{{super}}` placeholders in a root template, which has no parent.
pub(crate) fn flatten_root(template: &Template) -> Vec<Node> {
    substitute_super(&template.nodes, "", &HashMap::new())
}

/// Apply a child's block overrides on top of its parent's resolved nodes.
pub(crate) fn inherit(resolved: Vec<Node>, child: &Template) -> Vec<Node> {
    let mut current = HashMap::new();
    snapshot_blocks(&resolved, &mut current);
    let overrides = child.blocks();
    apply_overrides(resolved, &overrides, &current)
}

fn current<'a>(open: &'a mut [Block], root: &'a mut Vec<Node>) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(block) => &mut block.nodes,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    match nodes.last_mut() {
        Some(Node::Text(existing)) => existing.push_str(text),
        _ => nodes.push(Node::Text(text.to_string())),
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Block(block) => write_nodes(&block.nodes, out),
            Node::Super => {}
        }
    }
}

fn collect_names<'a>(nodes: &'a [Node], names: &mut Vec<&'a str>) {
    for node in nodes {
        if let Node::Block(block) = node {
            names.push(&block.name);
            collect_names(&block.nodes, names);
        }
    }
}

fn collect_blocks<'a>(nodes: &'a [Node], blocks: &mut HashMap<&'a str, &'a Block>) {
    for node in nodes {
        if let Node::Block(block) = node {
            blocks.insert(&block.name, block);
            collect_blocks(&block.nodes, blocks);
        }
    }
}

fn find_block<'a>(nodes: &'a [Node], name: &str) -> Option<&'a Block> {
    nodes.iter().find_map(|node| match node {
        Node::Block(block) if block.name == name => Some(block),
        Node::Block(block) => find_block(&block.nodes, name),
        _ => None,
    })
}

fn snapshot_blocks(nodes: &[Node], out: &mut HashMap<String, Vec<Node>>) {
    for node in nodes {
        if let Node::Block(block) = node {
            out.insert(block.name.clone(), block.nodes.clone());
            snapshot_blocks(&block.nodes, out);
        }
    }
}

fn apply_overrides(
    nodes: Vec<Node>,
    overrides: &HashMap<&str, &Block>,
    current: &HashMap<String, Vec<Node>>,
) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Block(block) => match overrides.get(block.name.as_str()) {
                Some(replacement) => Node::Block(Block {
                    nodes: substitute_super(&replacement.nodes, &block.name, current),
                    name: block.name,
                }),
                None => Node::Block(Block {
                    nodes: apply_overrides(block.nodes, overrides, current),
                    name: block.name,
                }),
            },
            other => other,
        })
        .collect()
}

fn substitute_super(
    nodes: &[Node],
    owner: &str,
    current: &HashMap<String, Vec<Node>>,
) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Super => {
                if let Some(parent_nodes) = current.get(owner) {
                    out.extend(parent_nodes.iter().cloned());
                }
            }
            Node::Block(block) => out.push(Node::Block(Block {
                name: block.name.clone(),
                nodes: substitute_super(&block.nodes, &block.name, current),
            })),
            Node::Text(text) => out.push(Node::Text(text.clone())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(base: &Template, child: &Template) -> ResolvedTemplate {
        ResolvedTemplate::new(&child.name, inherit(flatten_root(base), child))
    }

    #[test]
    fn test_parse_blocks() {
        let template = Template::parse(
            "page.html",
            r#"<html>{{#block "head"}}<title>{{title}}</title>{{/block}}<body>{{#block "content"}}Hello{{#block "inner"}}!{{/block}}{{/block}}</body></html>"#,
        )
        .unwrap();

        assert_eq!(template.parent, None);
        assert_eq!(template.block_names(), vec!["head", "content", "inner"]);
        assert!(template.blocks().contains_key("inner"));
    }

    #[test]
    fn test_whitespace_inside_markers() {
        let template = Template::parse("t", r#"{{ #block "a" }}x{{ /block }}"#).unwrap();
        assert_eq!(template.block_names(), vec!["a"]);
    }

    #[test]
    fn test_resolved_source_strips_markers() {
        let template = Template::parse("t", r#"<p>{{#block "a"}}A{{#block "b"}}B{{/block}}{{/block}}</p>"#).unwrap();
        let resolved = ResolvedTemplate::new("t", flatten_root(&template));
        assert_eq!(resolved.source(), "<p>AB</p>");
        assert_eq!(resolved.block_source("a").as_deref(), Some("AB"));
        assert_eq!(resolved.block_source("b").as_deref(), Some("B"));
        assert_eq!(resolved.block_source("c"), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Template::parse("t", r#"{{#block "a"}}x"#).is_err());
        assert!(Template::parse("t", "x{{/block}}").is_err());
        assert!(Template::parse("t", r#"{{#block "a"}}{{/block}}{{#block "a"}}{{/block}}"#).is_err());
        assert!(Template::parse("t", r#"{{#block "bad name"}}{{/block}}"#).is_err());
        assert!(Template::parse("t", r#"x{{extends "base"}}"#).is_err());
        assert!(Template::parse("t", "{{super}}").is_err());
    }

    #[test]
    fn test_handlebars_tags_untouched() {
        let template = Template::parse("t", "{{#each items}}{{this}}{{/each}} {{superlative}}").unwrap();
        assert_eq!(
            template.nodes,
            vec![Node::Text("{{#each items}}{{this}}{{/each}} {{superlative}}".into())]
        );
    }

    #[test]
    fn test_markers_in_comments_are_ignored() {
        let source = r#"{{!-- {{#block "x"}} --}}<p>{{#block "a"}}A{{! {{/block}}{{/block}}</p>{{~!-- {{super}} --~}}"#;
        let template = Template::parse("p.html", source).unwrap();
        assert_eq!(template.block_names(), vec!["a"]);

        let resolved = ResolvedTemplate::new("p.html", flatten_root(&template));
        assert_eq!(resolved.block_source("a").as_deref(), Some("A{{! {{/block}}"));
    }

    #[test]
    fn test_markers_in_raw_blocks_are_ignored() {
        let source = r#"{{{{raw}}}}{{#block "literal"}}{{{{/raw}}}}{{#block "a"}}A{{/block}}"#;
        let template = Template::parse("t", source).unwrap();
        assert_eq!(template.block_names(), vec!["a"]);

        let unterminated = Template::parse("t", r#"{{{{raw}}}}{{/block}}"#).unwrap();
        assert!(unterminated.block_names().is_empty());
    }

    #[test]
    fn test_whitespace_control_trims_adjacent_text() {
        let template = Template::parse("p.html", r#"<p>{{~#block "a"~}} A {{~/block~}}</p>"#).unwrap();
        assert_eq!(template.block_names(), vec!["a"]);

        let resolved = ResolvedTemplate::new("p.html", flatten_root(&template));
        assert_eq!(resolved.block_source("a").as_deref(), Some("A"));
        assert_eq!(resolved.source(), "<p>A</p>");
    }

    #[test]
    fn test_whitespace_control_is_one_sided() {
        let template = Template::parse("t", "x {{#block \"a\"~}}\n  A  {{/block}} y").unwrap();
        let resolved = ResolvedTemplate::new("t", flatten_root(&template));
        assert_eq!(resolved.source(), "x A   y");
    }

    #[test]
    fn test_triple_stash_super() {
        let template = Template::parse("t", r#"{{#block "a"}}[{{{super}}}]{{/block}}"#).unwrap();
        let resolved = ResolvedTemplate::new("t", flatten_root(&template));
        assert_eq!(resolved.source(), "[]");

        let base = Template::parse("base", r#"{{#block "title"}}Site{{/block}}"#).unwrap();
        let child = Template::parse(
            "child",
            r#"{{extends "base"}}{{#block "title"}}<{{{~super~}}}>{{/block}}"#,
        )
        .unwrap();
        assert_eq!(resolve(&base, &child).source(), "<Site>");
    }

    #[test]
    fn test_triple_stash_rejected_on_other_markers() {
        assert!(Template::parse("t", r#"{{{#block "a"}}}{{/block}}"#).is_err());
        assert!(Template::parse("t", r#"{{#block "a"}}{{{super}}{{/block}}"#).is_err());
    }

    #[test]
    fn test_inheritance_overrides_blocks() {
        let base = Template::parse(
            "base.html",
            r#"<h1>{{#block "title"}}Base{{/block}}</h1><main>{{#block "content"}}{{/block}}</main>"#,
        )
        .unwrap();
        let child = Template::parse(
            "child.html",
            r#"
            {{extends "base.html"}}
            ignored text
            {{#block "content"}}Child{{/block}}"#,
        )
        .unwrap();

        assert_eq!(child.parent.as_deref(), Some("base.html"));
        let resolved = resolve(&base, &child);
        assert_eq!(resolved.source(), "<h1>Base</h1><main>Child</main>");
        assert_eq!(resolved.block_source("content").as_deref(), Some("Child"));
    }

    #[test]
    fn test_super_inserts_parent_block() {
        let base = Template::parse("base", r#"{{#block "title"}}Site{{/block}}"#).unwrap();
        let child = Template::parse(
            "child",
            r#"{{extends "base"}}{{#block "title"}}Page | {{super}}{{/block}}"#,
        )
        .unwrap();

        let resolved = resolve(&base, &child);
        assert_eq!(resolved.source(), "Page | Site");
    }

    #[test]
    fn test_super_in_root_renders_nothing() {
        let template = Template::parse("t", r#"{{#block "a"}}[{{super}}]{{/block}}"#).unwrap();
        let resolved = ResolvedTemplate::new("t", flatten_root(&template));
        assert_eq!(resolved.source(), "[]");
    }

    #[test]
    fn test_nested_override_inside_untouched_block() {
        let base = Template::parse(
            "base",
            r#"{{#block "outer"}}<{{#block "inner"}}base{{/block}}>{{/block}}"#,
        )
        .unwrap();
        let child = Template::parse("child", r#"{{extends "base"}}{{#block "inner"}}child{{/block}}"#).unwrap();

        let resolved = resolve(&base, &child);
        assert_eq!(resolved.source(), "<child>");
        assert_eq!(resolved.block_source("outer").as_deref(), Some("<child>"));
    }
}
