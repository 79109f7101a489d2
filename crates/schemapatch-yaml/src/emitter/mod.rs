//! Emitter turning a [`Node`] tree back into YAML text
//!
//! Untouched parts of a parsed document are copied from the source. Block
//! collections that were edited are spliced: their untouched entries are
//! copied with their leading comment lines, edited block values are spliced
//! recursively, and only new or changed entries are written from scratch.

mod scalar;

use std::ops::Range;
use std::sync::Arc;

use crate::error::{Result, YamlError};
use crate::node::{Layout, Node, NodeKind, Origin, Style};
use crate::resolve::{self, MAP_TAG, SEQ_TAG};

/// Emitter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Spaces per nesting level for newly written content
    pub indent: usize,
    /// Whether block sequences nested in mappings are indented below their
    /// key. `None` follows the convention of the parsed document, and
    /// indents when the document has none.
    pub indented_sequences: Option<bool>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            indented_sequences: None,
        }
    }
}

/// Serialize a document (or any node, as a document root)
pub fn emit(node: &Node, options: &EmitOptions) -> Result<String> {
    let mut emitter = Emitter {
        out: String::new(),
        options,
        newline: "\n",
        indented: options.indented_sequences.unwrap_or(true),
    };
    if node.kind == NodeKind::Document {
        emitter.document(node)?;
    } else {
        emitter.top_level(node)?;
    }
    Ok(emitter.out)
}

/// Where an inline node is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Block,
    Flow,
    Key,
}

pub(crate) fn format_comment(comment: &str) -> String {
    let comment = comment.trim();
    if comment.starts_with('#') {
        comment.to_string()
    } else {
        format!("# {}", comment)
    }
}

fn is_block_collection(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Mapping | NodeKind::Sequence)
        && !node.style.contains(Style::FLOW)
        && !node.children.is_empty()
}

fn is_empty_null(node: &Node) -> bool {
    node.kind == NodeKind::Scalar
        && node.value.is_empty()
        && node.anchor.is_empty()
        && !node.style.contains(Style::TAGGED)
        && node.short_tag() == resolve::NULL_TAG
}

fn check_pairs(node: &Node) -> Result<()> {
    if node.children.len() % 2 != 0 {
        return Err(YamlError::Emit("mapping has an odd number of children".to_string()));
    }
    Ok(())
}

fn same_source(a: &Origin, b: &Origin) -> bool {
    Arc::ptr_eq(&a.src, &b.src)
}

fn complex_key() -> YamlError {
    YamlError::Emit("complex mapping keys are not supported".to_string())
}

pub(crate) struct Emitter<'o> {
    out: String,
    options: &'o EmitOptions,
    newline: &'static str,
    indented: bool,
}

impl Emitter<'_> {
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        self.out.push_str(self.newline);
    }

    fn ensure_line_start(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.line_break();
        }
    }

    fn write_indent(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat_n(' ', indent));
    }

    fn comment_lines(&mut self, comment: &str, indent: usize) {
        for line in comment.lines().filter(|line| !line.trim().is_empty()) {
            self.write_indent(indent);
            self.raw(&format_comment(line));
            self.line_break();
        }
    }

    fn trailing_comment(&mut self, comment: &str) {
        if !comment.is_empty() {
            self.raw(" ");
            self.raw(&format_comment(comment));
        }
    }

    /// Anchor and tag of a collection, as written before it
    fn collection_props(node: &Node) -> String {
        let mut props = Vec::new();
        if !node.anchor.is_empty() {
            props.push(format!("&{}", node.anchor));
        }
        let implicit = if node.kind == NodeKind::Mapping { MAP_TAG } else { SEQ_TAG };
        if !node.tag.is_empty()
            && (node.style.contains(Style::TAGGED) || resolve::short_tag(&node.tag) != implicit)
        {
            props.push(resolve::short_tag(&node.tag));
        }
        props.join(" ")
    }

    // ---- documents ----

    fn document(&mut self, doc: &Node) -> Result<()> {
        if doc.children.len() > 1 {
            return Err(YamlError::Emit("a document holds at most one root node".to_string()));
        }
        let parsed = doc.origin().and_then(|origin| match &origin.layout {
            Layout::Document {
                body,
                indented_sequences,
            } => Some((origin, body.clone(), *indented_sequences)),
            _ => None,
        });

        let Some((origin, body, hint)) = parsed else {
            self.comment_lines(&doc.head_comment, 0);
            if let Some(root) = doc.children.first() {
                self.top_level(root)?;
            }
            if !doc.foot_comment.is_empty() {
                self.ensure_line_start();
                self.comment_lines(&doc.foot_comment, 0);
            }
            return Ok(());
        };

        let src = &*origin.src;
        if doc.is_pristine() {
            self.raw(src);
            return Ok(());
        }
        if src.contains("\r\n") {
            self.newline = "\r\n";
        }
        self.indented = self.options.indented_sequences.or(hint).unwrap_or(true);

        if doc.head_comment == origin.snapshot.head_comment {
            self.raw(&src[..body.start]);
        } else {
            self.comment_lines(&doc.head_comment, 0);
        }
        if let Some(root) = doc.children.first() {
            self.root_in_body(root, origin, &body)?;
        }
        if doc.foot_comment == origin.snapshot.foot_comment {
            if body.end < src.len() {
                self.ensure_line_start();
                self.raw(&src[body.end..]);
            }
        } else if !doc.foot_comment.is_empty() {
            self.ensure_line_start();
            self.comment_lines(&doc.foot_comment, 0);
        }
        Ok(())
    }

    fn root_in_body(
        &mut self,
        root: &Node,
        doc_origin: &Origin,
        body: &Range<usize>,
    ) -> Result<()> {
        let src = &*doc_origin.src;
        let root_origin = root
            .origin()
            .filter(|o| o.parent_indent == -1 && same_source(o, doc_origin));
        if let Some(origin) = root_origin {
            if root.is_pristine() {
                self.raw(&src[body.clone()]);
                return Ok(());
            }
            if self.spliceable(root, -1) {
                self.raw(&src[body.start..origin.span.start]);
                return self.splice(root);
            }
        }
        if is_block_collection(root) && body.start > 0 && !src[..body.start].ends_with('\n') {
            self.line_break();
        }
        self.top_level(root)
    }

    /// Write a node as the root of a document
    fn top_level(&mut self, root: &Node) -> Result<()> {
        if is_block_collection(root) {
            let props = Self::collection_props(root);
            if !props.is_empty() {
                self.raw(&props);
                self.trailing_comment(&root.line_comment);
                self.line_break();
            } else {
                self.comment_lines(&root.line_comment, 0);
            }
            return self.block_collection(root, 0, false);
        }
        let comment_written = self.inline(root, 0, Place::Block)?;
        if !comment_written {
            self.trailing_comment(&root.line_comment);
        }
        self.line_break();
        Ok(())
    }

    // ---- splicing ----

    /// A parsed block collection whose own fields are unchanged and whose
    /// position matches the one it was parsed at
    fn spliceable(&self, node: &Node, parent_indent: isize) -> bool {
        is_block_collection(node)
            && node.header_unchanged()
            && node.origin().is_some_and(|o| {
                o.parent_indent == parent_indent && matches!(o.layout, Layout::Block { .. })
            })
    }

    fn splice(&mut self, node: &Node) -> Result<()> {
        match node.kind {
            NodeKind::Mapping => self.splice_mapping(node),
            _ => self.splice_sequence(node),
        }
    }

    /// Write what precedes an entry: its leading trivia and indentation, or
    /// nothing when the entry sits right after a `- ` of the enclosing item
    #[allow(clippy::too_many_arguments)]
    fn lead_in(
        &mut self,
        src: &str,
        region: &Range<usize>,
        entry_start: usize,
        was_first: bool,
        slot: bool,
        head_comment: Option<&str>,
        indent: usize,
    ) {
        if slot {
            return;
        }
        self.ensure_line_start();
        match head_comment {
            None if !was_first => self.raw(&src[region.start..entry_start]),
            _ => {
                self.comment_lines(head_comment.unwrap_or_default(), indent);
                self.write_indent(indent);
            }
        }
    }

    fn splice_mapping(&mut self, map: &Node) -> Result<()> {
        check_pairs(map)?;
        let Some(origin) = map.origin() else {
            return Err(YamlError::Emit("cannot splice a generated mapping".to_string()));
        };
        let Some((indent, compact)) = origin.block_indent() else {
            return Err(YamlError::Emit("cannot splice a flow mapping".to_string()));
        };
        let src = &*origin.src;
        let parent = indent as isize;

        for (i, pair) in map.children.chunks_exact(2).enumerate() {
            let (key, value) = (&pair[0], &pair[1]);
            let slot = compact && i == 0;
            let entry = key
                .origin()
                .filter(|o| o.parent_indent == parent && same_source(o, origin))
                .and_then(|o| o.region.clone().map(|region| (o, region)));

            let Some((key_origin, region)) = entry else {
                if !slot {
                    self.ensure_line_start();
                    self.comment_lines(&key.head_comment, indent);
                    self.write_indent(indent);
                }
                self.entry(key, value, indent)?;
                continue;
            };

            let was_first = compact && region.start == origin.span.start;
            let head = (key.head_comment != key_origin.snapshot.head_comment)
                .then_some(key.head_comment.as_str());
            let own_value = value.origin().is_some_and(|o| {
                same_source(o, origin)
                    && o.parent_indent == parent
                    && o.span.start >= key_origin.span.end
                    && o.span.end <= region.end
            });

            self.lead_in(src, &region, key_origin.entry_start, was_first, slot, head, indent);
            if own_value && key.is_pristine() && value.is_pristine() {
                self.raw(&src[key_origin.entry_start..region.end]);
            } else if let Some(value_origin) = value
                .origin()
                .filter(|_| own_value && key.is_pristine() && self.spliceable(value, parent))
            {
                self.raw(&src[key_origin.entry_start..value_origin.span.start]);
                self.splice(value)?;
            } else {
                self.entry(key, value, indent)?;
            }
        }

        if map.foot_comment != origin.snapshot.foot_comment {
            self.ensure_line_start();
            self.comment_lines(&map.foot_comment, indent);
        }
        Ok(())
    }

    fn splice_sequence(&mut self, seq: &Node) -> Result<()> {
        let Some(origin) = seq.origin() else {
            return Err(YamlError::Emit("cannot splice a generated sequence".to_string()));
        };
        let Some((indent, compact)) = origin.block_indent() else {
            return Err(YamlError::Emit("cannot splice a flow sequence".to_string()));
        };
        let src = &*origin.src;
        let parent = indent as isize;

        for (i, item) in seq.children.iter().enumerate() {
            let slot = compact && i == 0;
            let entry = item
                .origin()
                .filter(|o| o.parent_indent == parent && same_source(o, origin))
                .and_then(|o| o.region.clone().map(|region| (o, region)));

            let Some((item_origin, region)) = entry else {
                if !slot {
                    self.ensure_line_start();
                    self.comment_lines(&item.head_comment, indent);
                    self.write_indent(indent);
                }
                self.item(item, indent)?;
                continue;
            };

            let was_first = compact && region.start == origin.span.start;
            let head = (item.head_comment != item_origin.snapshot.head_comment)
                .then_some(item.head_comment.as_str());

            self.lead_in(src, &region, item_origin.entry_start, was_first, slot, head, indent);
            if item.is_pristine() {
                self.raw(&src[item_origin.entry_start..region.end]);
            } else if self.spliceable(item, parent) {
                self.raw(&src[item_origin.entry_start..item_origin.span.start]);
                self.splice(item)?;
            } else {
                self.item(item, indent)?;
            }
        }

        if seq.foot_comment != origin.snapshot.foot_comment {
            self.ensure_line_start();
            self.comment_lines(&seq.foot_comment, indent);
        }
        Ok(())
    }

    // ---- generation ----

    /// Write the entries of a block collection at `indent`; with `compact`
    /// the first entry continues the current line
    fn block_collection(&mut self, node: &Node, indent: usize, compact: bool) -> Result<()> {
        if node.kind == NodeKind::Mapping {
            check_pairs(node)?;
            for (i, pair) in node.children.chunks_exact(2).enumerate() {
                if !(compact && i == 0) {
                    self.ensure_line_start();
                    self.comment_lines(&pair[0].head_comment, indent);
                    self.write_indent(indent);
                }
                self.entry(&pair[0], &pair[1], indent)?;
            }
        } else {
            for (i, item) in node.children.iter().enumerate() {
                if !(compact && i == 0) {
                    self.ensure_line_start();
                    self.comment_lines(&item.head_comment, indent);
                    self.write_indent(indent);
                }
                self.item(item, indent)?;
            }
        }
        if !node.foot_comment.is_empty() {
            self.ensure_line_start();
            self.comment_lines(&node.foot_comment, indent);
        }
        Ok(())
    }

    /// `key: value` for a mapping at `indent`, through the end of its last line
    fn entry(&mut self, key: &Node, value: &Node, indent: usize) -> Result<()> {
        if matches!(key.kind, NodeKind::Mapping | NodeKind::Sequence | NodeKind::Document) {
            return Err(complex_key());
        }
        self.inline(key, indent, Place::Key)?;
        if key.kind == NodeKind::Alias {
            self.raw(" ");
        }
        self.raw(":");

        if is_block_collection(value) {
            let props = Self::collection_props(value);
            if !props.is_empty() {
                self.raw(" ");
                self.raw(&props);
            }
            let comment = if value.line_comment.is_empty() {
                &key.line_comment
            } else {
                &value.line_comment
            };
            self.trailing_comment(comment);
            self.line_break();
            return self.nested_block(value, indent);
        }

        let mut comment_written = false;
        if !is_empty_null(value) {
            self.raw(" ");
            comment_written = self.inline(value, indent, Place::Block)?;
        }
        if !comment_written {
            let comment = if value.line_comment.is_empty() {
                &key.line_comment
            } else {
                &value.line_comment
            };
            self.trailing_comment(comment);
        }
        self.line_break();
        Ok(())
    }

    /// A block collection written below the key of a mapping at `indent`
    fn nested_block(&mut self, value: &Node, indent: usize) -> Result<()> {
        let parent = indent as isize;
        if let Some(origin) = value.origin().filter(|o| o.parent_indent == parent) {
            if matches!(origin.layout, Layout::Block { compact: false, .. }) {
                if value.is_pristine() {
                    self.raw(&origin.src[origin.span.clone()]);
                    return Ok(());
                }
                if self.spliceable(value, parent) {
                    return self.splice(value);
                }
            }
        }
        let child = if value.kind == NodeKind::Sequence && !self.indented {
            indent
        } else {
            indent + self.options.indent
        };
        self.block_collection(value, child, false)
    }

    /// `- item` for a sequence at `indent`, through the end of its last line
    fn item(&mut self, item: &Node, indent: usize) -> Result<()> {
        self.raw("-");
        if is_block_collection(item) {
            let props = Self::collection_props(item);
            if props.is_empty() && item.line_comment.is_empty() {
                self.raw(" ");
                let inner = indent + 2;
                let parent = indent as isize;
                if let Some(origin) = item.origin().filter(|o| o.parent_indent == parent) {
                    if origin.layout == (Layout::Block { indent: inner, compact: true }) {
                        if item.is_pristine() {
                            self.raw(&origin.src[origin.span.clone()]);
                            return Ok(());
                        }
                        if self.spliceable(item, parent) {
                            return self.splice(item);
                        }
                    }
                }
                return self.block_collection(item, inner, true);
            }
            if !props.is_empty() {
                self.raw(" ");
                self.raw(&props);
            }
            self.trailing_comment(&item.line_comment);
            self.line_break();
            return self.block_collection(item, indent + self.options.indent, false);
        }

        let mut comment_written = false;
        if !is_empty_null(item) {
            self.raw(" ");
            comment_written = self.inline(item, indent, Place::Block)?;
        }
        if !comment_written {
            self.trailing_comment(&item.line_comment);
        }
        self.line_break();
        Ok(())
    }

    /// Scalars, aliases and flow collections; returns whether the node's
    /// line comment was written as part of it
    fn inline(&mut self, node: &Node, indent: usize, place: Place) -> Result<bool> {
        if let Some(origin) = node.origin() {
            if let Layout::Inline {
                multiline,
                comment_in_span,
            } = origin.layout
            {
                let fits = !multiline
                    || (place == Place::Block && origin.parent_indent == indent as isize);
                if fits && !origin.span.is_empty() && node.is_pristine() {
                    self.raw(&origin.src[origin.span.clone()]);
                    return Ok(comment_in_span);
                }
            }
        }

        match node.kind {
            NodeKind::Scalar => self.scalar(node, indent, place),
            NodeKind::Alias => {
                self.raw("*");
                self.raw(&node.value);
                Ok(false)
            }
            NodeKind::Mapping | NodeKind::Sequence => {
                if place == Place::Key {
                    return Err(complex_key());
                }
                let props = Self::collection_props(node);
                if !props.is_empty() {
                    self.raw(&props);
                    self.raw(" ");
                }
                self.flow(node, indent)?;
                Ok(false)
            }
            NodeKind::Document => Err(YamlError::Emit("a document cannot be nested".to_string())),
        }
    }

    fn flow(&mut self, node: &Node, indent: usize) -> Result<()> {
        if node.kind == NodeKind::Mapping {
            check_pairs(node)?;
            self.raw("{");
            for (i, pair) in node.children.chunks_exact(2).enumerate() {
                if i > 0 {
                    self.raw(", ");
                }
                let kind = &pair[0].kind;
                if matches!(kind, NodeKind::Mapping | NodeKind::Sequence | NodeKind::Document) {
                    return Err(complex_key());
                }
                self.inline(&pair[0], indent, Place::Flow)?;
                if pair[0].kind == NodeKind::Alias {
                    self.raw(" ");
                }
                self.raw(":");
                if !is_empty_null(&pair[1]) {
                    self.raw(" ");
                    self.inline(&pair[1], indent, Place::Flow)?;
                }
            }
            self.raw("}");
        } else {
            self.raw("[");
            for (i, item) in node.children.iter().enumerate() {
                if i > 0 {
                    self.raw(", ");
                }
                self.inline(item, indent, Place::Flow)?;
            }
            self.raw("]");
        }
        Ok(())
    }
}
