//! Recursive-descent parser producing a lossless [`Node`] tree
//!
//! The parser works directly on the source bytes and records, for every
//! node, the span it came from. Block collections also record how their
//! entries partition the source lines: every entry owns its leading comment
//! and blank lines plus everything through the end of its last line. The
//! emitter relies on that partition to copy untouched entries verbatim.
//!
//! Only the first document of a stream is parsed. Whatever follows it is
//! kept as opaque text.

mod flow;
mod scalar;

use std::cell::Cell;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{Result, YamlError};
use crate::node::{Layout, Node, NodeKind, Origin};
use crate::resolve;

/// Parse the first document of `input`
pub fn parse(input: &str) -> Result<Node> {
    let parser = Parser::new(input);
    let mut doc = parser.document()?;
    seal(&mut doc);
    Ok(doc)
}

/// Record the parsed state of every node so later edits can be detected
fn seal(node: &mut Node) {
    let snapshot = node.snapshot();
    if let Some(origin) = node.origin.as_mut() {
        origin.snapshot = snapshot;
    }
    for child in &mut node.children {
        seal(child);
    }
}

/// Where a node starts relative to the surrounding syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    /// First content of a line
    Line,
    /// After `- ` on the dash line
    Item,
    /// After `key:` on the key line
    Value,
    /// After a `---` marker
    Marker,
}

/// Anchor and tag written before a node
#[derive(Debug, Default)]
struct Props {
    anchor: String,
    tag: String,
}

impl Props {
    fn is_empty(&self) -> bool {
        self.anchor.is_empty() && self.tag.is_empty()
    }

    fn apply(self, node: &mut Node) {
        if !self.anchor.is_empty() {
            node.anchor = self.anchor;
        }
        if !self.tag.is_empty() {
            node.tag = self.tag;
            node.style.insert(crate::node::Style::TAGGED);
        }
    }
}

/// A parsed node, the position of the line after it, and a comment that
/// belongs to the enclosing entry (`key: # note` above a block value)
struct Parsed {
    node: Node,
    end: usize,
    entry_comment: String,
}

pub(crate) struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    shared: Arc<str>,
    indented_sequences: Cell<Option<bool>>,
}

pub(crate) fn is_blank_or_end(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0)
}

fn is_eol(b: u8) -> bool {
    matches!(b, b'\n' | b'\r' | 0)
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            shared: Arc::from(src),
            indented_sequences: Cell::new(None),
        }
    }

    // ---- byte level helpers ----

    fn at(&self, pos: usize) -> u8 {
        self.bytes.get(pos).copied().unwrap_or(0)
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    /// End of the line holding `pos`, before any `\r\n` or `\n`
    fn eol(&self, pos: usize) -> usize {
        let mut i = pos;
        while i < self.len() && self.bytes[i] != b'\n' {
            i += 1;
        }
        if i > pos && self.bytes[i - 1] == b'\r' {
            i - 1
        } else {
            i
        }
    }

    /// Start of the line after the one holding `pos`
    fn next_line(&self, pos: usize) -> usize {
        let mut i = pos;
        while i < self.len() && self.bytes[i] != b'\n' {
            i += 1;
        }
        (i + 1).min(self.len())
    }

    fn line_start(&self, pos: usize) -> usize {
        self.bytes[..pos]
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1)
    }

    fn column(&self, pos: usize) -> usize {
        pos - self.line_start(pos)
    }

    fn skip_ws(&self, pos: usize) -> usize {
        let mut i = pos;
        while matches!(self.at(i), b' ' | b'\t') {
            i += 1;
        }
        i
    }

    fn indent_of(&self, line: usize) -> usize {
        let mut i = line;
        while self.at(i) == b' ' {
            i += 1;
        }
        i - line
    }

    /// Blank or comment-only line
    fn is_trivia_line(&self, line: usize) -> bool {
        let p = self.skip_ws(line);
        is_eol(self.at(p)) || self.at(p) == b'#'
    }

    fn is_blank_line(&self, line: usize) -> bool {
        is_eol(self.at(self.skip_ws(line)))
    }

    fn is_marker(&self, line: usize) -> bool {
        let rest = &self.src[line..];
        (rest.starts_with("---") || rest.starts_with("...")) && is_blank_or_end(self.at(line + 3))
    }

    fn is_dash(&self, pos: usize) -> bool {
        self.at(pos) == b'-' && is_blank_or_end(self.at(pos + 1))
    }

    /// Start of the next line with content, skipping blank and comment lines
    fn next_content(&self, line: usize) -> Result<Option<usize>> {
        let mut ls = line;
        while ls < self.len() {
            if !self.is_trivia_line(ls) {
                let p = ls + self.indent_of(ls);
                if self.at(p) == b'\t' {
                    return Err(self.error(p, "tabs must not be used for indentation"));
                }
                return Ok(Some(ls));
            }
            ls = self.next_line(ls);
        }
        Ok(None)
    }

    /// Comment lines within `from..to`, joined by newlines
    fn comments_in(&self, from: usize, to: usize) -> String {
        let mut lines = Vec::new();
        let mut ls = from;
        while ls < to {
            let p = self.skip_ws(ls);
            if self.at(p) == b'#' {
                lines.push(self.src[p..self.eol(p)].trim_end());
            }
            ls = self.next_line(ls);
        }
        lines.join("\n")
    }

    /// Parse the rest of a line after a value: an optional comment, then the line break
    fn finish_line(&self, pos: usize) -> Result<(String, usize)> {
        let p = self.skip_ws(pos);
        let mut comment = String::new();
        let mut end = p;
        if self.at(p) == b'#' {
            end = self.eol(p);
            comment = self.src[p..end].trim_end().to_string();
        }
        if !is_eol(self.at(end)) {
            return Err(self.error(end, "unexpected content after value"));
        }
        Ok((comment, self.next_line(end)))
    }

    pub(crate) fn error(&self, pos: usize, message: &str) -> YamlError {
        let pos = pos.min(self.len());
        let line = self.bytes[..pos].iter().filter(|b| **b == b'\n').count() + 1;
        let start = self.line_start(pos);
        let column = self
            .src
            .get(start..pos)
            .map_or(pos - start, |s| s.chars().count())
            + 1;
        YamlError::Malformed {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn attach(&self, node: &mut Node, span: Range<usize>, layout: Layout, parent_indent: isize) {
        node.origin = Some(Box::new(Origin {
            src: Arc::clone(&self.shared),
            entry_start: span.start,
            span,
            region: None,
            parent_indent,
            layout,
            snapshot: node.snapshot(),
        }));
    }

    fn inline_layout(&self, span: &Range<usize>) -> Layout {
        Layout::Inline {
            multiline: self.src[span.clone()].contains('\n'),
            comment_in_span: false,
        }
    }

    /// Move the start of a node's span back over its properties
    fn extend_span(node: &mut Node, start: usize) {
        if let Some(origin) = node.origin.as_mut() {
            if start < origin.span.start && !matches!(origin.layout, Layout::Block { .. }) {
                origin.span.start = start;
                origin.entry_start = start;
            }
        }
    }

    // ---- properties ----

    fn name_end(&self, pos: usize, flow: bool) -> usize {
        let mut i = pos;
        while !is_blank_or_end(self.at(i))
            && !(flow && matches!(self.at(i), b',' | b'[' | b']' | b'{' | b'}'))
        {
            i += 1;
        }
        i
    }

    fn tag_end(&self, pos: usize, flow: bool) -> Result<usize> {
        if self.at(pos + 1) == b'<' {
            let end = self.eol(pos);
            return self.src[pos..end]
                .find('>')
                .map(|i| pos + i + 1)
                .ok_or_else(|| self.error(pos, "unterminated verbatim tag"));
        }
        Ok(self.name_end(pos, flow))
    }

    /// Parse anchors and tags in front of a node
    fn properties(&self, pos: usize, flow: bool) -> Result<(Props, usize)> {
        let mut props = Props::default();
        let mut p = pos;
        loop {
            match self.at(p) {
                b'&' => {
                    if !props.anchor.is_empty() {
                        return Err(self.error(p, "a node can only have one anchor"));
                    }
                    let end = self.name_end(p + 1, flow);
                    if end == p + 1 {
                        return Err(self.error(p, "empty anchor name"));
                    }
                    props.anchor = self.src[p + 1..end].to_string();
                    p = self.skip_ws(end);
                }
                b'!' => {
                    if !props.tag.is_empty() {
                        return Err(self.error(p, "a node can only have one tag"));
                    }
                    let end = self.tag_end(p, flow)?;
                    props.tag = resolve::short_tag(&self.src[p..end]);
                    p = self.skip_ws(end);
                }
                _ => return Ok((props, p)),
            }
        }
    }

    /// Closing position of a quoted scalar that ends on its own line
    fn quoted_end_on_line(&self, pos: usize) -> Option<usize> {
        let quote = self.at(pos);
        let end = self.eol(pos);
        let mut i = pos + 1;
        while i < end {
            match self.at(i) {
                b'\\' if quote == b'"' => i += 2,
                b'\'' if quote == b'\'' && self.at(i + 1) == b'\'' => i += 2,
                b if b == quote => return Some(i + 1),
                _ => i += 1,
            }
        }
        None
    }

    /// Whether the line content at `pos` is an implicit mapping key
    fn is_mapping_key(&self, pos: usize) -> bool {
        let mut p = pos;
        while matches!(self.at(p), b'&' | b'!') {
            let end = match self.tag_end(p, false) {
                Ok(end) => end,
                Err(_) => return false,
            };
            if !matches!(self.at(end), b' ' | b'\t') {
                return false;
            }
            p = self.skip_ws(end);
        }
        let colon_follows = |end: usize| {
            let q = self.skip_ws(end);
            self.at(q) == b':' && is_blank_or_end(self.at(q + 1))
        };
        match self.at(p) {
            b'"' | b'\'' => self.quoted_end_on_line(p).is_some_and(colon_follows),
            b'*' => colon_follows(self.name_end(p + 1, false)),
            b'[' | b'{' | b'#' | b'|' | b'>' => false,
            b if is_eol(b) => false,
            b'-' | b'?' if is_blank_or_end(self.at(p + 1)) => false,
            _ => {
                let end = self.eol(p);
                let mut i = p;
                while i < end {
                    match self.bytes[i] {
                        b'#' if i > p && matches!(self.bytes[i - 1], b' ' | b'\t') => return false,
                        b':' if is_blank_or_end(self.at(i + 1)) => return true,
                        _ => i += 1,
                    }
                }
                false
            }
        }
    }

    // ---- document ----

    fn document(&self) -> Result<Node> {
        let mut pos = if self.src.starts_with('\u{feff}') { 3 } else { 0 };
        let mut explicit_start = false;

        let root_at = loop {
            if pos >= self.len() {
                break None;
            }
            if self.is_trivia_line(pos) {
                pos = self.next_line(pos);
                continue;
            }
            if self.at(pos) == b'%' && !explicit_start {
                pos = self.next_line(pos);
                continue;
            }
            if self.is_marker(pos) {
                if self.src[pos..].starts_with("...") || explicit_start {
                    break None;
                }
                explicit_start = true;
                let after = self.skip_ws(pos + 3);
                if is_eol(self.at(after)) || self.at(after) == b'#' {
                    pos = self.next_line(pos);
                    continue;
                }
                break Some((after, Ctx::Marker));
            }
            let content = pos + self.indent_of(pos);
            if self.at(content) == b'\t' {
                return Err(self.error(content, "tabs must not be used for indentation"));
            }
            break Some((content, Ctx::Line));
        };

        let mut doc = Node::new(NodeKind::Document);
        let body = match root_at {
            None => pos..pos,
            Some((at, ctx)) => {
                let body_start = if ctx == Ctx::Line { self.line_start(at) } else { at };
                let parsed = self.parse_node(at, -1, ctx, body_start)?;
                let mut root = parsed.node;
                if !parsed.entry_comment.is_empty() {
                    root.line_comment = parsed.entry_comment;
                }
                doc.children.push(root);
                body_start..parsed.end
            }
        };

        // Only trivia may follow the root before the next marker
        let mut ls = body.end;
        while ls < self.len() && !self.is_marker(ls) {
            if !self.is_trivia_line(ls) {
                return Err(self.error(
                    ls + self.indent_of(ls),
                    "unexpected content after the document root",
                ));
            }
            ls = self.next_line(ls);
        }

        doc.head_comment = self.comments_in(0, body.start);
        doc.foot_comment = self.comments_in(body.end, ls);
        let layout = Layout::Document {
            body,
            indented_sequences: self.indented_sequences.get(),
        };
        self.attach(&mut doc, 0..self.len(), layout, -1);
        Ok(doc)
    }

    // ---- block structure ----

    /// Parse the node starting at `pos`
    ///
    /// `region_start` is where the first entry's region begins when the node
    /// turns out to be a block collection.
    fn parse_node(
        &self,
        pos: usize,
        parent_indent: isize,
        ctx: Ctx,
        region_start: usize,
    ) -> Result<Parsed> {
        if matches!(ctx, Ctx::Line | Ctx::Item) {
            let col = self.column(pos);
            let compact = ctx == Ctx::Item;
            if self.is_dash(pos) {
                return self.block_sequence(pos, col, parent_indent, region_start, compact);
            }
            if self.is_mapping_key(pos) {
                return self.block_mapping(pos, col, parent_indent, region_start, compact);
            }
        } else if self.is_dash(pos) {
            return Err(self.error(pos, "block sequence entries are not allowed in this context"));
        } else if self.is_mapping_key(pos) {
            return Err(self.error(pos, "mapping values are not allowed in this context"));
        }

        let (props, p) = self.properties(pos, false)?;
        if is_eol(self.at(p)) || self.at(p) == b'#' {
            return self.deferred_node(p, props, parent_indent, ctx);
        }
        if !props.is_empty() && (self.is_dash(p) || self.at(p) == b'?') {
            return Err(self.error(p, "properties must be followed by a line break here"));
        }

        let mut parsed = self.inline_node(p, parent_indent)?;
        props.apply(&mut parsed.node);
        Self::extend_span(&mut parsed.node, pos);
        Ok(parsed)
    }

    /// A node that starts on a later line, or an empty node
    fn deferred_node(
        &self,
        pos: usize,
        props: Props,
        parent_indent: isize,
        ctx: Ctx,
    ) -> Result<Parsed> {
        let comment = if self.at(pos) == b'#' {
            self.src[pos..self.eol(pos)].trim_end().to_string()
        } else {
            String::new()
        };
        let next = self.next_line(pos);

        if let Some(ls) = self.next_content(next)? {
            let indent = self.indent_of(ls);
            let content = ls + indent;
            if !self.is_marker(ls) {
                let deeper = indent as isize > parent_indent;
                let same_indent_seq =
                    ctx == Ctx::Value && indent as isize == parent_indent && self.is_dash(content);
                if deeper || same_indent_seq {
                    let mut parsed = self.parse_node(content, parent_indent, Ctx::Line, next)?;
                    if ctx == Ctx::Value
                        && parsed.node.kind == NodeKind::Sequence
                        && self.indented_sequences.get().is_none()
                    {
                        self.indented_sequences.set(Some(deeper));
                    }
                    props.apply(&mut parsed.node);
                    if !comment.is_empty() {
                        parsed.entry_comment = comment;
                    }
                    return Ok(parsed);
                }
            }
        }

        let mut node = Node::scalar("", resolve::NULL_TAG);
        props.apply(&mut node);
        let span = pos..pos;
        let layout = self.inline_layout(&span);
        self.attach(&mut node, span, layout, parent_indent);
        Ok(Parsed {
            node,
            end: next,
            entry_comment: comment,
        })
    }

    /// A scalar, alias or flow collection starting at `pos` on the current line
    fn inline_node(&self, pos: usize, parent_indent: isize) -> Result<Parsed> {
        let (mut node, span_end) = match self.at(pos) {
            b'|' | b'>' => return self.block_scalar(pos, parent_indent),
            b'"' => {
                let (value, end) = self.double_quoted(pos)?;
                let mut node = Node::string(value);
                node.style = crate::node::Style::DOUBLE_QUOTED;
                (node, end)
            }
            b'\'' => {
                let (value, end) = self.single_quoted(pos)?;
                let mut node = Node::string(value);
                node.style = crate::node::Style::SINGLE_QUOTED;
                (node, end)
            }
            b'[' | b'{' => {
                let (node, end) = self.flow_collection(pos, parent_indent)?;
                let (comment, next) = self.finish_line(end)?;
                let mut node = node;
                node.line_comment = comment;
                return Ok(Parsed {
                    node,
                    end: next,
                    entry_comment: String::new(),
                });
            }
            b'*' => {
                let end = self.name_end(pos + 1, false);
                if end == pos + 1 {
                    return Err(self.error(pos, "empty alias name"));
                }
                (Node::alias(&self.src[pos + 1..end]), end)
            }
            b'@' | b'`' => {
                return Err(self.error(pos, "reserved indicator cannot start a plain scalar"));
            }
            b'?' if is_blank_or_end(self.at(pos + 1)) => {
                return Err(self.error(pos, "explicit mapping keys are not supported"));
            }
            _ => {
                let (value, end) = self.plain_block(pos, parent_indent)?;
                let tag = resolve::resolve_plain(&value);
                (Node::scalar(value, tag), end)
            }
        };

        let span = pos..span_end;
        let layout = self.inline_layout(&span);
        self.attach(&mut node, span, layout, parent_indent);
        let (comment, end) = self.finish_line(span_end)?;
        node.line_comment = comment;
        Ok(Parsed {
            node,
            end,
            entry_comment: String::new(),
        })
    }

    fn block_mapping(
        &self,
        pos: usize,
        indent: usize,
        parent_indent: isize,
        region_start: usize,
        compact: bool,
    ) -> Result<Parsed> {
        let mut map = Node::mapping();
        let mut entry = pos;
        let mut region_from = region_start;

        let end = loop {
            let (mut key, after_colon) = self.mapping_key(entry, indent)?;
            if key.kind == NodeKind::Scalar && map.value_index(&key.value).is_some() {
                return Err(self.error(entry, &format!("duplicate mapping key '{}'", key.value)));
            }
            let parsed = self.parse_node(
                self.skip_ws(after_colon),
                indent as isize,
                Ctx::Value,
                after_colon,
            )?;
            if !parsed.entry_comment.is_empty() {
                key.line_comment = parsed.entry_comment;
            }
            let key_line = self.line_start(entry);
            if region_from < key_line {
                key.head_comment = self.comments_in(region_from, key_line);
            }
            if let Some(origin) = key.origin.as_mut() {
                origin.region = Some(region_from..parsed.end);
                origin.entry_start = entry;
            }
            map.push_pair(key, parsed.node);

            let Some(ls) = self.next_content(parsed.end)? else {
                break parsed.end;
            };
            let line_indent = self.indent_of(ls);
            if self.is_marker(ls) || line_indent < indent {
                break parsed.end;
            }
            let content = ls + line_indent;
            if line_indent > indent {
                return Err(self.error(content, "bad indentation of a mapping entry"));
            }
            if !self.is_mapping_key(content) {
                return Err(self.error(content, "expected a mapping key"));
            }
            region_from = parsed.end;
            entry = content;
        };

        self.attach(&mut map, region_start..end, Layout::Block { indent, compact }, parent_indent);
        Ok(Parsed {
            node: map,
            end,
            entry_comment: String::new(),
        })
    }

    /// Parse an implicit key and its `:` indicator
    fn mapping_key(&self, pos: usize, indent: usize) -> Result<(Node, usize)> {
        let (props, p) = self.properties(pos, false)?;
        let (mut key, end) = match self.at(p) {
            b'"' => {
                let (value, end) = self.double_quoted(p)?;
                let mut key = Node::string(value);
                key.style = crate::node::Style::DOUBLE_QUOTED;
                (key, end)
            }
            b'\'' => {
                let (value, end) = self.single_quoted(p)?;
                let mut key = Node::string(value);
                key.style = crate::node::Style::SINGLE_QUOTED;
                (key, end)
            }
            b'*' => {
                let end = self.name_end(p + 1, false);
                (Node::alias(&self.src[p + 1..end]), end)
            }
            b'?' if is_blank_or_end(self.at(p + 1)) => {
                return Err(self.error(p, "explicit mapping keys are not supported"));
            }
            b'[' | b'{' => return Err(self.error(p, "complex mapping keys are not supported")),
            _ => {
                let line_end = self.eol(p);
                let mut i = p;
                while i < line_end && !(self.bytes[i] == b':' && is_blank_or_end(self.at(i + 1))) {
                    i += 1;
                }
                let text = self.src[p..i].trim_end();
                let end = p + text.len();
                (Node::scalar(text, resolve::resolve_plain(text)), end)
            }
        };

        let span = p..end;
        let layout = self.inline_layout(&span);
        self.attach(&mut key, span, layout, indent as isize);
        props.apply(&mut key);
        Self::extend_span(&mut key, pos);

        let colon = self.skip_ws(end);
        if self.at(colon) != b':' {
            return Err(self.error(colon, "could not find expected ':'"));
        }
        Ok((key, colon + 1))
    }

    fn block_sequence(
        &self,
        pos: usize,
        indent: usize,
        parent_indent: isize,
        region_start: usize,
        compact: bool,
    ) -> Result<Parsed> {
        let mut seq = Node::sequence();
        let mut dash = pos;
        let mut region_from = region_start;

        let end = loop {
            let item_at = self.skip_ws(dash + 1);
            let parsed = self.parse_node(item_at, indent as isize, Ctx::Item, item_at)?;
            let mut item = parsed.node;
            if !parsed.entry_comment.is_empty() {
                item.line_comment = parsed.entry_comment;
            }
            let dash_line = self.line_start(dash);
            if region_from < dash_line {
                item.head_comment = self.comments_in(region_from, dash_line);
            }
            if let Some(origin) = item.origin.as_mut() {
                origin.region = Some(region_from..parsed.end);
                origin.entry_start = dash;
            }
            seq.children.push(item);

            let Some(ls) = self.next_content(parsed.end)? else {
                break parsed.end;
            };
            let line_indent = self.indent_of(ls);
            if self.is_marker(ls) || line_indent < indent {
                break parsed.end;
            }
            let content = ls + line_indent;
            if line_indent > indent {
                return Err(self.error(content, "bad indentation of a sequence entry"));
            }
            if !self.is_dash(content) {
                break parsed.end;
            }
            region_from = parsed.end;
            dash = content;
        };

        self.attach(&mut seq, region_start..end, Layout::Block { indent, compact }, parent_indent);
        Ok(Parsed {
            node: seq,
            end,
            entry_comment: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Style;

    fn root(input: &str) -> Node {
        let mut doc = parse(input).unwrap();
        doc.children.remove(0)
    }

    #[test]
    fn test_parse_block_mapping() {
        let node =
            root("apiVersion: v1\nkind: CustomResourceDefinition\nspec:\n  group: example.io\n");
        assert!(node.is_mapping());
        assert_eq!(node.children.len(), 6);
        assert_eq!(node.get("kind").unwrap().value, "CustomResourceDefinition");
        let spec = node.get("spec").unwrap();
        assert_eq!(spec.get("group").unwrap().value, "example.io");
    }

    #[test]
    fn test_parse_compact_sequence_items() {
        let node = root("versions:\n  - name: v1\n    served: true\n  - name: v2\n");
        let versions = node.get("versions").unwrap();
        assert!(versions.is_sequence());
        assert_eq!(versions.children.len(), 2);
        assert_eq!(versions.children[0].get("served").unwrap().short_tag(), "!!bool");
        assert_eq!(versions.children[1].get("name").unwrap().value, "v2");
    }

    #[test]
    fn test_parse_sequence_at_key_indentation() {
        let node = root("versions:\n- name: v1\n- name: v2\nscope: Namespaced\n");
        assert_eq!(node.get("versions").unwrap().children.len(), 2);
        assert_eq!(node.get("scope").unwrap().value, "Namespaced");
    }

    #[test]
    fn test_parse_comments() {
        let doc = parse(
            concat!(
                "# head\nspec: # spec comment\n",
                "  # group comment\n  group: example.io # inline\n# foot\n",
            ),
        )
        .unwrap();
        assert_eq!(doc.head_comment, "# head");
        assert_eq!(doc.foot_comment, "# foot");
        let root = &doc.children[0];
        assert_eq!(root.children[0].line_comment, "# spec comment");
        let spec = &root.children[1];
        assert_eq!(spec.children[0].head_comment, "# group comment");
        assert_eq!(spec.children[1].line_comment, "# inline");
    }

    #[test]
    fn test_parse_scalar_styles() {
        let node = root(
            concat!(
                "a: 'it''s'\nb: \"tab\\there\"\nc: |\n  line one\n  line two\n",
                "d: >-\n  folded\n  text\ne: plain\n  continued\n",
            ),
        );
        assert_eq!(node.get("a").unwrap().value, "it's");
        assert_eq!(node.get("a").unwrap().style, Style::SINGLE_QUOTED);
        assert_eq!(node.get("b").unwrap().value, "tab\there");
        assert_eq!(node.get("c").unwrap().value, "line one\nline two\n");
        assert_eq!(node.get("c").unwrap().style, Style::LITERAL);
        assert_eq!(node.get("d").unwrap().value, "folded text");
        assert_eq!(node.get("e").unwrap().value, "plain continued");
    }

    #[test]
    fn test_parse_flow_collections() {
        let node =
            root("names: {kind: Widget, plural: widgets}\nitems: [a, 'b', {c: d}]\nempty: []\n");
        let names = node.get("names").unwrap();
        assert!(names.style.contains(Style::FLOW));
        assert_eq!(names.get("plural").unwrap().value, "widgets");
        let items = node.get("items").unwrap();
        assert_eq!(items.children.len(), 3);
        assert_eq!(items.children[2].get("c").unwrap().value, "d");
        assert!(node.get("empty").unwrap().children.is_empty());
    }

    #[test]
    fn test_parse_anchors_tags_and_aliases() {
        let node = root("base: &base\n  type: string\ncopy: *base\ncount: !!str 12\n");
        assert_eq!(node.get("base").unwrap().anchor, "base");
        let alias = node.get("copy").unwrap();
        assert_eq!(alias.kind, NodeKind::Alias);
        assert_eq!(alias.value, "base");
        let count = node.get("count").unwrap();
        assert_eq!(count.tag, "!!str");
        assert!(count.style.contains(Style::TAGGED));
    }

    #[test]
    fn test_parse_empty_values() {
        let node = root("a:\nb: ~\nc: # nothing\n");
        assert_eq!(node.get("a").unwrap().short_tag(), "!!null");
        assert_eq!(node.get("b").unwrap().short_tag(), "!!null");
        assert_eq!(node.children[4].line_comment, "# nothing");
    }

    #[test]
    fn test_parse_document_markers() {
        let doc = parse("%YAML 1.2\n---\na: 1\n...\n---\nb: 2\n").unwrap();
        let root = &doc.children[0];
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.get("a").unwrap().value, "1");
    }

    #[test]
    fn test_parse_empty_stream() {
        let doc = parse("# only a comment\n").unwrap();
        assert!(doc.children.is_empty());
        assert_eq!(doc.head_comment, "# only a comment");
    }

    #[test]
    fn test_parse_crlf() {
        let node = root("a: 1\r\nb:\r\n  - x\r\n");
        assert_eq!(node.get("a").unwrap().value, "1");
        assert_eq!(node.get("b").unwrap().children[0].value, "x");
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("a: 1\n  b: 2\n").unwrap_err();
        assert!(matches!(err, YamlError::Malformed { line: 2, .. }), "{err:?}");

        let err = parse("? complex\n: value\n").unwrap_err();
        assert!(matches!(err, YamlError::Malformed { .. }));

        let err = parse("a: \"unterminated\n").unwrap_err();
        assert!(matches!(err, YamlError::Malformed { .. }));

        let err = parse("a: b: c\n").unwrap_err();
        assert!(matches!(err, YamlError::Malformed { line: 1, .. }));

        let err = parse("a: 1\na: 2\n").unwrap_err();
        assert!(matches!(err, YamlError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_regions_partition_lines() {
        let src = "a: 1\n\n# about b\nb:\n  c: 2\n";
        let node = root(src);
        let regions: Vec<_> = node
            .mapping_pairs()
            .map(|(k, _)| k.origin().unwrap().region.clone().unwrap())
            .collect();
        assert_eq!(regions, vec![0..5, 5..src.len()]);
        assert_eq!(node.children[2].head_comment, "# about b");
    }
}
