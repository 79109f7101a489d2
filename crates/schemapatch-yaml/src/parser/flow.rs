//! Flow collections: `[a, b]` and `{k: v}`

use super::{Parser, is_blank_or_end};
use crate::error::Result;
use crate::node::{Layout, Node, NodeKind, Style};
use crate::resolve;

fn is_flow_indicator(b: u8) -> bool {
    matches!(b, b',' | b'[' | b']' | b'{' | b'}')
}

impl Parser<'_> {
    /// Skip whitespace, line breaks and comments inside a flow collection
    fn flow_ws(&self, pos: usize) -> usize {
        let mut i = pos;
        loop {
            match self.at(i) {
                b' ' | b'\t' | b'\r' | b'\n' => i += 1,
                b'#' if i == 0 || matches!(self.bytes[i - 1], b' ' | b'\t' | b'\n') => {
                    i = self.eol(i)
                }
                _ => return i,
            }
        }
    }

    /// Scan a plain scalar inside a flow collection
    fn flow_plain(&self, pos: usize) -> Result<(String, usize)> {
        let mut value = String::new();
        let mut segment = pos;
        let mut last = pos;
        let mut i = pos;
        loop {
            let b = self.at(i);
            match b {
                0 => break,
                _ if is_flow_indicator(b) => break,
                b':' if is_blank_or_end(self.at(i + 1)) || is_flow_indicator(self.at(i + 1)) => {
                    break;
                }
                b'#' if i > pos && matches!(self.bytes[i - 1], b' ' | b'\t') => break,
                b'\n' | b'\r' => {
                    let next = self.flow_ws(i);
                    let stop = self.at(next);
                    if stop == 0 || is_flow_indicator(stop) || stop == b'#' || stop == b':' {
                        break;
                    }
                    value.push_str(&self.src[segment..last]);
                    let breaks = self.src[last..next].matches('\n').count();
                    if breaks > 1 {
                        value.extend(std::iter::repeat_n('\n', breaks - 1));
                    } else {
                        value.push(' ');
                    }
                    segment = next;
                    last = next;
                    i = next;
                }
                b' ' | b'\t' => i += 1,
                _ => {
                    i += 1;
                    last = i;
                }
            }
        }
        value.push_str(&self.src[segment..last]);
        if value.is_empty() {
            return Err(self.error(pos, "expected a flow node"));
        }
        Ok((value, last))
    }

    /// A node inside a flow collection
    fn flow_node(&self, pos: usize, parent_indent: isize) -> Result<(Node, usize)> {
        let (props, p) = self.properties(pos, true)?;
        let p = self.flow_ws(p);
        let (mut node, end) = match self.at(p) {
            b'[' | b'{' => self.flow_collection(p, parent_indent)?,
            b',' | b']' | b'}' if !props.is_empty() => {
                (self.empty_scalar(p, parent_indent), p)
            }
            b'?' if is_blank_or_end(self.at(p + 1)) => {
                return Err(self.error(p, "explicit mapping keys are not supported"));
            }
            first => {
                let (mut node, end) = match first {
                    b'"' => {
                        let (value, end) = self.double_quoted(p)?;
                        let mut node = Node::string(value);
                        node.style = Style::DOUBLE_QUOTED;
                        (node, end)
                    }
                    b'\'' => {
                        let (value, end) = self.single_quoted(p)?;
                        let mut node = Node::string(value);
                        node.style = Style::SINGLE_QUOTED;
                        (node, end)
                    }
                    b'*' => {
                        let end = self.name_end(p + 1, true);
                        if end == p + 1 {
                            return Err(self.error(p, "empty alias name"));
                        }
                        (Node::alias(&self.src[p + 1..end]), end)
                    }
                    _ => {
                        let (value, end) = self.flow_plain(p)?;
                        let tag = resolve::resolve_plain(&value);
                        (Node::scalar(value, tag), end)
                    }
                };
                let span = p..end;
                let layout = self.inline_layout(&span);
                self.attach(&mut node, span, layout, parent_indent);
                (node, end)
            }
        };
        props.apply(&mut node);
        Self::extend_span(&mut node, pos);
        Ok((node, end))
    }

    /// The value after a `:` inside a flow collection, empty when absent
    fn flow_value(&self, colon: usize, close: u8, parent_indent: isize) -> Result<(Node, usize)> {
        let p = self.flow_ws(colon + 1);
        if self.at(p) == b',' || self.at(p) == close {
            return Ok((self.empty_scalar(p, parent_indent), p));
        }
        self.flow_node(p, parent_indent)
    }

    /// An implicit null at `at`, such as the value of `{a}`
    fn empty_scalar(&self, at: usize, parent_indent: isize) -> Node {
        let mut node = Node::scalar("", resolve::NULL_TAG);
        let layout = Layout::Inline {
            multiline: false,
            comment_in_span: false,
        };
        self.attach(&mut node, at..at, layout, parent_indent);
        node
    }

    /// Parse a flow sequence or mapping starting at its opening bracket
    pub(super) fn flow_collection(
        &self,
        start: usize,
        parent_indent: isize,
    ) -> Result<(Node, usize)> {
        let is_map = self.at(start) == b'{';
        let close = if is_map { b'}' } else { b']' };
        let mut node = if is_map { Node::mapping() } else { Node::sequence() };
        node.style = Style::FLOW;

        let mut p = self.flow_ws(start + 1);
        loop {
            match self.at(p) {
                0 => return Err(self.error(start, "unterminated flow collection")),
                b if b == close => {
                    p += 1;
                    break;
                }
                b',' => return Err(self.error(p, "unexpected ',' in flow collection")),
                _ => {}
            }

            let (entry, end) = self.flow_node(p, parent_indent)?;
            let after = self.flow_ws(end);
            let has_value = self.at(after) == b':';

            if is_map {
                if matches!(entry.kind, NodeKind::Mapping | NodeKind::Sequence) {
                    return Err(self.error(p, "complex mapping keys are not supported"));
                }
                if entry.kind == NodeKind::Scalar && node.value_index(&entry.value).is_some() {
                    return Err(self.error(p, &format!("duplicate mapping key '{}'", entry.value)));
                }
                let (value, value_end) = if has_value {
                    self.flow_value(after, close, parent_indent)?
                } else {
                    (self.empty_scalar(after, parent_indent), after)
                };
                node.push_pair(entry, value);
                p = self.flow_ws(value_end);
            } else if has_value {
                // single pair mapping: `[key: value]`
                let entry_start = p;
                let (value, value_end) = self.flow_value(after, close, parent_indent)?;
                let mut pair = Node::mapping();
                pair.style = Style::FLOW;
                pair.push_pair(entry, value);
                let span = entry_start..value_end;
                let layout = self.inline_layout(&span);
                self.attach(&mut pair, span, layout, parent_indent);
                node.children.push(pair);
                p = self.flow_ws(value_end);
            } else {
                node.children.push(entry);
                p = after;
            }

            match self.at(p) {
                b',' => p = self.flow_ws(p + 1),
                b if b == close => {}
                _ => {
                    let expected = if is_map {
                        "expected ',' or '}'"
                    } else {
                        "expected ',' or ']'"
                    };
                    return Err(self.error(p, expected));
                }
            }
        }

        let span = start..p;
        let layout = self.inline_layout(&span);
        self.attach(&mut node, span, layout, parent_indent);
        Ok((node, p))
    }
}
