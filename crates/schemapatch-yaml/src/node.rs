//! The node tree
//!
//! A [`Node`] mirrors the shape of a YAML document: kind, tag, style,
//! scalar value, children and comment trivia. Nodes produced by the parser
//! also remember where they came from (a private [`Origin`]) so the emitter
//! can reproduce untouched regions byte for byte.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Range};
use std::sync::Arc;

use crate::resolve::{self, MAP_TAG, NULL_TAG, SEQ_TAG, STR_TAG};

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Mapping => write!(f, "mapping"),
            Self::Sequence => write!(f, "sequence"),
            Self::Scalar => write!(f, "scalar"),
            Self::Alias => write!(f, "alias"),
        }
    }
}

/// How a node was written. The empty set lets the emitter choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style(u8);

impl Style {
    /// The tag was written explicitly
    pub const TAGGED: Style = Style(1);
    pub const DOUBLE_QUOTED: Style = Style(1 << 1);
    pub const SINGLE_QUOTED: Style = Style(1 << 2);
    /// `|` block scalar
    pub const LITERAL: Style = Style(1 << 3);
    /// `>` block scalar
    pub const FOLDED: Style = Style(1 << 4);
    /// `[...]` or `{...}` collection
    pub const FLOW: Style = Style(1 << 5);

    pub const fn empty() -> Self {
        Style(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Style) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: Style) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Style) {
        self.0 &= !other.0;
    }

    /// Whether the scalar was written with quotes
    pub const fn is_quoted(self) -> bool {
        self.0 & (Self::DOUBLE_QUOTED.0 | Self::SINGLE_QUOTED.0) != 0
    }
}

impl BitOr for Style {
    type Output = Style;

    fn bitor(self, rhs: Style) -> Style {
        Style(self.0 | rhs.0)
    }
}

impl BitOrAssign for Style {
    fn bitor_assign(&mut self, rhs: Style) {
        self.0 |= rhs.0;
    }
}

/// How the parsed text of a node is laid out
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Layout {
    /// Scalars, aliases and flow collections
    Inline {
        multiline: bool,
        /// The line comment sits inside the span (block scalar headers)
        comment_in_span: bool,
    },
    /// Block mappings and sequences; `indent` is the column of their keys or dashes
    Block { indent: usize, compact: bool },
    /// Document; `body` is the byte range owned by the root node
    Document {
        body: Range<usize>,
        indented_sequences: Option<bool>,
    },
}

/// Field values at parse time, used to detect edits
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) kind: NodeKind,
    pub(crate) style: Style,
    pub(crate) tag: String,
    pub(crate) value: String,
    pub(crate) anchor: String,
    pub(crate) head_comment: String,
    pub(crate) line_comment: String,
    pub(crate) foot_comment: String,
    pub(crate) children: usize,
}

/// Where a parsed node came from
#[derive(Clone)]
pub(crate) struct Origin {
    pub(crate) src: Arc<str>,
    /// Bytes of the node itself, properties included. Block collections end
    /// after the newline of their last line.
    pub(crate) span: Range<usize>,
    /// Entry region owned inside the parent block collection (mapping keys
    /// and sequence items only): leading comment lines through the end of
    /// the entry's last line.
    pub(crate) region: Option<Range<usize>>,
    /// Position of the key (properties included) or of the sequence dash
    pub(crate) entry_start: usize,
    /// Indentation of the enclosing block collection, -1 at the root
    pub(crate) parent_indent: isize,
    pub(crate) layout: Layout,
    pub(crate) snapshot: Snapshot,
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("span", &self.span)
            .field("region", &self.region)
            .field("layout", &self.layout)
            .finish()
    }
}

impl Origin {
    pub(crate) fn block_indent(&self) -> Option<(usize, bool)> {
        match self.layout {
            Layout::Block { indent, compact } => Some((indent, compact)),
            _ => None,
        }
    }
}

/// A node of a YAML document
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub style: Style,
    /// Resolved tag (`!!str`, `!!map`, ...) or the explicit tag as written
    pub tag: String,
    /// Scalar payload, or the anchor name an alias points to
    pub value: String,
    pub anchor: String,
    /// For mappings: key, value, key, value, ...
    pub children: Vec<Node>,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
    pub(crate) origin: Option<Box<Origin>>,
}

impl Node {
    /// Create an empty node of the given kind
    pub fn new(kind: NodeKind) -> Self {
        let tag = match kind {
            NodeKind::Mapping => MAP_TAG,
            NodeKind::Sequence => SEQ_TAG,
            _ => "",
        };
        Self {
            kind,
            style: Style::empty(),
            tag: tag.to_string(),
            value: String::new(),
            anchor: String::new(),
            children: Vec::new(),
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
            origin: None,
        }
    }

    /// A document wrapping `root`
    pub fn document(root: Node) -> Self {
        let mut doc = Self::new(NodeKind::Document);
        doc.children.push(root);
        doc
    }

    pub fn mapping() -> Self {
        Self::new(NodeKind::Mapping)
    }

    pub fn sequence() -> Self {
        Self::new(NodeKind::Sequence)
    }

    /// A string scalar
    pub fn string(value: impl Into<String>) -> Self {
        Self::scalar(value, STR_TAG)
    }

    /// A scalar with an explicit resolved tag (not marked as written)
    pub fn scalar(value: impl Into<String>, tag: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Scalar);
        node.value = value.into();
        node.tag = tag.into();
        node
    }

    pub fn null() -> Self {
        Self::scalar("null", NULL_TAG)
    }

    /// An alias to the anchor `name`
    pub fn alias(name: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Alias);
        node.value = name.into();
        node
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    /// Append a key/value pair to a mapping
    pub fn push_pair(&mut self, key: Node, value: Node) {
        self.children.push(key);
        self.children.push(value);
    }

    /// Iterate over the key/value pairs of a mapping
    pub fn mapping_pairs(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.children.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Index (into `children`) of the value stored under `key`
    pub fn value_index(&self, key: &str) -> Option<usize> {
        self.children
            .chunks_exact(2)
            .position(|pair| pair[0].kind == NodeKind::Scalar && pair[0].value == key)
            .map(|i| i * 2 + 1)
    }

    /// The value stored under `key` in a mapping
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.value_index(key).map(|i| &self.children[i])
    }

    /// The tag in short form, resolving untagged nodes from their content
    pub fn short_tag(&self) -> String {
        if !self.tag.is_empty() {
            return resolve::short_tag(&self.tag);
        }
        match self.kind {
            NodeKind::Mapping => MAP_TAG.to_string(),
            NodeKind::Sequence => SEQ_TAG.to_string(),
            NodeKind::Scalar if self.style.is_quoted() => STR_TAG.to_string(),
            NodeKind::Scalar if self.style.contains(Style::LITERAL) => STR_TAG.to_string(),
            NodeKind::Scalar if self.style.contains(Style::FOLDED) => STR_TAG.to_string(),
            NodeKind::Scalar => resolve::resolve_plain(&self.value).to_string(),
            NodeKind::Document | NodeKind::Alias => String::new(),
        }
    }

    /// Structural equality that ignores style, comments and anchors.
    ///
    /// Mapping entries compare as a set of pairs, so key order does not matter.
    pub fn same_content(&self, other: &Node) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            NodeKind::Scalar => {
                let tag = self.short_tag();
                tag == other.short_tag() && resolve::scalars_equal(&tag, &self.value, &other.value)
            }
            NodeKind::Alias => self.value == other.value,
            NodeKind::Mapping => {
                self.children.len() == other.children.len()
                    && self.mapping_pairs().all(|(key, value)| {
                        other
                            .mapping_pairs()
                            .find(|(other_key, _)| key.same_content(other_key))
                            .is_some_and(|(_, other_value)| value.same_content(other_value))
                    })
            }
            _ => {
                self.children.len() == other.children.len()
                    && self
                        .children
                        .iter()
                        .zip(&other.children)
                        .all(|(a, b)| a.same_content(b))
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: self.kind,
            style: self.style,
            tag: self.tag.clone(),
            value: self.value.clone(),
            anchor: self.anchor.clone(),
            head_comment: self.head_comment.clone(),
            line_comment: self.line_comment.clone(),
            foot_comment: self.foot_comment.clone(),
            children: self.children.len(),
        }
    }

    /// The node's own fields (children excluded) are as parsed
    pub(crate) fn header_unchanged(&self) -> bool {
        let Some(origin) = &self.origin else {
            return false;
        };
        let snap = &origin.snapshot;
        snap.kind == self.kind
            && snap.style == self.style
            && snap.tag == self.tag
            && snap.value == self.value
            && snap.anchor == self.anchor
            && snap.head_comment == self.head_comment
            && snap.line_comment == self.line_comment
            && snap.foot_comment == self.foot_comment
    }

    /// Nothing in this subtree changed since parsing
    pub(crate) fn is_pristine(&self) -> bool {
        let Some(origin) = &self.origin else {
            return false;
        };
        if !self.header_unchanged() || origin.snapshot.children != self.children.len() {
            return false;
        }
        let mut last_start = None;
        for child in &self.children {
            if !child.is_pristine() {
                return false;
            }
            let start = child.origin.as_ref().map(|o| o.span.start);
            if start < last_start {
                return false;
            }
            last_start = start;
        }
        true
    }

    pub(crate) fn origin(&self) -> Option<&Origin> {
        self.origin.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_flags() {
        let mut style = Style::DOUBLE_QUOTED | Style::TAGGED;
        assert!(style.contains(Style::TAGGED));
        assert!(style.is_quoted());
        assert!(!style.contains(Style::FLOW));
        style.remove(Style::DOUBLE_QUOTED);
        assert!(!style.is_quoted());
        assert!(!Style::empty().contains(Style::empty()));
    }

    #[test]
    fn test_value_index_ignores_quoting() {
        let mut map = Node::mapping();
        let mut key = Node::string("name");
        key.style = Style::DOUBLE_QUOTED;
        map.push_pair(key, Node::string("v1"));
        map.push_pair(Node::string("served"), Node::scalar("true", "!!bool"));

        assert_eq!(map.value_index("name"), Some(1));
        assert_eq!(map.get("served").map(|n| n.value.as_str()), Some("true"));
        assert_eq!(map.value_index("storage"), None);
    }

    #[test]
    fn test_short_tag_resolution() {
        let mut node = Node::new(NodeKind::Scalar);
        node.value = "12".to_string();
        assert_eq!(node.short_tag(), "!!int");
        node.style = Style::SINGLE_QUOTED;
        assert_eq!(node.short_tag(), "!!str");
        assert_eq!(Node::mapping().short_tag(), "!!map");
    }

    #[test]
    fn test_same_content_ignores_style_and_comments() {
        let mut a = Node::mapping();
        a.push_pair(Node::string("type"), Node::string("object"));
        let mut b = a.clone();
        b.style = Style::FLOW;
        b.children[1].style = Style::DOUBLE_QUOTED;
        b.children[0].head_comment = "# note".to_string();
        assert!(a.same_content(&b));

        b.children[1].value = "string".to_string();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_same_content_ignores_key_order() {
        let mut a = Node::mapping();
        a.push_pair(Node::string("type"), Node::string("object"));
        a.push_pair(Node::string("description"), Node::string("A widget"));
        let mut b = Node::mapping();
        b.push_pair(Node::string("description"), Node::string("A widget"));
        b.push_pair(Node::string("type"), Node::string("object"));
        assert!(a.same_content(&b));

        let mut seq_a = Node::sequence();
        seq_a.children.push(Node::string("a"));
        seq_a.children.push(Node::string("b"));
        let mut seq_b = Node::sequence();
        seq_b.children.push(Node::string("b"));
        seq_b.children.push(Node::string("a"));
        assert!(!seq_a.same_content(&seq_b));
    }
}
