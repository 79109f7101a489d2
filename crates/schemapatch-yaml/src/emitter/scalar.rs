//! Scalar style selection and quoting

use super::{Emitter, Place};
use crate::error::Result;
use crate::node::{Node, Style};
use crate::resolve::{self, NULL_TAG, STR_TAG};

/// How a scalar ends up being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
}

/// Characters that cannot start a plain scalar
const INDICATORS: [char; 16] = [
    ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Whether `value` can be written as a plain scalar without changing its text
pub(crate) fn plain_ok(value: &str, in_flow: bool) -> bool {
    let mut chars = value.chars();
    let (Some(first), Some(last)) = (chars.next(), value.chars().last()) else {
        return false;
    };
    if first.is_whitespace() || last.is_whitespace() {
        return false;
    }
    if value.starts_with("---") || value.starts_with("...") {
        return false;
    }
    if INDICATORS.contains(&first) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        match chars.next() {
            None => return false,
            Some(next) if next.is_whitespace() => return false,
            Some(',' | '[' | ']' | '{' | '}') if in_flow => return false,
            Some(_) => {}
        }
    }
    if [": ", ":\t", " #", "\t#"].iter().any(|s| value.contains(s)) || last == ':' {
        return false;
    }
    if value.chars().any(needs_escape) {
        return false;
    }
    !(in_flow && value.contains([',', '[', ']', '{', '}']))
}

/// Characters that only a double-quoted scalar can carry
fn needs_escape(c: char) -> bool {
    (c.is_control() && c != '\t') || matches!(c, '\u{feff}' | '\u{2028}' | '\u{2029}')
}

fn single_ok(value: &str) -> bool {
    !value.chars().any(|c| c == '\n' || needs_escape(c))
}

/// Whether `value` survives a round trip through a `|` block scalar
fn literal_ok(value: &str) -> bool {
    let body = value.trim_end_matches('\n');
    if body.is_empty() || !body.contains('\n') && body.len() == value.len() {
        return false;
    }
    if value.chars().any(|c| c != '\n' && needs_escape(c)) {
        return false;
    }
    body.lines().last().is_some_and(|line| !line.trim().is_empty())
}

pub(crate) fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\x1b' => out.push_str("\\e"),
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if needs_escape(c) && (c as u32) <= 0xff => {
                out.push_str(&format!("\\x{:02X}", c as u32))
            }
            c if needs_escape(c) => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Pick the style a scalar is written in
pub(super) fn choose_style(node: &Node, place: Place) -> ScalarStyle {
    let value = node.value.as_str();
    let in_flow = place == Place::Flow;
    let block_allowed = place == Place::Block;

    if node.style.contains(Style::DOUBLE_QUOTED) {
        return ScalarStyle::DoubleQuoted;
    }
    if node.style.contains(Style::SINGLE_QUOTED) {
        return if single_ok(value) {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
    }
    let block_style = node.style.contains(Style::LITERAL) || node.style.contains(Style::FOLDED);
    if block_style && block_allowed && literal_ok(value) {
        return ScalarStyle::Literal;
    }

    let tag = node.short_tag();
    if value.is_empty() && tag == NULL_TAG {
        return ScalarStyle::Plain;
    }
    let is_str = tag == STR_TAG;
    let looks_like_other =
        is_str && (resolve::resolve_plain(value) != STR_TAG || resolve::is_yaml11_bool(value));
    if plain_ok(value, in_flow) && !looks_like_other {
        return ScalarStyle::Plain;
    }
    if value.contains('\n') && block_allowed && literal_ok(value) {
        return ScalarStyle::Literal;
    }
    if looks_like_other || !single_ok(value) {
        return ScalarStyle::DoubleQuoted;
    }
    ScalarStyle::SingleQuoted
}

impl Emitter<'_> {
    /// Write a scalar; returns whether its line comment was written too
    pub(super) fn scalar(&mut self, node: &Node, indent: usize, place: Place) -> Result<bool> {
        let style = choose_style(node, place);
        let implicit = match style {
            ScalarStyle::Plain => resolve::resolve_plain(&node.value),
            _ => STR_TAG,
        };
        let explicit_tag = node.style.contains(Style::TAGGED)
            || (!node.tag.is_empty() && resolve::short_tag(&node.tag) != implicit);
        let mut props = Vec::new();
        if !node.anchor.is_empty() {
            props.push(format!("&{}", node.anchor));
        }
        if explicit_tag && !node.tag.is_empty() {
            props.push(resolve::short_tag(&node.tag));
        }
        if !props.is_empty() {
            self.raw(&props.join(" "));
            if !(style == ScalarStyle::Plain && node.value.is_empty()) {
                self.raw(" ");
            }
        }

        match style {
            ScalarStyle::Plain => self.raw(&node.value),
            ScalarStyle::SingleQuoted => self.raw(&single_quote(&node.value)),
            ScalarStyle::DoubleQuoted => self.raw(&double_quote(&node.value)),
            ScalarStyle::Literal => {
                self.literal(node, indent);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write a `|` block scalar; content lines go one level below `indent`
    fn literal(&mut self, node: &Node, indent: usize) {
        let value = node.value.as_str();
        let content = value.strip_suffix('\n');
        let chomp = match content {
            Some(rest) if rest.ends_with('\n') => "+",
            Some(_) => "",
            None => "-",
        };
        let body = content.unwrap_or(value);
        let needs_indicator = body
            .lines()
            .find(|line| !line.is_empty())
            .is_some_and(|line| line.starts_with([' ', '\t']));

        self.raw("|");
        if needs_indicator {
            self.raw(&self.options.indent.to_string());
        }
        self.raw(chomp);
        if !node.line_comment.is_empty() {
            self.raw(" ");
            self.raw(&super::format_comment(&node.line_comment));
        }
        for line in body.split('\n') {
            self.line_break();
            if !line.is_empty() {
                self.write_indent(indent + self.options.indent);
                self.raw(line);
            }
        }
    }
}
