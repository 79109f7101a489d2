//! Scalar scanning: plain, quoted and block scalars

use super::{Parsed, Parser, is_blank_or_end, is_eol};
use crate::error::Result;
use crate::node::{Layout, Node, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Strip,
    Clip,
    Keep,
}

impl Parser<'_> {
    /// End of the plain text on the line starting at `pos`, trailing blanks excluded
    fn plain_line_end(&self, pos: usize) -> Result<usize> {
        let end = self.eol(pos);
        let mut last = pos;
        let mut i = pos;
        while i < end {
            match self.bytes[i] {
                b'#' if i > pos && matches!(self.bytes[i - 1], b' ' | b'\t') => break,
                b':' if is_blank_or_end(self.at(i + 1)) => {
                    return Err(self.error(i, "mapping values are not allowed in this context"));
                }
                b' ' | b'\t' => {}
                _ => last = i + 1,
            }
            i += 1;
        }
        Ok(last)
    }

    fn comment_follows(&self, pos: usize) -> bool {
        self.at(self.skip_ws(pos)) == b'#'
    }

    /// Scan a plain scalar in block context, folding continuation lines
    ///
    /// Returns the folded value and the end of the last content byte.
    pub(super) fn plain_block(&self, pos: usize, parent_indent: isize) -> Result<(String, usize)> {
        let first_end = self.plain_line_end(pos)?;
        let mut value = self.src[pos..first_end].to_string();
        let mut span_end = first_end;
        if self.comment_follows(first_end) {
            return Ok((value, span_end));
        }

        let mut line = self.next_line(first_end);
        while line < self.len() {
            let mut blanks = 0;
            let mut ls = line;
            while ls < self.len() && self.is_blank_line(ls) {
                blanks += 1;
                ls = self.next_line(ls);
            }
            if ls >= self.len() {
                break;
            }
            let content = self.skip_ws(ls);
            if self.indent_of(ls) as isize <= parent_indent
                || self.at(content) == b'#'
                || self.is_marker(ls)
                || self.is_mapping_key(content)
            {
                break;
            }
            let end = self.plain_line_end(content)?;
            if blanks == 0 {
                value.push(' ');
            } else {
                value.extend(std::iter::repeat_n('\n', blanks));
            }
            value.push_str(&self.src[content..end]);
            span_end = end;
            if self.comment_follows(end) {
                break;
            }
            line = self.next_line(end);
        }
        Ok((value, span_end))
    }

    /// Fold a line break inside a quoted scalar; returns the first content position after it
    fn fold_quoted_break(&self, pos: usize, out: &mut String) -> usize {
        let mut breaks = 0;
        let mut line = self.next_line(pos);
        loop {
            let p = self.skip_ws(line);
            if p < self.len() && matches!(self.at(p), b'\n' | b'\r') {
                breaks += 1;
                line = self.next_line(p);
                continue;
            }
            if breaks == 0 {
                out.push(' ');
            } else {
                out.extend(std::iter::repeat_n('\n', breaks));
            }
            return p;
        }
    }

    fn hex_escape(&self, pos: usize, digits: usize) -> Result<char> {
        let text = self
            .src
            .get(pos..pos + digits)
            .ok_or_else(|| self.error(pos, "truncated escape sequence"))?;
        u32::from_str_radix(text, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(pos, "invalid escape sequence"))
    }

    /// Scan a double-quoted scalar starting at the opening quote
    pub(super) fn double_quoted(&self, start: usize) -> Result<(String, usize)> {
        let mut out = String::new();
        let mut pending = String::new();
        let mut i = start + 1;
        loop {
            let Some(c) = self.src[i..].chars().next() else {
                return Err(self.error(start, "unterminated double-quoted scalar"));
            };
            match c {
                '"' => {
                    out.push_str(&pending);
                    return Ok((out, i + 1));
                }
                '\\' => {
                    out.push_str(&pending);
                    pending.clear();
                    let Some(escape) = self.src[i + 1..].chars().next() else {
                        return Err(self.error(start, "unterminated double-quoted scalar"));
                    };
                    i += 1 + escape.len_utf8();
                    let decoded = match escape {
                        '\n' | '\r' => {
                            i = self.skip_ws(self.next_line(i - 1));
                            continue;
                        }
                        'x' => {
                            let c = self.hex_escape(i, 2)?;
                            i += 2;
                            c
                        }
                        'u' => {
                            let c = self.hex_escape(i, 4)?;
                            i += 4;
                            c
                        }
                        'U' => {
                            let c = self.hex_escape(i, 8)?;
                            i += 8;
                            c
                        }
                        '0' => '\0',
                        'a' => '\x07',
                        'b' => '\x08',
                        't' | '\t' => '\t',
                        'n' => '\n',
                        'v' => '\x0b',
                        'f' => '\x0c',
                        'r' => '\r',
                        'e' => '\x1b',
                        ' ' => ' ',
                        '"' => '"',
                        '/' => '/',
                        '\\' => '\\',
                        'N' => '\u{85}',
                        '_' => '\u{a0}',
                        'L' => '\u{2028}',
                        'P' => '\u{2029}',
                        _ => {
                            let at = i - escape.len_utf8() - 1;
                            return Err(self.error(at, "unknown escape sequence"));
                        }
                    };
                    out.push(decoded);
                }
                ' ' | '\t' => {
                    pending.push(c);
                    i += 1;
                }
                '\r' | '\n' => {
                    pending.clear();
                    i = self.fold_quoted_break(i, &mut out);
                }
                _ => {
                    out.push_str(&pending);
                    pending.clear();
                    out.push(c);
                    i += c.len_utf8();
                }
            }
        }
    }

    /// Scan a single-quoted scalar starting at the opening quote
    pub(super) fn single_quoted(&self, start: usize) -> Result<(String, usize)> {
        let mut out = String::new();
        let mut pending = String::new();
        let mut i = start + 1;
        loop {
            let Some(c) = self.src[i..].chars().next() else {
                return Err(self.error(start, "unterminated single-quoted scalar"));
            };
            match c {
                '\'' if self.at(i + 1) == b'\'' => {
                    out.push_str(&pending);
                    pending.clear();
                    out.push('\'');
                    i += 2;
                }
                '\'' => {
                    out.push_str(&pending);
                    return Ok((out, i + 1));
                }
                ' ' | '\t' => {
                    pending.push(c);
                    i += 1;
                }
                '\r' | '\n' => {
                    pending.clear();
                    i = self.fold_quoted_break(i, &mut out);
                }
                _ => {
                    out.push_str(&pending);
                    pending.clear();
                    out.push(c);
                    i += c.len_utf8();
                }
            }
        }
    }

    /// Scan a `|` or `>` block scalar, header through its last content line
    pub(super) fn block_scalar(&self, pos: usize, parent_indent: isize) -> Result<Parsed> {
        let literal = self.at(pos) == b'|';
        let mut chomp = Chomp::Clip;
        let mut explicit_indent = None;
        let mut i = pos + 1;
        for _ in 0..2 {
            match self.at(i) {
                b'+' => chomp = Chomp::Keep,
                b'-' => chomp = Chomp::Strip,
                b @ b'1'..=b'9' => explicit_indent = Some(usize::from(b - b'0')),
                _ => break,
            }
            i += 1;
        }

        let after = self.skip_ws(i);
        let header_end = self.eol(after);
        let comment = match self.at(after) {
            b'#' if after > i => self.src[after..header_end].trim_end().to_string(),
            b if is_eol(b) => String::new(),
            _ => return Err(self.error(after, "invalid block scalar header")),
        };

        let base = parent_indent.max(0) as usize;
        let first_line = self.next_line(header_end);
        let content_indent = match explicit_indent {
            Some(indent) => base + indent,
            None => self.detect_block_indent(first_line, parent_indent),
        };

        let mut lines: Vec<&str> = Vec::new();
        let mut last_content: Option<usize> = None;
        let mut content_end = header_end;
        let mut trailing_end = header_end;
        let mut line = first_line;
        while line < self.len() {
            let end = self.eol(line);
            let spaces = self.indent_of(line);
            if self.skip_ws(line) == end {
                let text = if spaces > content_indent {
                    &self.src[line + content_indent..end]
                } else {
                    ""
                };
                lines.push(text);
                trailing_end = end;
            } else if spaces >= content_indent {
                lines.push(&self.src[line + content_indent..end]);
                last_content = Some(lines.len() - 1);
                content_end = end;
                trailing_end = end;
            } else {
                break;
            }
            let next = self.next_line(line);
            if next == line {
                break;
            }
            line = next;
        }

        let body = last_content.map_or(&lines[..0], |last| &lines[..=last]);
        let trailing = lines.len() - body.len();
        let mut value = if literal {
            body.join("\n")
        } else {
            fold_lines(body)
        };
        match chomp {
            Chomp::Strip => {}
            Chomp::Clip if !body.is_empty() => value.push('\n'),
            Chomp::Clip => {}
            Chomp::Keep => {
                let breaks = if body.is_empty() { trailing } else { trailing + 1 };
                value.extend(std::iter::repeat_n('\n', breaks));
            }
        }

        let span_end = if chomp == Chomp::Keep { trailing_end } else { content_end };
        let mut node = Node::string(value);
        node.style = if literal { Style::LITERAL } else { Style::FOLDED };
        node.line_comment = comment;
        self.attach(
            &mut node,
            pos..span_end,
            Layout::Inline {
                multiline: true,
                comment_in_span: true,
            },
            parent_indent,
        );
        Ok(Parsed {
            node,
            end: self.next_line(span_end),
            entry_comment: String::new(),
        })
    }

    /// Indentation of the first non-blank line of a block scalar
    fn detect_block_indent(&self, first_line: usize, parent_indent: isize) -> usize {
        let floor = (parent_indent + 1).max(1) as usize;
        let mut line = first_line;
        while line < self.len() {
            if !self.is_blank_line(line) {
                let indent = self.indent_of(line);
                return if indent as isize > parent_indent { indent } else { floor };
            }
            let next = self.next_line(line);
            if next == line {
                break;
            }
            line = next;
        }
        floor
    }
}

/// Apply `>` folding to the content lines of a block scalar
fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut breaks = 0;
    let mut first = true;
    let mut previous_more_indented = false;
    for line in lines {
        if line.is_empty() {
            breaks += 1;
            continue;
        }
        let more_indented = line.starts_with([' ', '\t']);
        if first {
            out.extend(std::iter::repeat_n('\n', breaks));
        } else if more_indented || previous_more_indented {
            out.extend(std::iter::repeat_n('\n', breaks + 1));
        } else if breaks == 0 {
            out.push(' ');
        } else {
            out.extend(std::iter::repeat_n('\n', breaks));
        }
        out.push_str(line);
        first = false;
        breaks = 0;
        previous_more_indented = more_indented;
    }
    out
}
