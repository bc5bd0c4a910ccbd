/* optimizer.rs
Copyright (C) 2024-2025, Wenjian Chern.

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>. */

use std::borrow::Cow;
use std::hint::black_box;
use std::time::Instant;

use log::{trace, warn};
use regex::Regex;
use serde::Serialize;

use crate::types::{Error, Priority, Result};

pub const DEFAULT_ITERATIONS: usize = 1000;

/// Characters that keep their backslash outside a class.
pub(crate) fn is_structural(c: char) -> bool {
    matches!(
        c,
        '.' | '^' | '$' | '*' | '+' | '?' | '{' | '}' | '[' | ']' | '\\' | '|' | '(' | ')'
    )
}

/// `\<` and `\>` are word boundaries, `\#` matters under `(?x)`.
fn is_redundant_escape(c: char) -> bool {
    c.is_ascii_punctuation() && !is_structural(c) && !matches!(c, '#' | '<' | '>')
}

#[derive(Debug, Clone, PartialEq)]
enum Node<'p> {
    Char(char),
    Escape(Cow<'p, str>),
    /// Text between the brackets, a leading `^` included.
    Class(Cow<'p, str>),
    Group { open: &'p str, body: Vec<Node<'p>> },
    /// `(?i)` and other bodiless groups, kept verbatim.
    Flags(&'p str),
    Repeat(&'p str),
    Alternation,
}

struct Scanner<'p> {
    pattern: &'p str,
    pos: usize,
}

impl<'p> Scanner<'p> {
    fn new(pattern: &'p str) -> Self {
        Scanner { pattern, pos: 0 }
    }
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
    fn rest(&self) -> &'p str {
        &self.pattern[self.pos ..]
    }
    fn error(&self, position: usize, reason: &'static str) -> Error {
        Error::InvalidPattern { position, reason }
    }

    fn parse(mut self) -> Result<Vec<Node<'p>>> {
        self.parse_sequence(0)
    }

    /// Stops before a `)` closing the current group.
    fn parse_sequence(&mut self, depth: usize) -> Result<Vec<Node<'p>>> {
        let mut nodes = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '\\' => nodes.push(Node::Escape(Cow::Borrowed(self.parse_escape()?))),
                '[' => nodes.push(Node::Class(Cow::Borrowed(self.parse_class()?))),
                '(' => nodes.push(self.parse_group(depth)?),
                ')' if depth == 0 => return Err(self.error(start, "unopened group")),
                ')' => return Ok(nodes),
                '|' => {
                    self.bump();
                    nodes.push(Node::Alternation);
                }
                '*' | '+' | '?' => {
                    self.bump();
                    self.skip_lazy();
                    nodes.push(Node::Repeat(&self.pattern[start .. self.pos]));
                }
                '{' => match self.counted_repeat_len() {
                    Some(len) => {
                        self.pos += len;
                        self.skip_lazy();
                        nodes.push(Node::Repeat(&self.pattern[start .. self.pos]));
                    }
                    None => {
                        self.bump();
                        nodes.push(Node::Char(c));
                    }
                },
                _ => {
                    self.bump();
                    nodes.push(Node::Char(c));
                }
            }
        }
        if depth > 0 {
            Err(self.error(self.pos, "unclosed group"))
        } else {
            Ok(nodes)
        }
    }

    fn skip_lazy(&mut self) {
        if self.peek() == Some('?') {
            self.bump();
        }
    }

    /// Length of `{n}`, `{n,}` or `{n,m}` at the cursor.
    fn counted_repeat_len(&self) -> Option<usize> {
        let rest = self.rest();
        let close = rest.find('}')?;
        let inner = &rest[1 .. close];
        let valid = inner.starts_with(|c: char| c.is_ascii_digit())
            && inner.chars().all(|c| c.is_ascii_digit() || c == ',')
            && inner.matches(',').count() <= 1;
        valid.then_some(close + 1)
    }

    fn parse_escape(&mut self) -> Result<&'p str> {
        let start = self.pos;
        self.bump();
        let c = self
            .bump()
            .ok_or_else(|| self.error(start, "trailing backslash"))?;
        match c {
            'p' | 'P' | 'x' | 'u' | 'U' if self.peek() == Some('{') => {
                match self.rest().find('}') {
                    Some(i) => self.pos += i + 1,
                    None => return Err(self.error(start, "unclosed escape braces")),
                }
            }
            'p' | 'P' => {
                self.bump();
            }
            'x' => self.skip_hex(2),
            'u' => self.skip_hex(4),
            'U' => self.skip_hex(8),
            _ => {}
        }
        Ok(&self.pattern[start .. self.pos])
    }

    fn skip_hex(&mut self, count: usize) {
        for _ in 0 .. count {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// `[]` and `[^]` are read as empty classes.
    fn parse_class(&mut self) -> Result<&'p str> {
        let start = self.pos;
        self.bump();
        let content_start = self.pos;
        if self.peek() == Some('^') {
            self.bump();
        }
        if self.peek() == Some(']') {
            self.bump();
            return Ok(&self.pattern[content_start .. self.pos - 1]);
        }
        let mut depth = 1;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if self.bump().is_none() {
                        break;
                    }
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.pattern[content_start .. self.pos - 1]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error(start, "unclosed character class"))
    }

    fn parse_group(&mut self, depth: usize) -> Result<Node<'p>> {
        let start = self.pos;
        self.bump();
        if self.peek() == Some('?') {
            loop {
                match self.bump() {
                    Some(':') | Some('>') => break,
                    Some(')') => return Ok(Node::Flags(&self.pattern[start .. self.pos])),
                    Some(_) => {}
                    None => return Err(self.error(start, "unclosed group")),
                }
            }
        }
        let open = &self.pattern[start .. self.pos];
        let body = self.parse_sequence(depth + 1)?;
        self.bump();
        Ok(Node::Group { open, body })
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Char(c) => out.push(*c),
            Node::Escape(s) => out.push_str(s),
            Node::Class(s) => {
                out.push('[');
                out.push_str(s);
                out.push(']');
            }
            Node::Group { open, body } => {
                out.push_str(open);
                write_nodes(body, out);
                out.push(')');
            }
            Node::Flags(s) | Node::Repeat(s) => out.push_str(s),
            Node::Alternation => out.push('|'),
        }
    }
}

fn is_atom(nodes: &[Node]) -> bool {
    matches!(
        nodes,
        [Node::Char(_) | Node::Escape(_) | Node::Class(_) | Node::Group { .. }]
    )
}

fn can_unwrap(body: &[Node], quantified: bool) -> bool {
    let scoped = body
        .iter()
        .any(|n| matches!(n, Node::Alternation | Node::Flags(_)));
    !scoped && (!quantified || is_atom(body))
}

fn ends_with_set_operator(content: &str) -> bool {
    let mut chars = content.chars().rev();
    match chars.next() {
        Some('-' | '&' | '~') => chars.take_while(|&c| c == '\\').count() % 2 == 0,
        _ => false,
    }
}

/// Classes whose text can be glued to a neighbour without changing how
/// either side parses.
fn is_mergeable(content: &str) -> bool {
    !content.is_empty()
        && !content.starts_with(['^', '-', '&', '~'])
        && !ends_with_set_operator(content)
}

fn minimize_nodes(nodes: Vec<Node<'_>>) -> Vec<Node<'_>> {
    let mut flat = Vec::with_capacity(nodes.len());
    let mut iter = nodes.into_iter().peekable();
    while let Some(node) = iter.next() {
        match node {
            Node::Group { open, body } => {
                let body = minimize_nodes(body);
                let quantified = matches!(iter.peek(), Some(Node::Repeat(_)));
                if open == "(?:" && can_unwrap(&body, quantified) {
                    trace!("Unwrap non-capturing group of {} nodes", body.len());
                    flat.extend(body);
                } else {
                    flat.push(Node::Group { open, body });
                }
            }
            Node::Escape(text) => flat.push(unescape(text)),
            other => flat.push(other),
        }
    }
    merge_class_runs(flat)
        .into_iter()
        .map(collapse_class)
        .collect()
}

fn unescape(text: Cow<'_, str>) -> Node<'_> {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('\\'), Some(c), None) if is_redundant_escape(c) => Node::Char(c),
        _ => Node::Escape(text),
    }
}

fn merge_class_runs(nodes: Vec<Node<'_>>) -> Vec<Node<'_>> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut open_run = false;
    let mut iter = nodes.into_iter().peekable();
    while let Some(node) = iter.next() {
        let quantified = matches!(iter.peek(), Some(Node::Repeat(_)));
        match node {
            Node::Class(content) if !quantified && is_mergeable(&content) => {
                if open_run {
                    if let Some(Node::Class(prev)) = out.last_mut() {
                        prev.to_mut().push_str(&content);
                        continue;
                    }
                }
                out.push(Node::Class(content));
                open_run = true;
            }
            other => {
                out.push(other);
                open_run = false;
            }
        }
    }
    out
}

fn collapse_class(node: Node<'_>) -> Node<'_> {
    if let Node::Class(content) = &node {
        let mut chars = content.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c != '^' && c != '\\' {
                return if is_structural(c) {
                    Node::Escape(Cow::Owned(format!("\\{}", c)))
                } else {
                    Node::Char(c)
                };
            }
        }
    }
    node
}

/// Result of [`Optimizer::benchmark_pattern`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub pattern_size: usize,
    pub iterations: usize,
    /// Seconds spent compiling the pattern.
    pub compile_time: f64,
    /// Mean seconds per match attempt.
    pub avg_match_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Rewrites pattern text under a [`Priority`].
#[derive(Debug, Default, Clone)]
pub struct Optimizer;

impl Optimizer {
    pub fn new() -> Self {
        Optimizer
    }

    /// Collapse code points into ascending `(start, end)` runs.
    pub fn compress_ranges<I: IntoIterator<Item = u32>>(&self, points: I) -> Vec<(u32, u32)> {
        let mut points = points.into_iter().collect::<Vec<_>>();
        points.sort_unstable();
        points.dedup();
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for cp in points {
            match ranges.last_mut() {
                Some((_, end)) if end.saturating_add(1) == cp => *end = cp,
                _ => ranges.push((cp, cp)),
            }
        }
        ranges
    }

    /// Merge `(start, end)` pairs that overlap or touch.
    pub fn compress_spans<I>(&self, spans: I) -> Vec<(u32, u32)>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut spans = spans
            .into_iter()
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect::<Vec<_>>();
        spans.sort_unstable();
        let mut ranges: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match ranges.last_mut() {
                Some((_, last)) if last.saturating_add(1) >= start => {
                    *last = (*last).max(end);
                }
                _ => ranges.push((start, end)),
            }
        }
        ranges
    }

    /// Drop redundant constructs in one structural pass:
    /// one-character classes, non-capturing groups without alternation,
    /// escapes of non-special punctuation, and runs of adjacent classes.
    ///
    /// Running it on its own output changes nothing.
    pub fn minimize_pattern(&self, pattern: &str) -> Result<String> {
        if pattern.is_empty() {
            return Ok(String::new());
        }
        let nodes = minimize_nodes(Scanner::new(pattern).parse()?);
        let mut out = String::with_capacity(pattern.len());
        write_nodes(&nodes, &mut out);
        Ok(out)
    }

    /// Put one space on each side of every `|` outside a class.
    pub fn optimize_readability(&self, pattern: &str) -> String {
        let mut result = String::with_capacity(pattern.len() + 8);
        let mut class_depth = 0usize;
        let mut escaped = false;
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => escaped = true,
                '[' => class_depth += 1,
                ']' if class_depth > 0 => class_depth -= 1,
                '|' if class_depth == 0 => {
                    if !result.is_empty() && !result.ends_with(' ') {
                        result.push(' ');
                    }
                    result.push('|');
                    if chars.peek().is_some_and(|&n| n != ' ') {
                        result.push(' ');
                    }
                    continue;
                }
                _ => {}
            }
            result.push(c);
        }
        result
    }

    pub fn optimize_pattern(&self, pattern: &str, priority: Priority) -> Result<String> {
        let minimized = self.minimize_pattern(pattern)?;
        Ok(match priority {
            Priority::Size => minimized,
            Priority::Readability => self.optimize_readability(&minimized),
        })
    }

    /// Same as [`Optimizer::optimize_pattern`], with the priority given by name.
    pub fn optimize_pattern_str(&self, pattern: &str, priority: &str) -> Result<String> {
        self.optimize_pattern(pattern, priority.parse()?)
    }

    /// Minimize, then space out alternations.
    pub fn optimize(&self, pattern: &str) -> Result<String> {
        let minimized = self.minimize_pattern(pattern)?;
        Ok(self.optimize_readability(&minimized))
    }

    /// Time `iterations` match attempts of `pattern` against `input`.
    /// A pattern the `regex` crate rejects yields a report carrying the
    /// error and zero iterations.
    pub fn benchmark_pattern(
        &self,
        pattern: &str,
        input: &str,
        iterations: usize,
    ) -> BenchmarkReport {
        let timer = Instant::now();
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!("Cannot compile pattern '{}' for benchmarking", pattern);
                return BenchmarkReport {
                    pattern_size: pattern.len(),
                    iterations: 0,
                    compile_time: 0.0,
                    avg_match_time: 0.0,
                    error: Some(e.to_string()),
                };
            }
        };
        let compile_time = timer.elapsed().as_secs_f64();

        let timer = Instant::now();
        for _ in 0 .. iterations {
            black_box(regex.is_match(black_box(input)));
        }
        let total = timer.elapsed().as_secs_f64();
        BenchmarkReport {
            pattern_size: pattern.len(),
            iterations,
            compile_time,
            avg_match_time: if iterations == 0 { 0.0 } else { total / iterations as f64 },
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimize(p: &str) -> String {
        Optimizer.minimize_pattern(p).unwrap()
    }

    #[test]
    fn compress() {
        let opt = Optimizer::new();
        assert!(opt.compress_ranges(std::iter::empty()).is_empty());
        assert_eq!(
            opt.compress_ranges([65, 66, 67, 70, 71, 72]),
            vec![(65, 67), (70, 72)]
        );
        assert_eq!(opt.compress_ranges([72, 65, 66, 66, 67]), vec![(65, 67), (72, 72)]);
        assert_eq!(opt.compress_spans([(1, 3), (4, 6), (7, 9)]), vec![(1, 9)]);
        assert_eq!(opt.compress_spans([(1, 4), (3, 6), (5, 8)]), vec![(1, 8)]);
        assert_eq!(
            opt.compress_spans([(1, 3), (3, 5), (7, 8), (10, 12), (12, 15)]),
            vec![(1, 5), (7, 8), (10, 15)]
        );
    }

    #[test]
    fn scanner_round_trip() {
        for p in [
            r"a|b(c)",
            r"[a-z]+?\d{2,3}",
            r"(?i:ab)(?P<x>c)(?i)d",
            r"\p{Greek}\pL\x41\x{1F600}A\U0001F600",
            r"[[:alpha:]\]]",
            r"[]",
            r"a{b",
        ] {
            let nodes = Scanner::new(p).parse().unwrap();
            let mut out = String::new();
            write_nodes(&nodes, &mut out);
            assert_eq!(out, p);
        }
    }

    #[test]
    fn scanner_errors() {
        let opt = Optimizer::new();
        for p in ["[", "(", "\\", "a)", "(?:a", "[a\\]", "\\p{L"] {
            assert!(
                matches!(opt.minimize_pattern(p), Err(Error::InvalidPattern { .. })),
                "{}",
                p
            );
        }
    }

    #[test]
    fn character_classes() {
        assert_eq!(minimize("[a]"), "a");
        assert_eq!(minimize("[abc]"), "[abc]");
        assert_eq!(minimize("[a-z]"), "[a-z]");
        assert_eq!(minimize("[a][b][c]"), "[abc]");
        assert_eq!(minimize("[.]"), r"\.");
        assert_eq!(minimize(r"[\.]"), r"[\.]");
        assert_eq!(minimize("[^a]"), "[^a]");
        assert_eq!(minimize("[a]+"), "a+");
        assert_eq!(minimize("[a][bc]+"), "a[bc]+");
        assert_eq!(minimize("[a-][b]"), "[a-]b");
        assert_eq!(minimize("[a][^b]"), "a[^b]");
        assert_eq!(minimize("[]"), "[]");
    }

    #[test]
    fn groups() {
        assert_eq!(minimize("(?:a)"), "a");
        assert_eq!(minimize("(?:a|b)"), "(?:a|b)");
        assert_eq!(minimize("(?:abc)(?:def)"), "abcdef");
        assert_eq!(minimize(r"(?:[a-z])(?:\d)(?:[A-Z])"), r"[a-z]\d[A-Z]");
        assert_eq!(minimize("(?:ab)+"), "(?:ab)+");
        assert_eq!(minimize("(?:[a])*"), "a*");
        assert_eq!(minimize("(?:x(?:y))"), "xy");
        assert_eq!(minimize("(ab)"), "(ab)");
        assert_eq!(minimize("(?i:ab)"), "(?i:ab)");
        assert_eq!(minimize("(?:(?i)a)b"), "(?:(?i)a)b");
        assert_eq!(minimize("[ab](?:[cd])"), "[abcd]");
    }

    #[test]
    fn escapes() {
        assert_eq!(minimize(r"\-"), "-");
        assert_eq!(minimize(r"a\/b"), "a/b");
        assert_eq!(minimize(r"\["), r"\[");
        assert_eq!(minimize(r"\w"), r"\w");
        assert_eq!(minimize(r"\d"), r"\d");
        assert_eq!(minimize(r"\a"), r"\a");
        assert_eq!(minimize(r"\#"), r"\#");
        assert_eq!(minimize(r"\<"), r"\<");
        assert_eq!(minimize(r"[\-]"), r"[\-]");
    }

    #[test]
    fn minimize_is_idempotent() {
        for p in [
            "[a][b][c]",
            "(?:[a])[b]",
            "[a](?:[bc])+",
            "(?:(?:[.]))",
            r"\-[x]\&",
            "(?:a|[b])|[c][d]",
            "[a-c][d-f]x[g]",
        ] {
            let once = minimize(p);
            assert_eq!(minimize(&once), once, "{}", p);
        }
    }

    #[test]
    fn readability() {
        let opt = Optimizer::new();
        assert_eq!(opt.optimize_readability("foo|bar|baz"), "foo | bar | baz");
        assert_eq!(opt.optimize_readability("[a|b]"), "[a|b]");
        assert_eq!(opt.optimize_readability("[a-z]|[0-9]"), "[a-z] | [0-9]");
        assert_eq!(opt.optimize_readability("(?:a|b|c)"), "(?:a | b | c)");
        assert_eq!(opt.optimize_readability(r"a\|b"), r"a\|b");
        assert_eq!(opt.optimize_readability("a | b"), "a | b");
        assert_eq!(opt.optimize_readability(""), "");
    }

    #[test]
    fn priorities() {
        let opt = Optimizer::new();
        assert_eq!(
            opt.optimize_pattern("(?:[a-z])|(?:[0-9])", Priority::Size),
            Ok("[a-z]|[0-9]".to_string())
        );
        assert_eq!(
            opt.optimize_pattern("(?:[a-z])|(?:[0-9])", Priority::Readability),
            Ok("[a-z] | [0-9]".to_string())
        );
        assert_eq!(
            opt.optimize_pattern_str("abc", "invalid"),
            Err(Error::InvalidArgument("invalid".into()))
        );
        assert_eq!(opt.optimize("(?:a)|(?:b)|(?:c)"), Ok("a | b | c".to_string()));
        assert_eq!(opt.optimize(""), Ok(String::new()));
        assert_eq!(opt.optimize(" "), Ok(" ".to_string()));
    }

    #[test]
    fn benchmark() {
        let opt = Optimizer::new();
        let report = opt.benchmark_pattern("[a-z]+", "abc", 10);
        assert!(report.is_ok());
        assert_eq!(report.pattern_size, 6);
        assert_eq!(report.iterations, 10);
        assert!(report.avg_match_time >= 0.0);

        let report = opt.benchmark_pattern("[", "abc", DEFAULT_ITERATIONS);
        assert!(!report.is_ok());
        assert_eq!(report.iterations, 0);
        assert_eq!(report.pattern_size, 1);
    }
}
