/* generator.rs
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

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasherDefault;
use std::sync::{Mutex, MutexGuard, PoisonError};

use compact_str::format_compact;
use hashers::fx_hash::FxHasher;
use lazy_static::lazy_static;
use log::{debug, trace};

use crate::optimizer::{is_structural, Optimizer};
use crate::range::CodePointRange;
use crate::set::{CodePointSet, SetSnapshot};
use crate::types::{Priority, Result};

/// The pattern emitted for an empty set.
///
/// The `regex` crate refuses to compile `[]`, other engines read it as a
/// class matching nothing. Callers that feed the result to a regex engine
/// should check [`CodePointSet::is_empty`] first.
pub const EMPTY_CLASS: &str = "[]";

type FxBuildHasher = BuildHasherDefault<FxHasher>;
type PatternCache = HashMap<(SetSnapshot, Priority), String, FxBuildHasher>;

const fn span(start: u32, end: u32) -> CodePointRange {
    CodePointRange::new_unchecked(start, end)
}

lazy_static! {
    static ref COMMON_RANGES: [(&'static str, CodePointSet); 3] = [
        (r"\d", CodePointSet::from_spans_unchecked([span(0x30, 0x39)])),
        (
            r"\w",
            CodePointSet::from_spans_unchecked([
                span(0x30, 0x39),
                span(0x41, 0x5A),
                span(0x5F, 0x5F),
                span(0x61, 0x7A),
            ])
        ),
        (
            r"\s",
            CodePointSet::from_spans_unchecked([span(0x09, 0x0D), span(0x20, 0x20)])
        ),
    ];
}

/// Shorthand escapes and the sets they stand for.
pub fn common_ranges() -> &'static [(&'static str, CodePointSet)] {
    COMMON_RANGES.as_slice()
}

fn push_code_point(out: &mut String, cp: u32, in_class: bool) {
    match char::from_u32(cp) {
        Some(c) if cp < 0x80 => {
            if is_structural(c) || (in_class && matches!(c, '-' | '&' | '~')) {
                out.push('\\');
            }
            out.push(c);
        }
        _ if cp <= 0xFFFF => out.push_str(&format_compact!("\\u{:04x}", cp)),
        _ => out.push_str(&format_compact!("\\U{:08x}", cp)),
    }
}

fn render_spans(spans: &[CodePointRange], priority: Priority) -> String {
    match spans {
        [] => EMPTY_CLASS.to_string(),
        [only] if only.is_single() => {
            let mut out = String::with_capacity(10);
            push_code_point(&mut out, only.start(), false);
            out
        }
        _ => {
            let (sep, dash) = match priority {
                Priority::Size => ("", "-"),
                Priority::Readability => (" | ", " - "),
            };
            let mut out = String::with_capacity(spans.len() * 12 + 2);
            out.push('[');
            for (i, range) in spans.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                push_code_point(&mut out, range.start(), true);
                if !range.is_single() {
                    out.push_str(dash);
                    push_code_point(&mut out, range.end(), true);
                }
            }
            out.push(']');
            out
        }
    }
}

fn lock(cache: &Mutex<PatternCache>) -> MutexGuard<'_, PatternCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop characters from the end of the first string until every string
/// starts with what is left.
fn common_prefix<'s>(strings: &[&'s str]) -> &'s str {
    let mut prefix = strings.first().copied().unwrap_or_default();
    for s in strings.iter().skip(1) {
        while !s.starts_with(prefix) {
            let mut chars = prefix.chars();
            chars.next_back();
            prefix = chars.as_str();
        }
    }
    prefix
}

/// `["v1", "v2"]` becomes `v[12]`. `None` when the strings differ in
/// anything but digits at fixed positions.
fn collapse_digit_positions(strings: &[&str]) -> Option<String> {
    let prefix = common_prefix(strings);
    let suffixes = strings
        .iter()
        .map(|s| s[prefix.len() ..].chars().collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let width = suffixes[0].len();
    if suffixes.iter().any(|s| s.len() != width) {
        return None;
    }

    let mut out = regex_syntax::escape(prefix);
    let mut literal = String::new();
    for i in 0 .. width {
        let seen = suffixes.iter().map(|s| s[i]).collect::<BTreeSet<char>>();
        if seen.len() == 1 {
            literal.push(suffixes[0][i]);
            continue;
        }
        if !seen.iter().all(char::is_ascii_digit) {
            return None;
        }
        out.push_str(&regex_syntax::escape(&literal));
        literal.clear();
        out.push('[');
        out.extend(seen);
        out.push(']');
    }
    out.push_str(&regex_syntax::escape(&literal));
    Some(out)
}

/// Renders code point sets and literal strings as patterns for the
/// `regex` crate.
///
/// Results of [`RegexGenerator::generate_pattern`] are remembered per set
/// membership and priority; the cache sits behind a lock so a generator can
/// be shared between threads.
#[derive(Debug)]
pub struct RegexGenerator {
    optimizer: Optimizer,
    cache: Option<Mutex<PatternCache>>,
}

impl Default for RegexGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexGenerator {
    pub fn new() -> Self {
        Self::with_cache(true)
    }

    pub fn without_cache() -> Self {
        Self::with_cache(false)
    }

    pub fn with_cache(enabled: bool) -> Self {
        RegexGenerator {
            optimizer: Optimizer::new(),
            cache: enabled.then(|| Mutex::new(PatternCache::default())),
        }
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    /// Number of remembered patterns.
    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| lock(cache).len())
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            lock(cache).clear();
        }
    }

    fn render(&self, set: &CodePointSet, priority: Priority) -> String {
        match COMMON_RANGES.iter().find(|(_, common)| common == set) {
            Some((shorthand, _)) => shorthand.to_string(),
            None => render_spans(set.spans(), priority),
        }
    }

    /// Pattern matching exactly one code point of `set`.
    ///
    /// Sets equal to the ASCII digit, word or whitespace sets come out as
    /// `\d`, `\w`, `\s`. Note that the `regex` crate reads these shorthands
    /// as Unicode-aware unless the `u` flag is cleared.
    pub fn generate_pattern(&self, set: &CodePointSet, priority: Priority) -> String {
        if set.is_empty() {
            return EMPTY_CLASS.to_string();
        }
        let Some(cache) = &self.cache else {
            return self.render(set, priority);
        };
        let key = (set.snapshot(), priority);
        if let Some(hit) = lock(cache).get(&key) {
            trace!("Pattern cache hit for {} ranges", key.0.ranges().len());
            return hit.clone();
        }
        let pattern = self.render(set, priority);
        lock(cache).insert(key, pattern.clone());
        pattern
    }

    /// [`RegexGenerator::generate_pattern`] followed by the optimizer.
    pub fn generate_optimized(&self, set: &CodePointSet, priority: Priority) -> Result<String> {
        let pattern = self.generate_pattern(set, priority);
        self.optimizer.optimize_pattern(&pattern, priority)
    }

    pub fn generate_alternation_pattern<S: AsRef<str>>(
        &self,
        patterns: &[S],
        priority: Priority,
    ) -> String {
        match patterns {
            [] => EMPTY_CLASS.to_string(),
            [only] => only.as_ref().to_string(),
            _ => {
                let parts = patterns.iter().map(AsRef::as_ref).collect::<Vec<_>>();
                match priority {
                    Priority::Size => parts.join("|"),
                    Priority::Readability => format!("(?:{})", parts.join(" | ")),
                }
            }
        }
    }

    pub fn generate_range_pattern(&self, start: u32, end: u32) -> Result<String> {
        let range = CodePointRange::new(start, end)?;
        Ok(render_spans(&[range], Priority::Size))
    }

    /// `\p{name}`; the name is not checked.
    pub fn generate_category_pattern(&self, name: &str) -> String {
        format!("\\p{{{}}}", name)
    }

    /// `\p{name=value}`; neither part is checked.
    pub fn generate_property_pattern(&self, name: &str, value: &str) -> String {
        format!("\\p{{{}={}}}", name, value)
    }

    pub fn escape(&self, text: &str) -> String {
        regex_syntax::escape(text)
    }

    /// Escaped strings as a non-capturing alternation.
    pub fn create_alternation<S: AsRef<str>>(&self, strings: &[S]) -> String {
        match strings {
            [] => EMPTY_CLASS.to_string(),
            [only] => self.escape(only.as_ref()),
            _ => {
                let parts = strings
                    .iter()
                    .map(|s| self.escape(s.as_ref()))
                    .collect::<Vec<_>>();
                format!("(?:{})", parts.join("|"))
            }
        }
    }

    /// Like [`RegexGenerator::create_alternation`], but strings sharing a
    /// prefix and differing only in digits collapse into digit classes:
    /// `2024_Launch` and `2025_Launch` give `202[45]_Launch`.
    pub fn create_optimized_pattern<S: AsRef<str>>(&self, strings: &[S]) -> String {
        match strings {
            [] => return EMPTY_CLASS.to_string(),
            [only] => return self.escape(only.as_ref()),
            _ => {}
        }
        let parts = strings.iter().map(AsRef::as_ref).collect::<Vec<_>>();
        match collapse_digit_positions(&parts) {
            Some(pattern) => pattern,
            None => {
                debug!("Strings differ beyond digit positions, using plain alternation");
                self.create_alternation(strings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Error, RangeFault};

    fn set(spans: &[(u32, u32)]) -> CodePointSet {
        let mut set = CodePointSet::new();
        for &(start, end) in spans {
            set.add_range(start, end).unwrap();
        }
        set
    }

    #[test]
    fn empty_and_common() {
        let gen = RegexGenerator::new();
        assert_eq!(gen.generate_pattern(&CodePointSet::new(), Priority::Size), "[]");
        assert_eq!(gen.generate_pattern(&set(&[(0x30, 0x39)]), Priority::Size), r"\d");
        assert_eq!(
            gen.generate_pattern(
                &set(&[(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)]),
                Priority::Readability
            ),
            r"\w"
        );
        let ws = "\t\n\x0B\x0C\r ".chars().collect::<CodePointSet>();
        assert_eq!(gen.generate_pattern(&ws, Priority::Size), r"\s");
        assert_eq!(common_ranges().len(), 3);
    }

    #[test]
    fn ranges() {
        let gen = RegexGenerator::new();
        let upper = set(&[(0x41, 0x5A)]);
        assert_eq!(gen.generate_pattern(&upper, Priority::Size), "[A-Z]");
        assert_eq!(gen.generate_pattern(&upper, Priority::Readability), "[A - Z]");

        let odd = "ace".chars().collect::<CodePointSet>();
        assert_eq!(gen.generate_pattern(&odd, Priority::Size), "[ace]");
        assert_eq!(gen.generate_pattern(&odd, Priority::Readability), "[a | c | e]");

        let greek = set(&[(0x41, 0x5A), (0x391, 0x3A1)]);
        assert_eq!(gen.generate_pattern(&greek, Priority::Size), r"[A-Z\u0391-\u03a1]");
    }

    #[test]
    fn single_points() {
        let gen = RegexGenerator::without_cache();
        let one = |cp| gen.generate_pattern(&CodePointSet::from_single(cp).unwrap(), Priority::Size);
        assert_eq!(one(0x61), "a");
        assert_eq!(one(0x2E), r"\.");
        assert_eq!(one(0x29), r"\)");
        assert_eq!(one(0x2D), "-");
        assert_eq!(one(0xE9), r"\u00e9");
        assert_eq!(one(0x1F600), r"\U0001f600");
    }

    #[test]
    fn class_escapes() {
        let gen = RegexGenerator::new();
        let s = "-a]&".chars().collect::<CodePointSet>();
        assert_eq!(gen.generate_pattern(&s, Priority::Size), r"[\&\-\]a]");
        let s = set(&[(0x2A, 0x2B), (0x5B, 0x5E)]);
        assert_eq!(gen.generate_pattern(&s, Priority::Size), r"[\*-\+\[-\^]");
    }

    #[test]
    fn cache() {
        let gen = RegexGenerator::new();
        let upper = set(&[(0x41, 0x5A)]);
        gen.generate_pattern(&upper, Priority::Size);
        gen.generate_pattern(&upper, Priority::Size);
        assert_eq!(gen.cache_size(), 1);
        gen.generate_pattern(&upper, Priority::Readability);
        assert_eq!(gen.cache_size(), 2);

        let mut changed = upper.clone();
        changed.add(0x61).unwrap();
        assert_eq!(gen.generate_pattern(&changed, Priority::Size), "[A-Za]");
        assert_eq!(gen.generate_pattern(&upper, Priority::Size), "[A-Z]");
        assert_eq!(gen.cache_size(), 3);

        gen.clear_cache();
        assert_eq!(gen.cache_size(), 0);
        assert_eq!(RegexGenerator::without_cache().cache_size(), 0);
    }

    #[test]
    fn range_pattern() {
        let gen = RegexGenerator::new();
        assert_eq!(gen.generate_range_pattern(0x41, 0x5A), Ok("[A-Z]".to_string()));
        assert_eq!(gen.generate_range_pattern(0x41, 0x41), Ok("A".to_string()));
        assert_eq!(
            gen.generate_range_pattern(0x5A, 0x41),
            Err(Error::InvalidRange { start: 0x5A, end: 0x41, fault: RangeFault::Reversed })
        );
    }

    #[test]
    fn properties() {
        let gen = RegexGenerator::new();
        assert_eq!(gen.generate_category_pattern("Lu"), r"\p{Lu}");
        assert_eq!(gen.generate_property_pattern("Script", "Greek"), r"\p{Script=Greek}");
    }

    #[test]
    fn alternations() {
        let gen = RegexGenerator::new();
        let none: [&str; 0] = [];
        assert_eq!(gen.generate_alternation_pattern(&none, Priority::Size), "[]");
        assert_eq!(gen.generate_alternation_pattern(&["[a-z]"], Priority::Readability), "[a-z]");
        assert_eq!(gen.generate_alternation_pattern(&["a", r"\d"], Priority::Size), r"a|\d");
        assert_eq!(
            gen.generate_alternation_pattern(&["a", r"\d"], Priority::Readability),
            r"(?:a | \d)"
        );

        assert_eq!(gen.create_alternation(&none), "[]");
        assert_eq!(gen.create_alternation(&["a.b"]), r"a\.b");
        assert_eq!(gen.create_alternation(&["cat", "c+t"]), r"(?:cat|c\+t)");
    }

    #[test]
    fn optimized_literals() {
        let gen = RegexGenerator::new();
        assert_eq!(gen.create_optimized_pattern(&["2024_Launch", "2025_Launch"]), "202[45]_Launch");
        assert_eq!(gen.create_optimized_pattern(&["v1.2.3", "v1.2.4"]), r"v1\.2\.[34]");
        assert_eq!(gen.create_optimized_pattern(&["a1b1", "a2b3", "a2b1"]), "a[12]b[13]");
        assert_eq!(gen.create_optimized_pattern(&["19", "29", "59"]), "[125]9");
        assert_eq!(gen.create_optimized_pattern(&["abc", "abc"]), "abc");
        assert_eq!(gen.create_optimized_pattern(&["one"]), "one");
        assert_eq!(gen.create_optimized_pattern(&["cat", "dog"]), "(?:cat|dog)");
        assert_eq!(gen.create_optimized_pattern(&["a1", "a10"]), "(?:a1|a10)");
        assert_eq!(gen.create_optimized_pattern(&["x1", "xa"]), "(?:x1|xa)");
        assert_eq!(common_prefix(&["héllo", "hélp"]), "hél");
    }

    #[test]
    fn optimized_generation() {
        let gen = RegexGenerator::new();
        let s = set(&[(0x41, 0x5A)]);
        assert_eq!(gen.generate_optimized(&s, Priority::Size), Ok("[A-Z]".to_string()));
        assert_eq!(gen.generate_optimized(&CodePointSet::new(), Priority::Size), Ok("[]".to_string()));
        let dot = CodePointSet::from_single(0x2E).unwrap();
        assert_eq!(gen.generate_optimized(&dot, Priority::Readability), Ok(r"\.".to_string()));
    }
}
