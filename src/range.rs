/* range.rs
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

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{self, RangeInclusive};

use compact_str::{format_compact, CompactString};

use crate::types::{Error, RangeFault, Result, MAX_CODE_POINT};

pub(crate) fn is_valid_code_point(num: i64) -> bool {
    (0 ..= MAX_CODE_POINT as i64).contains(&num)
}

/// Validate a raw integer as a code point.
pub fn code_point(num: i64) -> Result<u32> {
    if is_valid_code_point(num) {
        Ok(num as u32)
    } else {
        Err(Error::InvalidCodePoint(num))
    }
}

/// An inclusive, non-empty range of code points inside `[0, 0x10FFFF]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodePointRange {
    start: u32,
    end: u32,
}

impl Debug for CodePointRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CodePointRange(U+{:04X}..=U+{:04X})", self.start, self.end)
    }
}

impl CodePointRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        let fault = if start > MAX_CODE_POINT || end > MAX_CODE_POINT {
            Some(RangeFault::OutOfBounds)
        } else if start > end {
            Some(RangeFault::Reversed)
        } else {
            None
        };
        match fault {
            Some(fault) => Err(Error::InvalidRange {
                start: start as i64,
                end: end as i64,
                fault,
            }),
            None => Ok(CodePointRange { start, end }),
        }
    }
    /// Callers guarantee `start <= end <= 0x10FFFF`.
    pub(crate) const fn new_unchecked(start: u32, end: u32) -> Self {
        CodePointRange { start, end }
    }
    pub fn single(cp: u32) -> Result<Self> {
        if cp > MAX_CODE_POINT {
            return Err(Error::InvalidCodePoint(cp as i64));
        }
        Ok(CodePointRange { start: cp, end: cp })
    }
    pub fn full() -> Self {
        CodePointRange { start: 0, end: MAX_CODE_POINT }
    }

    pub fn start(&self) -> u32 {
        self.start
    }
    pub fn end(&self) -> u32 {
        self.end
    }
    /// Number of code points covered, never zero.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }
    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.start <= cp && cp <= self.end
    }
    /// Where the range lies relative to `cp`, usable with `binary_search_by`.
    pub fn cmp_point(&self, cp: u32) -> Ordering {
        if self.start > cp {
            Ordering::Greater
        } else if self.end < cp {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
    pub fn overlaps(&self, other: &Self) -> bool {
        self.end >= other.start && other.end >= self.start
    }
    pub fn adjacent_to(&self, other: &Self) -> bool {
        self.end + 1 == other.start || other.end + 1 == self.start
    }
    /// Smallest range covering both, only defined when they overlap or touch.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        if self.overlaps(other) || self.adjacent_to(other) {
            Ok(self.cover(other))
        } else {
            let (lower, upper) =
                if self.start < other.start { (self, other) } else { (other, self) };
            Err(Error::InvalidRange {
                start: lower.end as i64,
                end: upper.start as i64,
                fault: RangeFault::Disjoint,
            })
        }
    }
    pub(crate) fn cover(&self, other: &Self) -> Self {
        CodePointRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl IntoIterator for CodePointRange {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;
    fn into_iter(self) -> Self::IntoIter {
        self.start ..= self.end
    }
}

impl From<CodePointRange> for (u32, u32) {
    fn from(value: CodePointRange) -> Self {
        (value.start, value.end)
    }
}

impl TryFrom<RangeInclusive<u32>> for CodePointRange {
    type Error = Error;
    fn try_from(value: RangeInclusive<u32>) -> Result<Self> {
        CodePointRange::new(*value.start(), *value.end())
    }
}

/// A parsed, not yet validated, range of integers.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RangeItem<T>
where
    T: Ord + Clone,
{
    Single(T),
    From(ops::RangeFrom<T>),
    Range(ops::RangeInclusive<T>),
    To(ops::RangeToInclusive<T>),
    Full(ops::RangeFull),
}

impl TryFrom<RangeItem<i64>> for CodePointRange {
    type Error = Error;
    fn try_from(value: RangeItem<i64>) -> Result<Self> {
        let (start, end) = match value {
            RangeItem::Single(v) => (v, v),
            RangeItem::From(v) => (v.start, MAX_CODE_POINT as i64),
            RangeItem::Range(v) => (*v.start(), *v.end()),
            RangeItem::To(v) => (0, v.end),
            RangeItem::Full(_) => return Ok(CodePointRange::full()),
        };
        if !is_valid_code_point(start) || !is_valid_code_point(end) {
            return Err(if start == end {
                Error::InvalidCodePoint(start)
            } else {
                Error::InvalidRange { start, end, fault: RangeFault::OutOfBounds }
            });
        }
        CodePointRange::new(start as u32, end as u32)
    }
}

/// Parse one number: decimal, `0x`/`0o`/`0b` prefixed, `U+XXXX`, or a
/// backquoted character (`` `a ``, `` `\. ``). Leading signs are allowed.
pub fn parse_num(text: &str) -> Result<i64> {
    if text.is_empty() {
        return Err(Error::InvalidInput);
    }

    let mut chars = text.chars();
    let mut signal = 0;
    let mut c = None;
    for c_ in chars.by_ref() {
        match c_ {
            '+' => {}
            '-' => signal += 1,
            _ => {
                c = Some(c_);
                break;
            }
        }
    }
    let negate = |num: i64| if signal % 2 == 1 { -num } else { num };

    match c {
        None => Err(Error::InvalidInput),
        Some('0') => match chars.next() {
            None => Ok(0),
            Some(c2) => {
                let (radix, num_str) = match c2 {
                    'x' | 'X' => (16, chars.collect::<CompactString>()),
                    'o' | 'O' => (8, chars.collect::<CompactString>()),
                    'b' | 'B' => (2, chars.collect::<CompactString>()),
                    _ => (10, format_compact!("{}{}", c2, chars.as_str())),
                };
                i64::from_str_radix(&num_str, radix)
                    .map(negate)
                    .map_err(|_| Error::InvalidInput)
            }
        },
        Some('U' | 'u') => match chars.next() {
            Some('+') => i64::from_str_radix(chars.as_str(), 16)
                .map(negate)
                .map_err(|_| Error::InvalidInput),
            _ => Err(Error::InvalidInput),
        },
        Some('`') => {
            let rest = chars.as_str();
            let mut rest_chars = rest.chars();
            match (rest_chars.next(), rest_chars.next(), rest_chars.next()) {
                (Some('\\'), Some(c3), None) => Ok(c3 as i64),
                (Some(c2), None, _) if c2 != '\\' => Ok(c2 as i64),
                _ => Err(Error::InvalidInput),
            }
        }
        Some(c) => {
            let num_str = format_compact!("{}{}", c, chars.as_str());
            num_str
                .parse::<i64>()
                .map(negate)
                .map_err(|_| Error::InvalidInput)
        }
    }
}

pub fn parse_num_range(text: &str, sep: &str) -> Result<RangeItem<i64>> {
    let mut res = text.rsplitn(2, sep);
    let end = match res.next() {
        Some("") => None,
        Some(end_str) => Some(parse_num(end_str)?),
        None => return Err(Error::InvalidInput),
    };
    let start = match res.next() {
        None => {
            return end.map(RangeItem::Single).ok_or(Error::InvalidInput);
        }
        Some("") => None,
        Some(start_str) => Some(parse_num(start_str)?),
    };
    match (start, end) {
        (Some(start), Some(end)) if start == end => Ok(RangeItem::Single(start)),
        (Some(start), Some(end)) if start < end => Ok(RangeItem::Range(start ..= end)),
        (Some(_), Some(_)) => Err(Error::InvalidInput),
        (Some(start), None) => Ok(RangeItem::From(start ..)),
        (None, Some(end)) => Ok(RangeItem::To(..= end)),
        (None, None) => Ok(RangeItem::Full(..)),
    }
}

/// Parse `START..END` (either side optional) into a validated range.
pub fn parse_code_point_range(text: &str) -> Result<CodePointRange> {
    let item = parse_num_range(text.trim(), "..")?;
    CodePointRange::try_from(item)
}
