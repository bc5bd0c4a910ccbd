/* set.rs
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

use std::fmt::Debug;
use std::ops::{BitAnd, BitOr, Not, Sub};

use smallvec::SmallVec;

use crate::range::CodePointRange;
use crate::types::{Error, Result, MAX_CODE_POINT};

type Spans = SmallVec<[CodePointRange; 4]>;

/// A set of Unicode code points.
///
/// Members are kept as sorted, disjoint, non-adjacent ranges, so equality
/// and hashing only depend on membership.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CodePointSet {
    spans: Spans,
}

impl Debug for CodePointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dl = f.debug_list();
        for r in self.spans.iter() {
            if r.is_single() {
                dl.entry(&format_args!("U+{:04X}", r.start()));
            } else {
                dl.entry(&format_args!("U+{:04X}..=U+{:04X}", r.start(), r.end()));
            }
        }
        dl.finish()
    }
}

/// Canonical, immutable view of a set's membership, used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetSnapshot(Box<[CodePointRange]>);

impl SetSnapshot {
    pub fn ranges(&self) -> &[CodePointRange] {
        &self.0
    }
}

impl CodePointSet {
    pub fn new() -> Self {
        CodePointSet { spans: SmallVec::new() }
    }

    /// Build a set from raw integers. Every element is validated before
    /// anything is built, one bad element rejects the whole collection.
    pub fn from_points<I: IntoIterator<Item = u32>>(points: I) -> Result<Self> {
        let mut points = points.into_iter().collect::<Vec<_>>();
        if let Some(&bad) = points.iter().find(|&&cp| cp > MAX_CODE_POINT) {
            return Err(Error::InvalidCodePoint(bad as i64));
        }
        points.sort_unstable();
        points.dedup();
        Ok(CodePointSet::from_sorted_points(&points))
    }
    pub fn from_range(start: u32, end: u32) -> Result<Self> {
        let range = CodePointRange::new(start, end)?;
        Ok(CodePointSet { spans: smallvec::smallvec![range] })
    }
    pub fn from_single(cp: u32) -> Result<Self> {
        let range = CodePointRange::single(cp)?;
        Ok(CodePointSet { spans: smallvec::smallvec![range] })
    }
    /// Code points of every character in `text`.
    pub fn from_text(text: &str) -> Self {
        text.chars().collect()
    }
    pub fn full() -> Self {
        CodePointSet { spans: smallvec::smallvec![CodePointRange::full()] }
    }

    /// `points` must be sorted and free of duplicates.
    fn from_sorted_points(points: &[u32]) -> Self {
        let mut spans = Spans::new();
        let mut iter = points.iter().copied();
        if let Some(first) = iter.next() {
            let (mut start, mut end) = (first, first);
            for cp in iter {
                if cp == end + 1 {
                    end = cp;
                } else {
                    spans.push(CodePointRange::new_unchecked(start, end));
                    start = cp;
                    end = cp;
                }
            }
            spans.push(CodePointRange::new_unchecked(start, end));
        }
        CodePointSet { spans }
    }

    /// Ranges must already be sorted, disjoint and non-adjacent.
    pub(crate) fn from_spans_unchecked<I>(spans: I) -> Self
    where
        I: IntoIterator<Item = CodePointRange>,
    {
        CodePointSet { spans: spans.into_iter().collect() }
    }

    pub fn add(&mut self, cp: u32) -> Result<()> {
        let range = CodePointRange::single(cp)?;
        self.insert(range);
        Ok(())
    }
    pub fn add_range(&mut self, start: u32, end: u32) -> Result<()> {
        let range = CodePointRange::new(start, end)?;
        self.insert(range);
        Ok(())
    }
    pub fn insert(&mut self, range: CodePointRange) {
        // Ranges that overlap or touch `range` form the slice `lo .. hi`.
        let lo = self.spans.partition_point(|r| r.end() + 1 < range.start());
        let hi = self
            .spans
            .partition_point(|r| r.start() <= range.end().saturating_add(1));
        let merged = self.spans[lo .. hi]
            .iter()
            .fold(range, |acc, r| acc.cover(r));
        self.spans.drain(lo .. hi);
        self.spans.insert(lo, merged);
    }

    pub fn remove(&mut self, cp: u32) {
        self.remove_range(cp, cp);
    }
    /// Absent points and out of range bounds are ignored.
    pub fn remove_range(&mut self, start: u32, end: u32) {
        if start > end || start > MAX_CODE_POINT || self.spans.is_empty() {
            return;
        }
        let end = end.min(MAX_CODE_POINT);
        let lo = self.spans.partition_point(|r| r.end() < start);
        let hi = self.spans.partition_point(|r| r.start() <= end);
        if lo >= hi {
            return;
        }
        let mut kept = Spans::new();
        let first = self.spans[lo];
        let last = self.spans[hi - 1];
        if first.start() < start {
            kept.push(CodePointRange::new_unchecked(first.start(), start - 1));
        }
        if last.end() > end {
            kept.push(CodePointRange::new_unchecked(end + 1, last.end()));
        }
        self.spans.drain(lo .. hi);
        self.spans.insert_many(lo, kept);
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.spans.binary_search_by(|r| r.cmp_point(cp)).is_ok()
    }
    pub fn len(&self) -> usize {
        self.spans.iter().map(CodePointRange::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Maximal contiguous ranges in ascending order.
    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32)> + Clone + '_ {
        self.spans.iter().map(|r| (r.start(), r.end()))
    }
    pub fn spans(&self) -> &[CodePointRange] {
        &self.spans
    }
    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.spans.iter().flat_map(|r| r.into_iter())
    }
    pub fn snapshot(&self) -> SetSnapshot {
        SetSnapshot(self.spans.iter().copied().collect())
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut all = self
            .spans
            .iter()
            .chain(other.spans.iter())
            .copied()
            .collect::<Vec<_>>();
        all.sort_unstable();
        let mut spans = Spans::new();
        for r in all {
            match spans.last_mut() {
                Some(last) if last.end().saturating_add(1) >= r.start() => {
                    *last = last.cover(&r);
                }
                _ => spans.push(r),
            }
        }
        CodePointSet { spans }
    }
    pub fn intersect(&self, other: &Self) -> Self {
        let mut spans = Spans::new();
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < other.spans.len() {
            let a = self.spans[i];
            let b = other.spans[j];
            let start = a.start().max(b.start());
            let end = a.end().min(b.end());
            if start <= end {
                spans.push(CodePointRange::new_unchecked(start, end));
            }
            if a.end() < b.end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        CodePointSet { spans }
    }
    pub fn difference(&self, other: &Self) -> Self {
        self.intersect(&other.complement())
    }
    /// All valid code points not in the set.
    pub fn complement(&self) -> Self {
        let mut spans = Spans::new();
        let mut next = 0u32;
        for r in self.spans.iter() {
            if r.start() > next {
                spans.push(CodePointRange::new_unchecked(next, r.start() - 1));
            }
            next = r.end() + 1;
        }
        if next <= MAX_CODE_POINT {
            spans.push(CodePointRange::new_unchecked(next, MAX_CODE_POINT));
        }
        CodePointSet { spans }
    }
}

impl FromIterator<char> for CodePointSet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        let mut points = iter.into_iter().map(u32::from).collect::<Vec<_>>();
        points.sort_unstable();
        points.dedup();
        CodePointSet::from_sorted_points(&points)
    }
}

impl Extend<CodePointRange> for CodePointSet {
    fn extend<T: IntoIterator<Item = CodePointRange>>(&mut self, iter: T) {
        iter.into_iter().for_each(|r| self.insert(r));
    }
}

impl From<CodePointRange> for CodePointSet {
    fn from(value: CodePointRange) -> Self {
        CodePointSet { spans: smallvec::smallvec![value] }
    }
}

impl BitOr for &CodePointSet {
    type Output = CodePointSet;
    fn bitor(self, rhs: Self) -> CodePointSet {
        self.union(rhs)
    }
}
impl BitAnd for &CodePointSet {
    type Output = CodePointSet;
    fn bitand(self, rhs: Self) -> CodePointSet {
        self.intersect(rhs)
    }
}
impl Sub for &CodePointSet {
    type Output = CodePointSet;
    fn sub(self, rhs: Self) -> CodePointSet {
        self.difference(rhs)
    }
}
impl Not for &CodePointSet {
    type Output = CodePointSet;
    fn not(self) -> CodePointSet {
        self.complement()
    }
}
