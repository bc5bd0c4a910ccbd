/* types.rs
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

use compact_str::{CompactString, ToCompactString};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The largest valid Unicode code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a range was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFault {
    /// `start > end`.
    Reversed,
    /// A bound lies outside `[0, 0x10FFFF]`.
    OutOfBounds,
    /// Two ranges neither overlap nor touch, so they cannot be merged.
    Disjoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    InvalidCodePoint(i64),
    InvalidRange { start: i64, end: i64, fault: RangeFault },
    InvalidArgument(CompactString),
    InvalidPattern { position: usize, reason: &'static str },
    InvalidInput,
    UnknownCategory(CompactString),
    UnknownScript(CompactString),
    UnknownPropertyFile(CompactString),
    UnknownPropertyValue { file: CompactString, value: CompactString },
    MissingProperty { code_point: u32, property: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCodePoint(cp) => write!(
                f,
                "Invalid code point {}, code points must be between 0x0 and 0x10FFFF",
                cp
            ),
            Self::InvalidRange { start, end, fault } => match fault {
                RangeFault::Reversed => {
                    write!(f, "Invalid code point range {:X}-{:X}: start > end", start, end)
                }
                RangeFault::OutOfBounds => write!(
                    f,
                    "Invalid code point range {:X}-{:X}: bounds must be between 0x0 and 0x10FFFF",
                    start, end
                ),
                RangeFault::Disjoint => write!(
                    f,
                    "Cannot merge code point ranges ending at {:X} and starting at {:X}: \
                     they neither overlap nor touch",
                    start, end
                ),
            },
            Self::InvalidArgument(s) => write!(
                f,
                "Invalid priority '{}', priority must be 'size' or 'readability'",
                s
            ),
            Self::InvalidPattern { position, reason } => {
                write!(f, "Invalid pattern at byte {}: {}", position, reason)
            }
            Self::InvalidInput => write!(f, "Cannot parse a code point from the input"),
            Self::UnknownCategory(s) => write!(f, "Unknown Unicode category: {}", s),
            Self::UnknownScript(s) => write!(f, "Unknown Unicode script: {}", s),
            Self::UnknownPropertyFile(s) => write!(f, "Unknown property file: {}", s),
            Self::UnknownPropertyValue { file, value } => {
                write!(f, "Unknown property value '{}' in {}", value, file)
            }
            Self::MissingProperty { code_point, property } => {
                write!(f, "No {} value for code point U+{:04X}", property, code_point)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Optimization objective shared by the generator and the optimizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Shortest pattern text.
    #[default]
    Size,
    /// Spaced out alternations and ranges.
    Readability,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Readability => "readability",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("size") {
            Ok(Self::Size)
        } else if s.eq_ignore_ascii_case("readability") {
            Ok(Self::Readability)
        } else {
            Err(Error::InvalidArgument(s.to_compact_string()))
        }
    }
}
