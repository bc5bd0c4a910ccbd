/* unicode.rs
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

use std::hash::BuildHasherDefault;

use compact_str::{CompactString, ToCompactString};
use hashers::fx_hash::FxHasher;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use rayon::prelude::*;
use yeslogic_unicode_blocks::find_unicode_block;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};
use unicode_script::UnicodeScript;

use crate::range::CodePointRange;
use crate::set::CodePointSet;
use crate::types::{Error, Result, MAX_CODE_POINT};

/// Two-letter general categories and their long names.
pub const CATEGORIES: [(&str, &str); 30] = [
    ("Lu", "Uppercase_Letter"),
    ("Ll", "Lowercase_Letter"),
    ("Lt", "Titlecase_Letter"),
    ("Lm", "Modifier_Letter"),
    ("Lo", "Other_Letter"),
    ("Mn", "Nonspacing_Mark"),
    ("Mc", "Spacing_Mark"),
    ("Me", "Enclosing_Mark"),
    ("Nd", "Decimal_Number"),
    ("Nl", "Letter_Number"),
    ("No", "Other_Number"),
    ("Pc", "Connector_Punctuation"),
    ("Pd", "Dash_Punctuation"),
    ("Ps", "Open_Punctuation"),
    ("Pe", "Close_Punctuation"),
    ("Pi", "Initial_Punctuation"),
    ("Pf", "Final_Punctuation"),
    ("Po", "Other_Punctuation"),
    ("Sm", "Math_Symbol"),
    ("Sc", "Currency_Symbol"),
    ("Sk", "Modifier_Symbol"),
    ("So", "Other_Symbol"),
    ("Zs", "Space_Separator"),
    ("Zl", "Line_Separator"),
    ("Zp", "Paragraph_Separator"),
    ("Cc", "Control"),
    ("Cf", "Format"),
    ("Cs", "Surrogate"),
    ("Co", "Private_Use"),
    ("Cn", "Unassigned"),
];

/// One-letter major categories.
pub const MAJOR_CATEGORIES: [(&str, &str); 7] = [
    ("L", "Letter"),
    ("M", "Mark"),
    ("N", "Number"),
    ("P", "Punctuation"),
    ("S", "Symbol"),
    ("Z", "Separator"),
    ("C", "Other"),
];

pub const SCRIPTS_FILE: &str = "Scripts";
pub const BLOCKS_FILE: &str = "Blocks";

/// Long name of a one- or two-letter category.
pub fn category_name(abbr: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .chain(MAJOR_CATEGORIES.iter())
        .find(|(short, _)| *short == abbr)
        .map(|(_, long)| *long)
}

/// Queries over Unicode character data.
///
/// Every operation validates its code point first and fails with
/// [`Error::InvalidCodePoint`] beyond U+10FFFF.
pub trait UnicodeData {
    /// Two-letter general category.
    fn category_of(&self, cp: u32) -> Result<&'static str>;
    /// All code points of a two-letter category, or of a one-letter major category.
    fn category_set(&self, name: &str) -> Result<CodePointSet>;
    fn script_of(&self, cp: u32) -> Result<&'static str>;
    fn script_set(&self, name: &str) -> Result<CodePointSet>;
    fn name_of(&self, cp: u32) -> Result<String>;
    /// Value of a decimal digit (category `Nd`).
    fn decimal_value(&self, cp: u32) -> Result<u32>;
    /// Code points carrying `value` in the named property file.
    fn property_set(&self, file: &str, value: &str) -> Result<CodePointSet>;
    fn property_values(&self, file: &str) -> Result<Vec<CompactString>>;
}

type FxBuildHasher = BuildHasherDefault<FxHasher>;
type Table = IndexMap<&'static str, CodePointSet, FxBuildHasher>;
type Runs = Vec<(&'static str, CodePointRange)>;

lazy_static! {
    static ref CATEGORY_TABLE: Table = build_table(category_abbr, "Cs");
    static ref SCRIPT_TABLE: Table = build_table(script_name, "Unknown");
    static ref BLOCK_TABLE: Table = build_blocks();
}

fn category_abbr(c: char) -> &'static str {
    use GeneralCategory::*;
    match c.general_category() {
        UppercaseLetter => "Lu",
        LowercaseLetter => "Ll",
        TitlecaseLetter => "Lt",
        ModifierLetter => "Lm",
        OtherLetter => "Lo",
        NonspacingMark => "Mn",
        SpacingMark => "Mc",
        EnclosingMark => "Me",
        DecimalNumber => "Nd",
        LetterNumber => "Nl",
        OtherNumber => "No",
        ConnectorPunctuation => "Pc",
        DashPunctuation => "Pd",
        OpenPunctuation => "Ps",
        ClosePunctuation => "Pe",
        InitialPunctuation => "Pi",
        FinalPunctuation => "Pf",
        OtherPunctuation => "Po",
        MathSymbol => "Sm",
        CurrencySymbol => "Sc",
        ModifierSymbol => "Sk",
        OtherSymbol => "So",
        SpaceSeparator => "Zs",
        LineSeparator => "Zl",
        ParagraphSeparator => "Zp",
        Control => "Cc",
        Format => "Cf",
        PrivateUse => "Co",
        #[allow(unreachable_patterns)]
        _ => "Cn",
    }
}

fn script_name(c: char) -> &'static str {
    c.script().full_name()
}

/// Runs of equally labelled code points in one plane, surrogates included.
fn scan_plane(plane: u32, classify: fn(char) -> &'static str, surrogate: &'static str) -> Runs {
    let mut runs = Runs::new();
    let mut current: Option<(&'static str, u32, u32)> = None;
    let base = plane << 16;
    for cp in base ..= base | 0xFFFF {
        let label = char::from_u32(cp).map_or(surrogate, classify);
        match current.as_mut() {
            Some((last, _, end)) if *last == label => *end = cp,
            _ => {
                if let Some((last, start, end)) = current.replace((label, cp, cp)) {
                    runs.push((last, CodePointRange::new_unchecked(start, end)));
                }
            }
        }
    }
    runs.extend(current.map(|(last, start, end)| (last, CodePointRange::new_unchecked(start, end))));
    runs
}

fn build_table(classify: fn(char) -> &'static str, surrogate: &'static str) -> Table {
    let planes = (0 ..= MAX_CODE_POINT >> 16)
        .into_par_iter()
        .map(|plane| scan_plane(plane, classify, surrogate))
        .collect::<Vec<_>>();
    let mut table = Table::default();
    for (label, range) in planes.into_iter().flatten() {
        table.entry(label).or_default().insert(range);
    }
    debug!("Built a Unicode table with {} entries", table.len());
    table
}

fn build_blocks() -> Table {
    let mut table = Table::default();
    let mut cp = 0;
    while cp <= MAX_CODE_POINT {
        match char::from_u32(cp).and_then(find_unicode_block) {
            Some(block) => {
                table
                    .entry(block.name())
                    .or_default()
                    .insert(CodePointRange::new_unchecked(block.start(), block.end()));
                cp = block.end() + 1;
            }
            None => cp += 1,
        }
    }
    table
}

/// Case, spaces, hyphens and underscores are ignored.
fn loose_key(name: &str) -> CompactString {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup(table: &Table, name: &str) -> Option<CodePointSet> {
    if let Some(set) = table.get(name) {
        return Some(set.clone());
    }
    let key = loose_key(name);
    table
        .iter()
        .find(|(label, _)| loose_key(label) == key)
        .map(|(_, set)| set.clone())
}

fn checked(cp: u32) -> Result<Option<char>> {
    if cp > MAX_CODE_POINT {
        return Err(Error::InvalidCodePoint(cp as i64));
    }
    Ok(char::from_u32(cp))
}

/// Unicode data compiled into the binary.
///
/// The per-category and per-script tables are scanned once per process on
/// first use.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinUnicode;

impl BuiltinUnicode {
    pub fn new() -> Self {
        BuiltinUnicode
    }

    pub fn block_of(&self, cp: u32) -> Result<&'static str> {
        checked(cp)?
            .and_then(find_unicode_block)
            .map(|block| block.name())
            .ok_or(Error::MissingProperty { code_point: cp, property: "block" })
    }
}

impl UnicodeData for BuiltinUnicode {
    fn category_of(&self, cp: u32) -> Result<&'static str> {
        Ok(checked(cp)?.map_or("Cs", category_abbr))
    }

    fn category_set(&self, name: &str) -> Result<CodePointSet> {
        if CATEGORIES.iter().any(|(abbr, _)| *abbr == name) {
            return Ok(CATEGORY_TABLE.get(name).cloned().unwrap_or_default());
        }
        if MAJOR_CATEGORIES.iter().any(|(abbr, _)| *abbr == name) {
            return Ok(CATEGORY_TABLE
                .iter()
                .filter(|(abbr, _)| abbr.starts_with(name))
                .fold(CodePointSet::new(), |acc, (_, set)| &acc | set));
        }
        Err(Error::UnknownCategory(name.to_compact_string()))
    }

    fn script_of(&self, cp: u32) -> Result<&'static str> {
        Ok(checked(cp)?.map_or("Unknown", script_name))
    }

    fn script_set(&self, name: &str) -> Result<CodePointSet> {
        lookup(&SCRIPT_TABLE, name).ok_or_else(|| Error::UnknownScript(name.to_compact_string()))
    }

    fn name_of(&self, cp: u32) -> Result<String> {
        checked(cp)?
            .and_then(unicode_names2::name)
            .map(|name| name.to_string())
            .ok_or(Error::MissingProperty { code_point: cp, property: "name" })
    }

    fn decimal_value(&self, cp: u32) -> Result<u32> {
        let missing = Error::MissingProperty { code_point: cp, property: "decimal value" };
        if self.category_of(cp)? != "Nd" {
            return Err(missing);
        }
        // Decimal digits come in contiguous runs of ten starting at zero.
        CATEGORY_TABLE
            .get("Nd")
            .and_then(|digits| digits.spans().iter().find(|range| range.contains(cp)))
            .map(|range| (cp - range.start()) % 10)
            .ok_or(missing)
    }

    fn property_set(&self, file: &str, value: &str) -> Result<CodePointSet> {
        let table: &Table = match file {
            SCRIPTS_FILE => &*SCRIPT_TABLE,
            BLOCKS_FILE => &*BLOCK_TABLE,
            _ => return Err(Error::UnknownPropertyFile(file.to_compact_string())),
        };
        lookup(table, value).ok_or_else(|| Error::UnknownPropertyValue {
            file: file.to_compact_string(),
            value: value.to_compact_string(),
        })
    }

    fn property_values(&self, file: &str) -> Result<Vec<CompactString>> {
        let table: &Table = match file {
            SCRIPTS_FILE => &*SCRIPT_TABLE,
            BLOCKS_FILE => &*BLOCK_TABLE,
            _ => return Err(Error::UnknownPropertyFile(file.to_compact_string())),
        };
        Ok(table.keys().map(|k| k.to_compact_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let ucd = BuiltinUnicode::new();
        assert_eq!(ucd.category_of('A' as u32), Ok("Lu"));
        assert_eq!(ucd.category_of('7' as u32), Ok("Nd"));
        assert_eq!(ucd.category_of(0xD800), Ok("Cs"));
        assert_eq!(ucd.category_of(0x110000), Err(Error::InvalidCodePoint(0x110000)));

        let upper = ucd.category_set("Lu").unwrap();
        assert!(upper.contains('A' as u32) && upper.contains(0x391));
        assert!(!upper.contains('a' as u32));
        let letters = ucd.category_set("L").unwrap();
        assert!(letters.contains('a' as u32) && letters.contains('A' as u32));
        assert!(!letters.contains('1' as u32));
        assert_eq!(ucd.category_set("Cs").unwrap().ranges().collect::<Vec<_>>(), vec![(0xD800, 0xDFFF)]);
        assert_eq!(ucd.category_set("Xx"), Err(Error::UnknownCategory("Xx".into())));
        assert_eq!(category_name("Lu"), Some("Uppercase_Letter"));
        assert_eq!(category_name("Z"), Some("Separator"));
    }

    #[test]
    fn scripts() {
        let ucd = BuiltinUnicode::new();
        assert_eq!(ucd.script_of('A' as u32), Ok("Latin"));
        assert_eq!(ucd.script_of(0x3B1), Ok("Greek"));
        assert_eq!(ucd.script_of('1' as u32), Ok("Common"));
        let greek = ucd.script_set("Greek").unwrap();
        assert!(greek.contains(0x3B1) && !greek.contains('a' as u32));
        assert_eq!(ucd.script_set("greek"), Ok(greek));
        assert_eq!(ucd.script_set("Klingon"), Err(Error::UnknownScript("Klingon".into())));
    }

    #[test]
    fn names_and_digits() {
        let ucd = BuiltinUnicode::new();
        assert_eq!(ucd.name_of('A' as u32).unwrap(), "LATIN CAPITAL LETTER A");
        assert_eq!(
            ucd.name_of(0xE000),
            Err(Error::MissingProperty { code_point: 0xE000, property: "name" })
        );
        assert_eq!(ucd.decimal_value('7' as u32), Ok(7));
        assert_eq!(ucd.decimal_value(0x0667), Ok(7));
        assert_eq!(ucd.decimal_value(0x1D7D9), Ok(1));
        assert!(matches!(
            ucd.decimal_value('A' as u32),
            Err(Error::MissingProperty { code_point: 0x41, .. })
        ));
    }

    #[test]
    fn property_files() {
        let ucd = BuiltinUnicode::new();
        let latin = ucd.property_set(BLOCKS_FILE, "Basic Latin").unwrap();
        assert_eq!(latin.ranges().collect::<Vec<_>>(), vec![(0, 0x7F)]);
        assert_eq!(ucd.property_set(BLOCKS_FILE, "basic_latin"), Ok(latin));
        assert!(ucd.property_set(SCRIPTS_FILE, "Latin").unwrap().contains('z' as u32));
        assert_eq!(
            ucd.property_set("Emoji", "x"),
            Err(Error::UnknownPropertyFile("Emoji".into()))
        );
        assert_eq!(
            ucd.property_set(BLOCKS_FILE, "Nope"),
            Err(Error::UnknownPropertyValue { file: "Blocks".into(), value: "Nope".into() })
        );
        let blocks = ucd.property_values(BLOCKS_FILE).unwrap();
        assert_eq!(blocks[0], "Basic Latin");
        assert!(ucd.property_values(SCRIPTS_FILE).unwrap().iter().any(|s| s == "Greek"));
        assert_eq!(ucd.block_of(0x3B1), Ok("Greek and Coptic"));
    }
}
