use regex::Regex;
use unicode_regen::generator::EMPTY_CLASS;
use unicode_regen::unicode::BLOCKS_FILE;
use unicode_regen::{
    BuiltinUnicode, CodePointSet, Error, Optimizer, Priority, RegexGenerator, UnicodeData,
};

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern)).unwrap()
}

fn is_match(regex: &Regex, cp: u32) -> bool {
    let c = char::from_u32(cp).unwrap();
    regex.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Every member matches, the neighbours of every range do not.
fn assert_matches_exactly(set: &CodePointSet, pattern: &str) {
    let regex = anchored(pattern);
    for cp in set.iter().filter(|&cp| char::from_u32(cp).is_some()) {
        assert!(is_match(&regex, cp), "{} should match U+{:04X}", pattern, cp);
    }
    for (start, end) in set.ranges() {
        for outside in [start.checked_sub(1), end.checked_add(1)].into_iter().flatten() {
            if !set.contains(outside) && char::from_u32(outside).is_some() {
                assert!(
                    !is_match(&regex, outside),
                    "{} should not match U+{:04X}",
                    pattern,
                    outside
                );
            }
        }
    }
}

#[test]
fn generated_patterns_match_their_sets() {
    let gen = RegexGenerator::new();
    let mut sets = vec![
        CodePointSet::from_text("aceg"),
        CodePointSet::from_range(0x41, 0x5A).unwrap(),
        CodePointSet::from_text(".^$*+?{}[]\\|()-&~"),
        CodePointSet::from_points([0x391, 0x392, 0x393, 0x3B1, 0x1F600, 0x1F601, 0x10FFFF]).unwrap(),
    ];
    let mut mixed = CodePointSet::from_range(0x4E00, 0x4E20).unwrap();
    mixed.add_range(0x20, 0x2F).unwrap();
    mixed.add(0xE9).unwrap();
    sets.push(mixed);

    for set in &sets {
        assert_matches_exactly(set, &gen.generate_pattern(set, Priority::Size));
        // Readability spacing is literal class text, it only has to compile.
        anchored(&gen.generate_pattern(set, Priority::Readability));
    }
}

#[test]
fn shorthands() {
    let gen = RegexGenerator::new();
    let digits = CodePointSet::from_range(0x30, 0x39).unwrap();
    assert_eq!(gen.generate_pattern(&digits, Priority::Size), r"\d");
    let regex = anchored(r"\d");
    for cp in 0 .. 0x80 {
        assert_eq!(is_match(&regex, cp), digits.contains(cp));
    }
}

#[test]
fn empty_set() {
    let gen = RegexGenerator::new();
    let empty = CodePointSet::new();
    assert_eq!(gen.generate_pattern(&empty, Priority::Size), EMPTY_CLASS);
    assert_eq!(gen.generate_pattern(&empty, Priority::Readability), EMPTY_CLASS);
    let complement = CodePointSet::full().complement();
    assert_eq!(gen.generate_pattern(&complement, Priority::Size), EMPTY_CLASS);
}

#[test]
fn optimized_literals_match_inputs() {
    let gen = RegexGenerator::new();
    let pattern = gen.create_optimized_pattern(&["2024_Launch", "2025_Launch"]);
    assert_eq!(pattern, "202[45]_Launch");
    let regex = Regex::new(&format!("^{}$", pattern)).unwrap();
    assert!(regex.is_match("2024_Launch"));
    assert!(regex.is_match("2025_Launch"));
    assert!(!regex.is_match("2026_Launch"));

    let words = ["a.b", "a+b", "(x)"];
    let regex = Regex::new(&format!("^{}$", gen.create_optimized_pattern(&words))).unwrap();
    for word in words {
        assert!(regex.is_match(word));
    }
    assert!(!regex.is_match("axb"));
}

#[test]
fn unicode_sets_round_trip_through_patterns() {
    let ucd = BuiltinUnicode::new();
    let gen = RegexGenerator::new();
    let greek = ucd.script_set("Greek").unwrap();
    let pattern = gen.generate_pattern(&greek, Priority::Size);
    assert_matches_exactly(&greek, &pattern);

    let regex = anchored(&pattern);
    let native = Regex::new(r"^\p{Greek}$").unwrap();
    for cp in (0x370 .. 0x400).chain(0x1F00 .. 0x2000) {
        assert_eq!(is_match(&regex, cp), is_match(&native, cp), "U+{:04X}", cp);
    }

    let latin = ucd.property_set(BLOCKS_FILE, "Basic Latin").unwrap();
    assert_eq!(gen.generate_pattern(&latin, Priority::Size), "[\0-\x7f]");
}

#[test]
fn unicode_errors_propagate() {
    let ucd = BuiltinUnicode::new();
    assert_eq!(ucd.category_of(0x110000), Err(Error::InvalidCodePoint(0x110000)));
    assert!(matches!(ucd.script_set("Nope"), Err(Error::UnknownScript(_))));
    assert!(matches!(ucd.property_values("Nope"), Err(Error::UnknownPropertyFile(_))));
}

#[test]
fn optimizer_behaviour() {
    let opt = Optimizer::new();
    assert_eq!(opt.compress_ranges([65, 66, 67, 70, 71, 72]), vec![(65, 67), (70, 72)]);
    assert_eq!(opt.minimize_pattern("[a]").unwrap(), "a");

    let report = opt.benchmark_pattern("[", "abc", 100);
    assert!(!report.is_ok());
    assert_eq!(report.iterations, 0);
    assert_eq!(report.pattern_size, 1);

    let report = opt.benchmark_pattern("[a-z]+", "hello", 50);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 50);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["pattern_size"], 6);
    assert!(json.get("error").is_none());
}

#[test]
fn generator_is_shared_across_threads() {
    let gen = RegexGenerator::new();
    let sets = (0 .. 8u32)
        .map(|i| CodePointSet::from_range(0x100 * (i + 1), 0x100 * (i + 1) + 0x10).unwrap())
        .collect::<Vec<_>>();
    std::thread::scope(|scope| {
        for _ in 0 .. 4 {
            scope.spawn(|| {
                for set in &sets {
                    let pattern = gen.generate_pattern(set, Priority::Size);
                    assert!(pattern.starts_with("[\\u"));
                }
            });
        }
    });
    assert_eq!(gen.cache_size(), sets.len());
}
