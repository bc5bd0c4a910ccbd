use std::env::{set_var as set_env_var, var as get_env_var};
use std::iter::zip;

use anyhow::{bail, Context};
use clap::{arg, value_parser, Arg, ArgAction, ArgMatches, Command};

pub mod config;
pub mod generator;
pub mod optimizer;
pub mod range;
pub mod set;
pub mod types;
pub mod unicode;

pub use generator::RegexGenerator;
pub use optimizer::{BenchmarkReport, Optimizer};
pub use range::CodePointRange;
pub use set::CodePointSet;
pub use types::{Error, Priority, Result};
pub use unicode::{BuiltinUnicode, UnicodeData};

use crate::config::{load_config, ConfigLayer, RegenConfig};
use crate::range::{code_point, parse_code_point_range, parse_num};
use crate::unicode::BLOCKS_FILE;

const VERSION: i32 = 0;
const REVERSION: &str = ".1";
const DATE: &str = "2025/03/02";
const COPYRIGHT: &str = "2024-2025, Wenjian Chern ©";

pub fn print_copyright(prefix: &str) {
    eprintln!(
        "{} version {}{} ({}), copyright {}.",
        prefix, VERSION, REVERSION, DATE, COPYRIGHT
    );
}

fn priority_arg() -> Arg {
    Arg::new("priority")
        .long("priority")
        .short('p')
        .value_parser(["size", "readability"])
        .help("Override the configured priority.")
}

pub fn build_command() -> Command {
    let pattern = Command::new("pattern")
        .about("Generate a pattern matching one code point of a set")
        .arg(
            Arg::new("chars")
                .long("chars")
                .short('c')
                .value_name("TEXT")
                .action(ArgAction::Append)
                .help("Add every character of TEXT."),
        )
        .arg(
            Arg::new("range")
                .long("range")
                .short('r')
                .value_name("RANGE")
                .action(ArgAction::Append)
                .help("Add a code point or a range, e.g. `0x41`, `U+0041..U+005A`, `..0x7F`."),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .alias("gc")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Add a general category, e.g. `Lu` or `L`."),
        )
        .arg(
            Arg::new("script")
                .long("script")
                .alias("sc")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Add a script, e.g. `Greek`."),
        )
        .arg(
            Arg::new("block")
                .long("block")
                .alias("blk")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Add a block, e.g. `Basic Latin`."),
        )
        .arg(
            Arg::new("complement")
                .long("complement")
                .action(ArgAction::SetTrue)
                .help("Match every code point outside the set."),
        )
        .arg(
            Arg::new("optimize")
                .long("optimize")
                .short('O')
                .action(ArgAction::SetTrue)
                .help("Run the optimizer over the generated pattern."),
        )
        .arg(priority_arg());

    let literals = Command::new("literals")
        .about("Generate a pattern matching any of the given strings")
        .arg(arg!(<STRINGS> ... "Literal strings"))
        .arg(
            Arg::new("alternation")
                .long("alternation")
                .short('a')
                .action(ArgAction::SetTrue)
                .help("Plain alternation, without digit classes."),
        );

    let optimize = Command::new("optimize")
        .about("Minimize a pattern")
        .arg(arg!(<PATTERN> "Pattern to optimize"))
        .arg(priority_arg());

    let bench = Command::new("bench")
        .about("Time matches of a pattern and print a JSON report")
        .arg(arg!(<PATTERN> "Pattern to benchmark"))
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .value_name("TEXT")
                .help("Text matched against the pattern."),
        )
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .short('n')
                .value_parser(value_parser!(usize))
                .help("Override the configured number of match attempts."),
        );

    let info = Command::new("info")
        .about("Show Unicode data of a code point")
        .arg(arg!(<CODEPOINT> "Code point, e.g. `0x41`, `U+0041` or `` `A ``"));

    let config = Command::new("config").about("Print the effective configuration");

    Command::new("regen")
        .about("Generate and optimize regular expressions for Unicode code point sets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands([pattern, literals, optimize, bench, info, config])
        .arg(
            Arg::new("config")
                .long("config")
                .alias("c")
                .value_names(["key", "value"])
                .num_args(2)
                .action(ArgAction::Append)
                .help("Set a configuration key."),
        )
        .arg(
            Arg::new("config-file")
                .long("config-file")
                .alias("cf")
                .action(ArgAction::Append)
                .help("Read configuration from a TOML file."),
        )
        .arg(
            Arg::new("no-banner")
                .global(true)
                .long("no-banner")
                .alias("nb")
                .action(ArgAction::SetTrue)
                .help("Do not print banner"),
        )
        .arg(
            arg!(--"logging-level" <LEVEL> "Set logging level")
                .global(true)
                .alias("ll")
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        )
        .arg(
            Arg::new("verbose")
                .global(true)
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .conflicts_with("logging-level")
                .help(
                    "Increase log verbosity, (-v =: 1, -vv =: 2, ...)\n\
                     1=error, 2=warn, 3=info, 4=debug, 5=trace, 6=off",
                ),
        )
}

pub fn get_matches() -> ArgMatches {
    let matches = build_command().get_matches();

    if !matches.get_flag("no-banner") {
        print_copyright("This is Regen,");
    }
    match matches.get_one::<String>("logging-level") {
        Some(level) => {
            set_env_var("RUST_LOG", level);
        }
        None => match matches.get_count("verbose") {
            0 => {}
            1 => set_env_var("RUST_LOG", "error"),
            2 => set_env_var("RUST_LOG", "warn"),
            3 => set_env_var("RUST_LOG", "info"),
            4 => set_env_var("RUST_LOG", "debug"),
            5 => set_env_var("RUST_LOG", "trace"),
            6 => set_env_var("RUST_LOG", "off"),
            _ => set_env_var("RUST_LOG", "trace"),
        },
    }

    env_logger::init();
    log::info!(
        "Logging info: {}",
        get_env_var("RUST_LOG").unwrap_or("<DEFAULT>".to_string())
    );

    matches
}

/// `--config-file` and `--config` layers in command-line order.
pub fn config_layers(m: &ArgMatches) -> Vec<ConfigLayer> {
    let mut layers: Vec<(usize, ConfigLayer)> = Vec::new();
    if let (Some(files), Some(indices)) =
        (m.get_many::<String>("config-file"), m.indices_of("config-file"))
    {
        layers.extend(zip(indices, files.map(|f| ConfigLayer::File(f.clone()))));
    }
    if let (Some(settings), Some(indices)) =
        (m.get_occurrences::<String>("config"), m.indices_of("config"))
    {
        let settings = settings.filter_map(|mut kv| {
            let key = kv.next()?.clone();
            let value = kv.next()?.clone();
            Some(ConfigLayer::Setting { key, value })
        });
        layers.extend(zip(indices.step_by(2), settings));
    }
    layers.sort_by_key(|(i, _)| *i);
    layers.into_iter().map(|(_, layer)| layer).collect()
}

pub fn get_config(m: &ArgMatches) -> anyhow::Result<RegenConfig> {
    load_config(config_layers(m)).context("Cannot parse configs")
}

fn priority(m: &ArgMatches, config: &RegenConfig) -> anyhow::Result<Priority> {
    match m.get_one::<String>("priority") {
        Some(p) => Ok(p.parse()?),
        None => Ok(config.priority),
    }
}

fn values<'m>(m: &'m ArgMatches, id: &str) -> impl Iterator<Item = &'m String> {
    m.get_many::<String>(id).into_iter().flatten()
}

pub fn command_pattern(m: &ArgMatches, config: &RegenConfig) -> anyhow::Result<String> {
    let ucd = BuiltinUnicode::new();
    let mut set = CodePointSet::new();
    for text in values(m, "chars") {
        set = &set | &CodePointSet::from_text(text);
    }
    for item in values(m, "range") {
        let range = parse_code_point_range(item)
            .with_context(|| format!("Invalid code point range '{}'", item))?;
        set.insert(range);
    }
    for name in values(m, "category") {
        set = &set | &ucd.category_set(name)?;
    }
    for name in values(m, "script") {
        set = &set | &ucd.script_set(name)?;
    }
    for name in values(m, "block") {
        set = &set | &ucd.property_set(BLOCKS_FILE, name)?;
    }
    if m.get_flag("complement") {
        set = set.complement();
    }
    log::debug!("Generating a pattern for {} code points", set.len());

    let priority = priority(m, config)?;
    let generator = config.generator();
    if config.optimize || m.get_flag("optimize") {
        Ok(generator.generate_optimized(&set, priority)?)
    } else {
        Ok(generator.generate_pattern(&set, priority))
    }
}

pub fn command_literals(m: &ArgMatches, config: &RegenConfig) -> anyhow::Result<String> {
    let strings = values(m, "STRINGS").collect::<Vec<_>>();
    let generator = config.generator();
    Ok(if m.get_flag("alternation") {
        generator.create_alternation(&strings)
    } else {
        generator.create_optimized_pattern(&strings)
    })
}

pub fn command_optimize(m: &ArgMatches, config: &RegenConfig) -> anyhow::Result<String> {
    let pattern = m
        .get_one::<String>("PATTERN")
        .context("Missing pattern")?;
    let priority = priority(m, config)?;
    Optimizer::new()
        .optimize_pattern(pattern, priority)
        .with_context(|| format!("Cannot optimize pattern '{}'", pattern))
}

pub fn command_bench(m: &ArgMatches, config: &RegenConfig) -> anyhow::Result<String> {
    let pattern = m
        .get_one::<String>("PATTERN")
        .context("Missing pattern")?;
    let input = m.get_one::<String>("input").context("Missing input")?;
    let iterations = m
        .get_one::<usize>("iterations")
        .copied()
        .unwrap_or(config.iterations);
    let report = Optimizer::new().benchmark_pattern(pattern, input, iterations);
    serde_json::to_string_pretty(&report).context("Cannot serialize benchmark report")
}

pub fn command_info(m: &ArgMatches) -> anyhow::Result<String> {
    let text = m
        .get_one::<String>("CODEPOINT")
        .context("Missing code point")?;
    let cp = code_point(parse_num(text)?)?;
    let ucd = BuiltinUnicode::new();
    let category = ucd.category_of(cp)?;
    let or_dash = |value: types::Result<String>| value.unwrap_or_else(|_| "-".to_string());

    let mut lines = vec![format!("U+{:04X} {}", cp, or_dash(ucd.name_of(cp)))];
    lines.push(format!(
        "category: {} ({})",
        category,
        unicode::category_name(category).unwrap_or("-")
    ));
    lines.push(format!("script: {}", ucd.script_of(cp)?));
    lines.push(format!(
        "block: {}",
        or_dash(ucd.block_of(cp).map(str::to_string))
    ));
    lines.push(format!(
        "decimal: {}",
        or_dash(ucd.decimal_value(cp).map(|d| d.to_string()))
    ));
    Ok(lines.join("\n"))
}

pub fn command_config(config: &RegenConfig) -> anyhow::Result<String> {
    config.to_toml().context("Cannot serialize configs")
}

/// Dispatch the subcommand of `m`, returning what it prints.
pub fn run(m: &ArgMatches) -> anyhow::Result<String> {
    let config = get_config(m)?;
    match m.subcommand() {
        Some(("pattern", sub)) => command_pattern(sub, &config),
        Some(("literals", sub)) => command_literals(sub, &config),
        Some(("optimize", sub)) => command_optimize(sub, &config),
        Some(("bench", sub)) => command_bench(sub, &config),
        Some(("info", sub)) => command_info(sub),
        Some(("config", _)) => command_config(&config),
        Some((name, _)) => bail!("Unknown subcommand '{}'", name),
        None => bail!("No subcommand given"),
    }
}
