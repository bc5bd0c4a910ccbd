/* config.rs
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

use config::{Config, ConfigError, File, FileFormat};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::generator::RegexGenerator;
use crate::optimizer::DEFAULT_ITERATIONS;
use crate::types::Priority;

pub const PRELUDE_CONFIG: &str = include_str!("prelude-config.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegenConfig {
    pub priority: Priority,
    /// Run the optimizer over generated patterns.
    pub optimize: bool,
    /// Match attempts per benchmark.
    pub iterations: usize,
    /// Remember generated patterns per set and priority.
    pub cache: bool,
}

impl Default for RegenConfig {
    fn default() -> Self {
        RegenConfig {
            priority: Priority::Size,
            optimize: false,
            iterations: DEFAULT_ITERATIONS,
            cache: true,
        }
    }
}

impl RegenConfig {
    pub fn generator(&self) -> RegexGenerator {
        RegexGenerator::with_cache(self.cache)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// One layer on top of the prelude, applied in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    File(String),
    Setting { key: String, value: String },
}

/// Prelude, then every layer in turn; later layers win.
pub fn load_config<I>(layers: I) -> Result<RegenConfig, ConfigError>
where
    I: IntoIterator<Item = ConfigLayer>,
{
    let mut config =
        Config::builder().add_source(File::from_str(PRELUDE_CONFIG, FileFormat::Toml));
    for layer in layers {
        debug!("Adding config layer {:?}", layer);
        config = match layer {
            ConfigLayer::File(path) => config.add_source(File::new(&path, FileFormat::Toml)),
            ConfigLayer::Setting { key, value } => {
                let text = format!("'{}' = \"\"\"{}\"\"\"", key, value);
                config.add_source(File::from_str(&text, FileFormat::Toml))
            }
        };
    }
    config.build()?.try_deserialize()
}
