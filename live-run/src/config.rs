// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for live-run.
//!
//! The config is layered: the default config shipped with this crate comes first, and a
//! repository-specific `.config/live-run.toml` (or an explicitly passed file) overrides it.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

/// Overall configuration for live-run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LiveRunConfig {
    display: DisplayConfig,
}

impl LiveRunConfig {
    /// The default location of the config within a directory.
    pub const CONFIG_PATH: &'static str = ".config/live-run.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from `.config/live-run.toml` under
    /// `root`.
    ///
    /// An explicitly specified file must exist. If no file is specified and `root` doesn't contain
    /// `.config/live-run.toml`, the default config is used.
    pub fn from_sources(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (path, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let path = root.join(Self::CONFIG_PATH);
                let source = File::new(path.as_str(), FileFormat::Toml).required(false);
                (path, source)
            }
        };
        tracing::debug!("reading live-run config from {path}");

        let builder = Self::make_default_config().add_source(source);
        Self::build(&builder).map_err(|kind| ConfigParseError::new(Some(path), kind))
    }

    /// Parses a config from a TOML string, layered on top of the default config.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(&builder).map_err(|kind| ConfigParseError::new(None, kind))
    }

    /// Returns the display settings.
    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build(builder: &ConfigBuilder<DefaultState>) -> Result<Self, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;
        let inner: LiveRunConfigImpl = serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))?;

        let display = inner.display;
        if display.clock_start >= display.clock_end {
            return Err(ConfigParseErrorKind::InvalidClockRange {
                start: display.clock_start,
                end: display.clock_end,
            });
        }

        Ok(Self { display })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LiveRunConfigImpl {
    display: DisplayConfig,
}

/// Settings for [`Run::display_name`](crate::run::Run::display_name).
///
/// The defaults reproduce the display names producers and consumers already agree on: the clock
/// time is read from a fixed character range of the start time, and the connection label is the
/// connection name minus a fixed-length prefix.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// The first character of the clock time within the start time.
    pub clock_start: usize,

    /// One past the last character of the clock time within the start time.
    pub clock_end: usize,

    /// The number of characters dropped from the front of the connection name.
    pub connection_prefix_len: usize,

    /// The label used when there's no connection name.
    pub missing_connection_label: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            clock_start: 11,
            clock_end: 19,
            connection_prefix_len: 15,
            missing_connection_label: "n/a".to_owned(),
        }
    }
}
