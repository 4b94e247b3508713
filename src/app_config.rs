//! Application configuration loading for CLI defaults.
//!
//! Values are layered: built-in defaults, then the config file, then CLI
//! flags. [`RunSettings::resolve`] performs the merge.

use std::env;
use std::fs;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use refstyle_core::Brackets;
use refstyle_core::lookup::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_LOOKUP_TIMEOUT_SECS};
use refstyle_core::pipeline::DEFAULT_LOOKUP_CONCURRENCY;
use refstyle_core::style::{STYLE_OPTION_KEYS, StyleOptions};

use crate::cli::{JournalArgs, StyleArgs};

/// TOML-backed file configuration for refstyle defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Style option assignments, in file order.
    pub style: Vec<(String, String)>,
    /// Bracket pair for annotated files.
    pub brackets: Option<Brackets>,
    /// Journal table replacing the bundled one.
    pub journal_table: Option<PathBuf>,
    /// Recognize journal names at all.
    pub journal_matching: Option<bool>,
    /// Contact address for the Crossref polite pool.
    pub crossref_mailto: Option<String>,
    /// Minimum title similarity in percent (0..=100).
    pub fuzzy_threshold: Option<u8>,
    /// Crossref request timeout in seconds (1..=300).
    pub lookup_timeout_secs: Option<u64>,
    /// DOI lookups in flight (1..=16).
    pub lookup_concurrency: Option<u8>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.fuzzy_threshold
            && threshold > 100
        {
            bail!("Invalid config value for `fuzzy_threshold`: {threshold}. Expected range: 0..=100");
        }
        if let Some(timeout) = self.lookup_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            bail!("Invalid config value for `lookup_timeout_secs`: {timeout}. Expected range: 1..=300");
        }
        if let Some(concurrency) = self.lookup_concurrency
            && !(1..=16).contains(&concurrency)
        {
            bail!("Invalid config value for `lookup_concurrency`: {concurrency}. Expected range: 1..=16");
        }
        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    fn empty(path: Option<PathBuf>) -> Self {
        Self {
            path,
            config: None,
            loaded_from_file: false,
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/refstyle/config.toml`
/// 2. `$HOME/.config/refstyle/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("refstyle")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("refstyle")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config selected on the command line.
///
/// An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>, disabled: bool) -> Result<LoadedConfig> {
    if disabled {
        return Ok(LoadedConfig::empty(None));
    }
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
            loaded_from_file: true,
        });
    }
    load_default_file_config()
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig::empty(path));
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig::empty(path));
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    let mut style_check = StyleOptions::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "brackets" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `brackets` value on line {line_number}")
                })?;
                cfg.brackets = Some(parsed.parse::<Brackets>().with_context(|| {
                    format!("Invalid `brackets` value on line {line_number}")
                })?);
            }
            "journal_table" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `journal_table` value on line {line_number}")
                })?;
                cfg.journal_table = Some(PathBuf::from(parsed));
            }
            "journal_matching" => {
                let parsed = parse_boolean(value).with_context(|| {
                    format!("Invalid `journal_matching` value on line {line_number}")
                })?;
                cfg.journal_matching = Some(parsed);
            }
            "crossref_mailto" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `crossref_mailto` value on line {line_number}")
                })?;
                cfg.crossref_mailto = Some(parsed);
            }
            "fuzzy_threshold" => {
                let parsed = parse_unsigned::<u8>(value).with_context(|| {
                    format!("Invalid `fuzzy_threshold` value on line {line_number}")
                })?;
                cfg.fuzzy_threshold = Some(parsed);
            }
            "lookup_timeout_secs" => {
                let parsed = parse_unsigned::<u64>(value).with_context(|| {
                    format!("Invalid `lookup_timeout_secs` value on line {line_number}")
                })?;
                cfg.lookup_timeout_secs = Some(parsed);
            }
            "lookup_concurrency" => {
                let parsed = parse_unsigned::<u8>(value).with_context(|| {
                    format!("Invalid `lookup_concurrency` value on line {line_number}")
                })?;
                cfg.lookup_concurrency = Some(parsed);
            }
            style_key if STYLE_OPTION_KEYS.contains(&style_key) => {
                let parsed = parse_style_value(value);
                style_check.set(style_key, &parsed).with_context(|| {
                    format!("Invalid `{style_key}` value on line {line_number}")
                })?;
                cfg.style.push((style_key.to_string(), parsed));
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    raw_value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .context("Expected double-quoted string")
}

/// Style values may be quoted labels or bare words (`true`, `en-dash`).
fn parse_style_value(raw_value: &str) -> String {
    parse_string_literal(raw_value).unwrap_or_else(|_| raw_value.to_string())
}

/// Parses a bare unsigned integer; signs, quotes and trailing tokens are rejected.
fn parse_unsigned<T>(raw_value: &str) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    let token = raw_value.trim();
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        bail!("Expected a non-negative integer, got '{token}'");
    }
    token
        .parse::<T>()
        .with_context(|| format!("Integer value out of range: {token}"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    raw_value
        .trim()
        .parse::<bool>()
        .map_err(|_| anyhow::anyhow!("Expected 'true' or 'false'"))
}

// ==================== Effective Settings ====================

/// Settings for one run after layering defaults, file config and CLI flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub options: StyleOptions,
    pub brackets: Brackets,
    pub journal_table: Option<PathBuf>,
    pub journal_matching: bool,
    pub crossref_mailto: Option<String>,
    pub fuzzy_threshold: u8,
    pub lookup_timeout: Duration,
    pub lookup_concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            options: StyleOptions::default(),
            brackets: Brackets::default(),
            journal_table: None,
            journal_matching: true,
            crossref_mailto: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

impl RunSettings {
    /// Merges file config and CLI flags over the built-in defaults.
    pub fn resolve(
        file: Option<&FileConfig>,
        journals: Option<&JournalArgs>,
        style: Option<&StyleArgs>,
        brackets: Option<Brackets>,
    ) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(file) = file {
            for (key, value) in &file.style {
                settings.options.set(key, value)?;
            }
            if let Some(file_brackets) = file.brackets {
                settings.brackets = file_brackets;
            }
            settings.journal_table.clone_from(&file.journal_table);
            if let Some(matching) = file.journal_matching {
                settings.journal_matching = matching;
            }
            settings.crossref_mailto.clone_from(&file.crossref_mailto);
            if let Some(threshold) = file.fuzzy_threshold {
                settings.fuzzy_threshold = threshold;
            }
            if let Some(timeout) = file.lookup_timeout_secs {
                settings.lookup_timeout = Duration::from_secs(timeout);
            }
            if let Some(concurrency) = file.lookup_concurrency {
                settings.lookup_concurrency = usize::from(concurrency);
            }
        }

        if let Some(journals) = journals {
            if journals.no_journals {
                settings.journal_matching = false;
            }
            if let Some(path) = &journals.journal_table {
                settings.journal_table = Some(path.clone());
                settings.journal_matching = true;
            }
        }

        if let Some(style) = style {
            for (key, value) in &style.set {
                settings
                    .options
                    .set(key, value)
                    .with_context(|| format!("Invalid --set {key}={value}"))?;
            }
            if let Some(mode) = style.crossref {
                settings.options.crossref = mode;
            }
            if let Some(mailto) = &style.mailto {
                settings.crossref_mailto = Some(mailto.clone());
            }
            if let Some(threshold) = style.fuzzy_threshold {
                settings.fuzzy_threshold = threshold;
            }
            if let Some(concurrency) = style.lookup_concurrency {
                settings.lookup_concurrency = usize::from(concurrency);
            }
        }

        if let Some(cli_brackets) = brackets {
            settings.brackets = cli_brackets;
        }

        Ok(settings)
    }
}
