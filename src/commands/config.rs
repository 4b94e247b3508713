//! Config command handler: show effective configuration.

use anyhow::Result;

use refstyle_core::style::STYLE_OPTION_KEYS;

use crate::app_config::{LoadedConfig, RunSettings};

pub fn run_config_show_command(loaded_config: &LoadedConfig) -> Result<()> {
    let effective = RunSettings::resolve(loaded_config.config.as_ref(), None, None, None)?;

    let resolved_path = loaded_config.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded_config.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    for key in STYLE_OPTION_KEYS {
        if let Some(value) = effective.options.get(key) {
            println!("{key} = {value}");
        }
    }
    println!("brackets = {}", effective.brackets);
    println!(
        "journal_table = {}",
        effective
            .journal_table
            .as_ref()
            .map_or_else(|| "<bundled>".to_string(), |path| path.display().to_string())
    );
    println!("journal_matching = {}", effective.journal_matching);
    println!(
        "crossref_mailto = {}",
        effective.crossref_mailto.as_deref().unwrap_or("<none>")
    );
    println!("fuzzy_threshold = {}", effective.fuzzy_threshold);
    println!("lookup_timeout_secs = {}", effective.lookup_timeout.as_secs());
    println!("lookup_concurrency = {}", effective.lookup_concurrency);

    Ok(())
}
