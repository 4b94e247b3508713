//! One-pass formatting of a text or HTML reference list.

use anyhow::{Context, Result};
use tracing::info;

use refstyle_core::InputFormat;
use refstyle_core::pipeline::{process_html, process_text};

use super::context::{
    build_lookup, join_lines, load_journals, matcher, read_input, retrieval, write_output,
};
use crate::app_config::{FileConfig, RunSettings};
use crate::cli::FormatArgs;

pub async fn run_format_command(args: &FormatArgs, file_config: Option<&FileConfig>) -> Result<()> {
    let settings = RunSettings::resolve(
        file_config,
        Some(&args.journals),
        Some(&args.style),
        None,
    )?;
    let input = read_input(args.io.input.as_deref())?;
    let format = if args.html {
        InputFormat::Html
    } else {
        args.io
            .input
            .as_deref()
            .map_or(InputFormat::Text, InputFormat::from_path)
    };

    let journals = load_journals(&settings)?;
    let lookup = build_lookup(&settings)?;
    let doi_retrieval = retrieval(lookup.as_ref(), &settings);

    let output = match format {
        InputFormat::Text => {
            let lines = process_text(
                &input,
                &settings.options,
                matcher(journals.as_ref()),
                doi_retrieval,
            )
            .await;
            info!(entries = lines.len(), "Formatted reference list");
            join_lines(&lines)
        }
        InputFormat::Html => process_html(
            &input,
            &settings.options,
            matcher(journals.as_ref()),
            doi_retrieval,
        )
        .await
        .context("Failed to process HTML reference list")?,
    };

    write_output(args.io.output.as_deref(), &output)
}
