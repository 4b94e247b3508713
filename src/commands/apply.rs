//! Step 2 of the review workflow: format a reviewed annotated file.

use anyhow::Result;
use tracing::info;

use refstyle_core::pipeline::apply_annotated;

use super::context::{
    build_lookup, join_lines, load_journals, matcher, read_input, retrieval, write_output,
};
use crate::app_config::{FileConfig, RunSettings};
use crate::cli::ApplyArgs;

pub async fn run_apply_command(args: &ApplyArgs, file_config: Option<&FileConfig>) -> Result<()> {
    let settings = RunSettings::resolve(
        file_config,
        Some(&args.journals),
        Some(&args.style),
        args.brackets,
    )?;
    let input = read_input(args.io.input.as_deref())?;
    let journals = load_journals(&settings)?;
    let lookup = build_lookup(&settings)?;

    let lines = apply_annotated(
        &input,
        settings.brackets,
        &settings.options,
        matcher(journals.as_ref()),
        retrieval(lookup.as_ref(), &settings),
    )
    .await;
    info!(entries = lines.len(), "Formatted annotated references");
    write_output(args.io.output.as_deref(), &join_lines(&lines))
}
