//! Step 1 of the review workflow: write bracket-annotated references.

use anyhow::Result;
use tracing::info;

use refstyle_core::pipeline::annotate_text;

use super::context::{join_lines, load_journals, matcher, read_input, write_output};
use crate::app_config::{FileConfig, RunSettings};
use crate::cli::AnnotateArgs;

pub fn run_annotate_command(args: &AnnotateArgs, file_config: Option<&FileConfig>) -> Result<()> {
    let settings = RunSettings::resolve(file_config, Some(&args.journals), None, args.brackets)?;
    let input = read_input(args.io.input.as_deref())?;
    let journals = load_journals(&settings)?;

    let lines = annotate_text(&input, settings.brackets, matcher(journals.as_ref()));
    info!(entries = lines.len(), brackets = %settings.brackets, "Annotated reference list");
    write_output(args.io.output.as_deref(), &join_lines(&lines))
}
