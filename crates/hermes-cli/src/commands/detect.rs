//! Detect command implementation.

use crate::cli::DetectArgs;
use crate::error::convert_ingest_error;
use crate::output::OutputFormatter;
use anyhow::Result;

pub fn execute(args: &DetectArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let format = hermes_core::detect_file(&args.archive, args.filename.as_deref())
        .map_err(|e| convert_ingest_error(e, &args.archive))?;

    formatter.format_detection(&args.archive, format)
}
