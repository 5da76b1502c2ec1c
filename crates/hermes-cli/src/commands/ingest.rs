//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::error::convert_ingest_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use hermes_core::ArchiveRequest;
use hermes_core::IngestConfig;
use hermes_core::Ingestor;
use hermes_core::Limits;
use hermes_core::NoopObserver;
use hermes_core::TargetPath;
use tracing::debug;

pub fn execute(args: &IngestArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let config = IngestConfig::new(&args.root)
        .with_context(|| format!("invalid storage root '{}'", args.root.display()))?
        .with_limits(limits(args));
    debug!(
        archive = %args.archive.display(),
        target = %args.target,
        root = %config.storage_root.as_path().display(),
        "starting ingest"
    );
    let ingestor = Ingestor::new(config);

    let outcome = TargetPath::parse(&args.target)
        .and_then(|target| ArchiveRequest::from_file(target, &args.archive, args.filename.clone()))
        .and_then(|request| {
            if show_progress && CliProgress::should_show() {
                let mut progress = CliProgress::new("Ingesting");
                ingestor.ingest_with_observer(request, &mut progress)
            } else {
                ingestor.ingest_with_observer(request, &mut NoopObserver)
            }
        });

    match outcome {
        Ok(result) => formatter.format_ingest_result(&result),
        Err(err) => {
            formatter.format_ingest_error(&err);
            Err(convert_ingest_error(err, &args.archive))
        }
    }
}

fn limits(args: &IngestArgs) -> Limits {
    let defaults = Limits::default();
    Limits {
        max_file_count: args.max_files.unwrap_or(defaults.max_file_count),
        max_total_size: args.max_total_size.unwrap_or(defaults.max_total_size),
        max_file_size: args.max_file_size.unwrap_or(defaults.max_file_size),
        max_path_depth: args
            .max_depth
            .map_or(defaults.max_path_depth, usize::from),
    }
}
