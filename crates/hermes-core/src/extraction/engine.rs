//! Core ingestion engine.

use std::io::Read;
use std::io::Seek;
use std::path::Path;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ExtractionResult;
use crate::IngestConfig;
use crate::IngestObserver;
use crate::NoopObserver;
use crate::Result;
use crate::config::Limits;
use crate::formats::ArchiveReader;
use crate::formats::EntrySource;
use crate::formats::detect::read_leading;
use crate::formats::sniff;
use crate::report::ResultAggregator;
use crate::request::ArchiveRequest;
use crate::security::EntryValidator;
use crate::security::ValidatedEntryType;

use super::materialize::Materializer;
use super::staging::StagedReplacement;
use super::state::RequestState;

/// Ingests archives into a storage root.
///
/// One `Ingestor` can serve any number of requests; it holds only
/// configuration. Requests for different targets are independent. Requests
/// for the same target are not serialized, and the last to commit wins.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::ArchiveRequest;
/// use hermes_core::IngestConfig;
/// use hermes_core::Ingestor;
/// use hermes_core::types::TargetPath;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ingestor = Ingestor::new(IngestConfig::new("/srv/hermes")?);
/// let bytes = std::fs::read("site.tar.gz")?;
/// let target = TargetPath::parse("/deployments/v1")?;
///
/// let result = ingestor.ingest(ArchiveRequest::from_bytes(target, "site.tar.gz", bytes))?;
/// println!("{} paths under {}", result.total_extracted_paths, result.created_path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    /// Creates an engine for the given configuration.
    #[must_use]
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingests one archive, replacing whatever the target held.
    ///
    /// On success the target holds exactly the archive's entries. On any
    /// failure other than [`crate::IngestError::RollbackFailed`] the target
    /// is exactly as it was.
    ///
    /// # Errors
    ///
    /// Any [`crate::IngestError`]; see [`crate::error::ErrorKind`] for the
    /// classification.
    pub fn ingest<R: Read + Seek>(&self, request: ArchiveRequest<R>) -> Result<ExtractionResult> {
        self.ingest_with_observer(request, &mut NoopObserver)
    }

    /// Like [`Ingestor::ingest`], reporting progress to `observer`.
    ///
    /// # Errors
    ///
    /// Same as [`Ingestor::ingest`].
    pub fn ingest_with_observer<R: Read + Seek>(
        &self,
        request: ArchiveRequest<R>,
        observer: &mut dyn IngestObserver,
    ) -> Result<ExtractionResult> {
        let mut state = RequestState::Received;
        let target = request.target().clone();

        let outcome = self.run(request, &mut state, observer);
        if let Err(err) = &outcome {
            let moved = state.advance(RequestState::RolledBack);
            debug_assert!(moved, "request already terminal");
            warn!(
                target = %target,
                error = %err,
                code = err.kind().as_str(),
                "ingestion failed"
            );
        }
        outcome
    }

    /// Runs [`Ingestor::ingest`] on tokio's blocking pool.
    ///
    /// Dropping the returned future does not cancel the work, so a started
    /// request always finishes with a commit or a rollback.
    ///
    /// # Errors
    ///
    /// Same as [`Ingestor::ingest`]. A panicked worker is reported as
    /// [`crate::IngestError::Filesystem`].
    #[cfg(feature = "tokio")]
    pub async fn ingest_blocking<R>(&self, request: ArchiveRequest<R>) -> Result<ExtractionResult>
    where
        R: Read + Seek + Send + 'static,
    {
        let ingestor = self.clone();
        let target = request.target().to_string();
        tokio::task::spawn_blocking(move || ingestor.ingest(request))
            .await
            .map_err(|e| {
                crate::IngestError::filesystem("running ingestion worker", target, std::io::Error::other(e))
            })?
    }

    fn run<R: Read + Seek>(
        &self,
        request: ArchiveRequest<R>,
        state: &mut RequestState,
        observer: &mut dyn IngestObserver,
    ) -> Result<ExtractionResult> {
        let root = &self.config.storage_root;
        let limits = &self.config.limits;
        let (target, filename, mut source, file_size) = request.into_parts();

        let leading = read_leading(&mut source)?;
        let format = sniff(&filename, &leading)?;
        advance(state, RequestState::Sniffed(format));
        debug!(%target, %format, filename = %filename, "format detected");

        StagedReplacement::preflight(root, &target)?;

        advance(state, RequestState::Validating);
        let mut reader = ArchiveReader::open(format, source)?;
        let expected = match reader.manifest() {
            Some(manifest) => {
                let mut validator =
                    EntryValidator::new(limits).reserving_scratch_names(target.is_root());
                for header in manifest {
                    validator.validate_entry(&header.path, &header.kind, header.size)?;
                }
                debug!(
                    entries = manifest.len(),
                    bytes = validator.bytes_declared(),
                    "manifest validated"
                );
                Some(manifest.len())
            }
            None => None,
        };

        advance(state, RequestState::Staging);
        let staged = StagedReplacement::begin(root, &target)?;
        observer.on_start(expected);

        let mut aggregator = ResultAggregator::new();
        if let Err(err) = materialize_entries(
            &mut reader,
            staged.staging_dir(),
            target.is_root(),
            limits,
            &mut aggregator,
            observer,
        ) {
            return Err(staged.abort(err));
        }

        let created_path = staged.commit()?;
        advance(state, RequestState::Committed);
        observer.on_finish();

        info!(
            target = %target,
            format = %format,
            entries = aggregator.total(),
            bytes = file_size,
            "archive ingested"
        );
        Ok(aggregator.finish(created_path, format, filename, file_size))
    }
}

fn advance(state: &mut RequestState, next: RequestState) {
    let moved = state.advance(next);
    debug_assert!(moved, "illegal transition to {next}");
}

/// Validates and writes every entry into `staging`.
fn materialize_entries(
    reader: &mut dyn EntrySource,
    staging: &Path,
    root_target: bool,
    limits: &Limits,
    aggregator: &mut ResultAggregator,
    observer: &mut dyn IngestObserver,
) -> Result<()> {
    let mut validator = EntryValidator::new(limits).reserving_scratch_names(root_target);
    let mut materializer = Materializer::new(staging, limits);

    reader.for_each_entry(&mut |entry| {
        let validated = validator.validate_entry(&entry.path, &entry.kind, entry.size)?;
        let Some(top_level) = validated.safe_path.top_level() else {
            return Ok(());
        };

        observer.on_entry(&entry.path, aggregator.total());
        match validated.entry_type {
            ValidatedEntryType::File { size } => {
                let written = materializer.write_file(&validated.safe_path, size, entry.payload)?;
                observer.on_bytes(written);
            }
            ValidatedEntryType::Directory => {
                materializer.create_directory(&validated.safe_path)?;
            }
            ValidatedEntryType::TargetRoot => return Ok(()),
        }
        aggregator.record(top_level);
        Ok(())
    })
}
