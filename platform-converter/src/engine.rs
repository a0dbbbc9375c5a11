//! Platform patch engine: converts one archive
//!
//! A conversion runs in fixed stages, each depending on the previous one:
//!
//! 1. open the archive in its stored (compressed) form
//! 2. decompress it fully into memory, closing the source file
//! 3. load the serialized file it carries and resolve its class database
//! 4. overwrite the target platform in the serialized file's metadata
//! 5. reserialize the serialized file
//! 6. write the archive uncompressed, with the new serialized file, to a
//!    uniquely named staging file
//! 7. reopen the staging file and recompress it to the destination
//! 8. delete the staging file
//!
//! Every failure is turned into a [`SkipReason`] at this boundary.

use crate::job::{ConversionJob, ConversionResult, Outcome, SkipReason};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use unity_bundle::{
    AssetsManager, BuildTarget, Bundle, CompressionType, Error, Replacement, Result, WriteOptions,
};

const STAGING_PREFIX: &str = ".upc-stage-";
const OUTPUT_PREFIX: &str = ".upc-out-";

/// Settings shared by every conversion of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Directory for the uncompressed staging files
    pub staging_dir: PathBuf,
    /// Codec for the converted archive
    pub compression: CompressionType,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            compression: CompressionType::Lz4,
        }
    }
}

/// Converts archives using one library session.
///
/// The session is torn down when the engine is dropped.
#[derive(Debug)]
pub struct PatchEngine {
    session: AssetsManager,
    options: EngineOptions,
}

impl PatchEngine {
    /// Create an engine that owns `session`
    pub fn new(session: AssetsManager, options: EngineOptions) -> Self {
        Self { session, options }
    }

    /// Library session used by this engine
    pub fn session(&self) -> &AssetsManager {
        &self.session
    }

    /// Convert one archive. Never fails; problems become a skipped result.
    pub fn convert(&mut self, job: ConversionJob) -> ConversionResult {
        let converted = self.try_convert(&job);
        // Handles are closed by now; only the bookkeeping remains
        self.session.release_bundles();

        let outcome = match converted {
            Ok((bytes_written, previous_platform)) => Outcome::Success {
                bytes_written,
                previous_platform,
            },
            Err(e) => {
                log::debug!("Skipping {}: {e}", job.source.display());
                Outcome::Skipped(SkipReason::from_error(&e))
            }
        };
        ConversionResult { job, outcome }
    }

    fn try_convert(&mut self, job: &ConversionJob) -> Result<(u64, BuildTarget)> {
        let bundle = self
            .session
            .load_bundle(&job.source)?
            .decompress_to_memory()?;

        let index = bundle
            .serialized_file_index()
            .ok_or_else(|| Error::NodeNotFound("bundle has no nodes".to_string()))?;
        let mut assets = self.session.load_assets_file(&bundle, index)?;
        if self
            .session
            .load_class_database(assets.unity_version())
            .is_none()
        {
            log::warn!(
                "No class database for engine {} ({}), patching header only",
                assets.unity_version(),
                job.source.display()
            );
        }

        let previous = BuildTarget(assets.target_platform());
        assets.set_target_platform(job.target_platform.code());
        log::debug!(
            "{}: platform {} -> {}",
            job.display_name(),
            previous,
            job.target_platform
        );

        let replacement = Replacement::new(bundle.nodes()[index].path.clone(), assets.serialize()?);

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".bundle")
            .tempfile_in(&self.options.staging_dir)?;
        let result = self.stage_and_recompress(&bundle, replacement, staging.path(), job);
        drop(bundle);

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            log::warn!(
                "Failed to delete staging file {}: {e}",
                staging_path.display()
            );
        }

        result.map(|bytes| (bytes, previous))
    }

    fn stage_and_recompress(
        &mut self,
        bundle: &Bundle,
        replacement: Replacement,
        staging_path: &Path,
        job: &ConversionJob,
    ) -> Result<u64> {
        {
            let file = std::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(staging_path)?;
            let mut writer = BufWriter::new(file);
            let staged = bundle.write_with_replacements(
                &mut writer,
                &[replacement],
                &WriteOptions::uncompressed(),
            )?;
            log::trace!("Staged {staged} bytes at {}", staging_path.display());
        }

        let staged = self.session.load_bundle(staging_path)?;

        // Recompress next to the destination, then move into place
        let mut output = tempfile::Builder::new()
            .prefix(OUTPUT_PREFIX)
            .tempfile_in(job.destination_dir())?;
        let written = {
            let mut writer = BufWriter::new(output.as_file_mut());
            staged.pack(&mut writer, self.options.compression)?
        };
        output.as_file().sync_all()?;
        persist(output, &job.destination)?;

        Ok(written)
    }
}

impl Drop for PatchEngine {
    fn drop(&mut self) {
        self.session.unload_all();
    }
}

fn persist(file: NamedTempFile, destination: &Path) -> Result<()> {
    file.persist(destination).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
