//! Batch orchestration: discovery, worker threads and reporting
//!
//! A run loads the class package once, builds one job per input file and
//! drives a [`PatchEngine`] over them. Parallel runs split the jobs with the
//! [`Partitioner`] and give every worker thread its own engine and library
//! session; the only thing the threads share is the progress reporter.

use crate::config::ConvertConfig;
use crate::engine::{EngineOptions, PatchEngine};
use crate::job::{ConversionJob, ConversionResult, Outcome};
use crate::partition::Partitioner;
use crate::utils::{create_progress_bar, format_bytes, format_elapsed};
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use unity_bundle::{AssetsManager, BuildTarget, ClassPackage};

/// Totals of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Per-job results, ordered by source path
    pub results: Vec<ConversionResult>,
    /// Worker threads used
    pub workers: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Number of jobs that produced an output
    pub fn converted(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of skipped jobs
    pub fn skipped(&self) -> usize {
        self.results.len() - self.converted()
    }

    /// Whether every job succeeded
    pub fn is_complete(&self) -> bool {
        self.skipped() == 0
    }

    /// Final line shown to the user
    pub fn summary_line(&self) -> String {
        match self.skipped() {
            0 => "all complete".to_string(),
            n => format!("completed with {n} skipped"),
        }
    }
}

/// Per-job console output shared by all workers
struct Reporter {
    bar: ProgressBar,
    silent: bool,
}

// Progress and summary lines are the tool's console output
#[allow(clippy::print_stdout)]
impl Reporter {
    fn new(total: usize, silent: bool) -> Self {
        Self {
            bar: create_progress_bar(total as u64, "Converting", silent),
            silent,
        }
    }

    fn report(&self, result: &ConversionResult) {
        if !self.silent {
            let line = match &result.outcome {
                Outcome::Success {
                    bytes_written,
                    previous_platform,
                } => format!(
                    "Converted {} ({} -> {}, {})",
                    result.job.display_name(),
                    previous_platform,
                    result.job.target_platform,
                    format_bytes(*bytes_written)
                ),
                Outcome::Skipped(reason) => {
                    format!("Skipped {}: {reason}", result.job.display_name())
                }
            };
            self.bar.suspend(|| println!("{line}"));
        }
        self.bar.inc(1);
    }

    fn finish(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        if !self.silent {
            println!(
                "{} ({} converted in {})",
                summary.summary_line(),
                summary.converted(),
                format_elapsed(summary.elapsed)
            );
        }
    }
}

/// Run a conversion batch described by `config`.
///
/// Fails only for problems that stop the whole run (unloadable class
/// package, unreadable input directory, worker panic); individual archives
/// that cannot be converted are reported as skipped in the summary.
pub fn run(config: &ConvertConfig) -> Result<BatchSummary> {
    run_with(config, &Partitioner::new())
}

/// [`run`] with an explicit partitioner
pub fn run_with(config: &ConvertConfig, partitioner: &Partitioner) -> Result<BatchSummary> {
    let start = Instant::now();

    let package = ClassPackage::load(&config.class_package).with_context(|| {
        format!(
            "Failed to load class package {}",
            config.class_package.display()
        )
    })?;

    ensure_output_differs(&config.input, &config.output)?;

    let jobs = if config.directory_mode {
        discover_jobs(&config.input, &config.output, config.target_platform)?
    } else {
        vec![ConversionJob::new(
            &config.input,
            &config.output,
            config.target_platform,
        )]
    };

    log::info!(
        "Converting {} file(s) to platform {}",
        jobs.len(),
        config.target_platform
    );

    let reporter = Reporter::new(jobs.len(), config.silent);
    let options = config.engine_options();

    let (mut results, workers) = if config.directory_mode && config.threads > 1 {
        let partitions = partitioner.split(jobs, config.threads);
        let workers = partitions.len();
        (
            run_parallel(partitions, &package, &options, &reporter)?,
            workers,
        )
    } else {
        (run_partition(jobs, package, &options, &reporter), 1)
    };

    results.sort_by(|a, b| a.job.source.cmp(&b.job.source));
    let summary = BatchSummary {
        results,
        workers,
        elapsed: start.elapsed(),
    };

    log::info!(
        "{} converted, {} skipped, {} worker(s)",
        summary.converted(),
        summary.skipped(),
        summary.workers
    );
    reporter.finish(&summary);

    Ok(summary)
}

/// Refuse outputs that would replace their own sources.
///
/// Applies to both files and directories; an output that does not exist yet
/// cannot be the input.
fn ensure_output_differs(input: &Path, output: &Path) -> Result<()> {
    let (Ok(input_real), Ok(output_real)) = (fs::canonicalize(input), fs::canonicalize(output))
    else {
        return Ok(());
    };
    if input_real == output_real {
        bail!(
            "Output {} is the same location as input {}; converted files would replace their sources",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

/// One job per regular file in `input`, sorted by file name
fn discover_jobs(input: &Path, output: &Path, platform: BuildTarget) -> Result<Vec<ConversionJob>> {
    let entries = fs::read_dir(input)
        .with_context(|| format!("Failed to read input directory {}", input.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read input directory {}", input.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            log::debug!("Ignoring non-file entry {}", path.display());
        }
    }
    files.sort();

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    Ok(files
        .into_iter()
        .filter_map(|source| {
            let name = source.file_name()?.to_owned();
            Some(ConversionJob::new(source, output.join(name), platform))
        })
        .collect())
}

/// Convert a partition on the calling thread with a fresh session
fn run_partition(
    jobs: Vec<ConversionJob>,
    package: ClassPackage,
    options: &EngineOptions,
    reporter: &Reporter,
) -> Vec<ConversionResult> {
    let mut engine = PatchEngine::new(AssetsManager::new(package), options.clone());
    jobs.into_iter()
        .map(|job| {
            let result = engine.convert(job);
            reporter.report(&result);
            result
        })
        .collect()
}

/// One named thread per partition, joined before returning
fn run_parallel(
    partitions: Vec<Vec<ConversionJob>>,
    package: &ClassPackage,
    options: &EngineOptions,
    reporter: &Reporter,
) -> Result<Vec<ConversionResult>> {
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(partitions.len());
        for (index, jobs) in partitions.into_iter().enumerate() {
            let package = package.clone();
            log::debug!("Worker {index}: {} job(s)", jobs.len());
            let handle = thread::Builder::new()
                .name(format!("convert-{index}"))
                .spawn_scoped(scope, move || run_partition(jobs, package, options, reporter))
                .with_context(|| format!("Failed to spawn worker {index}"))?;
            handles.push(handle);
        }

        let mut results = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(partition_results) => results.extend(partition_results),
                Err(_) => bail!("Worker {index} panicked"),
            }
        }
        Ok(results)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use unity_bundle::test_utils::sample_bundle;

    fn write_package(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("classdata.yaml");
        fs::write(
            &path,
            "databases:\n  - version: \"2019.4.*\"\n    classes: []\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_summary_line() {
        let job = ConversionJob::new("a", "b", BuildTarget::ANDROID);
        let ok = ConversionResult {
            job: job.clone(),
            outcome: Outcome::Success {
                bytes_written: 1,
                previous_platform: BuildTarget::WEBGL,
            },
        };
        let skipped = ConversionResult {
            job,
            outcome: Outcome::Skipped(crate::job::SkipReason::Io("gone".into())),
        };

        let mut summary = BatchSummary {
            results: vec![ok.clone(), ok],
            workers: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.summary_line(), "all complete");
        assert!(summary.is_complete());

        summary.results.push(skipped);
        assert_eq!(summary.summary_line(), "completed with 1 skipped");
        assert_eq!(summary.converted(), 2);
    }

    #[test]
    fn test_discovery_sorted_and_files_only() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["c.bundle", "a.bundle", "b.bundle"] {
            fs::write(input.path().join(name), b"x").unwrap();
        }
        fs::create_dir(input.path().join("nested")).unwrap();

        let out_dir = output.path().join("converted");
        let jobs = discover_jobs(input.path(), &out_dir, BuildTarget::WEBGL).unwrap();
        let names: Vec<_> = jobs.iter().map(|j| j.display_name().into_owned()).collect();
        assert_eq!(names, ["a.bundle", "b.bundle", "c.bundle"]);
        assert_eq!(jobs[0].destination, out_dir.join("a.bundle"));
        assert!(out_dir.is_dir());
    }

    #[test]
    fn test_missing_class_package_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.bundle");
        let output = dir.path().join("out.bundle");
        sample_bundle(5).write_to(&input).unwrap();

        let mut config = ConvertConfig::single_file(&input, &output, BuildTarget::ANDROID);
        config.class_package = dir.path().join("missing.yaml");
        config.silent = true;

        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("class package"), "{err}");
        assert!(!output.exists());
    }

    #[test]
    fn test_unreadable_input_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = ConvertConfig::directory(
            dir.path().join("absent"),
            dir.path().join("out"),
            BuildTarget::ANDROID,
        );
        config.class_package = write_package(dir.path());
        config.silent = true;

        assert!(run(&config).is_err());
    }

    #[test]
    fn test_output_same_as_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        let source = input.join("a.bundle");
        sample_bundle(5).write_to(&source).unwrap();
        let original = fs::read(&source).unwrap();
        let package = write_package(dir.path());

        // same directory, spelled differently
        let mut config =
            ConvertConfig::directory(&input, input.join("."), BuildTarget::ANDROID);
        config.class_package = package.clone();
        config.silent = true;
        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("same location"), "{err}");

        // same file in single-file mode
        let mut config = ConvertConfig::single_file(&source, &source, BuildTarget::ANDROID);
        config.class_package = package;
        config.silent = true;
        assert!(run(&config).is_err());

        assert_eq!(fs::read(&source).unwrap(), original);
        assert_eq!(fs::read_dir(&input).unwrap().count(), 1);
    }

    #[test]
    fn test_parallel_run_uses_capped_workers() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        for i in 0..3 {
            sample_bundle(5)
                .write_to(input.join(format!("{i}.bundle")))
                .unwrap();
        }

        let mut config =
            ConvertConfig::directory(&input, dir.path().join("out"), BuildTarget::ANDROID);
        config.class_package = write_package(dir.path());
        config.staging_dir = dir.path().to_path_buf();
        config.threads = 8;
        config.silent = true;

        let summary = run_with(&config, &Partitioner::with_max_workers(8)).unwrap();
        assert_eq!(summary.workers, 3);
        assert_eq!(summary.converted(), 3);
        assert!(summary.is_complete());
    }
}
