//! Concurrent merge and deduplication
//!
//! One rayon task per input file streams its lines into a shared
//! [`UniqueLineSet`]. The merge waits for every task, then writes the distinct
//! lines once to the merge file. A file that cannot be read is reported and
//! skipped; only the final write can fail the merge.

use crossbeam_channel::{bounded, Sender};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::cli::MergeStrategy;
use crate::dedup::{create_line_set, UniqueLineSet};
use crate::encoding::LineSource;
use crate::error::{FilterError, Result};
use crate::output::ensure_output_dir;
use crate::progress::{create_bytes_progress_bar, print_warning};

use colored::*;

/// Lines per message in fan-in mode
const CHUNK_LINES: usize = 4096;

/// Messages buffered between workers and the consolidating thread
const CHANNEL_DEPTH: usize = 64;

/// Default merge file name
pub const DEFAULT_MERGE_NAME: &str = "dicts_merged.txt";

/// Merge configuration
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Where the deduplicated lines are written
    pub output_path: PathBuf,
    pub strategy: MergeStrategy,
    /// Shard count for [`MergeStrategy::Sharded`]
    pub shards: usize,
    /// Write buffer for the merge file
    pub buffer_size: usize,
    /// Sort the merge output instead of leaving set order
    pub sort: bool,
    pub quiet: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output").join(DEFAULT_MERGE_NAME),
            strategy: MergeStrategy::Sharded,
            shards: num_cpus::get() * 4,
            buffer_size: 1024 * 1024,
            sort: false,
            quiet: false,
        }
    }
}

/// Outcome of a merge
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub path: PathBuf,
    pub files_read: u64,
    pub files_failed: u64,
    /// Lines read across all inputs, duplicates included
    pub lines_read: u64,
    pub unique_lines: u64,
    pub elapsed: Duration,
}

#[derive(Default)]
struct MergeCounters {
    files_read: AtomicU64,
    files_failed: AtomicU64,
    lines_read: AtomicU64,
}

pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Merge `inputs` into one file of distinct lines
    pub fn merge(&self, inputs: &[PathBuf]) -> Result<MergeReport> {
        let start = Instant::now();
        let counters = MergeCounters::default();

        let total_bytes: u64 = inputs
            .iter()
            .map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            .sum();
        let pb = if self.options.quiet {
            indicatif::ProgressBar::hidden()
        } else {
            create_bytes_progress_bar(total_bytes, "Merging...")
        };

        log::info!(
            "merging {} files with {:?} strategy",
            inputs.len(),
            self.options.strategy
        );

        let set = match self.options.strategy {
            MergeStrategy::FanIn => self.collect_fan_in(inputs, &counters, &pb),
            strategy => {
                let set = create_line_set(strategy, self.options.shards);
                inputs.par_iter().for_each(|path| {
                    self.read_worker(path, &counters, &pb, |line| {
                        set.insert(line);
                    });
                });
                set
            }
        };

        pb.finish_with_message("Merged".green().to_string());

        let unique_lines = self.write_merged(set)?;

        Ok(MergeReport {
            path: self.options.output_path.clone(),
            files_read: counters.files_read.load(Ordering::Relaxed),
            files_failed: counters.files_failed.load(Ordering::Relaxed),
            lines_read: counters.lines_read.load(Ordering::Relaxed),
            unique_lines,
            elapsed: start.elapsed(),
        })
    }

    /// Workers send chunks of lines to one thread that owns the set
    fn collect_fan_in(
        &self,
        inputs: &[PathBuf],
        counters: &MergeCounters,
        pb: &indicatif::ProgressBar,
    ) -> Box<dyn UniqueLineSet> {
        let set = create_line_set(MergeStrategy::FanIn, self.options.shards);
        let (tx, rx) = bounded::<Vec<Vec<u8>>>(CHANNEL_DEPTH);

        std::thread::scope(|scope| {
            let consolidator = scope.spawn(move || {
                for chunk in rx {
                    for line in chunk {
                        set.insert(&line);
                    }
                }
                set
            });

            inputs.par_iter().for_each_with(tx, |tx, path| {
                let mut chunk = Vec::with_capacity(CHUNK_LINES);
                self.read_worker(path, counters, pb, |line| {
                    chunk.push(line.to_vec());
                    if chunk.len() >= CHUNK_LINES {
                        let full = std::mem::replace(&mut chunk, Vec::with_capacity(CHUNK_LINES));
                        send_chunk(tx, full, path);
                    }
                });
                if !chunk.is_empty() {
                    send_chunk(tx, chunk, path);
                }
            });

            consolidator
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    /// Stream one file into `sink`. Failures are reported, never propagated.
    fn read_worker<F>(&self, path: &Path, counters: &MergeCounters, pb: &indicatif::ProgressBar, mut sink: F)
    where
        F: FnMut(&[u8]),
    {
        match LineSource::open(path) {
            Ok(source) => {
                let mut lines = 0u64;
                for line in source.lines() {
                    sink(line);
                    lines += 1;
                }

                counters.files_read.fetch_add(1, Ordering::Relaxed);
                counters.lines_read.fetch_add(lines, Ordering::Relaxed);
                pb.inc(source.len() as u64);
                log::debug!("read {} lines from {:?}", lines, path);
            }
            Err(e) => {
                counters.files_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("skipping {:?}: {}", path, e);
                if !self.options.quiet {
                    pb.suspend(|| print_warning(&format!("Skipped dictionary: {}", e)));
                }
            }
        }
    }

    /// Write every line of the set to the merge file, replacing any old file
    fn write_merged(&self, set: Box<dyn UniqueLineSet>) -> Result<u64> {
        let path = &self.options.output_path;
        if let Some(parent) = path.parent() {
            ensure_output_dir(parent)?;
        }

        let mut lines = set.into_lines();
        if self.options.sort {
            lines.sort_unstable();
        }

        let file = File::create(path).map_err(|e| FilterError::open(path, e))?;
        let mut writer = BufWriter::with_capacity(self.options.buffer_size.max(1), file);

        for line in &lines {
            writer
                .write_all(line)
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| FilterError::write(path, e))?;
        }
        writer.flush().map_err(|e| FilterError::write(path, e))?;

        log::info!("wrote {} unique lines to {:?}", lines.len(), path);
        Ok(lines.len() as u64)
    }
}

/// Hand a chunk to the consolidating thread. Returns false, after logging
/// the loss, if that thread is gone.
fn send_chunk(tx: &Sender<Vec<Vec<u8>>>, chunk: Vec<Vec<u8>>, path: &Path) -> bool {
    match tx.send(chunk) {
        Ok(()) => true,
        Err(e) => {
            log::warn!(
                "consolidator stopped, {} lines from {:?} were dropped",
                e.into_inner().len(),
                path
            );
            false
        }
    }
}

/// Merge `inputs` into `output_path` with default options and no console output
pub fn merge(inputs: &[PathBuf], output_path: &Path) -> Result<PathBuf> {
    let merger = Merger::new(MergeOptions {
        output_path: output_path.to_path_buf(),
        quiet: true,
        ..MergeOptions::default()
    });
    Ok(merger.merge(inputs)?.path)
}

/// List the dictionaries under `dir`.
///
/// Keeps regular files whose extension is in `extensions` (all files when
/// empty), sorted by path. `exclude` is left out, so a merge file written
/// into the input directory is never read back.
pub fn collect_inputs(
    dir: &Path,
    extensions: &[String],
    recursive: bool,
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FilterError::open(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };
    let exclude = exclude.and_then(|p| fs::canonicalize(p).ok());

    let mut files = Vec::new();
    for entry in walker.into_iter() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            FilterError::read(path, e.into())
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        if !extensions.is_empty() {
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.contains(&e.to_lowercase()))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }

        if let Some(ref exclude) = exclude {
            if fs::canonicalize(path).ok().as_ref() == Some(exclude) {
                continue;
            }
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    const STRATEGIES: [MergeStrategy; 3] =
        [MergeStrategy::Locked, MergeStrategy::Sharded, MergeStrategy::FanIn];

    fn read_set(path: &Path) -> BTreeSet<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn set_of(lines: &[&str]) -> BTreeSet<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_send_chunk_reports_closed_channel() {
        let (tx, rx) = bounded::<Vec<Vec<u8>>>(1);
        let path = Path::new("dict.txt");

        assert!(send_chunk(&tx, vec![b"a".to_vec()], path));
        assert_eq!(rx.recv().unwrap(), vec![b"a".to_vec()]);

        drop(rx);
        assert!(!send_chunk(&tx, vec![b"b".to_vec()], path));
    }

    fn options(dir: &Path, strategy: MergeStrategy) -> MergeOptions {
        MergeOptions {
            output_path: dir.join("output").join(DEFAULT_MERGE_NAME),
            strategy,
            shards: 4,
            buffer_size: 64,
            sort: false,
            quiet: true,
        }
    }

    fn write_dicts(dir: &Path) -> Vec<PathBuf> {
        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        std::fs::write(&a, "alpha\nbeta\nalpha\ngamma\n").unwrap();
        std::fs::write(&b, "beta\ndelta\r\nepsilon").unwrap();
        vec![a, b]
    }

    #[test]
    fn test_merge_union_without_duplicates() {
        for strategy in STRATEGIES {
            let temp_dir = TempDir::new().unwrap();
            let inputs = write_dicts(temp_dir.path());

            let report = Merger::new(options(temp_dir.path(), strategy)).merge(&inputs).unwrap();

            let content = std::fs::read_to_string(&report.path).unwrap();
            assert_eq!(content.lines().count(), 5, "{:?}", strategy);
            assert_eq!(
                read_set(&report.path),
                set_of(&["alpha", "beta", "gamma", "delta", "epsilon"])
            );
            assert_eq!(report.files_read, 2);
            assert_eq!(report.files_failed, 0);
            assert_eq!(report.lines_read, 7);
            assert_eq!(report.unique_lines, 5);
        }
    }

    #[test]
    fn test_merge_same_file_twice() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_dicts(temp_dir.path());

        let once = merge(&inputs[..1], &temp_dir.path().join("once.txt")).unwrap();
        let twice = merge(
            &[inputs[0].clone(), inputs[0].clone()],
            &temp_dir.path().join("twice.txt"),
        )
        .unwrap();

        assert_eq!(read_set(&once), read_set(&twice));
        assert_eq!(read_set(&once), set_of(&["alpha", "beta", "gamma"]));
    }

    #[test]
    fn test_merge_tolerates_unreadable_input() {
        for strategy in STRATEGIES {
            let temp_dir = TempDir::new().unwrap();
            let mut inputs = write_dicts(temp_dir.path());
            inputs.insert(1, temp_dir.path().join("missing.txt"));

            let report = Merger::new(options(temp_dir.path(), strategy)).merge(&inputs).unwrap();

            assert_eq!(report.files_read, 2);
            assert_eq!(report.files_failed, 1);
            assert_eq!(
                read_set(&report.path),
                set_of(&["alpha", "beta", "gamma", "delta", "epsilon"])
            );
        }
    }

    #[test]
    fn test_merge_sorted_output() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_dicts(temp_dir.path());
        let mut opts = options(temp_dir.path(), MergeStrategy::Sharded);
        opts.sort = true;

        let report = Merger::new(opts).merge(&inputs).unwrap();

        assert_eq!(
            std::fs::read_to_string(&report.path).unwrap(),
            "alpha\nbeta\ndelta\nepsilon\ngamma\n"
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_dicts(temp_dir.path());

        let first = merge(&inputs, &temp_dir.path().join("first.txt")).unwrap();
        let second = merge(&inputs, &temp_dir.path().join("second.txt")).unwrap();

        assert_eq!(read_set(&first), read_set(&second));
    }

    #[test]
    fn test_repeated_merges_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut inputs = Vec::new();
        let mut expected = BTreeSet::new();

        // Six overlapping files
        for f in 0..6 {
            let path = temp_dir.path().join(format!("dict{}.txt", f));
            let lines: Vec<String> = (f * 300..f * 300 + 600).map(|i| format!("pw{}", i)).collect();
            expected.extend(lines.iter().cloned());
            std::fs::write(&path, lines.join("\n")).unwrap();
            inputs.push(path);
        }

        for strategy in STRATEGIES {
            for trial in 0..20 {
                let report = Merger::new(options(temp_dir.path(), strategy)).merge(&inputs).unwrap();
                assert_eq!(report.unique_lines, expected.len() as u64, "{:?} trial {}", strategy, trial);
                assert_eq!(read_set(&report.path), expected);
            }
        }
    }

    #[test]
    fn test_merge_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_dicts(temp_dir.path());
        let mut opts = options(temp_dir.path(), MergeStrategy::Locked);
        // The merge target is an existing directory
        opts.output_path = temp_dir.path().to_path_buf();

        assert!(Merger::new(opts).merge(&inputs).is_err());
    }

    #[test]
    fn test_collect_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("b.txt"), "x\n").unwrap();
        std::fs::write(dir.join("a.lst"), "y\n").unwrap();
        std::fs::write(dir.join("merged.txt"), "z\n").unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub").join("c.txt"), "w\n").unwrap();

        let all = collect_inputs(dir, &[], false, Some(&dir.join("merged.txt"))).unwrap();
        assert_eq!(all, vec![dir.join("a.lst"), dir.join("b.txt")]);

        let txt = collect_inputs(dir, &["txt".to_string()], true, None).unwrap();
        assert_eq!(
            txt,
            vec![dir.join("b.txt"), dir.join("merged.txt"), dir.join("sub").join("c.txt")]
        );
    }

    #[test]
    fn test_collect_inputs_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(collect_inputs(&temp_dir.path().join("dict"), &[], false, None).is_err());
    }
}
