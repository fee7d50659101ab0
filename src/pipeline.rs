//! Streaming filter pipeline
//!
//! Runs one input file through the policy evaluator and appends accepted
//! lines to the output in batches. Single-threaded; memory use is bounded by
//! the batch capacity whatever the input size.

use std::path::Path;
use std::time::Instant;

use crate::encoding::LineSource;
use crate::error::Result;
use crate::evaluator::PolicyEvaluator;
use crate::output::{BatchedWriter, DEFAULT_BATCH_SIZE};
use crate::policy::Policy;
use crate::progress::{create_progress_bar, format_number, print_info, RunStatistics};

use bytesize::ByteSize;
use colored::*;

/// Progress bar refresh interval, in lines
const PROGRESS_STEP: u64 = 16 * 1024;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Accepted lines held in memory before a flush
    pub batch_size: usize,
    /// Suppress console output
    pub quiet: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            quiet: false,
        }
    }
}

pub struct FilterPipeline {
    evaluator: PolicyEvaluator,
    options: PipelineOptions,
}

impl FilterPipeline {
    pub fn new(policy: Policy, options: PipelineOptions) -> Result<Self> {
        Ok(Self {
            evaluator: PolicyEvaluator::new(policy)?,
            options,
        })
    }

    /// Filter `input` into `output`.
    ///
    /// Accepted lines are appended in input order, each exactly once. The
    /// first I/O error aborts the run; batches flushed before it stay on disk.
    pub fn run(&self, input: &Path, output: &Path) -> Result<RunStatistics> {
        let start = Instant::now();
        let source = LineSource::open(input)?;

        // Counted from the mapping the scan below walks, so no rewind is needed
        let expected = crate::scanner::count_records(source.bytes());

        log::info!(
            "filtering {:?} ({}) into {:?}",
            input,
            source.encoding().name,
            output
        );
        if !self.options.quiet {
            print_info(&format!(
                "Processing {:?} ({})",
                input,
                ByteSize(source.len() as u64)
            ));
            print_info(&format!("Total passwords to process: {}", format_number(expected)));
        }

        let pb = if self.options.quiet {
            indicatif::ProgressBar::hidden()
        } else {
            create_progress_bar(expected, "Filtering...")
        };

        let mut writer = BatchedWriter::new(output.to_path_buf(), self.options.batch_size);
        let mut total = 0u64;
        let mut valid = 0u64;

        for line in source.lines() {
            total += 1;

            if self.evaluator.is_valid(&source.decode(line)) {
                writer.append(line)?;
                valid += 1;
            }

            if total % PROGRESS_STEP == 0 {
                pb.set_position(total);
            }
        }

        let written = writer.finish()?;
        pb.set_position(total);
        pb.finish_with_message("Complete".green().to_string());

        debug_assert_eq!(total, expected);
        debug_assert_eq!(written, valid);
        log::info!("{} of {} lines accepted from {:?}", valid, total, input);
        log::debug!("{} batches flushed to {:?}", writer.flushes(), output);

        Ok(RunStatistics {
            total_lines: total,
            valid_lines: valid,
            bytes_written: writer.bytes_written(),
            elapsed: start.elapsed(),
        })
    }
}

/// Filter `input` into `output` with default options and no console output
pub fn run(input: &Path, policy: Policy, output: &Path) -> Result<RunStatistics> {
    let options = PipelineOptions {
        quiet: true,
        ..PipelineOptions::default()
    };
    FilterPipeline::new(policy, options)?.run(input, output)
}
