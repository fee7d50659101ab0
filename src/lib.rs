//! # Policy Filter
//!
//! Prune large password dictionaries down to the candidates that satisfy a
//! complexity policy.
//!
//! ## Features
//!
//! - **Policy filtering**: minimum length plus minimum uppercase, digit and
//!   special-character counts, with a configurable special alphabet
//! - **Streaming**: memory-mapped input and batched appends keep memory flat
//!   for files of any size
//! - **Merge**: concurrent deduplicating merge of many dictionaries
//! - **Encoding aware**: lines are classified as UTF-8 when they are valid
//!   UTF-8 and through the detected encoding otherwise; output keeps the
//!   input bytes
//!
//! ## Usage
//!
//! ```bash
//! # Keep passwords of 12+ characters with an uppercase, a digit and a symbol
//! policy-filter -i dict/rockyou.txt --min-length 12
//!
//! # Merge everything in ./dict first
//! policy-filter -i dict --merge-all
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use policy_filter::pipeline::{FilterPipeline, PipelineOptions};
//! use policy_filter::policy::Policy;
//! use std::path::Path;
//!
//! let policy = Policy::new(12, 1, 1, "!@#$%^&*()_-", 1).unwrap();
//! let pipeline = FilterPipeline::new(policy, PipelineOptions::default()).unwrap();
//! let stats = pipeline
//!     .run(Path::new("dict/rockyou.txt"), Path::new("output/filtered.txt"))
//!     .unwrap();
//! println!("{} of {} kept", stats.valid_lines, stats.total_lines);
//! ```

pub mod cli;
pub mod dedup;
pub mod encoding;
pub mod error;
pub mod evaluator;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod scanner;

pub use cli::Args;
pub use error::FilterError;
pub use evaluator::PolicyEvaluator;
pub use merge::{MergeOptions, Merger};
pub use pipeline::{FilterPipeline, PipelineOptions};
pub use policy::Policy;
pub use progress::RunStatistics;
