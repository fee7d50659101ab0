//! Command-line interface definition for policy-filter
//!
//! Resolves the policy, the input (one dictionary or "merge all") and the
//! output location before the filtering core runs.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::merge::DEFAULT_MERGE_NAME;
use crate::output::DEFAULT_BATCH_SIZE;
use crate::policy::{Policy, DEFAULT_SPECIAL_CHARS};

/// Filter password dictionaries against a complexity policy
#[derive(Parser, Debug, Clone)]
#[command(
    name = "policy-filter",
    author = "m0h1nd4",
    version,
    about = "Filter password dictionaries against a complexity policy",
    long_about = r#"
Keep only the candidate passwords that satisfy a complexity policy:
a minimum length and minimum counts of uppercase characters, digits and
special characters. Dictionaries are streamed, so files far larger than
RAM are fine. Several dictionaries can be merged and deduplicated first.

EXAMPLES:
    # At least 12 characters, 1 uppercase, 2 digits, 1 of !@#
    policy-filter -i dict/rockyou.txt --min-length 12 --min-digits 2 --special-chars '!@#'

    # Merge every dictionary in ./dict, deduplicate, then filter
    policy-filter -i dict --merge-all

    # Reuse a saved policy
    policy-filter -i dict/rockyou.txt --policy config_corp.json

POLICY FILE FORMAT:
    {
      "min_length": 12,
      "min_uppercase": 1,
      "min_special_chars": 1,
      "special_chars": "!@#$%^&*()_-",
      "min_digits": 2
    }
"#,
    after_help = "For more information, visit: https://github.com/m0h1nd4/policy-filter"
)]
pub struct Args {
    /// Dictionary file, or dictionary directory with --merge-all
    #[arg(short, long, value_name = "PATH", default_value = "dict")]
    pub input: PathBuf,

    /// Merge and deduplicate every dictionary in the input directory first
    #[arg(short, long, default_value_t = false)]
    pub merge_all: bool,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,

    /// Name of the filtered output file
    #[arg(long, value_name = "NAME", default_value = "filtered_passwords.txt")]
    pub output_name: String,

    /// Name of the merge file written with --merge-all
    #[arg(long, value_name = "NAME", default_value = DEFAULT_MERGE_NAME)]
    pub merge_name: String,

    /// Replace an existing output file instead of picking a new name
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Load the policy from a JSON file (threshold flags are ignored)
    #[arg(short, long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Save the effective policy to a JSON file
    #[arg(long, value_name = "FILE")]
    pub save_policy: Option<PathBuf>,

    /// Minimum password length
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub min_length: usize,

    /// Minimum number of uppercase characters
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub min_uppercase: usize,

    /// Minimum number of special characters
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub min_special: usize,

    /// Characters that count as special
    #[arg(long, value_name = "CHARS", default_value = DEFAULT_SPECIAL_CHARS)]
    pub special_chars: String,

    /// Minimum number of digits
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub min_digits: usize,

    /// Accepted lines buffered in memory between writes
    #[arg(long, value_name = "LINES", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Write buffer for the merge file (e.g. "1MB")
    #[arg(long, value_name = "SIZE", default_value = "1MB")]
    pub buffer_size: String,

    /// Extensions of dictionaries to merge, comma separated (default: all files)
    #[arg(long, value_name = "EXT", default_value = "")]
    pub extensions: String,

    /// Look for dictionaries in subdirectories too
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// How merge workers share the set of unique lines
    #[arg(long, value_enum, default_value_t = MergeStrategy::Sharded)]
    pub strategy: MergeStrategy,

    /// Sort the merge file
    #[arg(long, default_value_t = false)]
    pub sort: bool,

    /// Number of threads (default: auto-detect)
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// How concurrent merge workers accumulate distinct lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergeStrategy {
    /// One lock around a single set
    Locked,
    /// Lines hashed across independently locked shards
    Sharded,
    /// Workers send lines over a channel to one owning thread
    FanIn,
}

impl Args {
    /// The policy to enforce: from `--policy` if given, else from the flags
    pub fn build_policy(&self) -> anyhow::Result<Policy> {
        let policy = match self.policy {
            Some(ref path) => Policy::load(path)?,
            None => {
                // An empty alphabet is only meaningful without a special minimum
                let alphabet = if self.min_special == 0 { "" } else { self.special_chars.as_str() };
                Policy::new(
                    self.min_length,
                    self.min_uppercase,
                    self.min_special,
                    alphabet,
                    self.min_digits,
                )?
            }
        };
        Ok(policy)
    }

    /// Parse buffer size string to bytes
    pub fn parse_buffer_size(&self) -> anyhow::Result<usize> {
        parse_size(&self.buffer_size)
    }

    /// Parse file extensions to merge
    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Parse human-readable size string to bytes
fn parse_size(size_str: &str) -> anyhow::Result<usize> {
    let size_str = size_str.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(n) = size_str.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = size_str.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = size_str.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = size_str.strip_suffix('B') {
        (n, 1)
    } else {
        (size_str.as_str(), 1)
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size format: '{}'", size_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Invalid size: '{}' is too large", size_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("policy-filter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.input, PathBuf::from("dict"));
        assert_eq!(args.output, PathBuf::from("output"));
        assert_eq!(args.batch_size, 50_000);
        assert_eq!(args.strategy, MergeStrategy::Sharded);
        assert!(!args.merge_all);
    }

    #[test]
    fn test_policy_from_flags() {
        let args = parse(&[
            "--min-length", "12", "--min-uppercase", "2", "--min-special", "1",
            "--special-chars", "-_", "--min-digits", "3",
        ]);

        let policy = args.build_policy().unwrap();
        assert_eq!(policy.min_length, 12);
        assert_eq!(policy.min_uppercase, 2);
        assert_eq!(policy.special_chars, vec!['-', '_']);
        assert_eq!(policy.min_digits, 3);
    }

    #[test]
    fn test_zero_special_minimum_clears_alphabet() {
        let policy = parse(&["--min-special", "0"]).build_policy().unwrap();
        assert!(policy.special_chars.is_empty());
    }

    #[test]
    fn test_empty_alphabet_with_minimum_rejected() {
        assert!(parse(&["--special-chars", ""]).build_policy().is_err());
    }

    #[test]
    fn test_policy_file_wins_over_flags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"min_length": 20, "special_chars": []}"#).unwrap();

        let args = parse(&["--policy", path.to_str().unwrap(), "--min-length", "4"]);
        let policy = args.build_policy().unwrap();

        assert_eq!(policy.min_length, 20);
        assert_eq!(policy.min_uppercase, 0);
    }

    #[test]
    fn test_strategy_values() {
        assert_eq!(parse(&["--strategy", "fan-in"]).strategy, MergeStrategy::FanIn);
        assert_eq!(parse(&["--strategy", "locked"]).strategy, MergeStrategy::Locked);
    }

    #[test]
    fn test_get_extensions() {
        let args = parse(&["--extensions", "TXT, .lst,,dic"]);
        assert_eq!(args.get_extensions(), vec!["txt", "lst", "dic"]);
        assert!(parse(&[]).get_extensions().is_empty());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64MB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("8GB").unwrap(), 8 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1024KB").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("99999999999GB").is_err());
        assert!(parse_size(&format!("{}KB", usize::MAX)).is_err());
    }
}
