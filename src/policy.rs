//! Password complexity policy
//!
//! A policy is four numeric thresholds plus the alphabet of characters that
//! count as "special". Policies can be stored as JSON; the `special_chars`
//! key accepts either a plain string or an array of Unicode code points.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Alphabet offered when the user asks for special characters but names none
pub const DEFAULT_SPECIAL_CHARS: &str = "!@#$%^&*()_-";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy requires {min_special} special character(s) but the special alphabet is empty")]
    MissingSpecialAlphabet { min_special: usize },

    #[error("invalid code point {0:#x} in special_chars")]
    InvalidCodePoint(u32),

    #[error("failed to access policy file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Complexity thresholds a candidate line must meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyFile", into = "PolicyFile")]
pub struct Policy {
    /// Minimum number of characters
    pub min_length: usize,
    /// Minimum number of uppercase characters
    pub min_uppercase: usize,
    /// Minimum number of characters drawn from `special_chars`
    pub min_special_chars: usize,
    /// Characters that count as special
    pub special_chars: Vec<char>,
    /// Minimum number of digits
    pub min_digits: usize,
}

impl Policy {
    /// Build a policy and check it for consistency
    pub fn new(
        min_length: usize,
        min_uppercase: usize,
        min_special_chars: usize,
        special_chars: &str,
        min_digits: usize,
    ) -> Result<Self, PolicyError> {
        let policy = Self {
            min_length,
            min_uppercase,
            min_special_chars,
            special_chars: special_chars.chars().collect(),
            min_digits,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// A special-character minimum needs a non-empty alphabet to be satisfiable
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_special_chars > 0 && self.special_chars.is_empty() {
            return Err(PolicyError::MissingSpecialAlphabet {
                min_special: self.min_special_chars,
            });
        }
        Ok(())
    }

    /// Load a policy from a JSON file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let data = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| PolicyError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the policy as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), PolicyError> {
        let data = serde_json::to_string_pretty(self).map_err(|source| PolicyError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, data).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Human-readable description, one rule per entry
    pub fn describe(&self) -> Vec<String> {
        let alphabet: String = self.special_chars.iter().collect();
        vec![
            format!("Minimum password length: {}", self.min_length),
            format!("Minimum number of uppercase characters: {}", self.min_uppercase),
            format!("Minimum number of special characters: {}", self.min_special_chars),
            format!("Allowed special characters: {}", alphabet),
            format!("Minimum number of digits: {}", self.min_digits),
        ]
    }
}

/// On-disk shape of a policy
#[derive(Serialize, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    min_length: usize,
    #[serde(default)]
    min_uppercase: usize,
    #[serde(default)]
    min_special_chars: usize,
    #[serde(default)]
    special_chars: Option<SpecialChars>,
    #[serde(default)]
    min_digits: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SpecialChars {
    Text(String),
    CodePoints(Vec<u32>),
}

impl TryFrom<PolicyFile> for Policy {
    type Error = PolicyError;

    fn try_from(file: PolicyFile) -> Result<Self, Self::Error> {
        let special_chars = match file.special_chars {
            None => Vec::new(),
            Some(SpecialChars::Text(s)) => s.chars().collect(),
            Some(SpecialChars::CodePoints(points)) => points
                .into_iter()
                .map(|p| char::from_u32(p).ok_or(PolicyError::InvalidCodePoint(p)))
                .collect::<Result<_, _>>()?,
        };

        let policy = Policy {
            min_length: file.min_length,
            min_uppercase: file.min_uppercase,
            min_special_chars: file.min_special_chars,
            special_chars,
            min_digits: file.min_digits,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl From<Policy> for PolicyFile {
    fn from(policy: Policy) -> Self {
        Self {
            min_length: policy.min_length,
            min_uppercase: policy.min_uppercase,
            min_special_chars: policy.min_special_chars,
            special_chars: Some(SpecialChars::Text(policy.special_chars.into_iter().collect())),
            min_digits: policy.min_digits,
        }
    }
}
