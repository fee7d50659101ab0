//! Policy evaluation
//!
//! Decides whether a single line satisfies a [`Policy`]. Evaluation is a pure
//! function of the line and the policy, so one evaluator can be shared by any
//! number of threads.

use ahash::RandomState;
use hashbrown::HashSet;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use crate::policy::{Policy, PolicyError};

/// Per-class character counts for one line
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CharClassCounts {
    /// Number of characters (Unicode scalar values)
    pub length: usize,
    pub uppercase: usize,
    pub digits: usize,
    pub special: usize,
}

impl CharClassCounts {
    /// Count character classes in a single pass.
    ///
    /// Classes are tried in the order uppercase, digit, special; a character
    /// counts toward the first class it matches and never more than one.
    /// Characters outside all three classes only contribute to `length`.
    ///
    /// Uppercase means general category Lu and digit means Nd, so `Ⓐ`, `²`
    /// and `½` are neither.
    pub fn tally<F>(line: &str, is_special: F) -> Self
    where
        F: Fn(char) -> bool,
    {
        let mut counts = Self::default();

        for c in line.chars() {
            counts.length += 1;
            if is_uppercase_letter(c) {
                counts.uppercase += 1;
            } else if is_decimal_digit(c) {
                counts.digits += 1;
            } else if is_special(c) {
                counts.special += 1;
            }
        }

        counts
    }

    /// Check every threshold of `policy`
    #[inline]
    pub fn satisfies(&self, policy: &Policy) -> bool {
        self.length >= policy.min_length
            && self.uppercase >= policy.min_uppercase
            && self.special >= policy.min_special_chars
            && self.digits >= policy.min_digits
    }
}

#[inline]
fn is_uppercase_letter(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_uppercase()
    } else {
        c.general_category() == GeneralCategory::UppercaseLetter
    }
}

#[inline]
fn is_decimal_digit(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_digit()
    } else {
        c.general_category() == GeneralCategory::DecimalNumber
    }
}

/// Evaluator with the special alphabet indexed for constant-time lookup
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    policy: Policy,
    special: HashSet<char, RandomState>,
}

impl PolicyEvaluator {
    pub fn new(policy: Policy) -> Result<Self, PolicyError> {
        policy.validate()?;

        let mut special = HashSet::with_capacity_and_hasher(
            policy.special_chars.len(),
            RandomState::new(),
        );
        special.extend(policy.special_chars.iter().copied());

        Ok(Self { policy, special })
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn classify(&self, line: &str) -> CharClassCounts {
        CharClassCounts::tally(line, |c| self.special.contains(&c))
    }

    /// Returns true if `line` meets every threshold of the policy
    #[inline]
    pub fn is_valid(&self, line: &str) -> bool {
        self.classify(line).satisfies(&self.policy)
    }
}

/// One-off check without building an evaluator.
///
/// Scans the alphabet linearly; prefer [`PolicyEvaluator`] for bulk work.
pub fn is_valid(line: &str, policy: &Policy) -> bool {
    CharClassCounts::tally(line, |c| policy.special_chars.contains(&c)).satisfies(policy)
}
