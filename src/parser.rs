//! Extraction of transfer metrics from rclone's statistics block.
//!
//! rclone prints a block like the following, possibly several times during
//! a long transfer; only the last occurrence of each line is of interest.
//!
//! ```text
//! Transferred:        1.234 GB / 1.234 GB, 100%, 2.0 MB/s, ETA 0s
//! Errors:                 0
//! Checks:                12 / 12, 100%
//! Transferred:           42 / 42, 100%
//! Elapsed time:        3m4s
//! ```
//!
//! Older releases print the summary as `Transferred: 1.234 GBytes (2.0 MBytes/s)`
//! and `Checks: 12` with nothing after the count. Both shapes are handled by
//! the patterns below: lines that don't fit a pattern simply don't contribute.

use std::sync::LazyLock;

use fancy_regex::{Captures, Regex};

use crate::types::TransferResult;

const SIZE_PATTERN: &str = r"(?m)Transferred:[ \t]+([0-9]+\.[0-9]+ \w\w)";
const AVG_RATE_PATTERN: &str =
    r"(?m)Transferred:[ \t]+([0-9]+\.[0-9]+ \w\w)\w* \(([0-9]+\.[0-9]+ \w\w)";
const ERRORS_PATTERN: &str = r"(?m)Errors:[ \t]+(\d+)[ \t\r]*$";
const CHECKS_PATTERN: &str = r"(?m)Checks:[ \t]+(\d+)[ \t\r]*$";
const NUM_OBJECTS_PATTERN: &str = r"(?m)Transferred:[ \t]+(\d+)[ \t\r]*$";
const DURATION_PATTERN: &str = r"(?m)Elapsed time:[ \t]+(.+?)[ \t\r]*$";

static DEFAULT_PARSER: LazyLock<TransferOutputParser> =
    LazyLock::new(|| TransferOutputParser::new().expect("built-in metric patterns are valid"));

/// Parse the transfer tool's textual output into a [`TransferResult`].
///
/// Never fails: a metric that cannot be found is `None`.
pub fn parse_transfer_output(output: &str) -> TransferResult {
    DEFAULT_PARSER.parse(output)
}

/// Compiled metric patterns.
pub struct TransferOutputParser {
    size: Regex,
    avg_rate: Regex,
    errors: Regex,
    checks: Regex,
    num_objects: Regex,
    duration: Regex,
}

impl TransferOutputParser {
    pub fn new() -> Result<Self, fancy_regex::Error> {
        Ok(TransferOutputParser {
            size: Regex::new(SIZE_PATTERN)?,
            avg_rate: Regex::new(AVG_RATE_PATTERN)?,
            errors: Regex::new(ERRORS_PATTERN)?,
            checks: Regex::new(CHECKS_PATTERN)?,
            num_objects: Regex::new(NUM_OBJECTS_PATTERN)?,
            duration: Regex::new(DURATION_PATTERN)?,
        })
    }

    pub fn parse(&self, output: &str) -> TransferResult {
        let result = TransferResult {
            size: last_capture(&self.size, output, 1),
            avg_rate: last_match(&self.avg_rate, output)
                .and_then(|captures| captures.get(2))
                .map(|rate| format!("{}/s", rate.as_str())),
            duration: last_capture(&self.duration, output, 1),
            errors: last_capture(&self.errors, output, 1),
            checks: last_capture(&self.checks, output, 1),
            num_objects: last_capture(&self.num_objects, output, 1),
        };

        if result.is_empty() {
            tracing::debug!(
                output_length = output.len(),
                "No transfer metrics found in output."
            );
        }

        result
    }
}

fn last_match<'t>(regex: &Regex, text: &'t str) -> Option<Captures<'t>> {
    // A match that hits the backtrack limit is treated like no match.
    regex.captures_iter(text).filter_map(Result::ok).last()
}

fn last_capture(regex: &Regex, text: &str, group: usize) -> Option<String> {
    last_match(regex, text)
        .and_then(|captures| captures.get(group))
        .map(|m| m.as_str().to_string())
}
