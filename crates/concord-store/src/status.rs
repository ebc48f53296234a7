//! Lifecycle state of one source's annotation set

use concord_core::errors::{ExError, ExErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Annotation set status as stored in `annotation_sets.status`
///
/// Only `Finished` sets are compared by default; `Ignore` marks sets an
/// administrator excluded from curation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatus {
    New,
    InProgress,
    Finished,
    Ignore,
}

impl SetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetStatus::New => "new",
            SetStatus::InProgress => "in_progress",
            SetStatus::Finished => "finished",
            SetStatus::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for SetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetStatus {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "new" => Ok(SetStatus::New),
            "in_progress" => Ok(SetStatus::InProgress),
            "finished" => Ok(SetStatus::Finished),
            "ignore" => Ok(SetStatus::Ignore),
            other => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_status")
                .with_message(format!(
                    "Unknown annotation set status '{}' (expected new, in_progress, finished or ignore)",
                    other
                ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!("In-Progress".parse::<SetStatus>().unwrap(), SetStatus::InProgress);
        assert_eq!("FINISHED".parse::<SetStatus>().unwrap(), SetStatus::Finished);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "done".parse::<SetStatus>().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_display_matches_column_values() {
        for status in [
            SetStatus::New,
            SetStatus::InProgress,
            SetStatus::Finished,
            SetStatus::Ignore,
        ] {
            assert_eq!(status.to_string().parse::<SetStatus>().unwrap(), status);
        }
    }
}
