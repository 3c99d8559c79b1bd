/// Site status definitions for tracking indexing progress
///
/// A full run moves every configured site into `Indexing`; the site then
/// settles in `Indexed` or `Failed`. A failed site re-enters `Indexing` on
/// the next full run.
use std::fmt;

/// Lifecycle stage of a site's index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    /// Crawl or page indexing is in progress
    Indexing,

    /// The last full run completed; the site is searchable
    Indexed,

    /// The last run failed or was stopped
    Failed,
}

impl SiteStatus {
    /// Returns true if the site may be searched
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Indexed)
    }

    /// Returns true if `next` is a legal successor of this status
    ///
    /// Any status may restart at `Indexing`; only `Indexing` may settle.
    pub fn can_transition_to(&self, next: SiteStatus) -> bool {
        match next {
            Self::Indexing => true,
            Self::Indexed | Self::Failed => matches!(self, Self::Indexing),
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_indexed_is_searchable() {
        assert!(SiteStatus::Indexed.is_searchable());
        assert!(!SiteStatus::Indexing.is_searchable());
        assert!(!SiteStatus::Failed.is_searchable());
    }

    #[test]
    fn test_transitions() {
        assert!(SiteStatus::Indexing.can_transition_to(SiteStatus::Indexed));
        assert!(SiteStatus::Indexing.can_transition_to(SiteStatus::Failed));
        assert!(SiteStatus::Failed.can_transition_to(SiteStatus::Indexing));
        assert!(SiteStatus::Indexed.can_transition_to(SiteStatus::Indexing));

        assert!(!SiteStatus::Failed.can_transition_to(SiteStatus::Indexed));
        assert!(!SiteStatus::Indexed.can_transition_to(SiteStatus::Failed));
    }

    #[test]
    fn test_db_string_roundtrip() {
        for status in [SiteStatus::Indexing, SiteStatus::Indexed, SiteStatus::Failed] {
            assert_eq!(SiteStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(SiteStatus::from_db_string("indexing"), None);
    }
}
