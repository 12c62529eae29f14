//! IFS Cloud domain clients.

pub mod assets;
pub mod documents;
pub mod fault_reports;
pub mod hse;
pub mod materials;
pub mod meter_readings;
pub mod persons;
pub mod service_contracts;
pub mod sites;
pub mod task_steps;
pub mod time_entries;
pub mod work_orders;

// Re-export commonly used types
pub use assets::AssetsClient;
pub use documents::DocumentsClient;
pub use fault_reports::FaultReportsClient;
pub use hse::HseClient;
pub use materials::MaterialsClient;
pub use meter_readings::MeterReadingsClient;
pub use persons::PersonsClient;
pub use service_contracts::ServiceContractsClient;
pub use sites::SitesClient;
pub use task_steps::TaskStepsClient;
pub use time_entries::TimeEntriesClient;
pub use work_orders::WorkOrdersClient;

use chrono::{SecondsFormat, Utc};

use crate::odata::quote;

/// Current time in the millisecond ISO 8601 form IFS accepts.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `Objversion gt datetime'…'` clause for "modified since" filters.
pub(crate) fn since_clause(since: Option<&str>) -> Option<String> {
    since.map(|s| format!("Objversion gt datetime{}", quote(s)))
}

/// `(contains(A,'t') or contains(B,'t'))` over the given fields.
pub(crate) fn search_clause(fields: &[&str], term: &str) -> String {
    let quoted = quote(term);
    let parts: Vec<String> = fields
        .iter()
        .map(|f| format!("contains({},{})", f, quoted))
        .collect();
    format!("({})", parts.join(" or "))
}

/// First `max` characters of `s`.
pub(crate) fn excerpt(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_clause() {
        assert_eq!(
            since_clause(Some("2024-01-01T00:00:00Z")).as_deref(),
            Some("Objversion gt datetime'2024-01-01T00:00:00Z'")
        );
        assert_eq!(since_clause(None), None);
    }

    #[test]
    fn test_search_clause() {
        assert_eq!(
            search_clause(&["PartNo", "Description"], "valve"),
            "(contains(PartNo,'valve') or contains(Description,'valve'))"
        );
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("abcdef", 3), "abc");
        assert_eq!(excerpt("ab", 3), "ab");
    }

    #[test]
    fn test_now_iso_shape() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
