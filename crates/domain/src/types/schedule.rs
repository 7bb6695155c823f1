//! Calendar pre-plan payload

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Payload of `calendar/pre-plan`
///
/// Maps an ISO date (`"2025-10-29"`) to the companies planned for that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrePlan {
    #[serde(default)]
    pub calendar_meetings: BTreeMap<String, Vec<String>>,
}

impl PrePlan {
    /// Planned meetings in date order. Keys that are not ISO dates are skipped.
    pub fn meetings_by_date(&self) -> Vec<(NaiveDate, &[String])> {
        let mut days: Vec<(NaiveDate, &[String])> = self
            .calendar_meetings
            .iter()
            .filter_map(|(day, companies)| {
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .ok()
                    .map(|date| (date, companies.as_slice()))
            })
            .collect();
        days.sort_by_key(|(date, _)| *date);
        days
    }

    /// Total number of planned meetings across all days.
    pub fn meeting_count(&self) -> usize {
        self.calendar_meetings.values().map(Vec::len).sum()
    }
}
