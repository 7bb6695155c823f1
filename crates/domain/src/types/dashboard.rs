//! Home dashboard payloads: TEU targets and meeting statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload of `crm_data/target_status/teu`
///
/// `monthly` is keyed by zero-based month index (`"0"` = January).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    pub monthly: BTreeMap<String, TargetProgress>,
    pub yearly: TargetProgress,
}

/// Progress against a TEU target for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub current: f64,
    pub target: f64,
    pub achievement_percentage: f64,
}

impl TargetStatus {
    /// Progress for a zero-based month index.
    pub fn month(&self, index: u32) -> Option<&TargetProgress> {
        self.monthly.get(&index.to_string())
    }

    /// Sum of the per-month targets.
    pub fn monthly_target_total(&self) -> f64 {
        self.monthly.values().map(|progress| progress.target).sum()
    }
}

/// Payload of `crm_data/meetings_split/`
///
/// `monthly` is keyed `"0"`..`"11"`, `quarterly` is keyed `"1"`..`"4"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingsSplit {
    pub monthly: BTreeMap<String, MeetingBreakdown>,
    pub quarterly: BTreeMap<String, MeetingBreakdown>,
    pub yearly: MeetingBreakdown,
}

/// Meeting counts per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingBreakdown {
    #[serde(rename = "Direct Meetings", default)]
    pub direct_meetings: u32,
    #[serde(rename = "Phone Calls", default)]
    pub phone_calls: u32,
    #[serde(rename = "Business Meetings", default)]
    pub business_meetings: u32,
}

impl MeetingBreakdown {
    /// Sum of all channels, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.direct_meetings.saturating_add(self.phone_calls).saturating_add(self.business_meetings)
    }
}

impl MeetingsSplit {
    /// Monthly breakdowns ordered by numeric month index.
    pub fn monthly_in_order(&self) -> Vec<(u32, MeetingBreakdown)> {
        numeric_order(&self.monthly)
    }

    /// Quarterly breakdowns ordered by quarter number.
    pub fn quarterly_in_order(&self) -> Vec<(u32, MeetingBreakdown)> {
        numeric_order(&self.quarterly)
    }
}

// Map keys are strings, so "10" sorts before "2" lexically.
fn numeric_order(periods: &BTreeMap<String, MeetingBreakdown>) -> Vec<(u32, MeetingBreakdown)> {
    let mut ordered: Vec<(u32, MeetingBreakdown)> = periods
        .iter()
        .filter_map(|(key, breakdown)| key.trim().parse::<u32>().ok().map(|n| (n, *breakdown)))
        .collect();
    ordered.sort_by_key(|(period, _)| *period);
    ordered
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn meetings_are_ordered_numerically() {
        let split: MeetingsSplit = serde_json::from_value(json!({
            "monthly": {
                "10": { "Direct Meetings": 1, "Phone Calls": 0, "Business Meetings": 0 },
                "2": { "Direct Meetings": 0, "Phone Calls": 3, "Business Meetings": 1 },
                "0": { "Direct Meetings": 2, "Phone Calls": 2, "Business Meetings": 2 }
            },
            "quarterly": {},
            "yearly": { "Direct Meetings": 3, "Phone Calls": 5, "Business Meetings": 3 }
        }))
        .unwrap();

        let months: Vec<u32> = split.monthly_in_order().into_iter().map(|(m, _)| m).collect();
        assert_eq!(months, vec![0, 2, 10]);
        assert_eq!(split.yearly.total(), 11);
    }

    #[test]
    fn meeting_total_saturates_on_oversized_counts() {
        let breakdown: MeetingBreakdown = serde_json::from_value(json!({
            "Direct Meetings": u32::MAX,
            "Phone Calls": 1,
            "Business Meetings": u32::MAX
        }))
        .unwrap();

        assert_eq!(breakdown.total(), u32::MAX);
    }

    #[test]
    fn target_totals_sum_monthly_targets() {
        let status: TargetStatus = serde_json::from_value(json!({
            "monthly": {
                "0": { "current": 10.0, "target": 100.0, "achievement_percentage": 10.0 },
                "1": { "current": 50.0, "target": 150.0, "achievement_percentage": 33.3 }
            },
            "yearly": { "current": 60.0, "target": 1200.0, "achievement_percentage": 5.0 }
        }))
        .unwrap();

        assert_eq!(status.monthly_target_total(), 250.0);
        assert_eq!(status.month(1).map(|p| p.current), Some(50.0));
        assert!(status.month(7).is_none());
    }
}
