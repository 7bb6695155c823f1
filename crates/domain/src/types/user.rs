//! Onboarding and user identity payloads

use serde::{Deserialize, Serialize};

/// Payload of `preferences/is-onboarded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStatus {
    pub is_onboarded: bool,
    pub user_data: UserData,
}

/// Sales person identity as known to the CRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub user_name: String,
    pub sales_person_id: String,
    pub email: String,
}

impl OnboardingStatus {
    /// The user's display name, if the backend sent a non-blank one.
    pub fn display_name(&self) -> Option<&str> {
        let name = self.user_data.user_name.trim();
        (!name.is_empty()).then_some(name)
    }
}
