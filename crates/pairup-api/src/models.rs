// Request and response bodies for the REST surface.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Reputation tier the server derives from the karma score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessLevel {
    Full,
    Standard,
    Warning,
    TempBan,
    PermanentBan,
}

impl AccessLevel {
    /// Banned tiers cannot verify, report, or queue.
    pub fn is_restricted(self) -> bool {
        matches!(self, Self::TempBan | Self::PermanentBan)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The caller's own account record (`register`, `me`, `update_profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub device_id: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub karma_score: i64,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub daily_matches_remaining: i64,
    #[serde(default)]
    pub is_verified: bool,
}

/// Body of `PUT /api/auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub nickname: String,
    #[serde(default)]
    pub bio: String,
}

/// Outcome of the selfie verification upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Why a user is being reported. Rendered as the `<code>` half of the
/// `"<code>: <details>"` reason string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Underage,
    Other,
}

impl ReportReason {
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Compose the wire reason: `"<code>: <details>"`.
    pub fn compose(self, details: &str) -> String {
        format!("{}: {details}", self.code())
    }
}

/// Body of `POST /api/reports/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReportRequest<'a> {
    pub reported_device_id: &'a str,
    pub reason: String,
}

/// Server acknowledgement of a submitted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReceipt {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Current karma and access tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaStatus {
    pub device_id: String,
    pub karma_score: i64,
    pub access_level: AccessLevel,
}

/// Result of marking a chat as completed without reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub success: bool,
    pub new_karma: i64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_reason_composes_code_and_details() {
        assert_eq!(
            ReportReason::Harassment.compose("kept insulting me"),
            "harassment: kept insulting me"
        );
    }

    #[test]
    fn user_profile_from_register_response() {
        let body = json!({
            "device_id": "abc",
            "gender": null,
            "nickname": "night-owl",
            "bio": null,
            "karma_score": 105,
            "access_level": "full",
            "daily_matches_remaining": 10,
            "is_verified": false
        });
        let profile: UserProfile = serde_json::from_value(body).unwrap();
        assert_eq!(profile.nickname.as_deref(), Some("night-owl"));
        assert_eq!(profile.access_level, AccessLevel::Full);
        assert!(!profile.is_verified);
    }

    #[test]
    fn restricted_access_levels() {
        assert!(AccessLevel::TempBan.is_restricted());
        assert!(AccessLevel::PermanentBan.is_restricted());
        assert!(!AccessLevel::Warning.is_restricted());
        assert_eq!(AccessLevel::TempBan.as_str(), "temp_ban");
        assert_eq!("permanent_ban".parse::<AccessLevel>().unwrap(), AccessLevel::PermanentBan);
    }
}
