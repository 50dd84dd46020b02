//! Check-in data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
    /// Alert raised; the check-in stays in the active collection until a
    /// human completes or cancels it.
    Emergency,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Emergency => "emergency",
        }
    }

    /// No transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// How to reach an emergency contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ContactChannel {
    Phone(String),
    Email(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub channel: ContactChannel,
}

impl EmergencyContact {
    pub fn phone(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: ContactChannel::Phone(number.into()),
        }
    }

    pub fn email(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: ContactChannel::Email(address.into()),
        }
    }
}

/// Input for scheduling a check-in.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub squad_member_id: String,
    pub squad_member_name: String,
    pub location: String,
    /// Meetup start.
    pub scheduled_time: DateTime<Utc>,
    /// Deadline for confirming safety.
    pub check_in_time: DateTime<Utc>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// A safety check-in for a real-world meetup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheckIn {
    pub id: String,
    pub squad_member_id: String,
    pub squad_member_name: String,
    pub location: String,
    pub scheduled_time: DateTime<Utc>,
    pub check_in_time: DateTime<Utc>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub status: CheckInStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SessionCheckIn {
    pub(crate) fn new(new: NewCheckIn, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            squad_member_id: new.squad_member_id,
            squad_member_name: new.squad_member_name,
            location: new.location,
            scheduled_time: new.scheduled_time,
            check_in_time: new.check_in_time,
            emergency_contacts: new.emergency_contacts,
            status: CheckInStatus::Scheduled,
            activated_at: None,
            completed_at: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> SessionCheckIn {
        let now = Utc::now();
        SessionCheckIn::new(
            NewCheckIn {
                squad_member_id: "member-7".to_string(),
                squad_member_name: "Riley".to_string(),
                location: "Arcade on 5th".to_string(),
                scheduled_time: now + Duration::hours(1),
                check_in_time: now + Duration::hours(3),
                emergency_contacts: vec![
                    EmergencyContact::phone("Sam", "+15550100"),
                    EmergencyContact::email("Jo", "jo@example.com"),
                ],
            },
            now,
        )
    }

    #[test]
    fn new_check_in_is_scheduled() {
        let check_in = sample();
        assert_eq!(check_in.status, CheckInStatus::Scheduled);
        assert!(check_in.activated_at.is_none());
        assert!(check_in.completed_at.is_none());
        assert!(!check_in.id.is_empty());
    }

    #[test]
    fn serializes_camel_case_with_tagged_channels() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["squadMemberName"], "Riley");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["emergencyContacts"][0]["channel"]["type"], "phone");
        assert_eq!(json["emergencyContacts"][1]["channel"]["value"], "jo@example.com");
        assert!(json.get("activatedAt").is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(CheckInStatus::Completed.is_terminal());
        assert!(CheckInStatus::Cancelled.is_terminal());
        assert!(!CheckInStatus::Emergency.is_terminal());
        assert!(!CheckInStatus::Active.is_terminal());
        assert_eq!(CheckInStatus::Emergency.as_str(), "emergency");
    }
}
