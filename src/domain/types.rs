//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

/// Moderation state derived from the persisted `approved` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Pending,
    Approved,
}

impl ModerationState {
    pub fn from_approved(approved: bool) -> Self {
        if approved { Self::Approved } else { Self::Pending }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModerationState::Pending => "pending",
            ModerationState::Approved => "approved",
        }
    }
}

/// Who is asking. Admins may see pending plaques and different aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Anonymous,
    Admin,
}

impl ViewerRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewerRole::Anonymous => "anonymous",
            ViewerRole::Admin => "admin",
        }
    }
}

/// Level of detail for the JSON representation of a plaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportDetail {
    Summary,
    Full,
}

impl ExportDetail {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportDetail::Summary => "summary",
            ExportDetail::Full => "full",
        }
    }
}
