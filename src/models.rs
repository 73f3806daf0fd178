use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::RiskFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Supervisor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Pending,
    Processed,
    Flagged,
    Safe,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fellow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub fellow_id: Uuid,
    pub supervisor_id: Uuid,
    pub date: DateTime<Utc>,
    pub group_id: String,
    pub transcript: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

// Stored scores for a session - at most one per session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub session_id: Uuid,
    pub summary: String,
    pub content_score: u8,
    pub facilitation_score: u8,
    pub protocol_score: u8,
    pub justification: String,
    pub risk_flag: RiskFlag,
    pub risk_quote: Option<String>,
    pub validated: bool,
    pub supervisor_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub fellow: Option<Fellow>,
    pub supervisor: Option<Supervisor>,
    pub ai_analysis: Option<AiAnalysis>,
}

pub struct NewSession {
    pub fellow_id: Uuid,
    pub supervisor_id: Uuid,
    pub date: DateTime<Utc>,
    pub group_id: String,
    pub transcript: String,
}

// Request bodies - fields are optional so missing ones map to 400, not a rejection
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub fellow_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub date: Option<String>,
    pub group_id: Option<String>,
    pub transcript: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub session_id: Option<String>,
    pub validated_status: Option<SessionStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFellowRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupervisorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}
