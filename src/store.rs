use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::analysis::{RiskFlag, SessionAnalysis};
use crate::models::{
    AiAnalysis, Fellow, NewSession, Role, Session, SessionDetail, SessionStatus, Supervisor,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("No analysis found to validate. Run analysis first.")]
    NoAnalysis,
}

const DEFAULT_FELLOWS: [&str; 5] = [
    "Alice Wanjiku",
    "Brian Otieno",
    "Catherine Akinyi",
    "David Mwangi",
    "Esther Njoroge",
];
const DEFAULT_SUPERVISOR: (&str, &str) = ("Dr. Sarah Mitchell", "sarah@shamiri.org");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub fellows_created: usize,
    pub supervisors_created: usize,
}

/// In-memory record tables for the dashboard.
#[derive(Default)]
pub struct Store {
    fellows: DashMap<Uuid, Fellow>,
    supervisors: DashMap<Uuid, Supervisor>,
    sessions: DashMap<Uuid, Session>,
    analyses: DashMap<Uuid, AiAnalysis>, // keyed by session id
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_fellow(&self, name: &str) -> Fellow {
        let fellow = Fellow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.fellows.insert(fellow.id, fellow.clone());
        fellow
    }

    pub fn fellow(&self, id: Uuid) -> Option<Fellow> {
        self.fellows.get(&id).map(|f| f.value().clone())
    }

    pub fn fellows(&self) -> Vec<Fellow> {
        let mut all: Vec<Fellow> = self.fellows.iter().map(|f| f.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn create_supervisor(&self, name: &str, email: &str, role: Role) -> Supervisor {
        let supervisor = Supervisor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.supervisors.insert(supervisor.id, supervisor.clone());
        supervisor
    }

    pub fn supervisor(&self, id: Uuid) -> Option<Supervisor> {
        self.supervisors.get(&id).map(|s| s.value().clone())
    }

    pub fn supervisor_by_email(&self, email: &str) -> Option<Supervisor> {
        self.supervisors
            .iter()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .map(|s| s.value().clone())
    }

    pub fn supervisors(&self) -> Vec<Supervisor> {
        let mut all: Vec<Supervisor> =
            self.supervisors.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn create_session(&self, new: NewSession) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            fellow_id: new.fellow_id,
            supervisor_id: new.supervisor_id,
            date: new.date,
            group_id: new.group_id,
            transcript: new.transcript,
            status: SessionStatus::Pending,
            created_at: Utc::now(),
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.sessions.get(&id).map(|s| s.value().clone())
    }

    // newest first
    pub fn sessions(&self) -> Vec<Session> {
        let mut all: Vec<Session> = self.sessions.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        all
    }

    pub fn session_detail(&self, id: Uuid) -> Option<SessionDetail> {
        let session = self.session(id)?;
        Some(SessionDetail {
            fellow: self.fellow(session.fellow_id),
            supervisor: self.supervisor(session.supervisor_id),
            ai_analysis: self.analysis(id),
            session,
        })
    }

    pub fn analysis(&self, session_id: Uuid) -> Option<AiAnalysis> {
        self.analyses.get(&session_id).map(|a| a.value().clone())
    }

    /// Store model scores for a session, replacing any earlier analysis.
    ///
    /// Flags the session when risk was detected, otherwise marks it processed.
    pub fn record_analysis(
        &self,
        session_id: Uuid,
        analysis: &SessionAnalysis,
    ) -> Result<AiAnalysis, StoreError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;

        let record = AiAnalysis {
            session_id,
            summary: analysis.summary.clone(),
            content_score: analysis.metrics.content_coverage.score,
            facilitation_score: analysis.metrics.facilitation_quality.score,
            protocol_score: analysis.metrics.protocol_safety.score,
            justification: analysis.justification(),
            risk_flag: analysis.risk_detection.status,
            risk_quote: analysis.risk_detection.quote.clone(),
            validated: false,
            supervisor_note: None,
            created_at: Utc::now(),
        };

        session.status = match record.risk_flag {
            RiskFlag::Risk => SessionStatus::Flagged,
            RiskFlag::Safe => SessionStatus::Processed,
        };
        drop(session);

        self.analyses.insert(session_id, record.clone());
        Ok(record)
    }

    /// Record a supervisor's verdict on an existing analysis.
    pub fn validate(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        note: Option<String>,
    ) -> Result<AiAnalysis, StoreError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;
        let mut analysis = self
            .analyses
            .get_mut(&session_id)
            .ok_or(StoreError::NoAnalysis)?;

        analysis.validated = status == SessionStatus::Approved;
        analysis.supervisor_note = note.filter(|n| !n.trim().is_empty());
        session.status = status;

        Ok(analysis.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn fellow_count(&self) -> usize {
        self.fellows.len()
    }

    /// Load the default fellows and supervisor. Safe to call repeatedly.
    pub fn seed_defaults(&self) -> SeedReport {
        let mut report = SeedReport {
            fellows_created: 0,
            supervisors_created: 0,
        };

        if self.fellows.is_empty() {
            for name in DEFAULT_FELLOWS {
                self.create_fellow(name);
            }
            report.fellows_created = DEFAULT_FELLOWS.len();
        }

        let (name, email) = DEFAULT_SUPERVISOR;
        if self.supervisor_by_email(email).is_none() {
            self.create_supervisor(name, email, Role::Supervisor);
            report.supervisors_created = 1;
        }

        info!(
            fellows = report.fellows_created,
            supervisors = report.supervisors_created,
            "seeded default records"
        );
        report
    }
}
