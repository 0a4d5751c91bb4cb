//! Contract to an external AI-advice provider. No implementation lives
//! here — natural-language coaching and AI-generated suggestions are
//! explicitly out of scope; only the seam the planner calls through is.

use uuid::Uuid;

use crate::planner::WeeklyPlan;
use crate::workload_analyzer::Warning;

#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("coach adapter unavailable: {0}")]
    Unavailable(String),
    #[error("coach adapter returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Free-form context handed to the adapter alongside a chat message. Kept
/// as opaque JSON rather than a typed struct since its shape is entirely
/// up to the concrete provider.
pub type CoachContext = serde_json::Value;

/// Durable memory a coach implementation may use to keep continuity across
/// turns. Deliberately storage-agnostic — a concrete adapter owns its own
/// persistence.
pub trait MemoryStore: Send + Sync {
    fn get(&self, user_id: Uuid, key: &str) -> Option<String>;
    fn set(&self, user_id: Uuid, key: &str, value: String);
}

#[async_trait::async_trait]
pub trait CoachAdapter: Send + Sync {
    /// Answer a free-text coaching question from the user.
    async fn generate_response(
        &self,
        user_id: Uuid,
        message: &str,
        context: CoachContext,
    ) -> Result<String, CoachError>;

    /// Offer an optional natural-language explanation of why a generated
    /// plan looks the way it does, or suggest an adjustment. A `None`
    /// result means the adapter has nothing to add.
    async fn suggest_schedule_adjustment(
        &self,
        plan: &WeeklyPlan,
        warnings: &[Warning],
    ) -> Result<Option<String>, CoachError>;

    /// Turn a user's raw end-of-day notes into a short reflective summary.
    async fn summarize_reflection(&self, reflection_text: &str) -> Result<String, CoachError>;
}

/// The adapter used when no AI provider is configured. Every call fails
/// immediately so callers take the deterministic fallback path the error
/// handling design requires: the planner's own output, unchanged.
pub struct NoopCoachAdapter;

#[async_trait::async_trait]
impl CoachAdapter for NoopCoachAdapter {
    async fn generate_response(
        &self,
        _user_id: Uuid,
        _message: &str,
        _context: CoachContext,
    ) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("no coach adapter configured".to_string()))
    }

    async fn suggest_schedule_adjustment(
        &self,
        _plan: &WeeklyPlan,
        _warnings: &[Warning],
    ) -> Result<Option<String>, CoachError> {
        Ok(None)
    }

    async fn summarize_reflection(&self, _reflection_text: &str) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("no coach adapter configured".to_string()))
    }
}
