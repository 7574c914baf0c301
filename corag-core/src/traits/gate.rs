//! Request admission trait.

/// Verdict from the request gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The request may proceed to retrieval.
    Allowed,

    /// The request is refused with a user-facing reason.
    Rejected(String),
}

impl GateDecision {
    /// Whether the request was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Admission control consulted once per pipeline turn, before any
/// retrieval work.
///
/// A rejection is a first-class negative result, not an error: the reason
/// string is surfaced directly to the end user.
pub trait RequestGate: Send + Sync + std::fmt::Debug {
    /// Validate the query and account the request against the user's
    /// rate budget.
    fn validate_and_limit(&self, user_id: &str, query: &str) -> GateDecision;
}
