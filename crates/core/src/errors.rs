use thiserror::Error;

use crate::domain::question::QuestionId;
use crate::domain::quotation::{QuotationId, QuotationStatus};

/// Validation and lifecycle failures surfaced by the pricing engine.
///
/// Every variant is a hard stop: the engine never clamps, coerces, or
/// substitutes a best-effort value for a rejected input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("answer for question {question_id} has the wrong shape: expected {expected}, got {got}")]
    InvalidAnswerType { question_id: QuestionId, expected: &'static str, got: &'static str },
    #[error("answer for question {question_id} is invalid: {reason}")]
    InvalidAnswerValue { question_id: QuestionId, reason: String },
    #[error("required question {0} has no answer")]
    MissingRequiredAnswer(QuestionId),
    #[error("invalid quotation transition from {from:?} to {to:?}")]
    InvalidTransition { from: QuotationStatus, to: QuotationStatus },
    #[error("quotation {0} was modified concurrently; re-read and retry once")]
    ConcurrentModification(QuotationId),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("quotation {0} not found")]
    QuotationNotFound(QuotationId),
    #[error("answer payload is malformed: {0}")]
    MalformedAnswerPayload(String),
    #[error("question definition invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The submission could not be processed. Check the answers and try again."
            }
            Self::Conflict { .. } => {
                "The quotation changed while you were editing it. Reload and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Engine(EngineError::ConcurrentModification(_)) => Self::Conflict {
                message: "quotation was modified concurrently".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Engine(EngineError::StorageUnavailable(message))
            | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Engine(_) => Self::BadRequest {
                message: "submission validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
