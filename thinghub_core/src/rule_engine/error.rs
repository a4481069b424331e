use thiserror::Error;

use crate::types::{ActionTypeId, EventTypeId, RuleId, StateTypeId, ThingId};

#[derive(Debug, Error)]
pub enum RuleEngineError {
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),
    #[error("invalid rule format: {0}")]
    InvalidRuleFormat(String),
    #[error("thing not found: {0}")]
    ThingNotFound(ThingId),
    #[error("type not found")]
    TypeNotFound,
    #[error("action type not found: {0}")]
    ActionTypeNotFound(ActionTypeId),
    #[error("event type not found: {0}")]
    EventTypeNotFound(EventTypeId),
    #[error("state type not found: {0}")]
    StateTypeNotFound(StateTypeId),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("invalid state evaluator value: {0}")]
    InvalidStateEvaluatorValue(String),
    #[error("invalid repeating option: {0}")]
    InvalidRepeatingOption(String),
    #[error("invalid calendar item: {0}")]
    InvalidCalendarItem(String),
    #[error("invalid time event item: {0}")]
    InvalidTimeEventItem(String),
}

pub type Result<T> = std::result::Result<T, RuleEngineError>;
