use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid landmark frame: expected 21 points, got {got}")]
    InvalidFrame { got: usize },

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("unknown capture slot '{0}' (expected first, operator or second)")]
    UnknownSlot(String),

    #[error("unknown capture mode '{0}' (expected auto or manual)")]
    UnknownMode(String),
}
