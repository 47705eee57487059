use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcError {
    #[error("Output buffer allocation failed: {requested} bytes requested")]
    AllocationFailed { requested: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid encoder config: {0}")]
    InvalidConfig(String),

    #[error("Carry propagated past the start of the stream")]
    CarryUnderflow,
}

impl EcError {
    /// Errors that leave the encoder unusable until it is reset.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. } | Self::CarryUnderflow)
    }
}

pub type EcResult<T> = Result<T, EcError>;
