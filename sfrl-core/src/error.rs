use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinetuneError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("environment execution failed: {0}")]
    EnvExecution(#[source] candle_core::Error),

    #[error("replay pool has no transitions to sample")]
    InsufficientData,

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}
