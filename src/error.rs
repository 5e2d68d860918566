/// Errors surfaced by a contract client invocation.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// The client or the interface description is misconfigured.
    ///
    /// Raised before any node access: missing read/write marker, a write call without a
    /// signer, an unknown method, or an adapter chain with nothing that matches.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The node answered a call or a transaction submission with an error.
    #[error("execution error: {0}")]
    Execution(String),
    /// Decoded values could not be bound to the declared return shape.
    #[error("binding error: {0}")]
    Binding(String),
    /// ABI encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),
    /// The gateway answered with a response of the wrong kind.
    #[error("gateway error: {0}")]
    Gateway(String),
    /// A spawned call panicked or was cancelled before completing.
    #[error("deferred call failed: {0}")]
    Join(String),
    /// The node could not be reached.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ContractError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }
}

pub type Result<T, E = ContractError> = std::result::Result<T, E>;
