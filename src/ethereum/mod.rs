pub mod abi;
pub mod adapter;
pub mod client;
pub mod descriptor;
pub mod interface;
pub mod options;
pub mod output;
pub mod provider;
pub mod utils;

#[cfg(test)]
pub(crate) mod mock;

use alloy::primitives::{Address, Bytes};
use std::fmt;

use crate::error::{ContractError, Result};
pub use options::ExecutionOptions;

/// Validated address of a deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractAddress(Address);

impl ContractAddress {
    pub fn parse(address: &str) -> Result<Self> {
        utils::validate_address(address)
            .map(Self)
            .map_err(|e| ContractError::Configuration(format!("Invalid contract address: {}", e)))
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for ContractAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A call or transaction as handed to the node gateway.
///
/// `nonce` is only set for state-changing transactions, `from` is only set when a
/// signer is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: ContractAddress,
    pub data: Bytes,
    pub options: ExecutionOptions,
    pub nonce: Option<u64>,
}

/// What the node answered, discriminated by call kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeResponse {
    /// Raw return data of a read call.
    Value(Bytes),
    /// Hash of a submitted transaction.
    TransactionHash(String),
    /// The node rejected the request.
    Error(String),
}

impl NodeResponse {
    pub fn has_error(&self) -> bool {
        matches!(self, NodeResponse::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            NodeResponse::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_address_parse() {
        let address = ContractAddress::parse("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").unwrap();
        assert_eq!(
            address.address(),
            "0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e"
                .parse::<Address>()
                .unwrap()
        );

        assert!(matches!(
            ContractAddress::parse("0x123"),
            Err(ContractError::Configuration(_))
        ));
    }

    #[test]
    fn test_node_response_error() {
        let response = NodeResponse::Error("execution reverted".to_string());
        assert!(response.has_error());
        assert_eq!(response.error_message(), Some("execution reverted"));
        assert!(!NodeResponse::Value(Bytes::new()).has_error());
    }
}
