use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{client::RpcClient, types::TransactionRequest as RpcTransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{
        http::{Client, Http},
        RpcError, TransportErrorKind,
    },
};
use anyhow::anyhow;
use async_trait::async_trait;
use std::fmt;

use super::descriptor::FunctionDescriptor;
use super::{abi, utils, NodeResponse, TransactionRequest};
use crate::error::{ContractError, Result};

/// Everything the dispatch engine needs from a node.
///
/// Encoding and decoding default to the alloy ABI codec; implementations only have to
/// provide the network operations.
#[async_trait]
pub trait NodeGateway: fmt::Debug + Send + Sync {
    fn encode_function_call(&self, descriptor: &FunctionDescriptor) -> Result<Bytes> {
        abi::encode_function_call(descriptor)
    }

    fn decode_parameters(&self, types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
        abi::decode_parameters(types, data)
    }

    /// Execute a read-only call; answers with [`NodeResponse::Value`] or an error.
    async fn call(&self, request: &TransactionRequest) -> Result<NodeResponse>;

    /// Sign and submit a transaction; answers with [`NodeResponse::TransactionHash`] or
    /// an error.
    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        signer: &PrivateKeySigner,
    ) -> Result<NodeResponse>;

    async fn get_transaction_count(&self, address: Address) -> Result<u64>;
}

/// [`NodeGateway`] over JSON-RPC HTTP.
#[derive(Debug, Clone)]
pub struct AlloyGateway {
    provider: RootProvider<Http<Client>>,
    chain_id: Option<u64>,
}

impl AlloyGateway {
    /// Connect to `rpc_url`, optionally through a caller-supplied HTTP client.
    pub fn connect(rpc_url: &str, client: Option<Client>) -> anyhow::Result<Self> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", rpc_url, e))?;

        let provider = match client {
            Some(client) => {
                ProviderBuilder::new().on_client(RpcClient::new(Http::with_client(client, url), false))
            }
            None => ProviderBuilder::new().on_http(url),
        };

        Ok(Self {
            provider,
            chain_id: None,
        })
    }

    /// Sign with a fixed chain id instead of asking the node for it.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    async fn chain_id(&self) -> Result<u64> {
        match self.chain_id {
            Some(chain_id) => Ok(chain_id),
            None => self.provider.get_chain_id().await.map_err(transport_error),
        }
    }

    fn rpc_request(request: &TransactionRequest) -> Result<RpcTransactionRequest> {
        let mut tx = RpcTransactionRequest::default()
            .to(request.to.address())
            .input(request.data.clone().into())
            .value(request.options.value)
            .with_gas_limit(narrow::<u64>(request.options.gas_limit, "Gas limit")?)
            .with_gas_price(narrow::<u128>(request.options.gas_price, "Gas price")?);
        if let Some(from) = request.from {
            tx = tx.from(from);
        }
        Ok(tx)
    }
}

/// Node error responses become [`NodeResponse::Error`]; anything else is a transport failure.
fn node_response_or_error(error: RpcError<TransportErrorKind>) -> Result<NodeResponse> {
    match error.as_error_resp() {
        Some(payload) => Ok(NodeResponse::Error(payload.message.to_string())),
        None => Err(transport_error(error)),
    }
}

fn transport_error(error: RpcError<TransportErrorKind>) -> ContractError {
    tracing::error!("RPC error details: {}", error);
    ContractError::Transport(anyhow!(utils::interpret_rpc_error(&error.to_string())))
}

fn narrow<T: TryFrom<U256>>(value: U256, field: &str) -> Result<T> {
    T::try_from(value)
        .map_err(|_| ContractError::configuration(format!("{} {} is out of range", field, value)))
}

#[async_trait]
impl NodeGateway for AlloyGateway {
    async fn call(&self, request: &TransactionRequest) -> Result<NodeResponse> {
        let tx = Self::rpc_request(request)?;
        match self.provider.call(&tx).await {
            Ok(result) => Ok(NodeResponse::Value(result)),
            Err(e) => node_response_or_error(e),
        }
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        signer: &PrivateKeySigner,
    ) -> Result<NodeResponse> {
        let nonce = request.nonce.ok_or_else(|| {
            ContractError::configuration("Transactions must carry a nonce")
        })?;
        let tx = Self::rpc_request(request)?
            .with_from(signer.address())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id().await?);

        let wallet = EthereumWallet::from(signer.clone());
        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| ContractError::Transport(anyhow!("Failed to sign transaction: {}", e)))?;

        tracing::info!("Sending transaction to contract: {}", request.to);
        match self.provider.send_raw_transaction(&envelope.encoded_2718()).await {
            Ok(pending) => Ok(NodeResponse::TransactionHash(format!("0x{:x}", pending.tx_hash()))),
            Err(e) => node_response_or_error(e),
        }
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(transport_error)
    }
}
