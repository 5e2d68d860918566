use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, Bytes},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::descriptor::FunctionDescriptor;
use super::provider::NodeGateway;
use super::{abi, NodeResponse, TransactionRequest};
use crate::error::{ContractError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    Encode(String),
    Decode(Vec<DynSolType>),
    Call(TransactionRequest),
    Send(TransactionRequest, Address),
    Nonce(Address),
}

#[derive(Debug, Default)]
pub(crate) struct MockGateway {
    responses: Mutex<VecDeque<NodeResponse>>,
    nonce: u64,
    recorded: Mutex<Vec<Recorded>>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, response: NodeResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue a successful call result encoding `values`.
    pub(crate) fn respond_values(self, values: Vec<DynSolValue>) -> Self {
        let data = DynSolValue::Tuple(values).abi_encode_params();
        self.respond(NodeResponse::Value(Bytes::from(data)))
    }

    pub(crate) fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub(crate) fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub(crate) fn invocations(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    fn record(&self, entry: Recorded) {
        self.recorded.lock().unwrap().push(entry);
    }

    fn next_response(&self) -> Result<NodeResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ContractError::Gateway("no response queued".to_string()))
    }
}

#[async_trait]
impl NodeGateway for MockGateway {
    fn encode_function_call(&self, descriptor: &FunctionDescriptor) -> Result<Bytes> {
        self.record(Recorded::Encode(descriptor.signature()));
        abi::encode_function_call(descriptor)
    }

    fn decode_parameters(&self, types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
        self.record(Recorded::Decode(types.to_vec()));
        abi::decode_parameters(types, data)
    }

    async fn call(&self, request: &TransactionRequest) -> Result<NodeResponse> {
        self.record(Recorded::Call(request.clone()));
        self.next_response()
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        signer: &PrivateKeySigner,
    ) -> Result<NodeResponse> {
        self.record(Recorded::Send(request.clone(), signer.address()));
        self.next_response()
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.record(Recorded::Nonce(address));
        Ok(self.nonce)
    }
}
