use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, B256, U256},
    signers::local::PrivateKeySigner,
};
use anyhow::anyhow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::adapter::{self, CallAdapter, PassThroughAdapter, Thunk};
use super::descriptor::{self, FunctionDescriptor};
use super::interface::{CallKind, ContractInterface, GasAnnotation, MethodSpec, ParamType, ReturnType};
use super::options::{self, ExecutionOptions};
use super::output::{FromOutput, Output};
use super::provider::{AlloyGateway, NodeGateway};
use super::{ContractAddress, NodeResponse, TransactionRequest};
use crate::config::Config;
use crate::error::{ContractError, Result};

/// Default node endpoint.
pub const DEFAULT_PROVIDER: &str = "http://localhost:8545/";

/// One runtime argument of a contract method call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(DynSolValue),
    /// Per-call execution options; recognised by type wherever it appears.
    Options(ExecutionOptions),
}

impl From<DynSolValue> for Arg {
    fn from(value: DynSolValue) -> Self {
        Arg::Value(value)
    }
}

impl From<ExecutionOptions> for Arg {
    fn from(options: ExecutionOptions) -> Self {
        Arg::Options(options)
    }
}

impl From<Address> for Arg {
    fn from(value: Address) -> Self {
        Arg::Value(DynSolValue::Address(value))
    }
}

impl From<U256> for Arg {
    fn from(value: U256) -> Self {
        Arg::Value(DynSolValue::Uint(value, 256))
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::from(U256::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(DynSolValue::Bool(value))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(DynSolValue::String(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::from(value.to_string())
    }
}

impl From<B256> for Arg {
    fn from(value: B256) -> Self {
        Arg::Value(DynSolValue::FixedBytes(value, 32))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Value(DynSolValue::Bytes(value))
    }
}

/// Split off the options argument, keeping the remaining values in order.
fn split_arguments(args: Vec<Arg>) -> (Option<ExecutionOptions>, Vec<DynSolValue>) {
    let mut explicit = None;
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Arg::Options(options) => explicit = explicit.or(Some(options)),
            Arg::Value(value) => values.push(value),
        }
    }
    (explicit, values)
}

/// Configures and builds a [`ContractFactory`].
#[derive(Debug)]
pub struct ClientBuilder {
    provider: String,
    chain_id: Option<u64>,
    signer: Option<PrivateKeySigner>,
    client: Option<reqwest::Client>,
    gateway: Option<Arc<dyn NodeGateway>>,
    adapters: Vec<Arc<dyn CallAdapter>>,
    default_options: ExecutionOptions,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            chain_id: None,
            signer: None,
            client: None,
            gateway: None,
            adapters: Vec::new(),
            default_options: ExecutionOptions::default(),
        }
    }
}

impl ClientBuilder {
    /// Start from a loaded configuration file.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Self::default()
            .provider(&config.node.rpc_url)
            .default_options(config.gas.default_options());

        if let Some(chain_id) = config.node.chain_id {
            builder = builder.chain_id(chain_id);
        }

        if let Some(timeout) = config.node.timeout_secs {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
            builder = builder.client(client);
        }

        if let Some(private_key) = config.signer.resolve_private_key() {
            let private_key = private_key.trim();
            let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);
            let signer = PrivateKeySigner::from_str(private_key)
                .map_err(|e| anyhow!("Invalid private key: {}", e))?;
            info!("Using signer {:?}", signer.address());
            builder = builder.signer(signer);
        }

        Ok(builder)
    }

    pub fn provider(mut self, url: impl Into<String>) -> Self {
        self.provider = url.into();
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Enables write calls.
    pub fn signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// HTTP client used by the default gateway.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the default HTTP gateway entirely.
    pub fn gateway(mut self, gateway: Arc<dyn NodeGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn add_call_adapter(mut self, adapter: Arc<dyn CallAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn default_options(mut self, options: ExecutionOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn build(self) -> anyhow::Result<ContractFactory> {
        let gateway = match self.gateway {
            Some(gateway) => gateway,
            None => {
                let mut gateway = AlloyGateway::connect(&self.provider, self.client)?;
                if let Some(chain_id) = self.chain_id {
                    gateway = gateway.with_chain_id(chain_id);
                }
                Arc::new(gateway)
            }
        };

        let mut adapters = self.adapters;
        adapters.push(Arc::new(PassThroughAdapter));

        Ok(ContractFactory::new(
            gateway,
            self.signer,
            adapters,
            self.default_options,
        ))
    }
}

/// Creates [`ContractClient`]s sharing one gateway, signer and adapter chain.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    gateway: Arc<dyn NodeGateway>,
    signer: Option<PrivateKeySigner>,
    adapters: Arc<[Arc<dyn CallAdapter>]>,
    default_options: ExecutionOptions,
}

impl ContractFactory {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Use `adapters` as given; [`ClientBuilder::build`] is the way to get the
    /// pass-through adapter appended.
    pub fn new(
        gateway: Arc<dyn NodeGateway>,
        signer: Option<PrivateKeySigner>,
        adapters: Vec<Arc<dyn CallAdapter>>,
        default_options: ExecutionOptions,
    ) -> Self {
        Self {
            gateway,
            signer,
            adapters: adapters.into(),
            default_options,
        }
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    pub fn create(&self, address: &str, interface: ContractInterface) -> Result<ContractClient> {
        self.create_at(ContractAddress::parse(address)?, interface)
    }

    /// Bind every method of `interface` to the contract at `address`.
    pub fn create_at(
        &self,
        address: ContractAddress,
        interface: ContractInterface,
    ) -> Result<ContractClient> {
        interface.validate()?;

        let mut methods: HashMap<String, Vec<BoundMethod>> = HashMap::new();
        for spec in interface.methods {
            let bound = self.bind(spec, interface.gas)?;
            methods.entry(bound.spec.name.clone()).or_default().push(bound);
        }

        debug!(
            "Created client for {} at {} with {} methods",
            interface.name,
            address,
            methods.values().map(Vec::len).sum::<usize>()
        );

        Ok(ContractClient {
            name: interface.name.into(),
            shared: Arc::new(Shared {
                address,
                gateway: self.gateway.clone(),
                signer: self.signer.clone(),
            }),
            methods: Arc::new(methods),
        })
    }

    fn bind(&self, spec: MethodSpec, interface_gas: Option<GasAnnotation>) -> Result<BoundMethod> {
        let adapter = adapter::select(&self.adapters, &spec.returns, &spec.annotations)
            .cloned()
            .ok_or_else(|| {
                ContractError::configuration(format!(
                    "No call adapter accepts '{}' returning '{}'; the pass-through adapter is missing",
                    spec.signature(),
                    spec.returns
                ))
            })?;

        let actual_return = adapter.actual_return_type(&spec.returns);
        if spec.kind == Some(CallKind::Read) && matches!(actual_return, ReturnType::Deferred(_)) {
            return Err(ContractError::configuration(format!(
                "Method '{}' returns '{}' but no registered call adapter produces deferred results",
                spec.signature(),
                spec.returns
            )));
        }

        Ok(BoundMethod {
            fallback_options: options::resolve(None, spec.gas, interface_gas, self.default_options),
            param_types: spec.sol_params(),
            accepts_options: spec.params.contains(&ParamType::Options),
            adapter,
            actual_return,
            spec,
        })
    }
}

#[derive(Debug)]
struct BoundMethod {
    spec: MethodSpec,
    param_types: Vec<DynSolType>,
    accepts_options: bool,
    adapter: Arc<dyn CallAdapter>,
    actual_return: ReturnType,
    /// Options used when the call does not pass its own.
    fallback_options: ExecutionOptions,
}

impl BoundMethod {
    fn accepts(&self, args: &[Arg]) -> bool {
        let options = args.iter().filter(|arg| matches!(arg, Arg::Options(_))).count();
        let values: Vec<&DynSolValue> = args
            .iter()
            .filter_map(|arg| match arg {
                Arg::Value(value) => Some(value),
                Arg::Options(_) => None,
            })
            .collect();

        options == usize::from(self.accepts_options)
            && values.len() == self.param_types.len()
            && self
                .param_types
                .iter()
                .zip(values)
                .all(|(ty, value)| descriptor::coerce(ty, value.clone()).is_some())
    }
}

/// State shared by every call of one client. Read-only after construction.
#[derive(Debug)]
struct Shared {
    address: ContractAddress,
    gateway: Arc<dyn NodeGateway>,
    signer: Option<PrivateKeySigner>,
}

impl Shared {
    async fn view(
        &self,
        descriptor: FunctionDescriptor,
        returns: ReturnType,
        options: ExecutionOptions,
    ) -> Result<Output> {
        let data = self.gateway.encode_function_call(&descriptor)?;
        let request = TransactionRequest {
            from: self.signer.as_ref().map(|signer| signer.address()),
            to: self.address,
            data,
            options,
            nonce: None,
        };

        debug!("Calling {} on {}", descriptor.signature(), self.address);
        match self.gateway.call(&request).await? {
            NodeResponse::Value(result) => {
                let values = self
                    .gateway
                    .decode_parameters(&descriptor.return_types, &result)?;
                returns.reconstruct(values)
            }
            NodeResponse::Error(message) => Err(ContractError::Execution(format!(
                "Error processing request: {}",
                message
            ))),
            NodeResponse::TransactionHash(_) => Err(ContractError::Gateway(
                "Expected call result, got a transaction hash".to_string(),
            )),
        }
    }

    async fn transact(
        &self,
        descriptor: FunctionDescriptor,
        options: ExecutionOptions,
        signer: PrivateKeySigner,
    ) -> Result<Output> {
        let data = self.gateway.encode_function_call(&descriptor)?;
        let from = signer.address();
        let nonce = self.gateway.get_transaction_count(from).await?;
        let request = TransactionRequest {
            from: Some(from),
            to: self.address,
            data,
            options,
            nonce: Some(nonce),
        };

        info!(
            "Sending {} to {} from {:?} with nonce {}",
            descriptor.signature(),
            self.address,
            from,
            nonce
        );
        match self.gateway.send_transaction(&request, &signer).await? {
            NodeResponse::TransactionHash(hash) => {
                info!("Transaction sent with hash: {}", hash);
                Ok(Output::TransactionHash(hash))
            }
            NodeResponse::Error(message) => Err(ContractError::Execution(format!(
                "Error processing transaction request: {}",
                message
            ))),
            NodeResponse::Value(_) => Err(ContractError::Gateway(
                "Expected a transaction hash, got a call result".to_string(),
            )),
        }
    }
}

/// Client for one deployed contract.
///
/// Cloning is cheap; clones share the bound methods and may be used from several tasks at
/// once. Nonces are fetched per write call and not coordinated between concurrent calls.
#[derive(Debug, Clone)]
pub struct ContractClient {
    name: Arc<str>,
    shared: Arc<Shared>,
    methods: Arc<HashMap<String, Vec<BoundMethod>>>,
}

impl ContractClient {
    pub fn address(&self) -> ContractAddress {
        self.shared.address
    }

    pub fn interface_name(&self) -> &str {
        &self.name
    }

    /// Declared overloads of `method`, in declaration order.
    pub fn overloads<'a>(&'a self, method: &str) -> impl Iterator<Item = &'a MethodSpec> + 'a {
        self.methods
            .get(method)
            .into_iter()
            .flatten()
            .map(|bound| &bound.spec)
    }

    fn resolve(&self, method: &str, args: &[Arg]) -> Result<&BoundMethod> {
        let overloads = self.methods.get(method).ok_or_else(|| {
            ContractError::configuration(format!(
                "Interface {} has no method '{}'",
                self.name, method
            ))
        })?;

        overloads
            .iter()
            .find(|bound| bound.accepts(args))
            .ok_or_else(|| {
                let declared: Vec<String> =
                    overloads.iter().map(|bound| bound.spec.signature()).collect();
                ContractError::configuration(format!(
                    "No overload of '{}' accepts the given arguments. Declared: {}",
                    method,
                    declared.join(", ")
                ))
            })
    }

    /// Invoke `method` and return its adapted result.
    pub async fn invoke(&self, method: &str, args: Vec<Arg>) -> Result<Output> {
        let bound = self.resolve(method, &args)?;

        let kind = bound.spec.kind.ok_or_else(|| {
            ContractError::configuration(format!(
                "Method '{}' carries neither a read nor a write marker",
                bound.spec.signature()
            ))
        })?;

        let signer = match kind {
            CallKind::Read => None,
            CallKind::Write => Some(self.shared.signer.clone().ok_or_else(|| {
                ContractError::configuration(format!(
                    "Method '{}' sends a transaction but no signer is configured",
                    bound.spec.signature()
                ))
            })?),
        };

        let (explicit, values) = split_arguments(args);
        let options = explicit.unwrap_or(bound.fallback_options);
        let descriptor =
            FunctionDescriptor::build(&bound.spec.name, values, &bound.param_types, &bound.actual_return)?;

        let shared = self.shared.clone();
        let returns = bound.actual_return.clone();
        let thunk: Thunk = Box::pin(async move {
            match signer {
                None => shared.view(descriptor, returns, options).await,
                Some(signer) => shared.transact(descriptor, options, signer).await,
            }
        });

        bound.adapter.adapt(thunk).await
    }

    /// Like [`invoke`](Self::invoke), converting the result into a native type.
    pub async fn invoke_as<T: FromOutput>(&self, method: &str, args: Vec<Arg>) -> Result<T> {
        T::from_output(self.invoke(method, args).await?)
    }
}
