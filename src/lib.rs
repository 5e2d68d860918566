//! Typed clients for deployed smart contracts, generated at runtime from an interface
//! description.
//!
//! ```no_run
//! use contract_client::ethereum::client::ContractFactory;
//! use contract_client::ethereum::interface::{ContractInterface, MethodSpec};
//! use alloy::{dyn_abi::DynSolType, primitives::{Address, U256}};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let token = ContractInterface::new("Token").method(
//!     MethodSpec::read("balanceOf")
//!         .param(DynSolType::Address)
//!         .returns("uint256".parse()?),
//! );
//!
//! let factory = ContractFactory::builder()
//!     .provider("http://localhost:8545/")
//!     .build()?;
//! let client = factory.create("0x5FbDB2315678afecb367f032d93F642f64180aa3", token)?;
//! let balance: U256 = client
//!     .invoke_as("balanceOf", vec![Address::ZERO.into()])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ethereum;

pub use error::{ContractError, Result};
pub use ethereum::adapter::{CallAdapter, PassThroughAdapter, PendingCall, SpawnAdapter};
pub use ethereum::client::{Arg, ClientBuilder, ContractClient, ContractFactory};
pub use ethereum::interface::{CallKind, ContractInterface, GasAnnotation, MethodSpec, ReturnType};
pub use ethereum::output::{FromOutput, Output};
pub use ethereum::provider::{AlloyGateway, NodeGateway};
pub use ethereum::{ContractAddress, ExecutionOptions, NodeResponse, TransactionRequest};
