use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};
use anyhow::anyhow;
use serde_json::Value;

use super::abi;
use super::adapter::PendingCall;
use crate::error::{ContractError, Result};

/// Result of an invocation, shaped after the method's declared return type.
#[derive(Debug)]
pub enum Output {
    Unit,
    Value(DynSolValue),
    Tuple(Vec<Output>),
    List(Vec<Output>),
    /// Hash of a submitted transaction.
    TransactionHash(String),
    /// A call still running on a spawned task.
    Pending(PendingCall),
}

impl PartialEq for Output {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Output::Unit, Output::Unit) => true,
            (Output::Value(a), Output::Value(b)) => a == b,
            (Output::Tuple(a), Output::Tuple(b)) | (Output::List(a), Output::List(b)) => a == b,
            (Output::TransactionHash(a), Output::TransactionHash(b)) => a == b,
            _ => false,
        }
    }
}

impl Output {
    fn kind(&self) -> &'static str {
        match self {
            Output::Unit => "unit",
            Output::Value(_) => "value",
            Output::Tuple(_) => "tuple",
            Output::List(_) => "list",
            Output::TransactionHash(_) => "transaction hash",
            Output::Pending(_) => "pending call",
        }
    }

    /// Convert into JSON; pending calls must be awaited first.
    pub fn to_json(&self) -> anyhow::Result<Value> {
        match self {
            Output::Unit => Ok(Value::Null),
            Output::Value(value) => abi::dyn_sol_value_to_json(value),
            Output::Tuple(items) | Output::List(items) => items
                .iter()
                .map(Output::to_json)
                .collect::<anyhow::Result<Vec<_>>>()
                .map(Value::Array),
            Output::TransactionHash(hash) => Ok(Value::String(hash.clone())),
            Output::Pending(_) => Err(anyhow!("Cannot serialize a pending call")),
        }
    }
}

fn mismatch<T>(expected: &str, output: &Output) -> Result<T> {
    Err(ContractError::binding(format!(
        "Expected {}, got {} output",
        expected,
        output.kind()
    )))
}

/// Conversion from an [`Output`] into a native Rust value.
pub trait FromOutput: Sized {
    fn from_output(output: Output) -> Result<Self>;
}

impl FromOutput for Output {
    fn from_output(output: Output) -> Result<Self> {
        Ok(output)
    }
}

impl FromOutput for () {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Unit => Ok(()),
            other => mismatch("unit", &other),
        }
    }
}

impl FromOutput for U256 {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::Uint(value, _)) => Ok(value),
            other => mismatch("uint", &other),
        }
    }
}

impl FromOutput for u64 {
    fn from_output(output: Output) -> Result<Self> {
        let value = U256::from_output(output)?;
        u64::try_from(value)
            .map_err(|_| ContractError::binding(format!("Value {} does not fit in u64", value)))
    }
}

impl FromOutput for bool {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::Bool(value)) => Ok(value),
            other => mismatch("bool", &other),
        }
    }
}

impl FromOutput for Address {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::Address(value)) => Ok(value),
            other => mismatch("address", &other),
        }
    }
}

impl FromOutput for String {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::String(value)) | Output::TransactionHash(value) => Ok(value),
            other => mismatch("string", &other),
        }
    }
}

impl FromOutput for Vec<u8> {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::Bytes(value)) => Ok(value),
            other => mismatch("bytes", &other),
        }
    }
}

impl FromOutput for B256 {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Value(DynSolValue::FixedBytes(word, 32)) => Ok(word),
            other => mismatch("bytes32", &other),
        }
    }
}

impl FromOutput for PendingCall {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::Pending(pending) => Ok(pending),
            other => mismatch("pending call", &other),
        }
    }
}

impl<T: FromOutput> FromOutput for Vec<T> {
    fn from_output(output: Output) -> Result<Self> {
        match output {
            Output::List(items) => items.into_iter().map(T::from_output).collect(),
            other => mismatch("list", &other),
        }
    }
}

macro_rules! tuple_from_output {
    ($len:expr => $($name:ident),+) => {
        impl<$($name: FromOutput),+> FromOutput for ($($name,)+) {
            fn from_output(output: Output) -> Result<Self> {
                match output {
                    Output::Tuple(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($($name::from_output(
                            items.next().ok_or_else(|| ContractError::binding("Tuple too short"))?,
                        )?,)+))
                    }
                    Output::Tuple(items) => Err(ContractError::binding(format!(
                        "Expected a tuple of {} values, got {}",
                        $len,
                        items.len()
                    ))),
                    other => mismatch("tuple", &other),
                }
            }
        }
    };
}

tuple_from_output!(1 => A);
tuple_from_output!(2 => A, B);
tuple_from_output!(3 => A, B, C);
tuple_from_output!(4 => A, B, C, D);
