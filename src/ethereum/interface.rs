//! Declarative description of a contract interface.
//!
//! Every method carries its call kind (read or write), parameter types, declared return
//! shape and optional gas annotation. The interface itself may carry a default gas
//! annotation. Descriptions are built in code or loaded from a TOML file:
//!
//! ```toml
//! name = "Greeter"
//!
//! [gas]
//! limit = 5300000
//! price = 24000000000
//!
//! [[methods]]
//! name = "greet"
//! kind = "read"
//! returns = "string"
//!
//! [[methods]]
//! name = "newGreeting"
//! kind = "write"
//! params = ["string", "options"]
//! returns = "future<string>"
//! ```

use alloy::dyn_abi::DynSolType;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

use super::utils;
use crate::error::{ContractError, Result};

/// Token used in parameter lists for the execution options slot.
const OPTIONS_PARAM: &str = "options";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// A query that does not change contract state.
    Read,
    /// A signed, state-changing transaction.
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasAnnotation {
    pub limit: u64,
    pub price: u64,
}

impl GasAnnotation {
    pub fn new(limit: u64, price: u64) -> Self {
        Self { limit, price }
    }
}

/// One slot of a method's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamType {
    Sol(DynSolType),
    /// Slot for a per-call `ExecutionOptions` argument.
    Options,
}

impl From<DynSolType> for ParamType {
    fn from(ty: DynSolType) -> Self {
        ParamType::Sol(ty)
    }
}

impl FromStr for ParamType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == OPTIONS_PARAM {
            return Ok(ParamType::Options);
        }
        DynSolType::parse(s)
            .map(ParamType::Sol)
            .map_err(|e| ContractError::configuration(format!("Invalid parameter type '{}': {}", s, e)))
    }
}

impl TryFrom<String> for ParamType {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ParamType> for String {
    fn from(value: ParamType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Sol(ty) => f.write_str(&ty.sol_type_name()),
            ParamType::Options => f.write_str(OPTIONS_PARAM),
        }
    }
}

/// Declared return shape of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReturnType {
    /// Nothing is returned.
    #[default]
    Unit,
    /// A single primitive value.
    Value(DynSolType),
    /// Several values; nested tuples are flattened into the function's outputs.
    Tuple(Vec<ReturnType>),
    /// A repeated element, returned as one array; the length is fixed when known.
    List(Box<ReturnType>, Option<usize>),
    /// A result handed back as a handle that completes later.
    Deferred(Box<ReturnType>),
}

impl ReturnType {
    pub fn deferred(inner: ReturnType) -> Self {
        ReturnType::Deferred(Box::new(inner))
    }

    pub fn list(element: ReturnType) -> Self {
        ReturnType::List(Box::new(element), None)
    }

    pub fn fixed_list(element: ReturnType, len: usize) -> Self {
        ReturnType::List(Box::new(element), Some(len))
    }

    fn from_sol_type(ty: DynSolType) -> Self {
        match ty {
            DynSolType::Tuple(fields) if fields.is_empty() => ReturnType::Unit,
            DynSolType::Tuple(fields) => {
                ReturnType::Tuple(fields.into_iter().map(Self::from_sol_type).collect())
            }
            DynSolType::Array(element) => ReturnType::list(Self::from_sol_type(*element)),
            DynSolType::FixedArray(element, len) => {
                ReturnType::fixed_list(Self::from_sol_type(*element), len)
            }
            other => ReturnType::Value(other),
        }
    }
}

impl FromStr for ReturnType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "()" {
            return Ok(ReturnType::Unit);
        }
        if let Some(inner) = s.strip_prefix("future<").and_then(|rest| rest.strip_suffix('>')) {
            return Ok(ReturnType::deferred(inner.parse()?));
        }
        DynSolType::parse(s)
            .map(Self::from_sol_type)
            .map_err(|e| ContractError::configuration(format!("Invalid return type '{}': {}", s, e)))
    }
}

impl TryFrom<String> for ReturnType {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ReturnType> for String {
    fn from(value: ReturnType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Unit => f.write_str("()"),
            ReturnType::Value(ty) => f.write_str(&ty.sol_type_name()),
            ReturnType::Tuple(fields) => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", field)?;
                }
                f.write_str(")")
            }
            ReturnType::List(element, None) => write!(f, "{}[]", element),
            ReturnType::List(element, Some(len)) => write!(f, "{}[{}]", element, len),
            ReturnType::Deferred(inner) => write!(f, "future<{}>", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    /// `None` when the method carries neither a read nor a write marker.
    #[serde(default)]
    pub kind: Option<CallKind>,
    #[serde(default)]
    pub params: Vec<ParamType>,
    #[serde(default)]
    pub returns: ReturnType,
    #[serde(default)]
    pub gas: Option<GasAnnotation>,
    /// Free-form tags inspected by call adapters.
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            params: Vec::new(),
            returns: ReturnType::Unit,
            gas: None,
            annotations: Vec::new(),
        }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self::new(name).kind(CallKind::Read)
    }

    pub fn write(name: impl Into<String>) -> Self {
        Self::new(name).kind(CallKind::Write)
    }

    pub fn kind(mut self, kind: CallKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn param(mut self, param: impl Into<ParamType>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn options_param(self) -> Self {
        self.param(ParamType::Options)
    }

    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = returns;
        self
    }

    pub fn gas(mut self, gas: GasAnnotation) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Solidity parameter types, options slot excluded.
    pub fn sol_params(&self) -> Vec<DynSolType> {
        self.params
            .iter()
            .filter_map(|param| match param {
                ParamType::Sol(ty) => Some(ty.clone()),
                ParamType::Options => None,
            })
            .collect()
    }

    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, params.join(","))
    }

    fn validate(&self) -> Result<()> {
        utils::validate_function_name(&self.name)
            .map_err(|e| ContractError::configuration(e.to_string()))?;

        let options_slots = self
            .params
            .iter()
            .filter(|param| **param == ParamType::Options)
            .count();
        if options_slots > 1 {
            return Err(ContractError::configuration(format!(
                "Method '{}' declares {} options parameters, at most one is allowed",
                self.signature(),
                options_slots
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInterface {
    pub name: String,
    /// Default gas annotation for every method without its own.
    #[serde(default)]
    pub gas: Option<GasAnnotation>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

impl ContractInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gas: None,
            methods: Vec::new(),
        }
    }

    pub fn gas(mut self, gas: GasAnnotation) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    /// All declared methods with the given name, in declaration order.
    pub fn overloads<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a MethodSpec> + 'a {
        let name = name.to_string();
        self.methods.iter().filter(move |method| method.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ContractError::configuration("Interface name cannot be empty"));
        }
        for method in &self.methods {
            method.validate()?;
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let interface: ContractInterface =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse interface: {}", e))?;
        interface.validate()?;
        Ok(interface)
    }

    /// Load an interface description from a TOML file
    pub async fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read interface file {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| anyhow!("{:?}: {}", path, e))
    }
}
