use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::interface::GasAnnotation;

/// Gas limit used when neither the call nor the interface says otherwise.
pub const DEFAULT_GAS_LIMIT: u64 = 4_300_000;

/// Gas price used when neither the call nor the interface says otherwise (22 Gwei).
pub const DEFAULT_GAS_PRICE: u64 = 22_000_000_000;

/// Value, gas limit and gas price attached to a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            value: U256::ZERO,
            gas_limit: U256::from(DEFAULT_GAS_LIMIT),
            gas_price: U256::from(DEFAULT_GAS_PRICE),
        }
    }
}

impl ExecutionOptions {
    pub fn new(value: U256, gas_limit: U256, gas_price: U256) -> Self {
        Self {
            value,
            gas_limit,
            gas_price,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

impl From<GasAnnotation> for ExecutionOptions {
    fn from(gas: GasAnnotation) -> Self {
        Self {
            value: U256::ZERO,
            gas_limit: U256::from(gas.limit),
            gas_price: U256::from(gas.price),
        }
    }
}

/// Pick the options for one call.
///
/// First match wins, fields are never merged: an explicit argument, then the method's gas
/// annotation, then the interface's gas annotation, then `default`.
pub fn resolve(
    explicit: Option<ExecutionOptions>,
    method_gas: Option<GasAnnotation>,
    interface_gas: Option<GasAnnotation>,
    default: ExecutionOptions,
) -> ExecutionOptions {
    explicit
        .or_else(|| method_gas.map(ExecutionOptions::from))
        .or_else(|| interface_gas.map(ExecutionOptions::from))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD_GAS: GasAnnotation = GasAnnotation {
        limit: 200_000,
        price: 30_000_000_000,
    };
    const INTERFACE_GAS: GasAnnotation = GasAnnotation {
        limit: 100_000,
        price: 10_000_000_000,
    };

    fn explicit() -> ExecutionOptions {
        ExecutionOptions::new(U256::from(7), U256::from(5_300_000), U256::from(24_000_000_000u64))
    }

    #[test]
    fn test_default_options() {
        let options = ExecutionOptions::default();
        assert_eq!(options.value, U256::ZERO);
        assert_eq!(options.gas_limit, U256::from(4_300_000));
        assert_eq!(options.gas_price, U256::from(22_000_000_000u64));
    }

    #[test]
    fn test_explicit_overrides_everything() {
        let resolved = resolve(
            Some(explicit()),
            Some(METHOD_GAS),
            Some(INTERFACE_GAS),
            ExecutionOptions::default(),
        );
        assert_eq!(resolved, explicit());
    }

    #[test]
    fn test_method_gas_overrides_interface_gas() {
        let resolved = resolve(
            None,
            Some(METHOD_GAS),
            Some(INTERFACE_GAS),
            ExecutionOptions::default(),
        );
        assert_eq!(resolved, ExecutionOptions::from(METHOD_GAS));
        assert_eq!(resolved.value, U256::ZERO);
    }

    #[test]
    fn test_interface_gas_overrides_default() {
        let resolved = resolve(None, None, Some(INTERFACE_GAS), ExecutionOptions::default());
        assert_eq!(resolved.gas_limit, U256::from(100_000));
        assert_eq!(resolved.gas_price, U256::from(10_000_000_000u64));
    }

    #[test]
    fn test_falls_back_to_default() {
        let default = ExecutionOptions::default().with_value(U256::from(1));
        assert_eq!(resolve(None, None, None, default), default);
    }
}
