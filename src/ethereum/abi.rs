use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Word},
    primitives::{Address, Bytes, I256, U256},
};
use anyhow::{anyhow, Result as AnyResult};
use serde_json::Value;
use std::str::FromStr;

use super::descriptor::FunctionDescriptor;
use crate::error::{ContractError, Result};

/// Selector followed by the ABI-encoded arguments.
pub fn encode_function_call(descriptor: &FunctionDescriptor) -> Result<Bytes> {
    let arguments = DynSolValue::Tuple(descriptor.argument_values());
    let mut data = descriptor.selector().to_vec();
    data.extend_from_slice(&arguments.abi_encode_params());
    Ok(data.into())
}

/// Decode return data against the given output types.
pub fn decode_parameters(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }

    if data.is_empty() {
        return Err(ContractError::Codec(
            "Empty return data; the contract may not exist or the function may not return anything"
                .to_string(),
        ));
    }

    let decoded = DynSolType::Tuple(types.to_vec())
        .abi_decode_params(data)
        .map_err(|e| ContractError::Codec(format!("Failed to decode output: {}", e)))?;

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Convert a JSON value into a `DynSolValue` of the expected Solidity type
pub fn json_to_dyn_sol_value(value: &Value, sol_type: &DynSolType) -> AnyResult<DynSolValue> {
    match sol_type {
        DynSolType::Address => {
            let addr_str = value
                .as_str()
                .ok_or_else(|| anyhow!("Address must be a string"))?;
            Ok(DynSolValue::Address(Address::from_str(addr_str)?))
        }
        DynSolType::Uint(size) => {
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| anyhow!("Invalid uint value: {}", n))?,
                Value::String(s) => parse_uint(s)?,
                _ => return Err(anyhow!("Uint must be a number or string")),
            };
            if num.bit_len() > *size {
                return Err(anyhow!("Value {} does not fit in uint{}", num, size));
            }
            Ok(DynSolValue::Uint(num, *size))
        }
        DynSolType::Int(size) => {
            let num = match value {
                Value::Number(n) => I256::from_str(&n.to_string())
                    .map_err(|_| anyhow!("Invalid int value: {}", n))?,
                Value::String(s) => {
                    I256::from_str(s).map_err(|_| anyhow!("Invalid int string: {}", s))?
                }
                _ => return Err(anyhow!("Int must be a number or string")),
            };
            if !int_fits(num, *size) {
                return Err(anyhow!("Value {} does not fit in int{}", num, size));
            }
            Ok(DynSolValue::Int(num, *size))
        }
        DynSolType::String => {
            let s = value
                .as_str()
                .ok_or_else(|| anyhow!("String parameter must be a string"))?;
            Ok(DynSolValue::String(s.to_string()))
        }
        DynSolType::Bool => {
            let b = value
                .as_bool()
                .ok_or_else(|| anyhow!("Bool parameter must be a boolean"))?;
            Ok(DynSolValue::Bool(b))
        }
        DynSolType::FixedBytes(size) => {
            let bytes = hex_bytes(value)?;
            if bytes.len() > *size {
                return Err(anyhow!(
                    "Expected at most {} bytes, got {}",
                    size,
                    bytes.len()
                ));
            }

            let mut word_bytes = [0u8; 32];
            word_bytes[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(Word::from(word_bytes), *size))
        }
        DynSolType::Bytes => Ok(DynSolValue::Bytes(hex_bytes(value)?)),
        DynSolType::Array(element_type) => {
            let array = value
                .as_array()
                .ok_or_else(|| anyhow!("Array parameter must be an array"))?;
            let elements = array
                .iter()
                .map(|element| json_to_dyn_sol_value(element, element_type))
                .collect::<AnyResult<Vec<_>>>()?;
            Ok(DynSolValue::Array(elements))
        }
        DynSolType::FixedArray(element_type, len) => {
            let array = value
                .as_array()
                .ok_or_else(|| anyhow!("Array parameter must be an array"))?;
            if array.len() != *len {
                return Err(anyhow!("Expected {} elements, got {}", len, array.len()));
            }
            let elements = array
                .iter()
                .map(|element| json_to_dyn_sol_value(element, element_type))
                .collect::<AnyResult<Vec<_>>>()?;
            Ok(DynSolValue::FixedArray(elements))
        }
        DynSolType::Tuple(types) => {
            let array = value
                .as_array()
                .ok_or_else(|| anyhow!("Tuple parameter must be an array"))?;
            if array.len() != types.len() {
                return Err(anyhow!(
                    "Expected a tuple of {} values, got {}",
                    types.len(),
                    array.len()
                ));
            }
            let fields = array
                .iter()
                .zip(types)
                .map(|(field, ty)| json_to_dyn_sol_value(field, ty))
                .collect::<AnyResult<Vec<_>>>()?;
            Ok(DynSolValue::Tuple(fields))
        }
        other => Err(anyhow!("Unsupported Solidity type: {}", other.sol_type_name())),
    }
}

/// Convert a single `DynSolValue` to JSON
pub fn dyn_sol_value_to_json(value: &DynSolValue) -> AnyResult<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(format!("0x{:x}", addr))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word[..*size])
        ))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items
                .iter()
                .map(dyn_sol_value_to_json)
                .collect::<AnyResult<Vec<_>>>()
                .map(Value::Array)
        }
        _ => Err(anyhow!("Unsupported DynSolValue type: {:?}", value)),
    }
}

fn int_fits(num: I256, size: usize) -> bool {
    if size >= 256 {
        return true;
    }
    let limit = U256::from(1) << (size - 1);
    let magnitude = num.unsigned_abs();
    if num.is_negative() {
        magnitude <= limit
    } else {
        magnitude < limit
    }
}

fn parse_uint(s: &str) -> AnyResult<U256> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_part) => U256::from_str_radix(hex_part, 16),
        None => U256::from_str_radix(s, 10),
    }
    .map_err(|_| anyhow!("Invalid uint string: {}", s))
}

fn hex_bytes(value: &Value) -> AnyResult<Vec<u8>> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| anyhow!("Bytes must be a hex string"))?;
    hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|_| anyhow!("Invalid hex string: {}", hex_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::interface::ReturnType;
    use serde_json::json;

    #[test]
    fn test_encode_balance_of() {
        let owner = Address::repeat_byte(0xaa);
        let descriptor = FunctionDescriptor::build(
            "balanceOf",
            vec![DynSolValue::Address(owner)],
            &[DynSolType::Address],
            &ReturnType::Value(DynSolType::Uint(256)),
        )
        .unwrap();

        let data = encode_function_call(&descriptor).unwrap();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(&data[16..36], owner.as_slice());
    }

    #[test]
    fn test_decode_parameters() {
        let encoded = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(100), 256)])
            .abi_encode_params();
        let values = decode_parameters(&[DynSolType::Uint(256)], &encoded).unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(100), 256)]);

        assert!(decode_parameters(&[], &[]).unwrap().is_empty());
        assert!(matches!(
            decode_parameters(&[DynSolType::Uint(256)], &[]),
            Err(ContractError::Codec(_))
        ));
    }

    #[test]
    fn test_json_conversion() {
        let ty = DynSolType::parse("(address,uint256,bool[])").unwrap();
        let value = json_to_dyn_sol_value(
            &json!(["0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e", "0x10", [true, false]]),
            &ty,
        )
        .unwrap();
        assert!(ty.matches(&value));

        let DynSolValue::Tuple(fields) = &value else {
            panic!("expected a tuple");
        };
        assert_eq!(fields[1], DynSolValue::Uint(U256::from(16), 256));

        assert_eq!(
            dyn_sol_value_to_json(&value).unwrap(),
            json!(["0x742d35cc6435c9c1c72c5e7b18bab7e1db7a5d6e", "16", [true, false]])
        );
    }

    #[test]
    fn test_json_integer_bounds() {
        assert_eq!(
            json_to_dyn_sol_value(&json!(255), &DynSolType::Uint(8)).unwrap(),
            DynSolValue::Uint(U256::from(255), 8)
        );
        assert!(json_to_dyn_sol_value(&json!(127), &DynSolType::Int(8)).is_ok());
        assert!(json_to_dyn_sol_value(&json!(-128), &DynSolType::Int(8)).is_ok());
        assert!(json_to_dyn_sol_value(&json!("-1"), &DynSolType::Int(256)).is_ok());
    }

    #[test]
    fn test_json_conversion_errors() {
        assert!(json_to_dyn_sol_value(&json!(12), &DynSolType::Address).is_err());
        assert!(json_to_dyn_sol_value(&json!(300), &DynSolType::Uint(8)).is_err());
        assert!(json_to_dyn_sol_value(&json!("0x100"), &DynSolType::Uint(8)).is_err());
        assert!(json_to_dyn_sol_value(&json!(128), &DynSolType::Int(8)).is_err());
        assert!(json_to_dyn_sol_value(&json!(-129), &DynSolType::Int(8)).is_err());
        assert!(json_to_dyn_sol_value(&json!("abc"), &DynSolType::Uint(256)).is_err());
        assert!(json_to_dyn_sol_value(&json!("0x0102"), &DynSolType::FixedBytes(1)).is_err());
        assert!(json_to_dyn_sol_value(&json!([1]), &DynSolType::FixedArray(Box::new(DynSolType::Uint(8)), 2)).is_err());
    }
}
