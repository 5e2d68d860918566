use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::keccak256,
};

use super::interface::ReturnType;
use super::output::Output;
use crate::error::{ContractError, Result};

/// Protocol-neutral description of one function invocation.
///
/// Built fresh for every call and dropped once the call completes.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub arguments: Vec<(DynSolValue, DynSolType)>,
    pub return_types: Vec<DynSolType>,
}

impl FunctionDescriptor {
    /// Pair each argument with its declared type and expand the return shape.
    pub fn build(
        name: &str,
        args: Vec<DynSolValue>,
        param_types: &[DynSolType],
        returns: &ReturnType,
    ) -> Result<Self> {
        if args.len() != param_types.len() {
            return Err(ContractError::configuration(format!(
                "Function '{}' takes {} arguments, got {}",
                name,
                param_types.len(),
                args.len()
            )));
        }

        let mut arguments = Vec::with_capacity(args.len());
        for (i, (value, ty)) in args.into_iter().zip(param_types).enumerate() {
            let value = coerce(ty, value).ok_or_else(|| {
                ContractError::configuration(format!(
                    "Argument #{} of '{}' does not match declared type '{}'",
                    i + 1,
                    name,
                    ty.sol_type_name()
                ))
            })?;
            arguments.push((value, ty.clone()));
        }

        let descriptor = Self {
            name: name.to_string(),
            arguments,
            return_types: returns.type_signatures(),
        };
        tracing::debug!("Built function descriptor {}", descriptor.signature());
        Ok(descriptor)
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self
            .arguments
            .iter()
            .map(|(_, ty)| ty.sol_type_name().into_owned())
            .collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn argument_types(&self) -> Vec<DynSolType> {
        self.arguments.iter().map(|(_, ty)| ty.clone()).collect()
    }

    pub fn argument_values(&self) -> Vec<DynSolValue> {
        self.arguments.iter().map(|(value, _)| value.clone()).collect()
    }
}

/// Check `value` against `ty`, re-sizing integers to the declared width when they fit.
pub(crate) fn coerce(ty: &DynSolType, value: DynSolValue) -> Option<DynSolValue> {
    match (ty, value) {
        (DynSolType::Uint(size), DynSolValue::Uint(v, _)) => {
            (v.bit_len() <= *size).then_some(DynSolValue::Uint(v, *size))
        }
        (DynSolType::Int(size), DynSolValue::Int(v, _)) => {
            (v.bits() as usize <= *size).then_some(DynSolValue::Int(v, *size))
        }
        (DynSolType::Array(element), DynSolValue::Array(values)) => values
            .into_iter()
            .map(|v| coerce(element, v))
            .collect::<Option<Vec<_>>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(element, len), DynSolValue::FixedArray(values))
            if values.len() == *len =>
        {
            values
                .into_iter()
                .map(|v| coerce(element, v))
                .collect::<Option<Vec<_>>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolType::Tuple(types), DynSolValue::Tuple(values)) if values.len() == types.len() => {
            types
                .iter()
                .zip(values)
                .map(|(ty, v)| coerce(ty, v))
                .collect::<Option<Vec<_>>>()
                .map(DynSolValue::Tuple)
        }
        (ty, value) => ty.matches(&value).then_some(value),
    }
}

impl ReturnType {
    /// Output types of the target function, in order.
    ///
    /// Tuples are flattened recursively; a list is a single array whose element keeps its
    /// tuple structure.
    pub fn type_signatures(&self) -> Vec<DynSolType> {
        match self {
            ReturnType::Unit => Vec::new(),
            ReturnType::Tuple(fields) => fields.iter().flat_map(|f| f.type_signatures()).collect(),
            ReturnType::Deferred(inner) => inner.type_signatures(),
            other => vec![other.element_type()],
        }
    }

    fn element_type(&self) -> DynSolType {
        match self {
            ReturnType::Unit => DynSolType::Tuple(Vec::new()),
            ReturnType::Value(ty) => ty.clone(),
            ReturnType::Tuple(fields) => {
                DynSolType::Tuple(fields.iter().map(|f| f.element_type()).collect())
            }
            ReturnType::List(element, None) => DynSolType::Array(Box::new(element.element_type())),
            ReturnType::List(element, Some(len)) => {
                DynSolType::FixedArray(Box::new(element.element_type()), *len)
            }
            ReturnType::Deferred(inner) => inner.element_type(),
        }
    }

    /// Rebuild the declared shape from decoded output values.
    pub fn reconstruct(&self, values: Vec<DynSolValue>) -> Result<Output> {
        let expected = self.type_signatures().len();
        if values.len() != expected {
            return Err(ContractError::binding(format!(
                "Return type '{}' expects {} values, decoded {}",
                self,
                expected,
                values.len()
            )));
        }
        self.take(&mut values.into_iter())
    }

    fn take(&self, values: &mut impl Iterator<Item = DynSolValue>) -> Result<Output> {
        match self {
            ReturnType::Unit => Ok(Output::Unit),
            ReturnType::Tuple(fields) => fields
                .iter()
                .map(|field| field.take(values))
                .collect::<Result<Vec<_>>>()
                .map(Output::Tuple),
            ReturnType::Deferred(_) => Err(ContractError::binding(format!(
                "Return type '{}' needs a deferred call adapter",
                self
            ))),
            other => {
                let value = values.next().ok_or_else(|| {
                    ContractError::binding(format!("Missing value for '{}'", other))
                })?;
                other.bind(value)
            }
        }
    }

    fn bind(&self, value: DynSolValue) -> Result<Output> {
        match (self, value) {
            (ReturnType::Unit, DynSolValue::Tuple(values)) if values.is_empty() => Ok(Output::Unit),
            (ReturnType::Value(ty), value) if ty.matches(&value) => Ok(Output::Value(value)),
            (ReturnType::Tuple(fields), DynSolValue::Tuple(values))
                if fields.len() == values.len() =>
            {
                fields
                    .iter()
                    .zip(values)
                    .map(|(field, value)| field.bind(value))
                    .collect::<Result<Vec<_>>>()
                    .map(Output::Tuple)
            }
            (ReturnType::List(element, None), DynSolValue::Array(values)) => values
                .into_iter()
                .map(|value| element.bind(value))
                .collect::<Result<Vec<_>>>()
                .map(Output::List),
            (ReturnType::List(element, Some(len)), DynSolValue::FixedArray(values))
                if values.len() == *len =>
            {
                values
                    .into_iter()
                    .map(|value| element.bind(value))
                    .collect::<Result<Vec<_>>>()
                    .map(Output::List)
            }
            (declared, value) => Err(ContractError::binding(format!(
                "Cannot bind decoded value {:?} to '{}'",
                value, declared
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::abi;
    use alloy::primitives::{Address, U256};

    fn uint(v: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(v), 256)
    }

    fn returns(text: &str) -> ReturnType {
        text.parse().unwrap()
    }

    #[test]
    fn test_build_descriptor() {
        let to = Address::repeat_byte(0xbb);
        let descriptor = FunctionDescriptor::build(
            "transfer",
            vec![DynSolValue::Address(to), DynSolValue::Uint(U256::from(5), 8)],
            &[DynSolType::Address, DynSolType::Uint(256)],
            &returns("bool"),
        )
        .unwrap();

        assert_eq!(descriptor.signature(), "transfer(address,uint256)");
        assert_eq!(descriptor.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(descriptor.argument_values()[1], uint(5));
        assert_eq!(descriptor.return_types, vec![DynSolType::Bool]);
    }

    #[test]
    fn test_build_rejects_mismatched_arguments() {
        let err = FunctionDescriptor::build(
            "balanceOf",
            vec![DynSolValue::Bool(true)],
            &[DynSolType::Address],
            &returns("uint256"),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Configuration(_)));

        let too_wide = FunctionDescriptor::build(
            "set",
            vec![uint(300)],
            &[DynSolType::Uint(8)],
            &ReturnType::Unit,
        );
        assert!(too_wide.is_err());

        let missing = FunctionDescriptor::build("set", vec![], &[DynSolType::Uint(8)], &ReturnType::Unit);
        assert!(missing.is_err());
    }

    #[test]
    fn test_type_signatures_flatten_nested_tuples() {
        assert!(ReturnType::Unit.type_signatures().is_empty());
        assert_eq!(
            returns("(uint256,(address,bool))").type_signatures(),
            vec![DynSolType::Uint(256), DynSolType::Address, DynSolType::Bool]
        );
        assert_eq!(
            returns("(uint256,address)[]").type_signatures(),
            vec![DynSolType::Array(Box::new(DynSolType::Tuple(vec![
                DynSolType::Uint(256),
                DynSolType::Address,
            ])))]
        );
        assert_eq!(
            returns("future<string>").type_signatures(),
            vec![DynSolType::String]
        );
    }

    #[test]
    fn test_reconstruct_primitive() {
        let output = returns("uint256").reconstruct(vec![uint(100)]).unwrap();
        assert_eq!(output, Output::Value(uint(100)));
    }

    #[test]
    fn test_reconstruct_nested_tuple() {
        let output = returns("(uint256,(bool,string))")
            .reconstruct(vec![
                uint(1),
                DynSolValue::Bool(true),
                DynSolValue::String("hi".into()),
            ])
            .unwrap();
        assert_eq!(
            output,
            Output::Tuple(vec![
                Output::Value(uint(1)),
                Output::Tuple(vec![
                    Output::Value(DynSolValue::Bool(true)),
                    Output::Value(DynSolValue::String("hi".into())),
                ]),
            ])
        );
    }

    #[test]
    fn test_reconstruct_list_of_tuples() {
        let owner = Address::repeat_byte(0x11);
        let output = returns("(uint256,address)[]")
            .reconstruct(vec![DynSolValue::Array(vec![
                DynSolValue::Tuple(vec![uint(1), DynSolValue::Address(owner)]),
                DynSolValue::Tuple(vec![uint(2), DynSolValue::Address(owner)]),
            ])])
            .unwrap();
        assert_eq!(
            output,
            Output::List(vec![
                Output::Tuple(vec![Output::Value(uint(1)), Output::Value(DynSolValue::Address(owner))]),
                Output::Tuple(vec![Output::Value(uint(2)), Output::Value(DynSolValue::Address(owner))]),
            ])
        );
    }

    #[test]
    fn test_reconstruct_fixed_list_of_tuples() {
        let owner = Address::repeat_byte(0x22);
        let declared = returns("(uint256,address)[2]");
        assert_eq!(
            declared.type_signatures(),
            vec![DynSolType::FixedArray(
                Box::new(DynSolType::Tuple(vec![DynSolType::Uint(256), DynSolType::Address])),
                2
            )]
        );

        let row = |n| DynSolValue::Tuple(vec![uint(n), DynSolValue::Address(owner)]);
        let output = declared
            .reconstruct(vec![DynSolValue::FixedArray(vec![row(1), row(2)])])
            .unwrap();
        let rows: Vec<(U256, Address)> = crate::ethereum::output::FromOutput::from_output(output).unwrap();
        assert_eq!(rows, vec![(U256::from(1), owner), (U256::from(2), owner)]);

        let err = declared
            .reconstruct(vec![DynSolValue::FixedArray(vec![row(1)])])
            .unwrap_err();
        assert!(matches!(err, ContractError::Binding(_)));
    }

    #[test]
    fn test_reconstruct_arity_mismatch_is_binding_error() {
        let err = returns("(uint256,bool)").reconstruct(vec![uint(1)]).unwrap_err();
        assert!(matches!(err, ContractError::Binding(_)));

        let err = returns("uint256")
            .reconstruct(vec![DynSolValue::Bool(false)])
            .unwrap_err();
        assert!(matches!(err, ContractError::Binding(_)));

        let err = returns("(uint256,bool)[]")
            .reconstruct(vec![DynSolValue::Array(vec![DynSolValue::Tuple(vec![uint(1)])])])
            .unwrap_err();
        assert!(matches!(err, ContractError::Binding(_)));
    }

    #[test]
    fn test_roundtrip_through_codec() {
        let owner = Address::repeat_byte(0x42);
        let cases = vec![
            (returns("uint256"), vec![uint(100)]),
            (
                returns("(uint256,address,string)"),
                vec![uint(7), DynSolValue::Address(owner), DynSolValue::String("seven".into())],
            ),
            (
                returns("bool[3]"),
                vec![DynSolValue::FixedArray(vec![
                    DynSolValue::Bool(true),
                    DynSolValue::Bool(false),
                    DynSolValue::Bool(true),
                ])],
            ),
            (
                returns("(uint256,bool)[]"),
                vec![DynSolValue::Array(vec![
                    DynSolValue::Tuple(vec![uint(1), DynSolValue::Bool(true)]),
                    DynSolValue::Tuple(vec![uint(2), DynSolValue::Bool(false)]),
                ])],
            ),
        ];

        for (declared, values) in cases {
            let encoded = DynSolValue::Tuple(values.clone()).abi_encode_params();
            let decoded = abi::decode_parameters(&declared.type_signatures(), &encoded).unwrap();
            assert_eq!(decoded, values);

            let expected = declared.reconstruct(values).unwrap();
            assert_eq!(declared.reconstruct(decoded).unwrap(), expected);
        }
    }
}
