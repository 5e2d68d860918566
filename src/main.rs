use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use contract_client::config::Config;
use contract_client::ethereum::abi::json_to_dyn_sol_value;
use contract_client::ethereum::client::{self, ContractFactory};
use contract_client::ethereum::interface::{ContractInterface, MethodSpec, ParamType};
use contract_client::ethereum::utils::parse_amount;
use contract_client::{ExecutionOptions, Output, SpawnAdapter};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("contract-client")
        .version("0.1.0")
        .about("Invoke smart contract methods from an interface description")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("contract")
                .long("contract")
                .value_name("NAME")
                .help("Named contract from the configuration file")
                .conflicts_with_all(["address", "interface"]),
        )
        .arg(
            Arg::new("address")
                .long("address")
                .value_name("ADDRESS")
                .help("Contract address")
                .requires("interface"),
        )
        .arg(
            Arg::new("interface")
                .long("interface")
                .value_name("FILE")
                .help("Interface description (TOML)")
                .requires("address"),
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("NAME")
                .help("Method to invoke"),
        )
        .arg(
            Arg::new("args")
                .short('a')
                .long("args")
                .value_name("JSON")
                .help("Method arguments as a JSON array"),
        )
        .arg(
            Arg::new("value")
                .long("value")
                .value_name("WEI")
                .help("Wei sent along with the call"),
        )
        .arg(
            Arg::new("gas-limit")
                .long("gas-limit")
                .value_name("GAS")
                .help("Gas limit for the call"),
        )
        .arg(
            Arg::new("gas-price")
                .long("gas-price")
                .value_name("WEI")
                .help("Gas price for the call"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("generate-config") {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.node.rpc_url = rpc_url.clone();
    }

    let method = matches
        .get_one::<String>("method")
        .ok_or_else(|| anyhow!("--method is required"))?;

    let (address, interface_path) = match matches.get_one::<String>("contract") {
        Some(name) => {
            let contract = config.contract(name)?;
            (contract.address.clone(), contract.interface.clone())
        }
        None => match (
            matches.get_one::<String>("address"),
            matches.get_one::<String>("interface"),
        ) {
            (Some(address), Some(interface)) => (address.clone(), PathBuf::from(interface)),
            _ => return Err(anyhow!("Either --contract or --address with --interface is required")),
        },
    };

    let interface = ContractInterface::load(&interface_path).await?;
    let args = parse_json_args(matches.get_one::<String>("args").map(|s| s.as_str()))?;
    let options = call_options(
        &config,
        matches.get_one::<String>("value").map(|s| s.as_str()),
        matches.get_one::<String>("gas-limit").map(|s| s.as_str()),
        matches.get_one::<String>("gas-price").map(|s| s.as_str()),
    )?;

    let (spec, call_args) = select_overload(&interface, method, &args, options)?;
    let signature = spec.signature();

    info!("Using node {}", config.node.rpc_url);
    let factory: ContractFactory = client::ClientBuilder::from_config(&config)?
        .add_call_adapter(Arc::new(SpawnAdapter))
        .build()?;
    let contract = factory.create(&address, interface)?;

    info!("Invoking {} on {}", signature, contract.address());
    let output = match contract.invoke(method, call_args).await? {
        Output::Pending(pending) => pending.wait().await?,
        output => output,
    };

    println!("{}", serde_json::to_string_pretty(&output.to_json()?)?);
    Ok(())
}

fn parse_json_args(args: Option<&str>) -> Result<Vec<Value>> {
    match args {
        None => Ok(Vec::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw)
            .map_err(|e| anyhow!("--args is not valid JSON: {}", e))?
        {
            Value::Array(values) => Ok(values),
            _ => Err(anyhow!("--args must be a JSON array")),
        },
    }
}

/// Explicit options when any of value, gas limit or gas price was given on the command line.
fn call_options(
    config: &Config,
    value: Option<&str>,
    gas_limit: Option<&str>,
    gas_price: Option<&str>,
) -> Result<Option<ExecutionOptions>> {
    if value.is_none() && gas_limit.is_none() && gas_price.is_none() {
        return Ok(None);
    }

    let mut options = config.gas.default_options();
    if let Some(value) = value {
        options.value = parse_amount(value)?;
    }
    if let Some(gas_limit) = gas_limit {
        options.gas_limit = parse_amount(gas_limit)?;
    }
    if let Some(gas_price) = gas_price {
        options.gas_price = parse_amount(gas_price)?;
    }
    Ok(Some(options))
}

/// First overload, in declaration order, whose parameters accept the JSON arguments.
///
/// The client resolves overloads the same way, so the converted arguments land on the
/// overload chosen here.
fn select_overload<'a>(
    interface: &'a ContractInterface,
    method: &str,
    args: &[Value],
    options: Option<ExecutionOptions>,
) -> Result<(&'a MethodSpec, Vec<client::Arg>)> {
    let mut rejected = Vec::new();
    for spec in interface.overloads(method) {
        if spec.sol_params().len() != args.len()
            || spec.params.contains(&ParamType::Options) != options.is_some()
        {
            continue;
        }
        match build_call_args(spec, args, options) {
            Ok(call_args) => return Ok((spec, call_args)),
            Err(e) => rejected.push(format!("{}: {}", spec.signature(), e)),
        }
    }

    if rejected.is_empty() {
        Err(anyhow!(
            "No overload of '{}' in {} takes {} arguments{}",
            method,
            interface.name,
            args.len(),
            if options.is_some() { " plus call options" } else { "" }
        ))
    } else {
        Err(anyhow!(
            "Arguments do not fit any overload of '{}': {}",
            method,
            rejected.join("; ")
        ))
    }
}

fn build_call_args(
    spec: &MethodSpec,
    args: &[Value],
    options: Option<ExecutionOptions>,
) -> Result<Vec<client::Arg>> {
    let mut json_args = args.iter();
    let mut call_args = Vec::with_capacity(spec.params.len());
    for param in &spec.params {
        match param {
            ParamType::Options => {
                if let Some(options) = options {
                    call_args.push(client::Arg::Options(options));
                }
            }
            ParamType::Sol(ty) => {
                let value = json_args
                    .next()
                    .ok_or_else(|| anyhow!("Missing argument of type '{}'", ty.sol_type_name()))?;
                call_args.push(client::Arg::Value(json_to_dyn_sol_value(value, ty)?));
            }
        }
    }
    Ok(call_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::dyn_abi::{DynSolType, DynSolValue};
    use alloy::primitives::U256;
    use serde_json::json;

    fn setter() -> ContractInterface {
        ContractInterface::new("Store")
            .method(MethodSpec::write("set").param(DynSolType::Uint(8)))
            .method(MethodSpec::write("set").param(DynSolType::Uint(256)))
            .method(MethodSpec::write("set").param(DynSolType::Uint(256)).options_param())
    }

    #[test]
    fn test_select_overload_skips_out_of_range_arguments() {
        let interface = setter();

        let (spec, args) = select_overload(&interface, "set", &[json!(7)], None).unwrap();
        assert_eq!(spec.signature(), "set(uint8)");
        assert_eq!(args, vec![client::Arg::Value(DynSolValue::Uint(U256::from(7), 8))]);

        let (spec, args) = select_overload(&interface, "set", &[json!(300)], None).unwrap();
        assert_eq!(spec.signature(), "set(uint256)");
        assert_eq!(args, vec![client::Arg::Value(DynSolValue::Uint(U256::from(300), 256))]);
    }

    #[test]
    fn test_select_overload_with_options() {
        let interface = setter();
        let options = ExecutionOptions::default().with_value(U256::from(1));

        let (_, args) = select_overload(&interface, "set", &[json!("5")], Some(options)).unwrap();
        assert_eq!(
            args,
            vec![
                client::Arg::Value(DynSolValue::Uint(U256::from(5), 256)),
                client::Arg::Options(options),
            ]
        );

        assert!(select_overload(&interface, "set", &[], None).is_err());
        assert!(select_overload(&interface, "set", &[json!(true)], None).is_err());
    }
}
