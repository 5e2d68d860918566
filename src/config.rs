use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ethereum::options::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE};
use crate::ethereum::ExecutionOptions;

/// Environment variable overriding `node.rpc_url`.
pub const RPC_URL_ENV: &str = "CONTRACT_CLIENT_RPC_URL";

/// Environment variable consulted for the signing key when none is set in the file.
pub const PRIVATE_KEY_ENV: &str = "CONTRACT_CLIENT_PRIVATE_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub contracts: HashMap<String, ContractConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub rpc_url: String,
    /// Asked from the node when unset.
    pub chain_id: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    pub private_key: Option<String>,
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_gas_limit: u64,
    pub default_gas_price: u64,
}

/// A named contract: where it lives and which interface file describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    pub interface: PathBuf,
}

fn default_private_key_env() -> String {
    PRIVATE_KEY_ENV.to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545/".to_string(),
            chain_id: None,
            timeout_secs: Some(30),
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            private_key_env: default_private_key_env(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            default_gas_limit: DEFAULT_GAS_LIMIT,
            default_gas_price: DEFAULT_GAS_PRICE,
        }
    }
}

impl GasConfig {
    /// Options applied when neither the call nor the interface names any.
    pub fn default_options(&self) -> ExecutionOptions {
        ExecutionOptions::new(
            U256::ZERO,
            U256::from(self.default_gas_limit),
            U256::from(self.default_gas_price),
        )
    }
}

impl SignerConfig {
    /// The configured key, falling back to the environment variable.
    pub fn resolve_private_key(&self) -> Option<String> {
        self.private_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(&self.private_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_vars(&mut self) {
        if let Ok(rpc_url) = std::env::var(RPC_URL_ENV) {
            if !rpc_url.trim().is_empty() {
                tracing::info!("Using {} environment variable for the RPC URL", RPC_URL_ENV);
                self.node.rpc_url = rpc_url;
            }
        }

        if self.signer.private_key.is_some() {
            tracing::warn!(
                "Private key stored in the config file; prefer the {} environment variable",
                self.signer.private_key_env
            );
        }
    }

    /// Look up a named contract
    pub fn contract(&self, name: &str) -> Result<&ContractConfig> {
        self.contracts.get(name).ok_or_else(|| {
            let mut known: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
            known.sort_unstable();
            anyhow!(
                "Unknown contract '{}'. Configured contracts: {}",
                name,
                known.join(", ")
            )
        })
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("contract-client").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Contract client configuration file

[node]
rpc_url = "http://localhost:8545/"
# chain_id = 31337       # asked from the node when omitted
timeout_secs = 30

[signer]
# Read from the environment unless private_key is set here
private_key_env = "CONTRACT_CLIENT_PRIVATE_KEY"
# private_key = "0x..."

# Used when neither the call nor the interface specifies gas
[gas]
default_gas_limit = 4300000
default_gas_price = 22000000000  # 22 Gwei

# Named contracts for --contract
[contracts.greeter]
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
interface = "interfaces/greeter.toml"

# Environment variables that can be used:
# CONTRACT_CLIENT_RPC_URL - overrides node.rpc_url
# CONTRACT_CLIENT_PRIVATE_KEY - signing key for write calls
"#;
        sample_config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.node.rpc_url, "http://localhost:8545/");
        assert_eq!(config.gas.default_gas_limit, 4_300_000);
        assert_eq!(config.signer.private_key_env, PRIVATE_KEY_ENV);
        assert_eq!(
            config.contract("greeter").unwrap().interface,
            PathBuf::from("interfaces/greeter.toml")
        );
        assert!(config.contract("missing").is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[node]\nrpc_url = \"http://node:8545\"\n").unwrap();
        assert_eq!(config.node.rpc_url, "http://node:8545");
        assert_eq!(config.node.timeout_secs, None);
        assert_eq!(config.gas.default_options(), ExecutionOptions::default());
        assert!(config.contracts.is_empty());
    }

    #[test]
    fn test_gas_default_options() {
        let gas = GasConfig {
            default_gas_limit: 21_000,
            default_gas_price: 1_000_000_000,
        };
        let options = gas.default_options();
        assert_eq!(options.value, U256::ZERO);
        assert_eq!(options.gas_limit, U256::from(21_000));
        assert_eq!(options.gas_price, U256::from(1_000_000_000u64));
    }

    #[test]
    fn test_signer_key_from_file_or_env() {
        let signer = SignerConfig {
            private_key: Some("0xabc".to_string()),
            private_key_env: "CONTRACT_CLIENT_TEST_UNUSED_KEY".to_string(),
        };
        assert_eq!(signer.resolve_private_key().as_deref(), Some("0xabc"));

        let env_name = "CONTRACT_CLIENT_TEST_SIGNER_KEY";
        std::env::set_var(env_name, "0xdef");
        let signer = SignerConfig {
            private_key: None,
            private_key_env: env_name.to_string(),
        };
        assert_eq!(signer.resolve_private_key().as_deref(), Some("0xdef"));
        std::env::remove_var(env_name);
        assert_eq!(signer.resolve_private_key(), None);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.node.chain_id = Some(31337);
        config.contracts.insert(
            "token".to_string(),
            ContractConfig {
                address: "0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e".to_string(),
                interface: PathBuf::from("token.toml"),
            },
        );
        config.save_to_file(&path).await.unwrap();

        let loaded = Config::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.node.chain_id, Some(31337));
        assert_eq!(loaded.contract("token").unwrap(), config.contract("token").unwrap());
    }

    #[tokio::test]
    async fn test_load_or_default_falls_back() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(Some(dir.path().join("absent.toml"))).await;
        assert!(config.contracts.is_empty());
        assert_eq!(config.gas.default_gas_price, DEFAULT_GAS_PRICE);
    }
}
