//! Daemon configuration.
//!
//! Settings come from two places: an optional JSON file keyed by network
//! name, and command-line flags (each backed by an environment variable).
//! Flags win over the file. The registry endpoint and address must be known
//! from one of the two or startup fails.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use ledger_gateway::{BlockOffset, GatewayConfig, DEFAULT_GAS_LIMIT};
use oracle_core::{DispatchConfig, RegistrationConfig, DEFAULT_CAPACITY};
use serde::Deserialize;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// JSON file with per-network endpoints, e.g. {"localhost": {"url": ..., "appAddress": ...}}
    #[arg(long, env = "ORACLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network entry to read from the config file
    #[arg(long, env = "ORACLE_NETWORK", default_value = "localhost")]
    pub network: String,

    /// Registry JSON-RPC endpoint (overrides the file)
    #[arg(long, env = "ORACLE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Registry contract address (overrides the file)
    #[arg(long, env = "ORACLE_REGISTRY_ADDRESS")]
    pub registry_address: Option<String>,

    /// Maximum number of oracle agents to register
    #[arg(long, env = "ORACLE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Block to start the request subscription from
    #[arg(long, env = "ORACLE_FROM_BLOCK", default_value_t = 0)]
    pub from_block: u64,

    /// Gas limit for registration and submission calls
    #[arg(long, env = "ORACLE_GAS_LIMIT", default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Give up on a single ledger call after this many seconds
    #[arg(long, env = "ORACLE_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    /// Delay between request subscription polls
    #[arg(long, env = "ORACLE_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Address for the liveness endpoint
    #[arg(long, env = "ORACLE_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,
}

/// One network entry of the config file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub url: Option<String>,
    pub app_address: Option<String>,
}

/// Config file contents: network name to entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct NetworkFile(HashMap<String, NetworkEntry>);

impl NetworkFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn network(&self, name: &str) -> Option<&NetworkEntry> {
        self.0.get(name)
    }
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway: GatewayConfig,
    pub registration: RegistrationConfig,
    pub dispatch: DispatchConfig,
    pub listen: SocketAddr,
}

impl Settings {
    pub fn resolve(args: &ConfigArgs) -> Result<Self> {
        let entry = match &args.config {
            Some(path) => {
                let file = NetworkFile::load(path)?;
                match file.network(&args.network) {
                    Some(entry) => entry.clone(),
                    None => bail!(
                        "Network '{}' not found in {}",
                        args.network,
                        path.display()
                    ),
                }
            }
            None => NetworkEntry::default(),
        };

        let Some(endpoint) = args.rpc_url.clone().or(entry.url) else {
            bail!("No registry endpoint: pass --rpc-url or set `url` in the config file");
        };
        let Some(registry_address) = args.registry_address.clone().or(entry.app_address) else {
            bail!(
                "No registry address: pass --registry-address or set `appAddress` in the config file"
            );
        };

        let gateway = GatewayConfig::new(endpoint, registry_address)
            .with_gas_limit(args.gas_limit)
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms));

        let mut registration = RegistrationConfig::default().with_capacity(args.capacity);
        let mut dispatch = DispatchConfig::default().from_block(BlockOffset(args.from_block));
        if let Some(secs) = args.call_timeout_secs {
            registration = registration.with_call_timeout(Duration::from_secs(secs));
            dispatch = dispatch.with_call_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            gateway,
            registration,
            dispatch,
            listen: args.listen,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> ConfigArgs {
        ConfigArgs {
            config: None,
            network: "localhost".to_string(),
            rpc_url: None,
            registry_address: None,
            capacity: DEFAULT_CAPACITY,
            from_block: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            call_timeout_secs: None,
            poll_interval_ms: 1000,
            listen: "127.0.0.1:3000".parse().unwrap(),
        }
    }

    fn config_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const LOCALHOST: &str = r#"{
        "localhost": {
            "url": "http://localhost:7545",
            "dataAddress": "0xdata",
            "appAddress": "0xapp"
        }
    }"#;

    #[test]
    fn reads_network_entry_from_file() {
        let file = config_file(LOCALHOST);
        let settings = Settings::resolve(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..args()
        })
        .unwrap();

        assert_eq!(settings.gateway.endpoint, "http://localhost:7545");
        assert_eq!(settings.gateway.registry_address, "0xapp");
        assert_eq!(settings.gateway.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(settings.registration.capacity, DEFAULT_CAPACITY);
        assert_eq!(settings.dispatch.from_block, BlockOffset::GENESIS);
    }

    #[test]
    fn flags_override_file() {
        let file = config_file(LOCALHOST);
        let settings = Settings::resolve(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            rpc_url: Some("http://node:8545".to_string()),
            ..args()
        })
        .unwrap();

        assert_eq!(settings.gateway.endpoint, "http://node:8545");
        assert_eq!(settings.gateway.registry_address, "0xapp");
    }

    #[test]
    fn flags_alone_are_enough() {
        let settings = Settings::resolve(&ConfigArgs {
            rpc_url: Some("http://node:8545".to_string()),
            registry_address: Some("0xreg".to_string()),
            capacity: 5,
            from_block: 42,
            call_timeout_secs: Some(7),
            poll_interval_ms: 250,
            ..args()
        })
        .unwrap();

        assert_eq!(settings.registration.capacity, 5);
        assert_eq!(settings.registration.call_timeout, Some(Duration::from_secs(7)));
        assert_eq!(settings.dispatch.call_timeout, Some(Duration::from_secs(7)));
        assert_eq!(settings.dispatch.from_block, BlockOffset(42));
        assert_eq!(settings.gateway.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_endpoint_is_an_error() {
        let err = Settings::resolve(&ConfigArgs {
            registry_address: Some("0xreg".to_string()),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("No registry endpoint"));
    }

    #[test]
    fn missing_address_is_an_error() {
        let file = config_file(r#"{"localhost": {"url": "http://localhost:7545"}}"#);
        let err = Settings::resolve(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("No registry address"));
    }

    #[test]
    fn unknown_network_is_an_error() {
        let file = config_file(LOCALHOST);
        let err = Settings::resolve(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            network: "mainnet".to_string(),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("mainnet"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = config_file("{ not json");
        let err = Settings::resolve(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
