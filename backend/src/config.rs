use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

pub const BIND_ADDR_ENV: &str = "HOLO_BIND_ADDR";
pub const SEED_ENV: &str = "HOLO_SEED";
pub const TICKER_REFRESH_ENV: &str = "HOLO_TICKER_REFRESH_SECS";
pub const WALLET_ADDRESS_ENV: &str = "HOLO_WALLET_ADDRESS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TICKER_REFRESH_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Fixed generator seed; entropy when unset.
    pub seed: Option<u64>,
    pub ticker_refresh: Duration,
    /// Wallet the stub gateway treats as connected.
    pub wallet_address: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get(BIND_ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .with_context(|| format!("{BIND_ADDR_ENV} must be a socket address"))?;

        let seed = get(SEED_ENV)
            .map(|v| v.parse::<u64>())
            .transpose()
            .with_context(|| format!("{SEED_ENV} must be an unsigned integer"))?;

        let refresh_secs = get(TICKER_REFRESH_ENV)
            .map(|v| v.parse::<u64>())
            .transpose()
            .with_context(|| format!("{TICKER_REFRESH_ENV} must be a whole number of seconds"))?
            .unwrap_or(DEFAULT_TICKER_REFRESH_SECS);
        if refresh_secs == 0 {
            anyhow::bail!("{TICKER_REFRESH_ENV} must be at least 1");
        }

        Ok(Self {
            bind_addr,
            seed,
            ticker_refresh: Duration::from_secs(refresh_secs),
            wallet_address: get(WALLET_ADDRESS_ENV),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.seed, None);
        assert_eq!(config.ticker_refresh, Duration::from_secs(10));
        assert_eq!(config.wallet_address, None);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            (BIND_ADDR_ENV, "127.0.0.1:9000"),
            (SEED_ENV, "42"),
            (TICKER_REFRESH_ENV, "3"),
            (WALLET_ADDRESS_ENV, "0xabc"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.ticker_refresh, Duration::from_secs(3));
        assert_eq!(config.wallet_address.as_deref(), Some("0xabc"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(Config::from_lookup(lookup(&[(SEED_ENV, "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[(TICKER_REFRESH_ENV, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(BIND_ADDR_ENV, "nowhere")])).is_err());
        let blank = Config::from_lookup(lookup(&[(WALLET_ADDRESS_ENV, "  ")])).unwrap();
        assert_eq!(blank.wallet_address, None);
    }
}
