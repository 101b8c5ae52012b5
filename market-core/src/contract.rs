//! Trade submission boundary.
//!
//! The exchange contract is not deployed anywhere; [`StubGateway`] targets
//! the zero address and hands back deterministic fake transaction hashes so
//! the trading forms have something to display.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use tracing::{debug, warn};

use crate::OrderSide;

pub const CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait TradeGateway {
    fn create_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        side: OrderSide,
    ) -> Result<TxHash, ContractError>;

    fn open_position(
        &mut self,
        symbol: &str,
        quantity: f64,
        entry_price: f64,
        kind: PositionKind,
    ) -> Result<TxHash, ContractError>;

    fn close_position(
        &mut self,
        position_id: u64,
        current_price: f64,
        profit: f64,
    ) -> Result<TxHash, ContractError>;
}

/// Gateway that never leaves the process.
#[derive(Debug, Clone, Default)]
pub struct StubGateway {
    account: Option<String>,
    nonce: u64,
}

impl StubGateway {
    pub fn new(account: Option<String>) -> Self {
        Self { account, nonce: 0 }
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn connect(&mut self, account: impl Into<String>) {
        self.account = Some(account.into());
    }

    pub fn disconnect(&mut self) {
        self.account = None;
    }

    fn submit(&mut self, function: &str, payload: impl Hash) -> Result<TxHash, ContractError> {
        let Some(account) = self.account.as_deref() else {
            warn!(function, "rejecting submission without a connected wallet");
            return Err(ContractError::WalletNotConnected);
        };
        self.nonce += 1;

        let mut hasher = DefaultHasher::new();
        (CONTRACT_ADDRESS, account, function, self.nonce).hash(&mut hasher);
        payload.hash(&mut hasher);
        let lo = hasher.finish();
        self.nonce.hash(&mut hasher);
        let hi = hasher.finish();

        let hash = TxHash(format!("0x{hi:016x}{lo:016x}{:032x}", self.nonce));
        debug!(function, nonce = self.nonce, %hash, "stub transaction submitted");
        Ok(hash)
    }
}

fn ensure_amount(name: &str, value: f64) -> Result<u64, ContractError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ContractError::SubmissionFailed(format!(
            "{name} must be a finite positive number"
        )));
    }
    Ok(value.to_bits())
}

impl TradeGateway for StubGateway {
    fn create_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        side: OrderSide,
    ) -> Result<TxHash, ContractError> {
        if !self.is_connected() {
            return Err(ContractError::WalletNotConnected);
        }
        let quantity = ensure_amount("quantity", quantity)?;
        let price = ensure_amount("price", price)?;
        self.submit("createOrder", (symbol, quantity, price, side))
    }

    fn open_position(
        &mut self,
        symbol: &str,
        quantity: f64,
        entry_price: f64,
        kind: PositionKind,
    ) -> Result<TxHash, ContractError> {
        if !self.is_connected() {
            return Err(ContractError::WalletNotConnected);
        }
        let quantity = ensure_amount("quantity", quantity)?;
        let entry_price = ensure_amount("entry price", entry_price)?;
        self.submit("openPosition", (symbol, quantity, entry_price, kind))
    }

    fn close_position(
        &mut self,
        position_id: u64,
        current_price: f64,
        profit: f64,
    ) -> Result<TxHash, ContractError> {
        if !self.is_connected() {
            return Err(ContractError::WalletNotConnected);
        }
        let current_price = ensure_amount("current price", current_price)?;
        if !profit.is_finite() {
            return Err(ContractError::SubmissionFailed("profit must be finite".into()));
        }
        self.submit("closePosition", (position_id, current_price, profit.to_bits()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_wallet_is_rejected() {
        let mut gw = StubGateway::default();
        assert_eq!(
            gw.create_order("ETH", 1.0, 2450.0, OrderSide::Buy),
            Err(ContractError::WalletNotConnected)
        );
        assert_eq!(
            gw.close_position(7, 2450.0, 12.5),
            Err(ContractError::WalletNotConnected)
        );
    }

    #[test]
    fn invalid_amounts_fail_submission() {
        let mut gw = StubGateway::new(Some("0xabc".into()));
        assert!(matches!(
            gw.create_order("ETH", 0.0, 2450.0, OrderSide::Sell),
            Err(ContractError::SubmissionFailed(_))
        ));
        assert!(matches!(
            gw.open_position("BTC", 1.0, f64::NAN, PositionKind::Long),
            Err(ContractError::SubmissionFailed(_))
        ));
    }

    #[test]
    fn hashes_are_unique_per_submission() {
        let mut gw = StubGateway::new(None);
        gw.connect("0xabc");
        let a = gw.create_order("ETH", 1.0, 2450.0, OrderSide::Buy).unwrap();
        let b = gw.create_order("ETH", 1.0, 2450.0, OrderSide::Buy).unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 2 + 64);

        gw.disconnect();
        assert!(gw.open_position("SOL", 2.0, 100.0, PositionKind::Short).is_err());
    }
}
