//! In-process supply-chain ledger: a catalog of products and users whose every
//! mutation is recorded as hashed transactions sealed into linked blocks.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod auth;
pub mod catalog;
pub mod chain;
pub mod constants;
pub mod entropy;
pub mod error;
pub mod ledger;
pub mod market;
pub mod ops;

pub use chain::SupplyChain;
pub use error::{LedgerError, Result};

/// Deterministic identifier digest: SHA-256 of the payload as `0x`-prefixed hex.
pub fn digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Wall-clock time in Unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Manufacturer,
    Distributor,
    Retailer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Manufacturer, Role::Distributor, Role::Retailer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manufacturer => "manufacturer",
            Role::Distributor => "distributor",
            Role::Retailer => "retailer",
        }
    }

    /// Whether this role may move a product out of `status`.
    /// Manufacturers ship what they made; distributors and retailers receive what is in transit.
    pub fn can_advance(&self, status: ProductStatus) -> bool {
        matches!(
            (self, status),
            (Role::Manufacturer, ProductStatus::Manufactured)
                | (Role::Distributor, ProductStatus::InTransit)
                | (Role::Retailer, ProductStatus::InTransit)
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownRole(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    Manufactured,
    InTransit,
    Delivered,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Manufactured => "manufactured",
            ProductStatus::InTransit => "in-transit",
            ProductStatus::Delivered => "delivered",
        }
    }

    /// Successor in `manufactured -> in-transit -> delivered`.
    pub fn next(&self) -> Option<ProductStatus> {
        match self {
            ProductStatus::Manufactured => Some(ProductStatus::InTransit),
            ProductStatus::InTransit => Some(ProductStatus::Delivered),
            ProductStatus::Delivered => None,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manufactured" => Ok(ProductStatus::Manufactured),
            "in-transit" => Ok(ProductStatus::InTransit),
            "delivered" => Ok(ProductStatus::Delivered),
            other => Err(LedgerError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InspectionStatus {
    Pending,
    Passed,
    Failed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::Pending => "pending",
            InspectionStatus::Passed => "passed",
            InspectionStatus::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: u64,
    pub price: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub short_term: f64,
    pub medium_term: f64,
    pub long_term: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub mean_price: f64,
    /// Coefficient of variation as a percentage, two decimals.
    pub volatility: f64,
    pub trend: Trend,
    pub volume: u64,
    pub predictions: Predictions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub address: String,
    pub role: Role,
    pub name: String,
    pub balance: u64,
    pub trading_volume: u64,
    pub reputation: f64,
    pub certifications: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Address of the owning manufacturer.
    pub manufacturer: String,
    pub current_location: String,
    pub status: ProductStatus,
    /// Last mutation, Unix millis.
    pub timestamp: u64,
    pub transaction_hash: String,
    pub price: u64,
    pub payment_status: PaymentStatus,
    pub estimated_delivery: u64,
    pub coordinates: Coordinates,
    pub route: Vec<Coordinates>,
    pub quality: u8,
    pub temperature: i32,
    pub humidity: u32,
    pub inspection_status: InspectionStatus,
    pub retail_price: f64,
    pub price_history: Vec<PricePoint>,
    pub market_analysis: MarketAnalysis,
    pub distributor_margin: f64,
    pub batch_size: u32,
    pub minimum_order_quantity: u32,
    pub certifications: Vec<String>,
    pub sustainability_score: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub product_id: String,
    pub action: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    /// Cosmetic; no difficulty target applies.
    pub nonce: u64,
}

impl Block {
    /// Digest over `previous_hash + timestamp + json(transactions) + nonce`.
    pub fn compute_hash(
        previous_hash: &str,
        timestamp: u64,
        transactions: &[Transaction],
        nonce: u64,
    ) -> String {
        let txs = serde_json::to_string(transactions).unwrap_or_default();
        digest(&format!("{previous_hash}{timestamp}{txs}{nonce}"))
    }

    pub fn recompute_hash(&self) -> String {
        Self::compute_hash(
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }
}
