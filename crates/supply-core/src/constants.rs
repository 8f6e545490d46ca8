pub const GENESIS_PREVIOUS_HASH: &str = "0x0";
pub const NONCE_CEILING: u64 = 1_000_000;

pub const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;
pub const DELIVERY_WINDOW_DAYS: u64 = 7;
pub const PRICE_HISTORY_DAYS: u64 = 30;
pub const ROUTE_STEPS: usize = 5;
pub const TREND_WINDOW: usize = 5;

pub const PRICE_RANGE: (i64, i64) = (10_000, 100_000);
pub const TEMPERATURE_RANGE: (i64, i64) = (18, 24);
pub const HUMIDITY_RANGE: (i64, i64) = (40, 60);
pub const BATCH_SIZE_RANGE: (i64, i64) = (100, 1_000);
pub const MIN_ORDER_RANGE: (i64, i64) = (10, 50);
pub const SUSTAINABILITY_RANGE: (i64, i64) = (60, 100);
pub const VOLUME_RANGE: (i64, i64) = (100_000, 1_000_000);

pub const STARTING_BALANCE: u64 = 1_000_000;
pub const DEFAULT_REPUTATION: f64 = 85.0;
pub const REPUTATION_STEP: f64 = 0.5;
pub const MAX_REPUTATION: f64 = 100.0;

pub const DEFAULT_MARGIN: f64 = 15.0;
pub const INITIAL_RETAIL_MARKUP: f64 = 1.2;
pub const INSPECTION_PASS_QUALITY: u8 = 90;
pub const IN_TRANSIT_QUALITY_FLOOR: u8 = 80;
pub const DELIVERED_QUALITY_FLOOR: u8 = 70;
