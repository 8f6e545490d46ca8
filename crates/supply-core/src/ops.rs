//! Domain operations, planned as values.
//!
//! Each `plan_*` function reads the catalog, decides every change the business
//! action implies and returns it as an [`Effect`] without touching any state.
//! [`SupplyChain`](crate::SupplyChain) is the only thing that applies effects,
//! always followed by sealing a block, so a failed plan leaves no trace.

use crate::catalog::Catalog;
use crate::constants::*;
use crate::entropy::{self, int_in, Entropy};
use crate::ledger::TxDraft;
use crate::market;
use crate::{
    digest, InspectionStatus, LedgerError, PaymentStatus, PricePoint, Product, ProductStatus,
    Result, User,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upserts and transaction drafts produced by one business action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effect {
    pub products: Vec<Product>,
    pub users: Vec<User>,
    pub transactions: Vec<TxDraft>,
}

impl Effect {
    fn touching(product: &Product, draft: TxDraft) -> Self {
        Self {
            products: vec![product.clone()],
            users: Vec::new(),
            transactions: vec![draft],
        }
    }
}

/// What the caller gets back once the effect is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Planned<T> {
    pub output: T,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub product_id: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub payer_balance: u64,
    pub payee_balance: u64,
}

/// Users modified within one plan, so two roles held by the same address
/// accumulate on a single record.
#[derive(Default)]
struct StagedUsers(Vec<User>);

impl StagedUsers {
    fn touch(&mut self, catalog: &dyn Catalog, address: &str) -> Option<&mut User> {
        if let Some(pos) = self.0.iter().position(|u| u.address == address) {
            return Some(&mut self.0[pos]);
        }
        self.0.push(catalog.user(address)?.clone());
        self.0.last_mut()
    }
}

fn find_product(catalog: &dyn Catalog, id: &str) -> Result<Product> {
    catalog
        .product(id)
        .cloned()
        .ok_or_else(|| LedgerError::ProductNotFound(id.to_string()))
}

/// Lose `loss` points without dropping under `floor`, and never gain.
fn decay(quality: u8, loss: i64, floor: u8) -> u8 {
    let dropped = (i64::from(quality) - loss).max(i64::from(floor));
    (dropped as u8).min(quality)
}

fn bump_reputation(user: &mut User) {
    user.reputation = (user.reputation + REPUTATION_STEP).min(MAX_REPUTATION);
}

pub fn plan_add_product(
    name: &str,
    manufacturer: &str,
    rng: &mut dyn Entropy,
    now: u64,
) -> Planned<Product> {
    let start = entropy::coordinates(rng);
    let end = entropy::coordinates(rng);
    let price = int_in(rng, PRICE_RANGE) as u64;
    let price_history = entropy::price_history(rng, price, PRICE_HISTORY_DAYS, now);
    let market_analysis = market::analyse(&price_history, rng);

    let product = Product {
        id: entropy::product_id(rng),
        name: name.to_string(),
        manufacturer: manufacturer.to_string(),
        current_location: manufacturer.to_string(),
        status: ProductStatus::Manufactured,
        timestamp: now,
        transaction_hash: digest(&format!("{now}{name}{manufacturer}")),
        price,
        payment_status: PaymentStatus::Pending,
        estimated_delivery: now + DELIVERY_WINDOW_DAYS * DAY_MILLIS,
        coordinates: start,
        route: entropy::route(start, end),
        quality: 100,
        temperature: int_in(rng, TEMPERATURE_RANGE) as i32,
        humidity: int_in(rng, HUMIDITY_RANGE) as u32,
        inspection_status: InspectionStatus::Pending,
        retail_price: price as f64 * INITIAL_RETAIL_MARKUP,
        price_history,
        market_analysis,
        distributor_margin: DEFAULT_MARGIN,
        batch_size: int_in(rng, BATCH_SIZE_RANGE) as u32,
        minimum_order_quantity: int_in(rng, MIN_ORDER_RANGE) as u32,
        certifications: vec!["ISO 9001".into(), "GMP".into(), "HACCP".into()],
        sustainability_score: int_in(rng, SUSTAINABILITY_RANGE) as u32,
    };

    let draft = TxDraft::new(manufacturer, manufacturer, &product.id, "Product Created");
    Planned {
        effect: Effect::touching(&product, draft),
        output: product,
    }
}

/// Move a product to `status`. Transitions are not policed here; callers gate
/// them with [`Role::can_advance`](crate::Role::can_advance).
pub fn plan_update_status(
    catalog: &dyn Catalog,
    id: &str,
    status: ProductStatus,
    from: &str,
    to: &str,
    rng: &mut dyn Entropy,
    now: u64,
) -> Result<Planned<Product>> {
    let mut product = find_product(catalog, id)?;
    let mut staged = StagedUsers::default();

    product.status = status;
    product.current_location = to.to_string();
    product.timestamp = now;

    match status {
        ProductStatus::InTransit => {
            product.payment_status = PaymentStatus::Processing;
            if let Some(mid) = product.route.get(product.route.len() / 2) {
                product.coordinates = *mid;
            }
            product.quality = decay(product.quality, rng.int_in(1, 5), IN_TRANSIT_QUALITY_FLOOR);
        }
        ProductStatus::Delivered => {
            product.payment_status = PaymentStatus::Completed;
            if let Some(last) = product.route.last() {
                product.coordinates = *last;
            }
            product.quality = decay(product.quality, rng.int_in(1, 10), DELIVERED_QUALITY_FLOOR);
            for party in [from, to] {
                if let Some(user) = staged.touch(catalog, party) {
                    user.trading_volume = user.trading_volume.saturating_add(product.price);
                }
            }
        }
        ProductStatus::Manufactured => {}
    }

    product.temperature = int_in(rng, TEMPERATURE_RANGE) as i32;
    product.humidity = int_in(rng, HUMIDITY_RANGE) as u32;

    let drifted = (product.price as f64 * rng.jitter(0.05)).round().max(0.0) as u64;
    product.price_history.push(PricePoint {
        timestamp: now,
        price: drifted,
    });
    product.market_analysis = market::analyse(&product.price_history, rng);

    let draft = TxDraft::new(from, to, id, format!("Status Updated to {status}"));
    let mut effect = Effect::touching(&product, draft);
    effect.users = staged.0;
    Ok(Planned {
        output: product,
        effect,
    })
}

/// Payer pays the product's manufacturer its price. `to` is only recorded on
/// the transaction.
pub fn plan_process_payment(
    catalog: &dyn Catalog,
    id: &str,
    from: &str,
    to: &str,
    now: u64,
) -> Result<Planned<PaymentReceipt>> {
    let mut product = find_product(catalog, id)?;
    let price = product.price;
    let payee_address = product.manufacturer.clone();

    let payer = catalog
        .user(from)
        .ok_or_else(|| LedgerError::UserNotFound(from.to_string()))?;
    if catalog.user(&payee_address).is_none() {
        return Err(LedgerError::UserNotFound(payee_address));
    }
    if payer.balance < price {
        warn!(
            payer = from,
            balance = payer.balance,
            price,
            "payment rejected: insufficient balance"
        );
        return Err(LedgerError::InsufficientBalance {
            needed: price,
            available: payer.balance,
        });
    }

    let mut staged = StagedUsers::default();
    if let Some(payer) = staged.touch(catalog, from) {
        payer.balance -= price;
        payer.trading_volume = payer.trading_volume.saturating_add(price);
        bump_reputation(payer);
    }
    if let Some(payee) = staged.touch(catalog, &payee_address) {
        payee.balance = payee.balance.saturating_add(price);
        payee.trading_volume = payee.trading_volume.saturating_add(price);
        bump_reputation(payee);
    }

    product.payment_status = PaymentStatus::Completed;
    product.timestamp = now;

    let balance_of = |address: &str| {
        staged
            .0
            .iter()
            .find(|u| u.address == address)
            .map(|u| u.balance)
            .unwrap_or_default()
    };
    let receipt = PaymentReceipt {
        product_id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        amount: price,
        payer_balance: balance_of(from),
        payee_balance: balance_of(&payee_address),
    };

    let draft = TxDraft::new(from, to, id, "Payment Processed")
        .amount(price);
    let mut effect = Effect::touching(&product, draft);
    effect.users = staged.0;
    Ok(Planned {
        output: receipt,
        effect,
    })
}

pub fn plan_set_margin(
    catalog: &dyn Catalog,
    id: &str,
    margin: f64,
    now: u64,
) -> Result<Planned<Product>> {
    let mut product = find_product(catalog, id)?;
    product.distributor_margin = margin;
    product.retail_price = product.price as f64 * (1.0 + margin / 100.0);
    product.timestamp = now;

    let here = product.current_location.clone();
    let draft = TxDraft::new(&here, &here, id, "Distributor Margin Updated").margin(margin);
    Ok(Planned {
        effect: Effect::touching(&product, draft),
        output: product,
    })
}

pub fn plan_update_batch_size(
    catalog: &dyn Catalog,
    id: &str,
    size: u32,
    now: u64,
) -> Result<Planned<Product>> {
    let mut product = find_product(catalog, id)?;
    product.batch_size = size;
    product.timestamp = now;

    let here = product.current_location.clone();
    let draft = TxDraft::new(&here, &here, id, "Batch Size Updated").quantity(size);
    Ok(Planned {
        effect: Effect::touching(&product, draft),
        output: product,
    })
}

/// Passes at quality 90 or above. Quality itself is left alone.
pub fn plan_inspect(
    catalog: &dyn Catalog,
    id: &str,
    inspector: &str,
    now: u64,
) -> Result<Planned<Product>> {
    let mut product = find_product(catalog, id)?;
    product.inspection_status = if product.quality >= INSPECTION_PASS_QUALITY {
        InspectionStatus::Passed
    } else {
        InspectionStatus::Failed
    };
    product.timestamp = now;

    let action = format!("Inspection {}", product.inspection_status.as_str());
    let draft = TxDraft::new(inspector, &product.current_location, id, action);
    Ok(Planned {
        effect: Effect::touching(&product, draft),
        output: product,
    })
}

/// Sets the retail price as given; it may disagree with the margin.
pub fn plan_update_retail_price(
    catalog: &dyn Catalog,
    id: &str,
    price: f64,
    now: u64,
) -> Result<Planned<Product>> {
    let mut product = find_product(catalog, id)?;
    product.retail_price = price;
    product.timestamp = now;

    let here = product.current_location.clone();
    let draft = TxDraft::new(&here, &here, id, "Retail Price Updated");
    Ok(Planned {
        effect: Effect::touching(&product, draft),
        output: product,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::Role;
    use rand::{rngs::StdRng, SeedableRng};

    const NOW: u64 = 1_700_000_000_000;

    fn user(address: &str, role: Role, balance: u64) -> User {
        User {
            address: address.to_string(),
            role,
            name: address.to_string(),
            balance,
            trading_volume: 0,
            reputation: 99.8,
            certifications: vec![],
        }
    }

    fn setup() -> (MemoryCatalog, StdRng, Product) {
        let mut rng = StdRng::seed_from_u64(21);
        let mut catalog = MemoryCatalog::with_users([
            user("0xm", Role::Manufacturer, 1_000_000),
            user("0xd", Role::Distributor, 1_000_000),
            user("0xr", Role::Retailer, 5),
        ]);
        let planned = plan_add_product("Widget", "0xm", &mut rng, NOW);
        catalog.upsert_product(planned.output.clone());
        (catalog, rng, planned.output)
    }

    #[test]
    fn decay_respects_floor_and_never_raises() {
        assert_eq!(decay(100, 3, 80), 97);
        assert_eq!(decay(82, 5, 80), 80);
        assert_eq!(decay(75, 2, 80), 75);
        assert_eq!(decay(70, 10, 70), 70);
    }

    #[test]
    fn new_product_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let planned = plan_add_product("Widget", "0xm", &mut rng, NOW);
        let p = &planned.output;
        assert_eq!(p.status, ProductStatus::Manufactured);
        assert_eq!(p.current_location, "0xm");
        assert_eq!(p.quality, 100);
        assert!((10_000..=100_000).contains(&p.price));
        assert_eq!(p.retail_price, p.price as f64 * 1.2);
        assert_eq!(p.estimated_delivery, NOW + 7 * DAY_MILLIS);
        assert_eq!(p.route.first(), Some(&p.coordinates));
        assert_eq!(planned.effect.transactions.len(), 1);
        assert_eq!(planned.effect.transactions[0].action, "Product Created");
        assert!(planned.effect.users.is_empty());
    }

    #[test]
    fn planning_does_not_touch_the_catalog() {
        let (catalog, mut rng, product) = setup();
        let _ = plan_update_status(
            &catalog,
            &product.id,
            ProductStatus::InTransit,
            "0xm",
            "0xd",
            &mut rng,
            NOW,
        )
        .unwrap();
        assert_eq!(catalog.product(&product.id), Some(&product));
    }

    #[test]
    fn in_transit_moves_to_route_midpoint() {
        let (catalog, mut rng, product) = setup();
        let planned = plan_update_status(
            &catalog,
            &product.id,
            ProductStatus::InTransit,
            "0xm",
            "0xd",
            &mut rng,
            NOW + 1,
        )
        .unwrap();
        let p = planned.output;
        assert_eq!(p.coordinates, product.route[product.route.len() / 2]);
        assert_eq!(p.payment_status, PaymentStatus::Processing);
        assert_eq!(p.current_location, "0xd");
        assert_eq!(p.price_history.len(), product.price_history.len() + 1);
        assert!((95..=99).contains(&p.quality));
        assert_eq!(
            planned.effect.transactions[0].action,
            "Status Updated to in-transit"
        );
    }

    #[test]
    fn delivery_credits_volume_to_both_parties() {
        let (catalog, mut rng, product) = setup();
        let planned = plan_update_status(
            &catalog,
            &product.id,
            ProductStatus::Delivered,
            "0xd",
            "0xr",
            &mut rng,
            NOW,
        )
        .unwrap();
        assert_eq!(planned.effect.users.len(), 2);
        for u in &planned.effect.users {
            assert_eq!(u.trading_volume, product.price);
        }
        assert_eq!(planned.output.coordinates, *product.route.last().unwrap());
    }

    #[test]
    fn delivery_to_unknown_party_is_tolerated() {
        let (catalog, mut rng, product) = setup();
        let planned = plan_update_status(
            &catalog,
            &product.id,
            ProductStatus::Delivered,
            "0xd",
            "retailer",
            &mut rng,
            NOW,
        )
        .unwrap();
        assert_eq!(planned.effect.users.len(), 1);
    }

    #[test]
    fn missing_product_is_not_found() {
        let (catalog, mut rng, _) = setup();
        let err = plan_update_status(
            &catalog,
            "nope",
            ProductStatus::InTransit,
            "0xm",
            "0xd",
            &mut rng,
            NOW,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::ProductNotFound("nope".into()));
        assert!(plan_inspect(&catalog, "nope", "0xd", NOW).is_err());
        assert!(plan_set_margin(&catalog, "nope", 10.0, NOW).is_err());
        assert!(plan_update_batch_size(&catalog, "nope", 10, NOW).is_err());
        assert!(plan_update_retail_price(&catalog, "nope", 10.0, NOW).is_err());
    }

    #[test]
    fn payment_moves_exact_price() {
        let (catalog, _, product) = setup();
        let planned = plan_process_payment(&catalog, &product.id, "0xd", "0xm", NOW).unwrap();
        let receipt = &planned.output;
        assert_eq!(receipt.amount, product.price);
        assert_eq!(receipt.payer_balance, 1_000_000 - product.price);
        assert_eq!(receipt.payee_balance, 1_000_000 + product.price);
        let tx = &planned.effect.transactions[0];
        assert_eq!(tx.amount, Some(product.price));
        assert_eq!(tx.payment_status, Some(PaymentStatus::Pending));
        assert_eq!(planned.effect.products[0].payment_status, PaymentStatus::Completed);
        for u in &planned.effect.users {
            assert_eq!(u.reputation, 100.0);
            assert_eq!(u.trading_volume, product.price);
        }
    }

    #[test]
    fn payment_preconditions() {
        let (catalog, _, product) = setup();
        assert_eq!(
            plan_process_payment(&catalog, &product.id, "0xr", "0xm", NOW).unwrap_err(),
            LedgerError::InsufficientBalance {
                needed: product.price,
                available: 5
            }
        );
        assert_eq!(
            plan_process_payment(&catalog, &product.id, "0xghost", "0xm", NOW).unwrap_err(),
            LedgerError::UserNotFound("0xghost".into())
        );
        assert!(plan_process_payment(&catalog, "nope", "0xd", "0xm", NOW).is_err());
    }

    #[test]
    fn payment_to_an_unknown_manufacturer_fails() {
        let (mut catalog, mut rng, _) = setup();
        let orphan = plan_add_product("Orphan", "0xnobody", &mut rng, NOW).output;
        catalog.upsert_product(orphan.clone());
        assert_eq!(
            plan_process_payment(&catalog, &orphan.id, "0xd", "0xnobody", NOW).unwrap_err(),
            LedgerError::UserNotFound("0xnobody".into())
        );
    }

    #[test]
    fn self_payment_nets_to_zero() {
        let (catalog, _, product) = setup();
        let planned = plan_process_payment(&catalog, &product.id, "0xm", "0xm", NOW).unwrap();
        assert_eq!(planned.effect.users.len(), 1);
        let m = &planned.effect.users[0];
        assert_eq!(m.balance, 1_000_000);
        assert_eq!(m.trading_volume, 2 * product.price);
    }

    #[test]
    fn margin_recomputes_retail_price() {
        let (catalog, _, product) = setup();
        let planned = plan_set_margin(&catalog, &product.id, 25.0, NOW).unwrap();
        assert_eq!(planned.output.distributor_margin, 25.0);
        assert_eq!(planned.output.retail_price, product.price as f64 * 1.25);
        assert_eq!(planned.effect.transactions[0].margin, Some(25.0));
    }

    #[test]
    fn batch_size_is_recorded_as_quantity() {
        let (catalog, _, product) = setup();
        let planned = plan_update_batch_size(&catalog, &product.id, 640, NOW).unwrap();
        assert_eq!(planned.output.batch_size, 640);
        assert_eq!(planned.effect.transactions[0].quantity, Some(640));
    }

    #[test]
    fn inspection_threshold() {
        let (mut catalog, _, mut product) = setup();
        product.quality = 90;
        catalog.upsert_product(product.clone());
        let passed = plan_inspect(&catalog, &product.id, "0xd", NOW).unwrap();
        assert_eq!(passed.output.inspection_status, InspectionStatus::Passed);
        assert_eq!(passed.output.quality, 90);
        assert_eq!(passed.effect.transactions[0].action, "Inspection passed");

        product.quality = 89;
        catalog.upsert_product(product.clone());
        let failed = plan_inspect(&catalog, &product.id, "0xd", NOW).unwrap();
        assert_eq!(failed.output.inspection_status, InspectionStatus::Failed);
        assert_eq!(failed.output.quality, 89);
    }

    #[test]
    fn retail_price_is_set_verbatim() {
        let (catalog, _, product) = setup();
        let planned = plan_update_retail_price(&catalog, &product.id, 1.5, NOW).unwrap();
        assert_eq!(planned.output.retail_price, 1.5);
        assert_eq!(planned.output.distributor_margin, product.distributor_margin);
    }
}
