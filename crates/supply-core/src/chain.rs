use crate::auth::{CredentialCheck, DemoCredentials};
use crate::catalog::{Catalog, MemoryCatalog};
use crate::constants::{DEFAULT_REPUTATION, NONCE_CEILING};
use crate::entropy::{self, Entropy};
use crate::ledger::Ledger;
use crate::ops::{self, Effect, PaymentReceipt, Planned};
use crate::{
    now_millis, Block, MarketAnalysis, Product, ProductStatus, Result, Role, Transaction, User,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub height: u64,
    pub tip_hash: Option<String>,
}

/// Catalog, ledger and randomness behind one `&mut self` executor.
///
/// Every command plans an [`Effect`], applies it and seals a block before
/// returning; callers sharing an instance across threads wrap it in a mutex.
pub struct SupplyChain<C: Catalog = MemoryCatalog> {
    catalog: C,
    ledger: Ledger,
    rng: Box<dyn Entropy>,
    credentials: Box<dyn CredentialCheck>,
    clock: Box<dyn Fn() -> u64 + Send>,
}

impl SupplyChain<MemoryCatalog> {
    /// Empty ledger with the one-user-per-role demo roster.
    pub fn demo(mut rng: impl Entropy + 'static) -> Self {
        let catalog = MemoryCatalog::with_users(entropy::demo_users(&mut rng));
        Self::new(catalog, Box::new(rng), Box::new(DemoCredentials))
    }

    pub fn seeded(seed: u64) -> Self {
        Self::demo(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_entropy() -> Self {
        Self::demo(StdRng::from_entropy())
    }
}

impl<C: Catalog> SupplyChain<C> {
    pub fn new(
        catalog: C,
        rng: Box<dyn Entropy>,
        credentials: Box<dyn CredentialCheck>,
    ) -> Self {
        Self {
            catalog,
            ledger: Ledger::new(),
            rng,
            credentials,
            clock: Box::new(now_millis),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Write every upsert, record every draft, then seal one block.
    pub fn apply(&mut self, effect: Effect, now: u64) -> &Block {
        let Effect {
            products,
            users,
            transactions,
        } = effect;
        for product in products {
            self.catalog.upsert_product(product);
        }
        for user in users {
            self.catalog.upsert_user(user);
        }
        for draft in transactions {
            self.ledger.record_transaction(draft, now);
        }
        let nonce = self.rng.int_in(0, NONCE_CEILING as i64 - 1) as u64;
        self.ledger.seal_block(nonce, now)
    }

    fn commit<T>(&mut self, planned: Planned<T>, now: u64) -> T {
        self.apply(planned.effect, now);
        planned.output
    }

    // -- commands --

    pub fn add_product(&mut self, name: &str, manufacturer: &str) -> Product {
        let now = self.now();
        let planned = ops::plan_add_product(name, manufacturer, self.rng.as_mut(), now);
        self.commit(planned, now)
    }

    pub fn update_product_status(
        &mut self,
        id: &str,
        status: ProductStatus,
        from: &str,
        to: &str,
    ) -> Result<Product> {
        let now = self.now();
        let planned = ops::plan_update_status(
            &self.catalog,
            id,
            status,
            from,
            to,
            self.rng.as_mut(),
            now,
        )?;
        Ok(self.commit(planned, now))
    }

    /// All-or-nothing: on error no balance, product field or transaction changes.
    pub fn process_payment(&mut self, id: &str, from: &str, to: &str) -> Result<PaymentReceipt> {
        let now = self.now();
        let planned = ops::plan_process_payment(&self.catalog, id, from, to, now)?;
        Ok(self.commit(planned, now))
    }

    pub fn set_distributor_margin(&mut self, id: &str, margin: f64) -> Result<Product> {
        let now = self.now();
        let planned = ops::plan_set_margin(&self.catalog, id, margin, now)?;
        Ok(self.commit(planned, now))
    }

    pub fn update_batch_size(&mut self, id: &str, size: u32) -> Result<Product> {
        let now = self.now();
        let planned = ops::plan_update_batch_size(&self.catalog, id, size, now)?;
        Ok(self.commit(planned, now))
    }

    pub fn inspect_product(&mut self, id: &str, inspector: &str) -> Result<Product> {
        let now = self.now();
        let planned = ops::plan_inspect(&self.catalog, id, inspector, now)?;
        Ok(self.commit(planned, now))
    }

    pub fn update_retail_price(&mut self, id: &str, price: f64) -> Result<Product> {
        let now = self.now();
        let planned = ops::plan_update_retail_price(&self.catalog, id, price, now)?;
        Ok(self.commit(planned, now))
    }

    // -- queries --

    pub fn products(&self) -> &[Product] {
        self.catalog.products()
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.catalog.product(id)
    }

    pub fn product_transactions(&self, id: &str) -> Vec<Transaction> {
        self.ledger.transactions_for(id)
    }

    pub fn market_analysis(&self, id: &str) -> Option<&MarketAnalysis> {
        self.catalog.product(id).map(|p| &p.market_analysis)
    }

    pub fn users(&self) -> &[User] {
        self.catalog.users()
    }

    pub fn user(&self, address: &str) -> Option<&User> {
        self.catalog.user(address)
    }

    pub fn user_by_role(&self, role: Role) -> Option<&User> {
        self.catalog.user_by_role(role)
    }

    pub fn user_balance(&self, address: &str) -> u64 {
        self.user(address).map(|u| u.balance).unwrap_or(0)
    }

    pub fn user_trading_volume(&self, address: &str) -> u64 {
        self.user(address).map(|u| u.trading_volume).unwrap_or(0)
    }

    pub fn user_reputation(&self, address: &str) -> f64 {
        self.user(address)
            .map(|u| u.reputation)
            .unwrap_or(DEFAULT_REPUTATION)
    }

    pub fn blocks(&self) -> &[Block] {
        self.ledger.blocks()
    }

    pub fn pending(&self) -> &[Transaction] {
        self.ledger.pending()
    }

    pub fn head(&self) -> ChainHead {
        ChainHead {
            height: self.ledger.height(),
            tip_hash: self.ledger.tip_hash().map(str::to_string),
        }
    }

    pub fn verify(&self) -> Result<()> {
        self.ledger.verify()
    }

    /// The pre-provisioned user for `role` if the password matches; unknown roles fail.
    pub fn authenticate(&self, role: &str, password: &str) -> Option<&User> {
        let role: Role = role.parse().ok()?;
        if !self.credentials.accepts(role, password) {
            return None;
        }
        self.catalog.user_by_role(role)
    }
}
