use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use supply_core::entropy::price_history;
use supply_core::ledger::{Ledger, TxDraft};
use supply_core::{market, ProductStatus, Role, SupplyChain};

fn bench_seal(c: &mut Criterion) {
    c.bench_function("seal_block_10_txs", |b| {
        let mut ledger = Ledger::new();
        b.iter(|| {
            for i in 0..10 {
                let draft = TxDraft::new(format!("alice-{i}"), "bob", "widget", "Product Created");
                ledger.record_transaction(draft, 1_700_000_000_000 + i);
            }
            black_box(ledger.seal_block(42, 1_700_000_000_100));
        });
    });
}

fn bench_market(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let history = price_history(&mut rng, 50_000, 365, 1_700_000_000_000);
    c.bench_function("analyse_365_days", |b| {
        b.iter(|| market::analyse(black_box(&history), &mut rng));
    });
}

fn bench_lifecycle(c: &mut Criterion) {
    c.bench_function("product_lifecycle", |b| {
        let mut chain = SupplyChain::seeded(42);
        let m = chain.user_by_role(Role::Manufacturer).unwrap().address.clone();
        let d = chain.user_by_role(Role::Distributor).unwrap().address.clone();
        b.iter(|| {
            let p = chain.add_product("Widget", &m);
            chain
                .update_product_status(&p.id, ProductStatus::InTransit, &m, &d)
                .unwrap();
            chain.inspect_product(&p.id, &d).unwrap();
        });
    });
}

criterion_group!(benches, bench_seal, bench_market, bench_lifecycle);
criterion_main!(benches);
