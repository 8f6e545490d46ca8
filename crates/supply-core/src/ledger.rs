//! Pending transaction pool and the append-only block list.

use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::{digest, Block, LedgerError, PaymentStatus, Result, Transaction};
use tracing::{debug, info};

/// A transaction before it is hashed and timestamped.
#[derive(Clone, Debug, PartialEq)]
pub struct TxDraft {
    pub from: String,
    pub to: String,
    pub product_id: String,
    pub action: String,
    pub amount: Option<u64>,
    pub payment_status: Option<PaymentStatus>,
    pub margin: Option<f64>,
    pub quantity: Option<u32>,
}

impl TxDraft {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        product_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            product_id: product_id.into(),
            action: action.into(),
            amount: None,
            payment_status: None,
            margin: None,
            quantity: None,
        }
    }

    /// Amount-bearing transactions are recorded `pending`; the product carries the settled state.
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self.payment_status = Some(PaymentStatus::Pending);
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    recorded: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.blocks.last().map(|b| b.hash.as_str())
    }

    /// Hash and timestamp `draft` and add it to the pending pool.
    ///
    /// Parties are not checked against the catalog.
    pub fn record_transaction(&mut self, draft: TxDraft, now: u64) -> Transaction {
        let seq = self.recorded;
        self.recorded += 1;
        let tx = Transaction {
            hash: digest(&format!(
                "{now}{}{}{}#{seq}",
                draft.from, draft.to, draft.product_id
            )),
            from: draft.from,
            to: draft.to,
            product_id: draft.product_id,
            action: draft.action,
            timestamp: now,
            amount: draft.amount,
            payment_status: draft.payment_status,
            margin: draft.margin,
            quantity: draft.quantity,
        };
        debug!(hash = %tx.hash, action = %tx.action, "transaction recorded");
        self.pending.push(tx.clone());
        tx
    }

    /// Move the whole pending pool into a new block linked to the current tip.
    pub fn seal_block(&mut self, nonce: u64, now: u64) -> &Block {
        let previous_hash = self
            .tip_hash()
            .unwrap_or(GENESIS_PREVIOUS_HASH)
            .to_string();
        let transactions = std::mem::take(&mut self.pending);
        let hash = Block::compute_hash(&previous_hash, now, &transactions, nonce);
        let block = Block {
            index: self.height(),
            hash,
            previous_hash,
            timestamp: now,
            transactions,
            nonce,
        };
        info!(
            index = block.index,
            hash = %block.hash,
            txs = block.transactions.len(),
            "block sealed"
        );
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }

    /// Re-derive every digest and link. Nothing in the write path relies on this.
    pub fn verify(&self) -> Result<()> {
        let mut expected_prev = GENESIS_PREVIOUS_HASH;
        for block in &self.blocks {
            if block.previous_hash != expected_prev {
                return Err(LedgerError::BrokenLink { index: block.index });
            }
            if block.recompute_hash() != block.hash {
                return Err(LedgerError::DigestMismatch { index: block.index });
            }
            expected_prev = &block.hash;
        }
        Ok(())
    }

    /// Every sealed transaction touching `product_id`, oldest first.
    pub fn transactions_for(&self, product_id: &str) -> Vec<Transaction> {
        self.blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| tx.product_id == product_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(product: &str) -> TxDraft {
        TxDraft::new("0xa", "0xb", product, "Product Created")
    }

    #[test]
    fn first_block_links_to_sentinel() {
        let mut ledger = Ledger::new();
        ledger.record_transaction(draft("p1"), 1_000);
        let block = ledger.seal_block(42, 1_001);
        assert_eq!(block.index, 0);
        assert_eq!(block.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(block.nonce, 42);
        assert_eq!(block.transactions.len(), 1);
    }

    #[test]
    fn sealing_drains_pool_exactly() {
        let mut ledger = Ledger::new();
        let a = ledger.record_transaction(draft("p1"), 1_000);
        let b = ledger.record_transaction(draft("p2"), 1_000);
        assert_eq!(ledger.pending().len(), 2);
        let block = ledger.seal_block(0, 1_002).clone();
        assert!(ledger.pending().is_empty());
        assert_eq!(block.transactions, vec![a, b]);
    }

    #[test]
    fn same_millisecond_drafts_get_distinct_hashes() {
        let mut ledger = Ledger::new();
        let a = ledger.record_transaction(draft("p1"), 5);
        let b = ledger.record_transaction(draft("p1"), 5);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn blocks_chain_and_verify() {
        let mut ledger = Ledger::new();
        for i in 0..5 {
            ledger.record_transaction(draft("p1"), i);
            ledger.seal_block(i * 7, i + 100);
        }
        assert_eq!(ledger.height(), 5);
        for pair in ledger.blocks().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
        }
        assert_eq!(ledger.verify(), Ok(()));
        assert_eq!(ledger.tip_hash(), Some(ledger.blocks()[4].hash.as_str()));
    }

    #[test]
    fn verify_detects_tampering() {
        let mut ledger = Ledger::new();
        for i in 0..3 {
            ledger.record_transaction(draft("p1"), i);
            ledger.seal_block(i, i);
        }
        let mut tampered = ledger.clone();
        tampered.blocks[1].transactions[0].action = "Forged".into();
        assert_eq!(
            tampered.verify(),
            Err(LedgerError::DigestMismatch { index: 1 })
        );

        let mut relinked = ledger.clone();
        relinked.blocks[2].previous_hash = "0xdead".into();
        assert_eq!(relinked.verify(), Err(LedgerError::BrokenLink { index: 2 }));
    }

    #[test]
    fn empty_seal_still_appends() {
        let mut ledger = Ledger::new();
        let block = ledger.seal_block(1, 1);
        assert!(block.transactions.is_empty());
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn transactions_for_filters_across_blocks() {
        let mut ledger = Ledger::new();
        ledger.record_transaction(draft("p1"), 1);
        ledger.seal_block(0, 1);
        ledger.record_transaction(draft("p2"), 2);
        ledger.record_transaction(draft("p1"), 2);
        ledger.seal_block(0, 2);
        // unsealed transactions are not reported
        ledger.record_transaction(draft("p1"), 3);
        assert_eq!(ledger.transactions_for("p1").len(), 2);
        assert_eq!(ledger.transactions_for("p2").len(), 1);
        assert!(ledger.transactions_for("p3").is_empty());
    }
}
