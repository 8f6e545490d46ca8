use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown product status: {0}")]
    UnknownStatus(String),

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} digest does not match its contents")]
    DigestMismatch { index: u64 },
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::ProductNotFound(_) | LedgerError::UserNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
