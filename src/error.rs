// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::BudgetId;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient funds: available {available}, required {required}, short by {shortfall}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
        shortfall: Decimal,
    },

    #[error(
        "Budget {budget_id} allocation exceeded: {allocated} already allocated, {requested} requested, total {total}"
    )]
    ConstraintViolation {
        budget_id: BudgetId,
        allocated: Decimal,
        requested: Decimal,
        total: Decimal,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_funds(available: Decimal, required: Decimal) -> Self {
        Self::InsufficientFunds {
            available,
            required,
            shortfall: required - available,
        }
    }

    pub fn overflow(what: impl std::fmt::Display) -> Self {
        Self::Validation(format!("{} exceeds the largest representable amount", what))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Corrupt(_))
    }
}
