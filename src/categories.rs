// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Categories the ledger itself posts against, resolved by name and type.

use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId, EntryType};
use crate::store::CategoryStore;

pub const OPENING_BALANCE: &str = "Opening Balance";
pub const BALANCE_ADJUSTMENT: &str = "Balance Adjustment";
pub const ACCOUNT_CLOSURE: &str = "Account Closure";
pub const TRANSFER: &str = "Transfer";
pub const DEPOSIT: &str = "Deposit";
pub const WITHDRAWAL: &str = "Withdrawal";

/// Looks up `name`/`kind`, creating it when missing.
pub fn ensure<S: CategoryStore + ?Sized>(
    store: &S,
    name: &str,
    kind: EntryType,
) -> LedgerResult<CategoryId> {
    if let Some(cat) = store.find_category(name, kind)? {
        return Ok(cat.id);
    }
    let id = store.create_category(name, kind)?;
    info!(category = name, kind = %kind, id, "provisioned category");
    Ok(id)
}

pub fn create<S: CategoryStore + ?Sized>(
    store: &S,
    name: &str,
    kind: EntryType,
) -> LedgerResult<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("category name must not be empty"));
    }
    if store.find_category(name, kind)?.is_some() {
        return Err(LedgerError::conflict(format!(
            "{} category '{}' already exists",
            kind, name
        )));
    }
    let id = store.create_category(name, kind)?;
    Ok(Category {
        id,
        name: name.to_string(),
        kind,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCategories {
    pub opening_balance: CategoryId,
    pub deposit: CategoryId,
    pub withdrawal: CategoryId,
    pub adjustment_income: CategoryId,
    pub adjustment_expense: CategoryId,
    pub transfer_income: CategoryId,
    pub transfer_expense: CategoryId,
}

impl SystemCategories {
    pub fn provision<S: CategoryStore + ?Sized>(store: &S) -> LedgerResult<Self> {
        Ok(Self {
            opening_balance: ensure(store, OPENING_BALANCE, EntryType::Income)?,
            deposit: ensure(store, DEPOSIT, EntryType::Income)?,
            withdrawal: ensure(store, WITHDRAWAL, EntryType::Expense)?,
            adjustment_income: ensure(store, BALANCE_ADJUSTMENT, EntryType::Income)?,
            adjustment_expense: ensure(store, BALANCE_ADJUSTMENT, EntryType::Expense)?,
            transfer_income: ensure(store, TRANSFER, EntryType::Income)?,
            transfer_expense: ensure(store, TRANSFER, EntryType::Expense)?,
        })
    }

    pub fn adjustment(&self, kind: EntryType) -> CategoryId {
        match kind {
            EntryType::Income => self.adjustment_income,
            EntryType::Expense => self.adjustment_expense,
        }
    }

    pub fn transfer(&self, kind: EntryType) -> CategoryId {
        match kind {
            EntryType::Income => self.transfer_income,
            EntryType::Expense => self.transfer_expense,
        }
    }
}
