// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Local;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Category, CategoryId, EntryType, NewTransaction, OwnerId, Transaction, TransactionFilter,
};
use crate::store::LedgerStore;
use crate::usage::{BudgetUsageTracker, CategoryUsage};

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub transaction: Transaction,
    pub budget_usage: Vec<CategoryUsage>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionRecorder {
    tracker: BudgetUsageTracker,
}

impl TransactionRecorder {
    pub fn new(tracker: BudgetUsageTracker) -> Self {
        Self { tracker }
    }

    /// Fails unless `category_id` exists and has type `kind`.
    pub fn postable_category<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        category_id: CategoryId,
        kind: EntryType,
    ) -> LedgerResult<Category> {
        let category = store.get_category(category_id)?;
        if category.kind != kind {
            return Err(LedgerError::validation(format!(
                "category '{}' is {}, cannot post {} against it",
                category.name, category.kind, kind
            )));
        }
        Ok(category)
    }

    pub fn record<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        new: &NewTransaction,
    ) -> LedgerResult<Recorded> {
        if new.amount <= rust_decimal::Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "transaction amount must be positive, got {}",
                new.amount
            )));
        }
        let category = self.postable_category(store, new.category_id, new.kind)?;
        let (source_account_id, destination_account_id) = match new.kind {
            EntryType::Income => (None, Some(new.account_id)),
            EntryType::Expense => (Some(new.account_id), None),
        };
        let mut transaction = Transaction {
            id: 0,
            owner_id: new.owner_id,
            source_account_id,
            destination_account_id,
            category_id: category.id,
            amount: new.amount,
            kind: new.kind,
            date: new.date.unwrap_or_else(|| Local::now().date_naive()),
            description: new.description.clone().unwrap_or_default(),
        };
        transaction.id = store.create_transaction(&transaction)?;
        debug!(
            id = transaction.id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            category = %category.name,
            "transaction recorded"
        );
        let budget_usage = self.tracker.on_transaction_recorded(store, &transaction)?;
        Ok(Recorded {
            transaction,
            budget_usage,
        })
    }

    pub fn history<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        owner_id: OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(LedgerError::validation(format!(
                    "date range is inverted: {} > {}",
                    from, to
                )));
            }
        }
        store.find_transactions(owner_id, filter)
    }
}
