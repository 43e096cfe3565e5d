// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod categories;
pub mod transactions;
pub mod budgets;
pub mod doctor;

use crate::allocator::BudgetAllocator;
use crate::categories::SystemCategories;
use crate::coordinator::Coordinator;
use crate::db::SqliteLedger;
use crate::error::LedgerResult;
use crate::ledger::AccountLedger;
use crate::models::OwnerId;
use crate::recorder::TransactionRecorder;
use crate::usage::BudgetUsageTracker;

/// The wired-up components a command runs against.
pub struct Session {
    pub coordinator: Coordinator<SqliteLedger>,
    pub categories: SystemCategories,
    pub owner_id: OwnerId,
}

impl Session {
    pub fn new(db: SqliteLedger, owner_id: OwnerId) -> LedgerResult<Self> {
        let mut coordinator = Coordinator::new(db);
        let categories =
            coordinator.run_atomic("provision_categories", |s| SystemCategories::provision(s))?;
        Ok(Self {
            coordinator,
            categories,
            owner_id,
        })
    }

    pub fn ledger(&mut self) -> AccountLedger<'_, SqliteLedger> {
        AccountLedger::new(
            &mut self.coordinator,
            self.categories,
            TransactionRecorder::new(BudgetUsageTracker),
        )
    }

    pub fn allocator(&mut self) -> BudgetAllocator<'_, SqliteLedger> {
        BudgetAllocator::new(&mut self.coordinator, BudgetUsageTracker)
    }

    pub fn reader(&self) -> &rusqlite::Connection {
        self.coordinator.inner().connection()
    }
}
