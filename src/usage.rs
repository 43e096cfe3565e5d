// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Budget spending, summed on demand from the expenses in each budget window.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Budget, BudgetCategory, BudgetCategoryId, BudgetId, EntryType, Transaction, checked_total,
};
use crate::store::LedgerStore;

/// `spent / allocated * 100`, or zero when nothing is allocated.
pub fn usage_percentage(spent: Decimal, allocated: Decimal) -> LedgerResult<Decimal> {
    if allocated.is_zero() {
        return Ok(Decimal::ZERO);
    }
    spent
        .checked_div(allocated)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(2))
        .ok_or_else(|| LedgerError::overflow(format!("usage of {} against {}", spent, allocated)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryUsage {
    pub budget_category_id: BudgetCategoryId,
    pub budget_id: BudgetId,
    pub category_id: i64,
    pub category_name: String,
    pub allocated: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub usage_percentage: Decimal,
    pub overspent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub budget: Budget,
    pub allocated: Decimal,
    pub unallocated: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub usage_percentage: Decimal,
    pub overspent: bool,
    pub categories: Vec<CategoryUsage>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BudgetUsageTracker;

impl BudgetUsageTracker {
    pub fn spent<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        budget: &Budget,
        category_id: i64,
    ) -> LedgerResult<Decimal> {
        store.sum_expenses(
            budget.owner_id,
            category_id,
            budget.start_date,
            budget.end_date,
        )
    }

    fn usage_for<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        budget: &Budget,
        row: &BudgetCategory,
    ) -> LedgerResult<CategoryUsage> {
        let category = store.get_category(row.category_id)?;
        let spent = self.spent(store, budget, row.category_id)?;
        Ok(CategoryUsage {
            budget_category_id: row.id,
            budget_id: budget.id,
            category_id: row.category_id,
            category_name: category.name,
            allocated: row.allocated_amount,
            spent,
            remaining: row.allocated_amount - spent,
            usage_percentage: usage_percentage(spent, row.allocated_amount)?,
            overspent: spent > row.allocated_amount,
        })
    }

    pub fn category_usage<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        budget_category_id: BudgetCategoryId,
    ) -> LedgerResult<CategoryUsage> {
        let row = store.get_budget_category(budget_category_id)?;
        let budget = store.get_budget(row.budget_id)?;
        self.usage_for(store, &budget, &row)
    }

    pub fn budget_summary<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        budget_id: BudgetId,
    ) -> LedgerResult<BudgetSummary> {
        let budget = store.get_budget(budget_id)?;
        let mut categories = Vec::new();
        for row in store.list_allocations(budget_id)? {
            categories.push(self.usage_for(store, &budget, &row)?);
        }
        let allocated = checked_total(categories.iter().map(|c| c.allocated)).ok_or_else(|| {
            LedgerError::Corrupt(format!("allocations of budget {} overflow", budget_id))
        })?;
        let spent = checked_total(categories.iter().map(|c| c.spent)).ok_or_else(|| {
            LedgerError::Corrupt(format!("spending in budget {} overflows", budget_id))
        })?;
        let usage_percentage = usage_percentage(spent, budget.total_amount)?;
        Ok(BudgetSummary {
            allocated,
            unallocated: budget.total_amount - allocated,
            spent,
            remaining: budget.total_amount - spent,
            usage_percentage,
            overspent: spent > budget.total_amount,
            categories,
            budget,
        })
    }

    /// Usage of every allocation the new transaction counts towards.
    pub fn on_transaction_recorded<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        tx: &Transaction,
    ) -> LedgerResult<Vec<CategoryUsage>> {
        if tx.kind != EntryType::Expense {
            return Ok(Vec::new());
        }
        let mut affected = Vec::new();
        for budget in store.budgets_covering(tx.owner_id, tx.category_id, tx.date)? {
            let Some(row) = store.find_allocation(budget.id, tx.category_id)? else {
                continue;
            };
            let usage = self.usage_for(store, &budget, &row)?;
            if usage.overspent {
                warn!(
                    budget = %budget.name,
                    category = %usage.category_name,
                    allocated = %usage.allocated,
                    spent = %usage.spent,
                    "budget category overspent"
                );
            }
            affected.push(usage);
        }
        Ok(affected)
    }
}
