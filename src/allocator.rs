// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Budgets and their per-category allocations. Allocations never add up to
//! more than the budget total.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Budget, BudgetCategory, BudgetCategoryId, BudgetId, CategoryId, EntryType, NewAllocation,
    NewBudget, OwnerId, PeriodType, checked_total,
};
use crate::store::{LedgerStore, UnitOfWork};
use crate::usage::{BudgetSummary, BudgetUsageTracker, CategoryUsage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWithAllocations {
    pub budget: Budget,
    pub allocations: Vec<BudgetCategory>,
}

fn require_positive(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} must be positive, got {}",
            what, amount
        )));
    }
    Ok(())
}

fn require_expense_category<S: LedgerStore + ?Sized>(
    store: &S,
    category_id: CategoryId,
) -> LedgerResult<()> {
    let category = store.get_category(category_id)?;
    if category.kind != EntryType::Expense {
        return Err(LedgerError::validation(format!(
            "category '{}' is {}, only expense categories can be budgeted",
            category.name, category.kind
        )));
    }
    Ok(())
}

fn check_capacity(budget: &Budget, allocated: Decimal, requested: Decimal) -> LedgerResult<()> {
    let exceeds = match allocated.checked_add(requested) {
        Some(sum) => sum > budget.total_amount,
        None => true,
    };
    if exceeds {
        return Err(LedgerError::ConstraintViolation {
            budget_id: budget.id,
            allocated,
            requested,
            total: budget.total_amount,
        });
    }
    Ok(())
}

fn ensure_unique_name<S: LedgerStore + ?Sized>(
    store: &S,
    owner_id: OwnerId,
    name: &str,
) -> LedgerResult<()> {
    if store.find_budget_by_owner_and_name(owner_id, name)?.is_some() {
        return Err(LedgerError::conflict(format!(
            "budget '{}' already exists",
            name
        )));
    }
    Ok(())
}

fn period_end(period: PeriodType, start: NaiveDate) -> LedgerResult<NaiveDate> {
    period.end_date(start).ok_or_else(|| {
        LedgerError::validation(format!("{} period starting {} is out of range", period, start))
    })
}

fn clean_name(name: &str) -> LedgerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("budget name must not be empty"));
    }
    Ok(name.to_string())
}

pub struct BudgetAllocator<'c, U: UnitOfWork> {
    coordinator: &'c mut Coordinator<U>,
    tracker: BudgetUsageTracker,
}

impl<'c, U: UnitOfWork> BudgetAllocator<'c, U> {
    pub fn new(coordinator: &'c mut Coordinator<U>, tracker: BudgetUsageTracker) -> Self {
        Self {
            coordinator,
            tracker,
        }
    }

    pub fn create_budget(
        &mut self,
        owner_id: OwnerId,
        name: &str,
        period: PeriodType,
        start_date: NaiveDate,
        total_amount: Decimal,
    ) -> LedgerResult<Budget> {
        let name = clean_name(name)?;
        require_positive(total_amount, "budget total")?;
        let end_date = period_end(period, start_date)?;
        let budget = self.coordinator.run_atomic("create_budget", |store| {
            ensure_unique_name(store, owner_id, &name)?;
            let id = store.create_budget(&NewBudget {
                owner_id,
                name: name.clone(),
                period,
                start_date,
                end_date,
                total_amount,
            })?;
            store.get_budget(id)
        })?;
        info!(budget_id = budget.id, owner_id, name = %budget.name, total = %budget.total_amount, "budget created");
        Ok(budget)
    }

    pub fn budget(&mut self, id: BudgetId) -> LedgerResult<BudgetWithAllocations> {
        self.coordinator.run_atomic("budget", |store| {
            Ok(BudgetWithAllocations {
                budget: store.get_budget(id)?,
                allocations: store.list_allocations(id)?,
            })
        })
    }

    pub fn budgets(&mut self, owner_id: OwnerId) -> LedgerResult<Vec<Budget>> {
        self.coordinator
            .run_atomic("budgets", |store| store.list_budgets(owner_id))
    }

    pub fn update_budget_total(&mut self, id: BudgetId, total_amount: Decimal) -> LedgerResult<Budget> {
        require_positive(total_amount, "budget total")?;
        self.coordinator.run_atomic("update_budget_total", |store| {
            let budget = store.get_budget(id)?;
            let allocated = store.sum_allocated_excluding(id, None)?;
            if allocated > total_amount {
                return Err(LedgerError::ConstraintViolation {
                    budget_id: id,
                    allocated,
                    requested: Decimal::ZERO,
                    total: total_amount,
                });
            }
            let budget = Budget {
                total_amount,
                ..budget
            };
            store.update_budget(&budget)?;
            Ok(budget)
        })
    }

    pub fn delete_budget(&mut self, id: BudgetId) -> LedgerResult<()> {
        self.coordinator
            .run_atomic("delete_budget", |store| store.delete_budget(id))?;
        info!(budget_id = id, "budget deleted");
        Ok(())
    }

    pub fn add_category(
        &mut self,
        budget_id: BudgetId,
        category_id: CategoryId,
        allocated_amount: Decimal,
    ) -> LedgerResult<BudgetCategory> {
        require_positive(allocated_amount, "allocated amount")?;
        let row = self.coordinator.run_atomic("add_category", |store| {
            let budget = store.get_budget(budget_id)?;
            require_expense_category(store, category_id)?;
            if store.find_allocation(budget_id, category_id)?.is_some() {
                return Err(LedgerError::conflict(format!(
                    "category {} is already allocated in budget '{}'",
                    category_id, budget.name
                )));
            }
            let allocated = store.sum_allocated_excluding(budget_id, None)?;
            check_capacity(&budget, allocated, allocated_amount)?;
            let id = store.insert_allocation(
                budget_id,
                &NewAllocation {
                    category_id,
                    allocated_amount,
                },
            )?;
            store.get_budget_category(id)
        })?;
        info!(budget_id, category_id, allocated = %allocated_amount, "category allocated");
        Ok(row)
    }

    pub fn update_category(
        &mut self,
        budget_category_id: BudgetCategoryId,
        allocated_amount: Decimal,
    ) -> LedgerResult<BudgetCategory> {
        require_positive(allocated_amount, "allocated amount")?;
        self.coordinator.run_atomic("update_category", |store| {
            let row = store.get_budget_category(budget_category_id)?;
            let budget = store.get_budget(row.budget_id)?;
            let others = store.sum_allocated_excluding(row.budget_id, Some(row.id))?;
            check_capacity(&budget, others, allocated_amount)?;
            store.update_allocation(row.id, allocated_amount)?;
            Ok(BudgetCategory {
                allocated_amount,
                ..row
            })
        })
    }

    pub fn remove_category(&mut self, budget_category_id: BudgetCategoryId) -> LedgerResult<()> {
        self.coordinator.run_atomic("remove_category", |store| {
            store.delete_allocation(budget_category_id)
        })
    }

    /// Replaces the budget's allocations with exactly `allocations`.
    pub fn allocate_batch(
        &mut self,
        budget_id: BudgetId,
        allocations: &BTreeMap<CategoryId, Decimal>,
    ) -> LedgerResult<Vec<BudgetCategory>> {
        for (category_id, amount) in allocations {
            require_positive(*amount, &format!("allocation for category {}", category_id))?;
        }
        let requested = checked_total(allocations.values().copied())
            .ok_or_else(|| LedgerError::overflow(format!("allocations for budget {}", budget_id)))?;
        let rows: Vec<NewAllocation> = allocations
            .iter()
            .map(|(category_id, amount)| NewAllocation {
                category_id: *category_id,
                allocated_amount: *amount,
            })
            .collect();
        let result = self.coordinator.run_atomic("allocate_batch", |store| {
            let budget = store.get_budget(budget_id)?;
            for row in &rows {
                require_expense_category(store, row.category_id)?;
            }
            check_capacity(&budget, Decimal::ZERO, requested)?;
            store.replace_allocations(budget_id, &rows)?;
            store.list_allocations(budget_id)
        })?;
        info!(budget_id, categories = result.len(), total = %requested, "allocations replaced");
        Ok(result)
    }

    /// Duplicates a budget and its allocations under a new name and start
    /// date. The copy starts with nothing spent, so its window must not
    /// already hold expenses in any copied category.
    pub fn copy_budget(
        &mut self,
        source_id: BudgetId,
        new_name: &str,
        new_start: NaiveDate,
    ) -> LedgerResult<BudgetWithAllocations> {
        let name = clean_name(new_name)?;
        let copy = self.coordinator.run_atomic("copy_budget", |store| {
            let source = store.get_budget(source_id)?;
            ensure_unique_name(store, source.owner_id, &name)?;
            let end_date = period_end(source.period, new_start)?;
            let sources = store.list_allocations(source_id)?;
            for row in &sources {
                let spent = store.sum_expenses(source.owner_id, row.category_id, new_start, end_date)?;
                if !spent.is_zero() {
                    let category = store.get_category(row.category_id)?;
                    return Err(LedgerError::validation(format!(
                        "'{}' already has {} spent between {} and {}; a copy must start unspent",
                        category.name, spent, new_start, end_date
                    )));
                }
            }
            let id = store.create_budget(&NewBudget {
                owner_id: source.owner_id,
                name: name.clone(),
                period: source.period,
                start_date: new_start,
                end_date,
                total_amount: source.total_amount,
            })?;
            let rows: Vec<NewAllocation> = sources
                .into_iter()
                .map(|r| NewAllocation {
                    category_id: r.category_id,
                    allocated_amount: r.allocated_amount,
                })
                .collect();
            store.replace_allocations(id, &rows)?;
            Ok(BudgetWithAllocations {
                budget: store.get_budget(id)?,
                allocations: store.list_allocations(id)?,
            })
        })?;
        info!(source_id, budget_id = copy.budget.id, name = %copy.budget.name, "budget copied");
        Ok(copy)
    }

    pub fn summary(&mut self, budget_id: BudgetId) -> LedgerResult<BudgetSummary> {
        let tracker = self.tracker;
        self.coordinator
            .run_atomic("budget_summary", |store| tracker.budget_summary(store, budget_id))
    }

    pub fn category_usage(&mut self, budget_category_id: BudgetCategoryId) -> LedgerResult<CategoryUsage> {
        let tracker = self.tracker;
        self.coordinator.run_atomic("category_usage", |store| {
            tracker.category_usage(store, budget_category_id)
        })
    }
}
