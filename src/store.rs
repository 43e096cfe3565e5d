// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence port. Nothing here commits on its own.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::LedgerResult;
use crate::models::{
    Account, AccountId, AccountStatus, Budget, BudgetCategory, BudgetCategoryId, BudgetId,
    Category, CategoryId, EntryType, NewAccount, NewAllocation, NewBudget, OwnerId, Transaction,
    TransactionFilter, TransactionId,
};

pub trait AccountStore {
    fn get_account(&self, id: AccountId) -> LedgerResult<Account>;
    fn create_account(&self, account: &NewAccount) -> LedgerResult<AccountId>;
    /// Writes the balance only if the stored version still equals
    /// `expected_version`, otherwise fails with `Conflict`.
    fn update_balance(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> LedgerResult<()>;
    fn update_status(&self, id: AccountId, status: AccountStatus) -> LedgerResult<()>;
    fn rename_account(&self, id: AccountId, name: &str) -> LedgerResult<()>;
    fn delete_account(&self, id: AccountId) -> LedgerResult<()>;
    fn find_account_by_owner_and_name(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> LedgerResult<Option<Account>>;
    fn list_accounts(&self, owner_id: OwnerId) -> LedgerResult<Vec<Account>>;
}

pub trait CategoryStore {
    fn get_category(&self, id: CategoryId) -> LedgerResult<Category>;
    fn create_category(&self, name: &str, kind: EntryType) -> LedgerResult<CategoryId>;
    fn find_category(&self, name: &str, kind: EntryType) -> LedgerResult<Option<Category>>;
    fn list_categories(&self) -> LedgerResult<Vec<Category>>;
}

pub trait TransactionStore {
    fn create_transaction(&self, tx: &Transaction) -> LedgerResult<TransactionId>;
    fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction>;
    // inclusive of both ends
    fn sum_expenses(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal>;
    // newest first
    fn find_transactions(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>>;
}

pub trait BudgetStore {
    fn get_budget(&self, id: BudgetId) -> LedgerResult<Budget>;
    fn create_budget(&self, budget: &NewBudget) -> LedgerResult<BudgetId>;
    fn update_budget(&self, budget: &Budget) -> LedgerResult<()>;
    fn delete_budget(&self, id: BudgetId) -> LedgerResult<()>;
    fn find_budget_by_owner_and_name(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> LedgerResult<Option<Budget>>;
    fn list_budgets(&self, owner_id: OwnerId) -> LedgerResult<Vec<Budget>>;
    /// Budgets of `owner_id` whose window contains `date` and which allocate `category_id`.
    fn budgets_covering(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
        date: NaiveDate,
    ) -> LedgerResult<Vec<Budget>>;
}

pub trait BudgetCategoryStore {
    fn get_budget_category(&self, id: BudgetCategoryId) -> LedgerResult<BudgetCategory>;
    fn find_allocation(
        &self,
        budget_id: BudgetId,
        category_id: CategoryId,
    ) -> LedgerResult<Option<BudgetCategory>>;
    fn list_allocations(&self, budget_id: BudgetId) -> LedgerResult<Vec<BudgetCategory>>;
    fn insert_allocation(
        &self,
        budget_id: BudgetId,
        row: &NewAllocation,
    ) -> LedgerResult<BudgetCategoryId>;
    fn update_allocation(&self, id: BudgetCategoryId, allocated: Decimal) -> LedgerResult<()>;
    fn delete_allocation(&self, id: BudgetCategoryId) -> LedgerResult<()>;
    fn sum_allocated_excluding(
        &self,
        budget_id: BudgetId,
        exclude: Option<BudgetCategoryId>,
    ) -> LedgerResult<Decimal>;
    /// Deletes every allocation of the budget, then inserts `rows`.
    fn replace_allocations(&self, budget_id: BudgetId, rows: &[NewAllocation])
    -> LedgerResult<()>;
}

pub trait LedgerStore:
    AccountStore + CategoryStore + TransactionStore + BudgetStore + BudgetCategoryStore
{
}

impl<T> LedgerStore for T where
    T: AccountStore + CategoryStore + TransactionStore + BudgetStore + BudgetCategoryStore
{
}

pub trait UnitOfWork {
    fn begin(&mut self) -> LedgerResult<Box<dyn WorkHandle + '_>>;
}

/// An open unit of work. Dropping it without committing discards its writes.
pub trait WorkHandle {
    fn store(&self) -> &dyn LedgerStore;
    fn commit(self: Box<Self>) -> LedgerResult<()>;
    fn rollback(self: Box<Self>) -> LedgerResult<()>;
}
