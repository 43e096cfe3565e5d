// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Account balances and the account state machine. Balances change only
//! here, in the same unit of work as the transaction describing the change.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::categories::{self, ACCOUNT_CLOSURE, SystemCategories};
use crate::coordinator::Coordinator;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountId, AccountStatus, CategoryId, EntryType, NewAccount, NewTransaction, OwnerId,
    Transaction, TransactionFilter, checked_total,
};
use crate::recorder::TransactionRecorder;
use crate::store::{LedgerStore, UnitOfWork};
use crate::usage::CategoryUsage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posting {
    pub account: Account,
    pub transaction: Transaction,
    pub budget_usage: Vec<CategoryUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferOutcome {
    pub from: Account,
    pub to: Account,
    /// Empty for plain transfers; the expense/income pair for audited ones.
    pub entries: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Adjustment {
    Unchanged { account: Account },
    Posted(Posting),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Closure {
    Deleted {
        account_id: AccountId,
    },
    Migrated {
        account_id: AccountId,
        target: Account,
        expense: Transaction,
        income: Transaction,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub category_id: Option<CategoryId>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

fn require_positive(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} amount must be positive, got {}",
            what, amount
        )));
    }
    Ok(())
}

fn require_active(account: &Account) -> LedgerResult<()> {
    if account.status != AccountStatus::Active {
        return Err(LedgerError::validation(format!(
            "account '{}' is {}, only active accounts can move funds",
            account.name, account.status
        )));
    }
    Ok(())
}

fn active_account<S: LedgerStore + ?Sized>(store: &S, id: AccountId) -> LedgerResult<Account> {
    let account = store.get_account(id)?;
    require_active(&account)?;
    Ok(account)
}

fn write_balance<S: LedgerStore + ?Sized>(
    store: &S,
    account: &Account,
    new_balance: Decimal,
) -> LedgerResult<Account> {
    if new_balance < Decimal::ZERO {
        return Err(LedgerError::insufficient_funds(
            account.balance,
            account.balance - new_balance,
        ));
    }
    store.update_balance(account.id, account.version, new_balance)?;
    Ok(Account {
        balance: new_balance,
        version: account.version + 1,
        ..account.clone()
    })
}

fn credit<S: LedgerStore + ?Sized>(
    store: &S,
    account: &Account,
    amount: Decimal,
) -> LedgerResult<Account> {
    let new_balance = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::overflow(format!("balance of account '{}'", account.name)))?;
    write_balance(store, account, new_balance)
}

fn debit<S: LedgerStore + ?Sized>(
    store: &S,
    account: &Account,
    amount: Decimal,
) -> LedgerResult<Account> {
    if account.balance < amount {
        return Err(LedgerError::insufficient_funds(account.balance, amount));
    }
    write_balance(store, account, account.balance - amount)
}

// `account` must already be known active
fn post<S: LedgerStore + ?Sized>(
    store: &S,
    recorder: &TransactionRecorder,
    account: &Account,
    kind: EntryType,
    amount: Decimal,
    category_id: CategoryId,
    entry: &Entry,
) -> LedgerResult<Posting> {
    recorder.postable_category(store, category_id, kind)?;
    let updated = match kind {
        EntryType::Income => credit(store, account, amount)?,
        EntryType::Expense => debit(store, account, amount)?,
    };
    let recorded = recorder.record(
        store,
        &NewTransaction {
            owner_id: account.owner_id,
            account_id: account.id,
            category_id,
            amount,
            kind,
            date: entry.date,
            description: entry.description.clone(),
        },
    )?;
    Ok(Posting {
        account: updated,
        transaction: recorded.transaction,
        budget_usage: recorded.budget_usage,
    })
}

pub struct AccountLedger<'c, U: UnitOfWork> {
    coordinator: &'c mut Coordinator<U>,
    categories: SystemCategories,
    recorder: TransactionRecorder,
}

impl<'c, U: UnitOfWork> AccountLedger<'c, U> {
    pub fn new(
        coordinator: &'c mut Coordinator<U>,
        categories: SystemCategories,
        recorder: TransactionRecorder,
    ) -> Self {
        Self {
            coordinator,
            categories,
            recorder,
        }
    }

    pub fn open_account(
        &mut self,
        owner_id: OwnerId,
        name: &str,
        initial_balance: Decimal,
    ) -> LedgerResult<Account> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("account name must not be empty"));
        }
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "initial balance must not be negative, got {}",
                initial_balance
            )));
        }
        let recorder = self.recorder;
        let opening = self.categories.opening_balance;
        let account = self.coordinator.run_atomic("open_account", |store| {
            if store.find_account_by_owner_and_name(owner_id, &name)?.is_some() {
                return Err(LedgerError::conflict(format!(
                    "account '{}' already exists",
                    name
                )));
            }
            let id = store.create_account(&NewAccount {
                owner_id,
                name: name.clone(),
                balance: Decimal::ZERO,
                status: AccountStatus::Active,
            })?;
            let account = store.get_account(id)?;
            if initial_balance.is_zero() {
                return Ok(account);
            }
            let entry = Entry {
                description: Some("Opening balance".into()),
                ..Entry::default()
            };
            let posting = post(
                store,
                &recorder,
                &account,
                EntryType::Income,
                initial_balance,
                opening,
                &entry,
            )?;
            Ok(posting.account)
        })?;
        info!(account_id = account.id, owner_id, name = %account.name, balance = %account.balance, "account opened");
        Ok(account)
    }

    pub fn account(&mut self, id: AccountId) -> LedgerResult<Account> {
        self.coordinator
            .run_atomic("account", |store| store.get_account(id))
    }

    pub fn accounts(&mut self, owner_id: OwnerId) -> LedgerResult<Vec<Account>> {
        self.coordinator
            .run_atomic("accounts", |store| store.list_accounts(owner_id))
    }

    pub fn net_worth(&mut self, owner_id: OwnerId) -> LedgerResult<Decimal> {
        let accounts = self.accounts(owner_id)?;
        checked_total(
            accounts
                .iter()
                .filter(|a| a.status != AccountStatus::Closed)
                .map(|a| a.balance),
        )
        .ok_or_else(|| LedgerError::overflow(format!("net worth of owner {}", owner_id)))
    }

    pub fn history(
        &mut self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        let recorder = self.recorder;
        self.coordinator.run_atomic("history", |store| {
            recorder.history(store, owner_id, filter)
        })
    }

    pub fn rename_account(&mut self, id: AccountId, name: &str) -> LedgerResult<Account> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("account name must not be empty"));
        }
        self.coordinator.run_atomic("rename_account", |store| {
            let account = store.get_account(id)?;
            if let Some(other) = store.find_account_by_owner_and_name(account.owner_id, &name)? {
                if other.id != id {
                    return Err(LedgerError::conflict(format!(
                        "account '{}' already exists",
                        name
                    )));
                }
            }
            store.rename_account(id, &name)?;
            Ok(Account { name, ..account })
        })
    }

    pub fn update_status(&mut self, id: AccountId, status: AccountStatus) -> LedgerResult<Account> {
        let account = self.coordinator.run_atomic("update_status", |store| {
            let account = store.get_account(id)?;
            if account.status == status {
                return Ok(account);
            }
            if !account.status.can_become(status) {
                return Err(LedgerError::validation(format!(
                    "account '{}' cannot go from {} to {}",
                    account.name, account.status, status
                )));
            }
            if !account.balance.is_zero() {
                return Err(LedgerError::validation(format!(
                    "account '{}' holds {}; its balance must be zero to become {}",
                    account.name, account.balance, status
                )));
            }
            store.update_status(id, status)?;
            Ok(Account { status, ..account })
        })?;
        info!(account_id = id, status = %account.status, "account status updated");
        Ok(account)
    }

    pub fn deposit(&mut self, id: AccountId, amount: Decimal) -> LedgerResult<Posting> {
        let category = self.categories.deposit;
        self.record_entry(id, EntryType::Income, amount, category, Entry::default())
    }

    pub fn withdraw(&mut self, id: AccountId, amount: Decimal) -> LedgerResult<Posting> {
        let category = self.categories.withdrawal;
        self.record_entry(id, EntryType::Expense, amount, category, Entry::default())
    }

    pub fn record_income(
        &mut self,
        id: AccountId,
        amount: Decimal,
        entry: Entry,
    ) -> LedgerResult<Posting> {
        let category = entry.category_id.unwrap_or(self.categories.deposit);
        self.record_entry(id, EntryType::Income, amount, category, entry)
    }

    pub fn record_expense(
        &mut self,
        id: AccountId,
        amount: Decimal,
        entry: Entry,
    ) -> LedgerResult<Posting> {
        let category = entry.category_id.unwrap_or(self.categories.withdrawal);
        self.record_entry(id, EntryType::Expense, amount, category, entry)
    }

    fn record_entry(
        &mut self,
        id: AccountId,
        kind: EntryType,
        amount: Decimal,
        category_id: CategoryId,
        entry: Entry,
    ) -> LedgerResult<Posting> {
        let what = match kind {
            EntryType::Income => "deposit",
            EntryType::Expense => "withdrawal",
        };
        require_positive(amount, what)?;
        let recorder = self.recorder;
        let posting = self.coordinator.run_atomic(what, |store| {
            let account = active_account(store, id)?;
            post(store, &recorder, &account, kind, amount, category_id, &entry)
        })?;
        info!(
            account_id = id,
            kind = %kind,
            amount = %amount,
            balance = %posting.account.balance,
            transaction_id = posting.transaction.id,
            "balance posted"
        );
        Ok(posting)
    }

    /// Moves funds between two active accounts of the same owner without
    /// writing transaction records.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> LedgerResult<TransferOutcome> {
        self.transfer_inner(from, to, amount, false)
    }

    /// Also records an expense on `from` and an income on `to`.
    pub fn transfer_with_audit(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> LedgerResult<TransferOutcome> {
        self.transfer_inner(from, to, amount, true)
    }

    fn transfer_inner(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        audit: bool,
    ) -> LedgerResult<TransferOutcome> {
        require_positive(amount, "transfer")?;
        if from == to {
            return Err(LedgerError::validation(
                "cannot transfer between an account and itself",
            ));
        }
        let recorder = self.recorder;
        let categories = self.categories;
        let outcome = self.coordinator.run_atomic("transfer", |store| {
            let source = active_account(store, from)?;
            let target = active_account(store, to)?;
            if source.owner_id != target.owner_id {
                return Err(LedgerError::validation(
                    "transfers must stay within one owner's accounts",
                ));
            }
            if !audit {
                let source = debit(store, &source, amount)?;
                let target = credit(store, &target, amount)?;
                return Ok(TransferOutcome {
                    from: source,
                    to: target,
                    entries: Vec::new(),
                });
            }
            let entry = Entry {
                description: Some(format!("Transfer {} -> {}", source.name, target.name)),
                ..Entry::default()
            };
            let out = post(
                store,
                &recorder,
                &source,
                EntryType::Expense,
                amount,
                categories.transfer(EntryType::Expense),
                &entry,
            )?;
            let inc = post(
                store,
                &recorder,
                &target,
                EntryType::Income,
                amount,
                categories.transfer(EntryType::Income),
                &entry,
            )?;
            Ok(TransferOutcome {
                from: out.account,
                to: inc.account,
                entries: vec![out.transaction, inc.transaction],
            })
        })?;
        info!(from, to, amount = %amount, audit, "funds transferred");
        Ok(outcome)
    }

    pub fn adjust_balance(&mut self, id: AccountId, new_balance: Decimal) -> LedgerResult<Adjustment> {
        if new_balance < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "balance cannot be set below zero, got {}",
                new_balance
            )));
        }
        let recorder = self.recorder;
        let categories = self.categories;
        let adjustment = self.coordinator.run_atomic("adjust_balance", |store| {
            let account = active_account(store, id)?;
            let delta = new_balance - account.balance;
            if delta.is_zero() {
                return Ok(Adjustment::Unchanged { account });
            }
            let kind = if delta > Decimal::ZERO {
                EntryType::Income
            } else {
                EntryType::Expense
            };
            let entry = Entry {
                description: Some(format!("Balance adjusted to {}", new_balance)),
                ..Entry::default()
            };
            let posting = post(
                store,
                &recorder,
                &account,
                kind,
                delta.abs(),
                categories.adjustment(kind),
                &entry,
            )?;
            Ok(Adjustment::Posted(posting))
        })?;
        if let Adjustment::Posted(ref p) = adjustment {
            info!(account_id = id, balance = %p.account.balance, "balance adjusted");
        }
        Ok(adjustment)
    }

    /// Deletes the account. A non-zero balance is first migrated to
    /// `transfer_account_id`, which must be an active account of the same
    /// owner, through an expense/income pair under the closure categories.
    pub fn close(
        &mut self,
        id: AccountId,
        transfer_account_id: Option<AccountId>,
    ) -> LedgerResult<Closure> {
        if transfer_account_id == Some(id) {
            return Err(LedgerError::validation(
                "an account cannot migrate its funds into itself",
            ));
        }
        let recorder = self.recorder;
        let closure = self.coordinator.run_atomic("close_account", |store| {
            let account = store.get_account(id)?;
            if account.balance.is_zero() {
                store.delete_account(id)?;
                return Ok(Closure::Deleted { account_id: id });
            }
            let Some(target_id) = transfer_account_id else {
                return Err(LedgerError::validation(format!(
                    "account '{}' still holds {}; choose an account to receive it",
                    account.name, account.balance
                )));
            };
            let target = store.get_account(target_id)?;
            if target.owner_id != account.owner_id {
                return Err(LedgerError::validation(
                    "funds can only migrate to an account of the same owner",
                ));
            }
            require_active(&target)?;

            let expense_cat = categories::ensure(store, ACCOUNT_CLOSURE, EntryType::Expense)?;
            let income_cat = categories::ensure(store, ACCOUNT_CLOSURE, EntryType::Income)?;
            let amount = account.balance;
            let entry = Entry {
                description: Some(format!(
                    "Closing '{}' into '{}'",
                    account.name, target.name
                )),
                ..Entry::default()
            };
            let out = post(
                store,
                &recorder,
                &account,
                EntryType::Expense,
                amount,
                expense_cat,
                &entry,
            )?;
            let inc = post(
                store,
                &recorder,
                &target,
                EntryType::Income,
                amount,
                income_cat,
                &entry,
            )?;
            store.delete_account(id)?;
            Ok(Closure::Migrated {
                account_id: id,
                target: inc.account,
                expense: out.transaction,
                income: inc.transaction,
            })
        })?;
        match &closure {
            Closure::Deleted { .. } => info!(account_id = id, "account closed"),
            Closure::Migrated { target, expense, .. } => info!(
                account_id = id,
                target = target.id,
                amount = %expense.amount,
                "account closed, funds migrated"
            ),
        }
        Ok(closure)
    }
}
