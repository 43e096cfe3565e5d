// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountId, AccountStatus, Budget, BudgetCategory, BudgetCategoryId, BudgetId,
    Category, CategoryId, EntryType, NewAccount, NewAllocation, NewBudget, OwnerId, PeriodType,
    Transaction, TransactionFilter, TransactionId,
};
use crate::store::{
    AccountStore, BudgetCategoryStore, BudgetStore, CategoryStore, LedgerStore, TransactionStore,
    UnitOfWork, WorkHandle,
};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Billfold", "billfold"));

pub fn default_db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("billfold.sqlite"))
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL CHECK(status IN ('active','inactive','closed')),
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(owner_id, name)
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        UNIQUE(name, type)
    );

    -- account ids are kept as plain references so history outlives closed accounts
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        source_account_id INTEGER,
        destination_account_id INTEGER,
        category_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        date TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK((type = 'income' AND destination_account_id IS NOT NULL AND source_account_id IS NULL)
           OR (type = 'expense' AND source_account_id IS NOT NULL AND destination_account_id IS NULL)),
        FOREIGN KEY(category_id) REFERENCES categories(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_owner_cat_date
        ON transactions(owner_id, category_id, date);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        period_type TEXT NOT NULL CHECK(period_type IN ('monthly','quarterly','yearly')),
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(owner_id, name)
    );

    CREATE TABLE IF NOT EXISTS budget_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        allocated_amount TEXT NOT NULL,
        UNIQUE(budget_id, category_id),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id)
    );
    "#,
    )
}

/// SQLite-backed persistence port.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    pub fn open(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self::from_connection(conn)?)
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> LedgerResult<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Read access outside a unit of work.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl UnitOfWork for SqliteLedger {
    fn begin(&mut self) -> LedgerResult<Box<dyn WorkHandle + '_>> {
        // IMMEDIATE takes the write lock up front so read-then-write of a
        // balance cannot interleave with another connection's writer.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Box::new(SqliteWork { tx }))
    }
}

struct SqliteWork<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl WorkHandle for SqliteWork<'_> {
    fn store(&self) -> &dyn LedgerStore {
        &*self.tx
    }

    fn commit(self: Box<Self>) -> LedgerResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> LedgerResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

macro_rules! sql_enum {
    ($t:ty) => {
        impl ToSql for $t {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $t {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$t>::parse(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", stringify!($t), s).into())
                })
            }
        }
    };
}

sql_enum!(AccountStatus);
sql_enum!(EntryType);
sql_enum!(PeriodType);

fn get_decimal(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn sum_decimal_column(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> LedgerResult<Decimal> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let amount: String = r.get(0)?;
        let value = amount
            .parse::<Decimal>()
            .map_err(|_| LedgerError::Corrupt(format!("invalid amount '{}'", amount)))?;
        total = total
            .checked_add(value)
            .ok_or_else(|| LedgerError::Corrupt(format!("stored amounts overflow at '{}'", amount)))?;
    }
    Ok(total)
}

const ACCOUNT_COLS: &str = "id, owner_id, name, balance, status, version";
const TRANSACTION_COLS: &str = "id, owner_id, source_account_id, destination_account_id, category_id, amount, type, date, description";
const BUDGET_COLS: &str = "id, owner_id, name, period_type, start_date, end_date, total_amount";
const ALLOCATION_COLS: &str = "id, budget_id, category_id, allocated_amount";

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        balance: get_decimal(r, 3)?,
        status: r.get(4)?,
        version: r.get(5)?,
    })
}

fn transaction_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        source_account_id: r.get(2)?,
        destination_account_id: r.get(3)?,
        category_id: r.get(4)?,
        amount: get_decimal(r, 5)?,
        kind: r.get(6)?,
        date: r.get(7)?,
        description: r.get(8)?,
    })
}

fn budget_from_row(r: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        period: r.get(3)?,
        start_date: r.get(4)?,
        end_date: r.get(5)?,
        total_amount: get_decimal(r, 6)?,
    })
}

fn allocation_from_row(r: &Row<'_>) -> rusqlite::Result<BudgetCategory> {
    Ok(BudgetCategory {
        id: r.get(0)?,
        budget_id: r.get(1)?,
        category_id: r.get(2)?,
        allocated_amount: get_decimal(r, 3)?,
    })
}

impl AccountStore for Connection {
    fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.query_row(
            &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id=?1"),
            params![id],
            account_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("Account", id))
    }

    fn create_account(&self, account: &NewAccount) -> LedgerResult<AccountId> {
        self.execute(
            "INSERT INTO accounts(owner_id, name, balance, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                account.owner_id,
                account.name,
                account.balance.to_string(),
                account.status
            ],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn update_balance(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE accounts SET balance=?1, version=version+1 WHERE id=?2 AND version=?3",
            params![new_balance.to_string(), id, expected_version],
        )?;
        if changed == 0 {
            let current = self.get_account(id)?;
            return Err(LedgerError::conflict(format!(
                "account {} changed concurrently (version {} expected, {} stored)",
                id, expected_version, current.version
            )));
        }
        Ok(())
    }

    fn update_status(&self, id: AccountId, status: AccountStatus) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE accounts SET status=?1 WHERE id=?2",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("Account", id));
        }
        Ok(())
    }

    fn rename_account(&self, id: AccountId, name: &str) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE accounts SET name=?1 WHERE id=?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("Account", id));
        }
        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> LedgerResult<()> {
        let changed = self.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("Account", id));
        }
        Ok(())
    }

    fn find_account_by_owner_and_name(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> LedgerResult<Option<Account>> {
        Ok(self
            .query_row(
                &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE owner_id=?1 AND name=?2"),
                params![owner_id, name],
                account_from_row,
            )
            .optional()?)
    }

    fn list_accounts(&self, owner_id: OwnerId) -> LedgerResult<Vec<Account>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {ACCOUNT_COLS} FROM accounts WHERE owner_id=?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![owner_id], account_from_row)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }
}

impl CategoryStore for Connection {
    fn get_category(&self, id: CategoryId) -> LedgerResult<Category> {
        self.query_row(
            "SELECT id, name, type FROM categories WHERE id=?1",
            params![id],
            |r| {
                Ok(Category {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    kind: r.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("Category", id))
    }

    fn create_category(&self, name: &str, kind: EntryType) -> LedgerResult<CategoryId> {
        self.execute(
            "INSERT INTO categories(name, type) VALUES (?1, ?2)",
            params![name, kind],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn find_category(&self, name: &str, kind: EntryType) -> LedgerResult<Option<Category>> {
        Ok(self
            .query_row(
                "SELECT id, name, type FROM categories WHERE name=?1 AND type=?2",
                params![name, kind],
                |r| {
                    Ok(Category {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        kind: r.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let mut stmt = self.prepare("SELECT id, name, type FROM categories ORDER BY type, name")?;
        let rows = stmt.query_map([], |r| {
            Ok(Category {
                id: r.get(0)?,
                name: r.get(1)?,
                kind: r.get(2)?,
            })
        })?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }
}

impl TransactionStore for Connection {
    fn create_transaction(&self, tx: &Transaction) -> LedgerResult<TransactionId> {
        self.execute(
            "INSERT INTO transactions(owner_id, source_account_id, destination_account_id, category_id, amount, type, date, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.owner_id,
                tx.source_account_id,
                tx.destination_account_id,
                tx.category_id,
                tx.amount.to_string(),
                tx.kind,
                tx.date,
                tx.description
            ],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.query_row(
            &format!("SELECT {TRANSACTION_COLS} FROM transactions WHERE id=?1"),
            params![id],
            transaction_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("Transaction", id))
    }

    fn sum_expenses(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Decimal> {
        sum_decimal_column(
            self,
            "SELECT amount FROM transactions
             WHERE owner_id=?1 AND category_id=?2 AND type='expense' AND date>=?3 AND date<=?4",
            params![owner_id, category_id, start, end],
        )
    }

    fn find_transactions(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        let mut sql = format!("SELECT {TRANSACTION_COLS} FROM transactions WHERE owner_id=?");
        let mut params_vec: Vec<Value> = vec![Value::Integer(owner_id)];

        if let Some(acct) = filter.account_id {
            sql.push_str(" AND (source_account_id=? OR destination_account_id=?)");
            params_vec.push(Value::Integer(acct));
            params_vec.push(Value::Integer(acct));
        }
        if let Some(cat) = filter.category_id {
            sql.push_str(" AND category_id=?");
            params_vec.push(Value::Integer(cat));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND type=?");
            params_vec.push(Value::Text(kind.as_str().into()));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND date>=?");
            params_vec.push(Value::Text(from.to_string()));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND date<=?");
            params_vec.push(Value::Text(to.to_string()));
        }
        sql.push_str(" ORDER BY date DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Value::Integer(limit as i64));
        }

        let mut stmt = self.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params_vec), transaction_from_row)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }
}

impl BudgetStore for Connection {
    fn get_budget(&self, id: BudgetId) -> LedgerResult<Budget> {
        self.query_row(
            &format!("SELECT {BUDGET_COLS} FROM budgets WHERE id=?1"),
            params![id],
            budget_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("Budget", id))
    }

    fn create_budget(&self, budget: &NewBudget) -> LedgerResult<BudgetId> {
        self.execute(
            "INSERT INTO budgets(owner_id, name, period_type, start_date, end_date, total_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                budget.owner_id,
                budget.name,
                budget.period,
                budget.start_date,
                budget.end_date,
                budget.total_amount.to_string()
            ],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn update_budget(&self, budget: &Budget) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE budgets SET name=?1, period_type=?2, start_date=?3, end_date=?4, total_amount=?5
             WHERE id=?6",
            params![
                budget.name,
                budget.period,
                budget.start_date,
                budget.end_date,
                budget.total_amount.to_string(),
                budget.id
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("Budget", budget.id));
        }
        Ok(())
    }

    fn delete_budget(&self, id: BudgetId) -> LedgerResult<()> {
        // explicit so the cascade does not depend on the foreign_keys pragma
        self.execute("DELETE FROM budget_categories WHERE budget_id=?1", params![id])?;
        let changed = self.execute("DELETE FROM budgets WHERE id=?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("Budget", id));
        }
        Ok(())
    }

    fn find_budget_by_owner_and_name(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> LedgerResult<Option<Budget>> {
        Ok(self
            .query_row(
                &format!("SELECT {BUDGET_COLS} FROM budgets WHERE owner_id=?1 AND name=?2"),
                params![owner_id, name],
                budget_from_row,
            )
            .optional()?)
    }

    fn list_budgets(&self, owner_id: OwnerId) -> LedgerResult<Vec<Budget>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {BUDGET_COLS} FROM budgets WHERE owner_id=?1 ORDER BY start_date DESC, name"
        ))?;
        let rows = stmt.query_map(params![owner_id], budget_from_row)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    fn budgets_covering(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
        date: NaiveDate,
    ) -> LedgerResult<Vec<Budget>> {
        let mut stmt = self.prepare_cached(
            "SELECT b.id, b.owner_id, b.name, b.period_type, b.start_date, b.end_date, b.total_amount
             FROM budgets b JOIN budget_categories bc ON bc.budget_id=b.id
             WHERE b.owner_id=?1 AND bc.category_id=?2 AND b.start_date<=?3 AND b.end_date>=?3
             ORDER BY b.id",
        )?;
        let rows = stmt.query_map(params![owner_id, category_id, date], budget_from_row)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }
}

impl BudgetCategoryStore for Connection {
    fn get_budget_category(&self, id: BudgetCategoryId) -> LedgerResult<BudgetCategory> {
        self.query_row(
            &format!("SELECT {ALLOCATION_COLS} FROM budget_categories WHERE id=?1"),
            params![id],
            allocation_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("Budget category", id))
    }

    fn find_allocation(
        &self,
        budget_id: BudgetId,
        category_id: CategoryId,
    ) -> LedgerResult<Option<BudgetCategory>> {
        Ok(self
            .query_row(
                &format!(
                    "SELECT {ALLOCATION_COLS} FROM budget_categories WHERE budget_id=?1 AND category_id=?2"
                ),
                params![budget_id, category_id],
                allocation_from_row,
            )
            .optional()?)
    }

    fn list_allocations(&self, budget_id: BudgetId) -> LedgerResult<Vec<BudgetCategory>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {ALLOCATION_COLS} FROM budget_categories WHERE budget_id=?1 ORDER BY category_id"
        ))?;
        let rows = stmt.query_map(params![budget_id], allocation_from_row)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    fn insert_allocation(
        &self,
        budget_id: BudgetId,
        row: &NewAllocation,
    ) -> LedgerResult<BudgetCategoryId> {
        self.execute(
            "INSERT INTO budget_categories(budget_id, category_id, allocated_amount) VALUES (?1, ?2, ?3)",
            params![budget_id, row.category_id, row.allocated_amount.to_string()],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn update_allocation(&self, id: BudgetCategoryId, allocated: Decimal) -> LedgerResult<()> {
        let changed = self.execute(
            "UPDATE budget_categories SET allocated_amount=?1 WHERE id=?2",
            params![allocated.to_string(), id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("Budget category", id));
        }
        Ok(())
    }

    fn delete_allocation(&self, id: BudgetCategoryId) -> LedgerResult<()> {
        let changed = self.execute("DELETE FROM budget_categories WHERE id=?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("Budget category", id));
        }
        Ok(())
    }

    fn sum_allocated_excluding(
        &self,
        budget_id: BudgetId,
        exclude: Option<BudgetCategoryId>,
    ) -> LedgerResult<Decimal> {
        sum_decimal_column(
            self,
            "SELECT allocated_amount FROM budget_categories WHERE budget_id=?1 AND (?2 IS NULL OR id<>?2)",
            params![budget_id, exclude],
        )
    }

    fn replace_allocations(
        &self,
        budget_id: BudgetId,
        rows: &[NewAllocation],
    ) -> LedgerResult<()> {
        self.execute(
            "DELETE FROM budget_categories WHERE budget_id=?1",
            params![budget_id],
        )?;
        for row in rows {
            self.insert_allocation(budget_id, row)?;
        }
        Ok(())
    }
}
