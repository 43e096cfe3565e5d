// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::categories::{self, SystemCategories};
use billfold::coordinator::Coordinator;
use billfold::db::{SqliteLedger, init_schema};
use billfold::models::{AccountStatus, EntryType, NewAccount, NewTransaction};
use billfold::recorder::TransactionRecorder;
use billfold::store::{AccountStore, BudgetCategoryStore, CategoryStore};
use billfold::LedgerError;
use chrono::Local;
use rusqlite::{Connection, params};
use rust_decimal_macros::dec;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn
}

fn income(account_id: i64, category_id: i64) -> NewTransaction {
    NewTransaction {
        owner_id: 1,
        account_id,
        category_id,
        amount: dec!(25),
        kind: EntryType::Income,
        date: None,
        description: Some("pay".into()),
    }
}

#[test]
fn failed_unit_of_work_discards_earlier_writes() {
    let mut coord = Coordinator::new(SqliteLedger::open_in_memory().unwrap());
    let err = coord
        .run_atomic("test", |store| {
            store.create_category("Rent", EntryType::Expense)?;
            Err::<(), _>(LedgerError::validation("boom"))
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let found = coord
        .inner()
        .connection()
        .find_category("Rent", EntryType::Expense)
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn successful_unit_of_work_commits() {
    let mut coord = Coordinator::new(SqliteLedger::open_in_memory().unwrap());
    let id = coord
        .run_atomic("test", |store| store.create_category("Rent", EntryType::Expense))
        .unwrap();
    assert_eq!(coord.inner().connection().get_category(id).unwrap().name, "Rent");
}

#[test]
fn provisioning_is_idempotent() {
    let conn = setup();
    let first = SystemCategories::provision(&conn).unwrap();
    let second = SystemCategories::provision(&conn).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.adjustment_income, first.adjustment_expense);
    assert_eq!(conn.list_categories().unwrap().len(), 7);
}

#[test]
fn duplicate_user_category_conflicts() {
    let conn = setup();
    categories::create(&conn, "Groceries", EntryType::Expense).unwrap();
    let err = categories::create(&conn, " Groceries ", EntryType::Expense).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    // same name with the other type is a different category
    categories::create(&conn, "Groceries", EntryType::Income).unwrap();
}

#[test]
fn income_sets_destination_only() {
    let conn = setup();
    let salary = conn.create_category("Salary", EntryType::Income).unwrap();
    let recorded = TransactionRecorder::default()
        .record(&conn, &income(3, salary))
        .unwrap();
    let t = recorded.transaction;
    assert_eq!(t.destination_account_id, Some(3));
    assert_eq!(t.source_account_id, None);
    assert_eq!(t.description, "pay");
    assert!(recorded.budget_usage.is_empty());
}

#[test]
fn category_type_must_match() {
    let conn = setup();
    let food = conn.create_category("Food", EntryType::Expense).unwrap();
    let err = TransactionRecorder::default()
        .record(&conn, &income(3, food))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = TransactionRecorder::default()
        .record(&conn, &income(3, 999))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn missing_date_defaults_to_today() {
    let conn = setup();
    let salary = conn.create_category("Salary", EntryType::Income).unwrap();
    let before = Local::now().date_naive();
    let t = TransactionRecorder::default()
        .record(&conn, &income(3, salary))
        .unwrap()
        .transaction;
    let after = Local::now().date_naive();
    assert!(t.date >= before && t.date <= after);
}

#[test]
fn stale_version_is_a_conflict() {
    let conn = setup();
    let id = conn
        .create_account(&NewAccount {
            owner_id: 1,
            name: "Checking".into(),
            balance: dec!(10),
            status: AccountStatus::Active,
        })
        .unwrap();
    conn.update_balance(id, 0, dec!(20)).unwrap();
    let err = conn.update_balance(id, 0, dec!(30)).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    let acct = conn.get_account(id).unwrap();
    assert_eq!(acct.balance, dec!(20));
    assert_eq!(acct.version, 1);
}

#[test]
fn schema_rejects_income_without_destination() {
    let conn = setup();
    let cat = conn.create_category("Salary", EntryType::Income).unwrap();
    let res = conn.execute(
        "INSERT INTO transactions(owner_id, source_account_id, category_id, amount, type, date)
         VALUES (1, 5, ?1, '1', 'income', '2025-01-01')",
        params![cat],
    );
    assert!(res.is_err());
}

fn budget_with_raw_allocations(conn: &Connection, amounts: &[&str]) {
    conn.execute(
        "INSERT INTO budgets(owner_id, name, period_type, start_date, end_date, total_amount)
         VALUES (1, 'B', 'monthly', '2025-01-01', '2025-01-31', '100')",
        [],
    )
    .unwrap();
    for (i, amount) in amounts.iter().enumerate() {
        let cat = conn
            .create_category(&format!("Cat{}", i), EntryType::Expense)
            .unwrap();
        conn.execute(
            "INSERT INTO budget_categories(budget_id, category_id, allocated_amount) VALUES (1, ?1, ?2)",
            params![cat, amount],
        )
        .unwrap();
    }
}

#[test]
fn corrupt_amount_is_reported() {
    let conn = setup();
    budget_with_raw_allocations(&conn, &["abc"]);
    let err = conn.sum_allocated_excluding(1, None).unwrap_err();
    assert!(matches!(err, LedgerError::Corrupt(_)));
}

#[test]
fn overflowing_stored_sum_is_reported() {
    let conn = setup();
    let max = rust_decimal::Decimal::MAX.to_string();
    budget_with_raw_allocations(&conn, &[max.as_str(), max.as_str()]);
    let err = conn.sum_allocated_excluding(1, None).unwrap_err();
    assert!(matches!(err, LedgerError::Corrupt(_)));
}
