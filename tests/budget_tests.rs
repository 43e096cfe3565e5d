// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::categories;
use billfold::commands::Session;
use billfold::db::SqliteLedger;
use billfold::ledger::Entry;
use billfold::models::{AccountId, CategoryId, EntryType, PeriodType};
use billfold::store::{BudgetCategoryStore, BudgetStore};
use billfold::usage::usage_percentage;
use billfold::LedgerError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn setup() -> Session {
    Session::new(SqliteLedger::open_in_memory().unwrap(), 1).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn category(s: &mut Session, name: &str, kind: EntryType) -> CategoryId {
    s.coordinator
        .run_atomic("test_category", |store| categories::create(store, name, kind))
        .unwrap()
        .id
}

fn spend(s: &mut Session, account: AccountId, cat: CategoryId, amount: Decimal, date: NaiveDate) {
    s.ledger()
        .record_expense(
            account,
            amount,
            Entry {
                category_id: Some(cat),
                date: Some(date),
                description: None,
            },
        )
        .unwrap();
}

fn pairs(s: &Session, budget_id: i64) -> Vec<(CategoryId, Decimal)> {
    let mut rows: Vec<_> = s
        .reader()
        .list_allocations(budget_id)
        .unwrap()
        .into_iter()
        .map(|r| (r.category_id, r.allocated_amount))
        .collect();
    rows.sort();
    rows
}

#[test]
fn allocations_cannot_exceed_budget_total() {
    let mut s = setup();
    let c1 = category(&mut s, "Groceries", EntryType::Expense);
    let c2 = category(&mut s, "Rent", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Household", PeriodType::Monthly, d(2025, 1, 1), dec!(1000.00))
        .unwrap();

    s.allocator().add_category(b.id, c1, dec!(600.00)).unwrap();
    let err = s.allocator().add_category(b.id, c2, dec!(500.00)).unwrap_err();
    match err {
        LedgerError::ConstraintViolation {
            budget_id,
            allocated,
            requested,
            total,
        } => {
            assert_eq!(budget_id, b.id);
            assert_eq!(allocated, dec!(600.00));
            assert_eq!(requested, dec!(500.00));
            assert_eq!(total, dec!(1000.00));
        }
        other => panic!("expected constraint violation, got {other:?}"),
    }
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(600.00))]);

    // an exact fit is allowed
    s.allocator().add_category(b.id, c2, dec!(400.00)).unwrap();
    assert_eq!(s.allocator().summary(b.id).unwrap().unallocated, Decimal::ZERO);
}

#[test]
fn updating_an_allocation_excludes_its_own_amount() {
    let mut s = setup();
    let c1 = category(&mut s, "Fuel", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Car", PeriodType::Monthly, d(2025, 1, 1), dec!(1000))
        .unwrap();
    let row = s.allocator().add_category(b.id, c1, dec!(600)).unwrap();

    let row = s.allocator().update_category(row.id, dec!(1000)).unwrap();
    assert_eq!(row.allocated_amount, dec!(1000));
    let err = s.allocator().update_category(row.id, dec!(1000.01)).unwrap_err();
    assert!(matches!(err, LedgerError::ConstraintViolation { .. }));
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(1000))]);
}

#[test]
fn allocation_rules() {
    let mut s = setup();
    let food = category(&mut s, "Food", EntryType::Expense);
    let salary = category(&mut s, "Salary", EntryType::Income);
    let b = s
        .allocator()
        .create_budget(1, "Monthly", PeriodType::Monthly, d(2025, 3, 1), dec!(500))
        .unwrap();

    s.allocator().add_category(b.id, food, dec!(100)).unwrap();
    let err = s.allocator().add_category(b.id, food, dec!(50)).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    let err = s.allocator().add_category(b.id, salary, dec!(50)).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = s.allocator().add_category(b.id, 9_999, dec!(50)).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    let err = s.allocator().add_category(b.id, food, Decimal::ZERO).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn removing_an_allocation_frees_capacity() {
    let mut s = setup();
    let c1 = category(&mut s, "Travel", EntryType::Expense);
    let c2 = category(&mut s, "Hotels", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Trip", PeriodType::Yearly, d(2025, 1, 1), dec!(1000))
        .unwrap();
    let row = s.allocator().add_category(b.id, c1, dec!(600)).unwrap();
    s.allocator().remove_category(row.id).unwrap();
    s.allocator().add_category(b.id, c2, dec!(1000)).unwrap();
    assert_eq!(pairs(&s, b.id), vec![(c2, dec!(1000))]);
}

#[test]
fn total_cannot_drop_below_allocations() {
    let mut s = setup();
    let c1 = category(&mut s, "Gym", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Health", PeriodType::Monthly, d(2025, 1, 1), dec!(300))
        .unwrap();
    s.allocator().add_category(b.id, c1, dec!(250)).unwrap();

    let err = s.allocator().update_budget_total(b.id, dec!(200)).unwrap_err();
    assert!(matches!(err, LedgerError::ConstraintViolation { .. }));
    let updated = s.allocator().update_budget_total(b.id, dec!(250)).unwrap();
    assert_eq!(updated.total_amount, dec!(250));
    assert_eq!(s.reader().get_budget(b.id).unwrap().total_amount, dec!(250));
}

#[test]
fn budget_creation_rules() {
    let mut s = setup();
    let b = s
        .allocator()
        .create_budget(1, "Q1", PeriodType::Quarterly, d(2025, 1, 1), dec!(900))
        .unwrap();
    assert_eq!(b.end_date, d(2025, 3, 31));
    let y = s
        .allocator()
        .create_budget(1, "Leap", PeriodType::Yearly, d(2024, 3, 1), dec!(900))
        .unwrap();
    assert_eq!(y.end_date, d(2025, 2, 28));

    let err = s
        .allocator()
        .create_budget(1, " Q1 ", PeriodType::Monthly, d(2025, 1, 1), dec!(1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    let err = s
        .allocator()
        .create_budget(1, "Zero", PeriodType::Monthly, d(2025, 1, 1), Decimal::ZERO)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    // names are per owner
    s.allocator()
        .create_budget(2, "Q1", PeriodType::Quarterly, d(2025, 1, 1), dec!(10))
        .unwrap();
    assert_eq!(s.allocator().budgets(1).unwrap().len(), 2);
}

#[test]
fn batch_replaces_allocations_and_is_idempotent() {
    let mut s = setup();
    let c1 = category(&mut s, "Books", EntryType::Expense);
    let c2 = category(&mut s, "Music", EntryType::Expense);
    let c3 = category(&mut s, "Games", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Fun", PeriodType::Monthly, d(2025, 1, 1), dec!(500))
        .unwrap();
    s.allocator().add_category(b.id, c3, dec!(100)).unwrap();

    let map = BTreeMap::from([(c1, dec!(300)), (c2, dec!(200))]);
    s.allocator().allocate_batch(b.id, &map).unwrap();
    let first = pairs(&s, b.id);
    assert_eq!(first, vec![(c1, dec!(300)), (c2, dec!(200))]);

    s.allocator().allocate_batch(b.id, &map).unwrap();
    assert_eq!(pairs(&s, b.id), first);

    let rows = s.allocator().allocate_batch(b.id, &BTreeMap::new()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn batch_over_capacity_keeps_previous_allocations() {
    let mut s = setup();
    let c1 = category(&mut s, "Water", EntryType::Expense);
    let c2 = category(&mut s, "Power", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Utilities", PeriodType::Monthly, d(2025, 1, 1), dec!(100))
        .unwrap();
    s.allocator().add_category(b.id, c1, dec!(40)).unwrap();

    let map = BTreeMap::from([(c1, dec!(60)), (c2, dec!(50))]);
    let err = s.allocator().allocate_batch(b.id, &map).unwrap_err();
    assert!(matches!(err, LedgerError::ConstraintViolation { .. }));
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(40))]);

    let map = BTreeMap::from([(c1, dec!(60)), (c2, dec!(-1))]);
    let err = s.allocator().allocate_batch(b.id, &map).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(40))]);
}

#[test]
fn batch_failure_midway_rolls_back() {
    let mut s = setup();
    let c1 = category(&mut s, "Bus", EntryType::Expense);
    let c2 = category(&mut s, "Taxi", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Transit", PeriodType::Monthly, d(2025, 1, 1), dec!(100))
        .unwrap();
    s.allocator().add_category(b.id, c1, dec!(40)).unwrap();
    s.reader()
        .execute_batch(&format!(
            "CREATE TRIGGER no_taxi BEFORE INSERT ON budget_categories
             WHEN NEW.category_id = {c2}
             BEGIN SELECT RAISE(ABORT, 'taxi is not budgetable'); END;"
        ))
        .unwrap();

    let map = BTreeMap::from([(c1, dec!(30)), (c2, dec!(30))]);
    let err = s.allocator().allocate_batch(b.id, &map).unwrap_err();
    assert!(err.is_storage());
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(40))]);
}

#[test]
fn usage_counts_expenses_inside_the_window_only() {
    let mut s = setup();
    let food = category(&mut s, "Dining", EntryType::Expense);
    let tips = category(&mut s, "Tips", EntryType::Income);
    let acct = s.ledger().open_account(1, "Card", dec!(1000)).unwrap();
    let other = s.ledger().open_account(2, "Card", dec!(1000)).unwrap();
    let b = s
        .allocator()
        .create_budget(1, "January", PeriodType::Monthly, d(2025, 1, 1), dec!(500))
        .unwrap();
    assert_eq!(b.end_date, d(2025, 1, 31));
    let row = s.allocator().add_category(b.id, food, dec!(100)).unwrap();

    spend(&mut s, acct.id, food, dec!(25), d(2025, 1, 1));
    spend(&mut s, acct.id, food, dec!(15), d(2025, 1, 31));
    spend(&mut s, acct.id, food, dec!(99), d(2024, 12, 31));
    spend(&mut s, acct.id, food, dec!(99), d(2025, 2, 1));
    // another owner's spending in the same category
    spend(&mut s, other.id, food, dec!(99), d(2025, 1, 10));
    s.ledger()
        .record_income(
            acct.id,
            dec!(99),
            Entry {
                category_id: Some(tips),
                date: Some(d(2025, 1, 10)),
                description: None,
            },
        )
        .unwrap();

    let usage = s.allocator().category_usage(row.id).unwrap();
    assert_eq!(usage.category_name, "Dining");
    assert_eq!(usage.spent, dec!(40));
    assert_eq!(usage.remaining, dec!(60));
    assert_eq!(usage.usage_percentage, dec!(40.00));
    assert!(!usage.overspent);

    let summary = s.allocator().summary(b.id).unwrap();
    assert_eq!(summary.allocated, dec!(100));
    assert_eq!(summary.unallocated, dec!(400));
    assert_eq!(summary.spent, dec!(40));
    assert_eq!(summary.remaining, dec!(460));
    assert_eq!(summary.usage_percentage, dec!(8.00));
}

#[test]
fn recording_reports_overspent_categories() {
    let mut s = setup();
    let fun = category(&mut s, "Concerts", EntryType::Expense);
    let acct = s.ledger().open_account(1, "Card", dec!(1000)).unwrap();
    let b = s
        .allocator()
        .create_budget(1, "Spring", PeriodType::Quarterly, d(2025, 3, 1), dec!(100))
        .unwrap();
    s.allocator().add_category(b.id, fun, dec!(50)).unwrap();

    let outside = s
        .ledger()
        .record_expense(
            acct.id,
            dec!(10),
            Entry {
                category_id: Some(fun),
                date: Some(d(2025, 6, 1)),
                description: None,
            },
        )
        .unwrap();
    assert!(outside.budget_usage.is_empty());

    let posting = s
        .ledger()
        .record_expense(
            acct.id,
            dec!(60),
            Entry {
                category_id: Some(fun),
                date: Some(d(2025, 4, 2)),
                description: Some("festival".into()),
            },
        )
        .unwrap();
    assert_eq!(posting.budget_usage.len(), 1);
    assert!(posting.budget_usage[0].overspent);
    assert_eq!(posting.budget_usage[0].remaining, dec!(-10));
    assert_eq!(posting.transaction.description, "festival");

    // category over its cap, budget still within its total
    let summary = s.allocator().summary(b.id).unwrap();
    assert!(summary.categories[0].overspent);
    assert!(!summary.overspent);

    spend(&mut s, acct.id, fun, dec!(50), d(2025, 5, 31));
    let summary = s.allocator().summary(b.id).unwrap();
    assert_eq!(summary.spent, dec!(110));
    assert!(summary.overspent);
}

#[test]
fn copy_budget_recomputes_window() {
    let mut s = setup();
    let c1 = category(&mut s, "Coffee", EntryType::Expense);
    let c2 = category(&mut s, "Snacks", EntryType::Expense);
    let acct = s.ledger().open_account(1, "Cash", dec!(500)).unwrap();
    let jan = s
        .allocator()
        .create_budget(1, "Jan", PeriodType::Monthly, d(2025, 1, 1), dec!(200))
        .unwrap();
    s.allocator()
        .allocate_batch(jan.id, &BTreeMap::from([(c1, dec!(80)), (c2, dec!(70))]))
        .unwrap();
    spend(&mut s, acct.id, c1, dec!(30), d(2025, 1, 20));

    let err = s.allocator().copy_budget(jan.id, "Jan", d(2025, 2, 1)).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    let feb = s.allocator().copy_budget(jan.id, "Feb", d(2025, 2, 1)).unwrap();
    assert_eq!(feb.budget.end_date, d(2025, 2, 28));
    assert_eq!(feb.budget.total_amount, dec!(200));
    assert_eq!(feb.budget.period, PeriodType::Monthly);
    assert_eq!(pairs(&s, feb.budget.id), pairs(&s, jan.id));

    let summary = s.allocator().summary(feb.budget.id).unwrap();
    assert_eq!(summary.spent, Decimal::ZERO);
    let summary = s.allocator().summary(jan.id).unwrap();
    assert_eq!(summary.spent, dec!(30));
}

#[test]
fn deleting_a_budget_removes_its_allocations() {
    let mut s = setup();
    let c1 = category(&mut s, "Pets", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Animals", PeriodType::Monthly, d(2025, 1, 1), dec!(100))
        .unwrap();
    let row = s.allocator().add_category(b.id, c1, dec!(50)).unwrap();

    s.allocator().delete_budget(b.id).unwrap();
    assert!(s.reader().list_allocations(b.id).unwrap().is_empty());
    let err = s.reader().get_budget_category(row.id).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    let err = s.allocator().budget(b.id).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    let err = s.allocator().delete_budget(b.id).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn copy_into_a_window_with_spending_is_rejected() {
    let mut s = setup();
    let food = category(&mut s, "Food", EntryType::Expense);
    let acct = s.ledger().open_account(1, "Card", dec!(500)).unwrap();
    let jan = s
        .allocator()
        .create_budget(1, "Jan", PeriodType::Monthly, d(2025, 1, 1), dec!(100))
        .unwrap();
    s.allocator().add_category(jan.id, food, dec!(100)).unwrap();
    spend(&mut s, acct.id, food, dec!(30), d(2025, 1, 20));

    let err = s
        .allocator()
        .copy_budget(jan.id, "Mid Jan", d(2025, 1, 15))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert!(s.reader().find_budget_by_owner_and_name(1, "Mid Jan").unwrap().is_none());
    assert_eq!(s.allocator().budgets(1).unwrap().len(), 1);

    // the window after the spending is fine
    let copy = s.allocator().copy_budget(jan.id, "Late Jan", d(2025, 1, 21)).unwrap();
    assert_eq!(s.allocator().summary(copy.budget.id).unwrap().spent, Decimal::ZERO);
}

#[test]
fn batch_total_past_the_largest_amount_is_rejected() {
    let mut s = setup();
    let c1 = category(&mut s, "Yachts", EntryType::Expense);
    let c2 = category(&mut s, "Islands", EntryType::Expense);
    let b = s
        .allocator()
        .create_budget(1, "Dreams", PeriodType::Yearly, d(2025, 1, 1), Decimal::MAX)
        .unwrap();
    s.allocator().add_category(b.id, c1, dec!(10)).unwrap();

    let err = s
        .allocator()
        .allocate_batch(b.id, &BTreeMap::from([(c1, Decimal::MAX), (c2, Decimal::MAX)]))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(pairs(&s, b.id), vec![(c1, dec!(10))]);

    // single adds that would overflow the running total hit the capacity check
    let err = s.allocator().add_category(b.id, c2, Decimal::MAX).unwrap_err();
    assert!(matches!(err, LedgerError::ConstraintViolation { .. }));
}

#[test]
fn usage_percentage_rounds_to_cents() {
    assert_eq!(usage_percentage(dec!(50), Decimal::ZERO).unwrap(), Decimal::ZERO);
    assert_eq!(usage_percentage(dec!(1), dec!(3)).unwrap(), dec!(33.33));
    assert_eq!(usage_percentage(dec!(150), dec!(100)).unwrap(), dec!(150));
    let err = usage_percentage(Decimal::MAX, dec!(0.01)).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
