// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::config::{Config, OWNER_ENV};
use billfold::models::{AccountStatus, EntryType, PeriodType, Transaction};
use billfold::utils::{fmt_money, parse_date, parse_decimal, parse_entry_type};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::path::PathBuf;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn period_end_dates() {
    assert_eq!(PeriodType::Monthly.end_date(d(2025, 3, 1)), Some(d(2025, 3, 31)));
    assert_eq!(PeriodType::Quarterly.end_date(d(2025, 1, 1)), Some(d(2025, 3, 31)));
    assert_eq!(PeriodType::Yearly.end_date(d(2024, 7, 15)), Some(d(2025, 7, 14)));
    // clamps to the shorter month
    assert_eq!(PeriodType::Monthly.end_date(d(2024, 1, 31)), Some(d(2024, 2, 28)));
}

#[test]
fn status_edges() {
    use AccountStatus::*;
    assert!(Active.can_become(Inactive));
    assert!(Inactive.can_become(Active));
    assert!(Active.can_become(Closed));
    assert!(Inactive.can_become(Closed));
    assert!(!Closed.can_become(Active));
    assert!(!Closed.can_become(Inactive));
    assert!(!Active.can_become(Active));
}

#[test]
fn enum_names_parse_back() {
    for s in [AccountStatus::Active, AccountStatus::Inactive, AccountStatus::Closed] {
        assert_eq!(AccountStatus::parse(s.as_str()), Some(s));
    }
    for p in [PeriodType::Monthly, PeriodType::Quarterly, PeriodType::Yearly] {
        assert_eq!(PeriodType::parse(&p.to_string()), Some(p));
    }
    assert_eq!(EntryType::parse(" EXPENSE "), Some(EntryType::Expense));
    assert_eq!(PeriodType::parse("weekly"), None);
}

#[test]
fn transaction_account_follows_kind() {
    let mut t = Transaction {
        id: 1,
        owner_id: 1,
        source_account_id: None,
        destination_account_id: Some(4),
        category_id: 1,
        amount: dec!(5),
        kind: EntryType::Income,
        date: d(2025, 1, 1),
        description: String::new(),
    };
    assert_eq!(t.account_id(), Some(4));
    t.kind = EntryType::Expense;
    t.source_account_id = Some(9);
    t.destination_account_id = None;
    assert_eq!(t.account_id(), Some(9));
}

#[test]
fn parsers_trim_input() {
    assert_eq!(parse_decimal(" 12.50 ").unwrap(), dec!(12.50));
    assert_eq!(parse_date(" 2025-02-03 ").unwrap(), d(2025, 2, 3));
    assert!(parse_date("03/02/2025").is_err());
    assert_eq!(parse_entry_type("Income").unwrap(), EntryType::Income);
    assert!(parse_entry_type("loan").is_err());
}

#[test]
fn money_has_two_places() {
    assert_eq!(fmt_money(&dec!(5)), "5.00");
    assert_eq!(fmt_money(&dec!(0.505)), "0.50");
}

#[test]
fn explicit_config_values_win() {
    let cfg = Config::from_vars(Some(" /tmp/b.sqlite ".into()), Some("7".into())).unwrap();
    assert_eq!(cfg.db_path, PathBuf::from("/tmp/b.sqlite"));
    assert_eq!(cfg.owner_id, 7);
    assert_eq!(cfg.with_owner(Some(3)).owner_id, 3);
}

#[test]
fn bad_owner_is_rejected() {
    let err = Config::from_vars(Some("/tmp/b.sqlite".into()), Some("me".into())).unwrap_err();
    assert!(err.to_string().contains(OWNER_ENV));
}
