// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

use crate::models::{Account, Budget, BudgetCategory, Category, EntryType, OwnerId};
use crate::store::LedgerStore;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn parse_entry_type(s: &str) -> Result<EntryType> {
    EntryType::parse(s).ok_or_else(|| anyhow!("Invalid type '{}', expected income|expense", s))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn arg<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .with_context(|| format!("Missing --{}", name))
}

pub fn opt_arg<'a>(m: &'a clap::ArgMatches, name: &str) -> Option<&'a str> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn account_by_name<S: LedgerStore + ?Sized>(
    store: &S,
    owner_id: OwnerId,
    name: &str,
) -> Result<Account> {
    store
        .find_account_by_owner_and_name(owner_id, name)?
        .with_context(|| format!("Account '{}' not found", name))
}

pub fn category_by_name<S: LedgerStore + ?Sized>(
    store: &S,
    name: &str,
    kind: EntryType,
) -> Result<Category> {
    store
        .find_category(name, kind)?
        .with_context(|| format!("{} category '{}' not found", kind, name))
}

pub fn budget_by_name<S: LedgerStore + ?Sized>(
    store: &S,
    owner_id: OwnerId,
    name: &str,
) -> Result<Budget> {
    store
        .find_budget_by_owner_and_name(owner_id, name)?
        .with_context(|| format!("Budget '{}' not found", name))
}

pub fn allocation_by_names<S: LedgerStore + ?Sized>(
    store: &S,
    owner_id: OwnerId,
    budget: &str,
    category: &str,
) -> Result<BudgetCategory> {
    let budget = budget_by_name(store, owner_id, budget)?;
    let category = category_by_name(store, category, EntryType::Expense)?;
    store
        .find_allocation(budget.id, category.id)?
        .with_context(|| {
            format!(
                "Category '{}' is not allocated in budget '{}'",
                category.name, budget.name
            )
        })
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
