// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::Session;
use crate::error::LedgerError;
use crate::ledger::Entry;
use crate::models::{EntryType, TransactionFilter};
use crate::store::{AccountStore, CategoryStore};
use crate::utils::{
    account_by_name, arg, category_by_name, fmt_money, maybe_print_json, opt_arg, parse_date,
    parse_decimal, parse_entry_type, pretty_table,
};
use anyhow::Result;
use serde::Serialize;

pub fn handle(session: &mut Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(session, sub)?,
        Some(("list", sub)) => list(session, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let kind = parse_entry_type(arg(sub, "type")?)?;
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "account")?)?;
    let category_id = match opt_arg(sub, "category") {
        Some(name) => Some(category_by_name(session.reader(), name, kind)?.id),
        None => None,
    };
    let entry = Entry {
        category_id,
        date: opt_arg(sub, "date").map(parse_date).transpose()?,
        description: opt_arg(sub, "note").map(str::to_string),
    };
    let mut ledger = session.ledger();
    let posting = match kind {
        EntryType::Income => ledger.record_income(acct.id, amount, entry)?,
        EntryType::Expense => ledger.record_expense(acct.id, amount, entry)?,
    };
    println!(
        "Recorded {} {} on {} (acct: {}, balance {})",
        kind,
        fmt_money(&amount),
        posting.transaction.date,
        acct.name,
        fmt_money(&posting.account.balance)
    );
    for usage in posting.budget_usage.iter().filter(|u| u.overspent) {
        println!(
            "Warning: '{}' is over budget ({} of {})",
            usage.category_name,
            fmt_money(&usage.spent),
            fmt_money(&usage.allocated)
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub account: String,
    pub kind: String,
    pub amount: String,
    pub category: String,
    pub description: String,
}

pub fn query_rows(session: &mut Session, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let owner = session.owner_id;
    let kind = opt_arg(sub, "type").map(parse_entry_type).transpose()?;
    let account_id = match opt_arg(sub, "account") {
        Some(name) => Some(account_by_name(session.reader(), owner, name)?.id),
        None => None,
    };
    let category_id = match (opt_arg(sub, "category"), kind) {
        (Some(name), Some(k)) => Some(category_by_name(session.reader(), name, k)?.id),
        (Some(name), None) => Some(
            category_by_name(session.reader(), name, EntryType::Expense)
                .or_else(|_| category_by_name(session.reader(), name, EntryType::Income))?
                .id,
        ),
        (None, _) => None,
    };
    let filter = TransactionFilter {
        account_id,
        category_id,
        kind,
        from: opt_arg(sub, "from").map(parse_date).transpose()?,
        to: opt_arg(sub, "to").map(parse_date).transpose()?,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let txs = session.ledger().history(owner, &filter)?;

    let reader = session.reader();
    let mut data = Vec::with_capacity(txs.len());
    for t in txs {
        // closed accounts are gone; keep their id visible
        let account = match t.account_id() {
            Some(id) => match reader.get_account(id) {
                Ok(a) => a.name,
                Err(LedgerError::NotFound { .. }) => format!("#{}", id),
                Err(e) => return Err(e.into()),
            },
            None => String::new(),
        };
        let category = reader.get_category(t.category_id)?.name;
        data.push(TransactionRow {
            id: t.id,
            date: t.date.to_string(),
            account,
            kind: t.kind.to_string(),
            amount: fmt_money(&t.amount),
            category,
            description: t.description,
        });
    }
    Ok(data)
}

fn list(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(session, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.account.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.category.clone(),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Account", "Type", "Amount", "Category", "Note"],
                rows
            )
        );
    }
    Ok(())
}
