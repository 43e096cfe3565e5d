// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::Session;
use crate::ledger::{Adjustment, Closure};
use crate::models::AccountStatus;
use crate::utils::{
    account_by_name, arg, fmt_money, maybe_print_json, opt_arg, parse_decimal, pretty_table,
};
use anyhow::{Result, anyhow};
use rust_decimal::Decimal;

pub fn handle(session: &mut Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(session, sub)?,
        Some(("list", sub)) => list(session, sub)?,
        Some(("deposit", sub)) => deposit(session, sub)?,
        Some(("withdraw", sub)) => withdraw(session, sub)?,
        Some(("transfer", sub)) => transfer(session, sub)?,
        Some(("adjust", sub)) => adjust(session, sub)?,
        Some(("status", sub)) => status(session, sub)?,
        Some(("rename", sub)) => rename(session, sub)?,
        Some(("close", sub)) => close(session, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let name = arg(sub, "name")?;
    let balance = match opt_arg(sub, "balance") {
        Some(s) => parse_decimal(s)?,
        None => Decimal::ZERO,
    };
    let owner = session.owner_id;
    let acct = session.ledger().open_account(owner, name, balance)?;
    println!("Added account '{}' with balance {}", acct.name, fmt_money(&acct.balance));
    Ok(())
}

fn list(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let owner = session.owner_id;
    let mut ledger = session.ledger();
    let accounts = ledger.accounts(owner)?;
    let net = ledger.net_worth(owner)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
        return Ok(());
    }
    let data = accounts
        .iter()
        .map(|a| vec![a.name.clone(), a.status.to_string(), fmt_money(&a.balance)])
        .collect();
    println!("{}", pretty_table(&["Name", "Status", "Balance"], data));
    println!("Net worth: {}", fmt_money(&net));
    Ok(())
}

fn deposit(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    let posting = session.ledger().deposit(acct.id, amount)?;
    println!(
        "Deposited {} into '{}' (balance {})",
        fmt_money(&amount),
        acct.name,
        fmt_money(&posting.account.balance)
    );
    Ok(())
}

fn withdraw(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    let posting = session.ledger().withdraw(acct.id, amount)?;
    println!(
        "Withdrew {} from '{}' (balance {})",
        fmt_money(&amount),
        acct.name,
        fmt_money(&posting.account.balance)
    );
    Ok(())
}

fn transfer(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let from = account_by_name(session.reader(), session.owner_id, arg(sub, "from")?)?;
    let to = account_by_name(session.reader(), session.owner_id, arg(sub, "to")?)?;
    let mut ledger = session.ledger();
    let outcome = if sub.get_flag("audit") {
        ledger.transfer_with_audit(from.id, to.id, amount)?
    } else {
        ledger.transfer(from.id, to.id, amount)?
    };
    println!(
        "Moved {} from '{}' ({}) to '{}' ({})",
        fmt_money(&amount),
        outcome.from.name,
        fmt_money(&outcome.from.balance),
        outcome.to.name,
        fmt_money(&outcome.to.balance)
    );
    Ok(())
}

fn adjust(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let balance = parse_decimal(arg(sub, "balance")?)?;
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    match session.ledger().adjust_balance(acct.id, balance)? {
        Adjustment::Unchanged { .. } => println!("Balance of '{}' unchanged", acct.name),
        Adjustment::Posted(p) => println!(
            "Adjusted '{}' to {} ({} {})",
            acct.name,
            fmt_money(&p.account.balance),
            p.transaction.kind,
            fmt_money(&p.transaction.amount)
        ),
    }
    Ok(())
}

fn status(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let raw = arg(sub, "status")?;
    let status = AccountStatus::parse(raw)
        .ok_or_else(|| anyhow!("Invalid status '{}', expected active|inactive|closed", raw))?;
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    let acct = session.ledger().update_status(acct.id, status)?;
    println!("Account '{}' is now {}", acct.name, acct.status);
    Ok(())
}

fn rename(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    let renamed = session.ledger().rename_account(acct.id, arg(sub, "to")?)?;
    println!("Renamed '{}' to '{}'", acct.name, renamed.name);
    Ok(())
}

fn close(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let acct = account_by_name(session.reader(), session.owner_id, arg(sub, "name")?)?;
    let into = match opt_arg(sub, "into") {
        Some(name) => Some(account_by_name(session.reader(), session.owner_id, name)?.id),
        None => None,
    };
    match session.ledger().close(acct.id, into)? {
        Closure::Deleted { .. } => println!("Closed account '{}'", acct.name),
        Closure::Migrated { target, expense, .. } => println!(
            "Closed account '{}', moved {} to '{}'",
            acct.name,
            fmt_money(&expense.amount),
            target.name
        ),
    }
    Ok(())
}
