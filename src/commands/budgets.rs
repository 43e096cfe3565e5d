// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::Session;
use crate::models::{EntryType, PeriodType};
use crate::utils::{
    allocation_by_names, arg, budget_by_name, category_by_name, fmt_money, maybe_print_json,
    parse_date, parse_decimal, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;

pub fn handle(session: &mut Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(session, sub)?,
        Some(("list", sub)) => list(session, sub)?,
        Some(("total", sub)) => total(session, sub)?,
        Some(("rm", sub)) => remove(session, sub)?,
        Some(("allocate", sub)) => allocate(session, sub)?,
        Some(("reallocate", sub)) => reallocate(session, sub)?,
        Some(("unallocate", sub)) => unallocate(session, sub)?,
        Some(("batch", sub)) => batch(session, sub)?,
        Some(("copy", sub)) => copy(session, sub)?,
        Some(("status", sub)) => status(session, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let name = arg(sub, "name")?;
    let raw = arg(sub, "period")?;
    let period = PeriodType::parse(raw)
        .ok_or_else(|| anyhow!("Invalid period '{}', expected monthly|quarterly|yearly", raw))?;
    let start = parse_date(arg(sub, "start")?)?;
    let total = parse_decimal(arg(sub, "total")?)?;
    let owner = session.owner_id;
    let b = session
        .allocator()
        .create_budget(owner, name, period, start, total)?;
    println!(
        "Budget '{}' {} to {} = {}",
        b.name,
        b.start_date,
        b.end_date,
        fmt_money(&b.total_amount)
    );
    Ok(())
}

fn list(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let owner = session.owner_id;
    let budgets = session.allocator().budgets(owner)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budgets)? {
        let data = budgets
            .iter()
            .map(|b| {
                vec![
                    b.name.clone(),
                    b.period.to_string(),
                    b.start_date.to_string(),
                    b.end_date.to_string(),
                    fmt_money(&b.total_amount),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Budget", "Period", "Start", "End", "Total"], data)
        );
    }
    Ok(())
}

fn total(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let b = session.allocator().update_budget_total(budget.id, amount)?;
    println!("Budget '{}' total set to {}", b.name, fmt_money(&b.total_amount));
    Ok(())
}

fn remove(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    session.allocator().delete_budget(budget.id)?;
    println!("Removed budget '{}'", budget.name);
    Ok(())
}

fn allocate(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    let category = category_by_name(session.reader(), arg(sub, "category")?, EntryType::Expense)?;
    let amount = parse_decimal(arg(sub, "amount")?)?;
    session
        .allocator()
        .add_category(budget.id, category.id, amount)?;
    println!(
        "Allocated {} to '{}' in '{}'",
        fmt_money(&amount),
        category.name,
        budget.name
    );
    Ok(())
}

fn reallocate(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let row = allocation_by_names(
        session.reader(),
        session.owner_id,
        arg(sub, "budget")?,
        arg(sub, "category")?,
    )?;
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let row = session.allocator().update_category(row.id, amount)?;
    println!("Allocation set to {}", fmt_money(&row.allocated_amount));
    Ok(())
}

fn unallocate(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let row = allocation_by_names(
        session.reader(),
        session.owner_id,
        arg(sub, "budget")?,
        arg(sub, "category")?,
    )?;
    session.allocator().remove_category(row.id)?;
    println!("Allocation removed");
    Ok(())
}

fn batch(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    let mut map = BTreeMap::new();
    if let Some(values) = sub.get_many::<String>("set") {
        for pair in values {
            let (name, amount) = pair
                .split_once('=')
                .with_context(|| format!("Expected CATEGORY=AMOUNT, got '{}'", pair))?;
            let category = category_by_name(session.reader(), name.trim(), EntryType::Expense)?;
            if map.insert(category.id, parse_decimal(amount)?).is_some() {
                return Err(anyhow!("Category '{}' given twice", category.name));
            }
        }
    }
    let rows = session.allocator().allocate_batch(budget.id, &map)?;
    println!("Budget '{}' now has {} allocations", budget.name, rows.len());
    Ok(())
}

fn copy(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    let start = parse_date(arg(sub, "start")?)?;
    let copy = session
        .allocator()
        .copy_budget(budget.id, arg(sub, "name")?, start)?;
    println!(
        "Copied '{}' to '{}' ({} allocations, {} to {})",
        budget.name,
        copy.budget.name,
        copy.allocations.len(),
        copy.budget.start_date,
        copy.budget.end_date
    );
    Ok(())
}

fn status(session: &mut Session, sub: &clap::ArgMatches) -> Result<()> {
    let budget = budget_by_name(session.reader(), session.owner_id, arg(sub, "budget")?)?;
    let summary = session.allocator().summary(budget.id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
        return Ok(());
    }
    let rows = summary
        .categories
        .iter()
        .map(|c| {
            vec![
                c.category_name.clone(),
                fmt_money(&c.allocated),
                fmt_money(&c.spent),
                fmt_money(&c.remaining),
                format!("{}%", c.usage_percentage),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Allocated", "Spent", "Remaining", "Used"], rows)
    );
    println!(
        "Total {} | allocated {} | spent {} | {}",
        fmt_money(&summary.budget.total_amount),
        fmt_money(&summary.allocated),
        fmt_money(&summary.spent),
        if summary.overspent { "OVERSPENT" } else { "within budget" }
    );
    Ok(())
}
