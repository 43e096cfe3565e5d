// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::OwnerId;
use crate::store::LedgerStore;
use crate::usage::BudgetUsageTracker;
use crate::utils::{fmt_money, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;

/// Lists consistency problems for one owner. Writes nothing.
pub fn check<S: LedgerStore + ?Sized>(store: &S, owner_id: OwnerId) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Balances below zero
    for acct in store.list_accounts(owner_id)? {
        if acct.balance < Decimal::ZERO {
            rows.push(vec![
                "negative_balance".into(),
                format!("{} {}", acct.name, fmt_money(&acct.balance)),
            ]);
        }
    }

    // 2) Allocations above the budget total, and overspent budgets
    let tracker = BudgetUsageTracker;
    for budget in store.list_budgets(owner_id)? {
        let summary = tracker.budget_summary(store, budget.id)?;
        if summary.allocated > budget.total_amount {
            rows.push(vec![
                "over_allocated".into(),
                format!(
                    "{} {} > {}",
                    budget.name,
                    fmt_money(&summary.allocated),
                    fmt_money(&budget.total_amount)
                ),
            ]);
        }
        if summary.overspent {
            rows.push(vec![
                "overspent".into(),
                format!(
                    "{} {} > {}",
                    budget.name,
                    fmt_money(&summary.spent),
                    fmt_money(&budget.total_amount)
                ),
            ]);
        }
    }
    Ok(rows)
}

pub fn handle<S: LedgerStore + ?Sized>(store: &S, owner_id: OwnerId) -> Result<()> {
    let rows = check(store, owner_id)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
