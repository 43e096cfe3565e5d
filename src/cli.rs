// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn text(name: &'static str) -> Arg {
    Arg::new(name).long(name).required(true)
}

fn opt(name: &'static str) -> Arg {
    Arg::new(name).long(name)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
        .arg(Arg::new("jsonl").long("jsonl").action(ArgAction::SetTrue))
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts and move funds")
        .subcommand(
            Command::new("add")
                .arg(text("name"))
                .arg(opt("balance").help("Opening balance (default 0)")),
        )
        .subcommand(json_flags(Command::new("list")))
        .subcommand(Command::new("deposit").arg(text("name")).arg(text("amount")))
        .subcommand(Command::new("withdraw").arg(text("name")).arg(text("amount")))
        .subcommand(
            Command::new("transfer")
                .arg(text("from"))
                .arg(text("to"))
                .arg(text("amount"))
                .arg(
                    Arg::new("audit")
                        .long("audit")
                        .action(ArgAction::SetTrue)
                        .help("Also record an expense/income pair"),
                ),
        )
        .subcommand(Command::new("adjust").arg(text("name")).arg(text("balance")))
        .subcommand(
            Command::new("status")
                .arg(text("name"))
                .arg(text("status").help("active|inactive|closed")),
        )
        .subcommand(Command::new("rename").arg(text("name")).arg(text("to")))
        .subcommand(
            Command::new("close")
                .arg(text("name"))
                .arg(opt("into").help("Account receiving the remaining balance")),
        )
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage income and expense categories")
        .subcommand(
            Command::new("add")
                .arg(text("name"))
                .arg(text("type").help("income|expense")),
        )
        .subcommand(json_flags(Command::new("list")))
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and list transactions")
        .subcommand(
            Command::new("add")
                .arg(text("account"))
                .arg(text("type").help("income|expense"))
                .arg(text("amount"))
                .arg(opt("category"))
                .arg(opt("date").help("YYYY-MM-DD, defaults to today"))
                .arg(opt("note")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .arg(opt("account"))
                .arg(opt("category"))
                .arg(opt("type"))
                .arg(opt("from"))
                .arg(opt("to"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                ),
        ))
}

fn budget_cmd() -> Command {
    Command::new("budget")
        .about("Manage budgets and category allocations")
        .subcommand(
            Command::new("add")
                .arg(text("name"))
                .arg(text("period").help("monthly|quarterly|yearly"))
                .arg(text("start"))
                .arg(text("total")),
        )
        .subcommand(json_flags(Command::new("list")))
        .subcommand(Command::new("total").arg(text("budget")).arg(text("amount")))
        .subcommand(Command::new("rm").arg(text("budget")))
        .subcommand(
            Command::new("allocate")
                .arg(text("budget"))
                .arg(text("category"))
                .arg(text("amount")),
        )
        .subcommand(
            Command::new("reallocate")
                .arg(text("budget"))
                .arg(text("category"))
                .arg(text("amount")),
        )
        .subcommand(
            Command::new("unallocate")
                .arg(text("budget"))
                .arg(text("category")),
        )
        .subcommand(
            Command::new("batch").arg(text("budget")).arg(
                Arg::new("set")
                    .long("set")
                    .action(ArgAction::Append)
                    .help("CATEGORY=AMOUNT, repeatable"),
            ),
        )
        .subcommand(
            Command::new("copy")
                .arg(text("budget"))
                .arg(text("name"))
                .arg(text("start")),
        )
        .subcommand(json_flags(Command::new("status").arg(text("budget"))))
}

pub fn build_cli() -> Command {
    Command::new("billfold")
        .about("Accounts ledger and category budgets")
        .version(clap::crate_version!())
        .arg(
            Arg::new("owner")
                .long("owner")
                .global(true)
                .value_parser(value_parser!(i64))
                .help("Owner id (overrides BILLFOLD_OWNER)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(account_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(budget_cmd())
        .subcommand(Command::new("doctor").about("Check ledger consistency"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        build_cli().debug_assert();
    }
}
