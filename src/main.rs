// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use billfold::commands::{self, Session};
use billfold::config::Config;
use billfold::{cli, db::SqliteLedger};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "billfold=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let config = Config::from_env()?.with_owner(matches.get_one::<i64>("owner").copied());
    let db = SqliteLedger::open(&config.db_path)?;
    let mut session = Session::new(db, config.owner_id)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", config.db_path.display());
        }
        Some(("account", sub)) => commands::accounts::handle(&mut session, sub)?,
        Some(("category", sub)) => commands::categories::handle(&mut session, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut session, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&mut session, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(session.reader(), session.owner_id)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
