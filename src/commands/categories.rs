// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::categories;
use crate::commands::Session;
use crate::store::CategoryStore;
use crate::utils::{arg, maybe_print_json, parse_entry_type, pretty_table};
use anyhow::Result;

pub fn handle(session: &mut Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg(sub, "name")?;
            let kind = parse_entry_type(arg(sub, "type")?)?;
            let cat = session
                .coordinator
                .run_atomic("create_category", |s| categories::create(s, name, kind))?;
            println!("Added {} category '{}'", cat.kind, cat.name);
        }
        Some(("list", sub)) => {
            let cats = session.reader().list_categories()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .iter()
                    .map(|c| vec![c.name.clone(), c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["Category", "Type"], data));
            }
        }
        _ => {}
    }
    Ok(())
}
