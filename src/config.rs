// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::db::default_db_path;
use crate::models::OwnerId;

pub const DB_ENV: &str = "BILLFOLD_DB";
pub const OWNER_ENV: &str = "BILLFOLD_OWNER";
pub const DEFAULT_OWNER: OwnerId = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub owner_id: OwnerId,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::var(DB_ENV).ok(), std::env::var(OWNER_ENV).ok())
    }

    pub fn from_vars(db: Option<String>, owner: Option<String>) -> Result<Self> {
        let db_path = match db.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(p) => PathBuf::from(p),
            None => default_db_path()?,
        };
        let owner_id = match owner.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s
                .parse::<OwnerId>()
                .with_context(|| format!("Invalid {} '{}'", OWNER_ENV, s))?,
            None => DEFAULT_OWNER,
        };
        Ok(Self { db_path, owner_id })
    }

    pub fn with_owner(mut self, owner: Option<OwnerId>) -> Self {
        if let Some(o) = owner {
            self.owner_id = o;
        }
        self
    }
}
