// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod allocator;
pub mod categories;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod recorder;
pub mod store;
pub mod usage;
pub mod utils;

pub use error::{LedgerError, LedgerResult};
