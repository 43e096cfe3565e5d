// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use tracing::{debug, warn};

use crate::error::LedgerResult;
use crate::store::{LedgerStore, UnitOfWork};

pub struct Coordinator<U: UnitOfWork> {
    uow: U,
}

impl<U: UnitOfWork> Coordinator<U> {
    pub fn new(uow: U) -> Self {
        Self { uow }
    }

    pub fn inner(&self) -> &U {
        &self.uow
    }

    /// Commits when `f` succeeds; any error rolls back and is returned as is.
    pub fn run_atomic<T, F>(&mut self, op: &str, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&dyn LedgerStore) -> LedgerResult<T>,
    {
        let handle = self.uow.begin()?;
        debug!(op, "unit of work started");
        match f(handle.store()) {
            Ok(value) => {
                handle.commit()?;
                debug!(op, "unit of work committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rb) = handle.rollback() {
                    warn!(op, error = %rb, "rollback failed; dropping unit of work");
                }
                warn!(op, error = %err, "unit of work rolled back");
                Err(err)
            }
        }
    }
}
