// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Append-only transaction journal.
//!
//! Entries are indexed by ID for O(1) audit lookup and kept per owner in
//! append order for pagination. Appends from different owners never contend;
//! nothing in the journal is ever mutated or removed.

use crate::base::{OwnerId, TransactionId};
use crate::transaction::Transaction;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// One page of a paginated listing, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number this page corresponds to.
    pub page: u32,
    pub page_size: u32,
    /// Total entries across all pages.
    pub total: usize,
}

/// Thread-safe append-only ledger of committed transactions.
#[derive(Debug, Default)]
pub struct Journal {
    /// Entries by ID for O(1) audit lookup.
    entries: DashMap<TransactionId, Arc<Transaction>>,

    /// Per-owner entries in append order, for pagination.
    by_owner: DashMap<OwnerId, Mutex<Vec<Arc<Transaction>>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            by_owner: DashMap::new(),
        }
    }

    /// Appends a committed entry and returns the shared handle.
    ///
    /// Called from inside a wallet commit's critical section, so the entry
    /// lands in the journal in the same atomic step as the balance write.
    pub(crate) fn append(&self, entry: Transaction) -> Arc<Transaction> {
        let entry = Arc::new(entry);
        let previous = self.entries.insert(entry.id, Arc::clone(&entry));
        debug_assert!(previous.is_none(), "ledger entry ID collision: {}", entry.id);

        self.by_owner
            .entry(entry.owner_id)
            .or_default()
            .lock()
            .push(Arc::clone(&entry));
        entry
    }

    /// Looks up a single entry by ID.
    pub fn get(&self, id: &TransactionId) -> Option<Arc<Transaction>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Returns one page of an owner's entries, newest first. Pages are
    /// 1-based; a page past the end comes back empty with the total intact.
    pub fn list(&self, owner_id: OwnerId, page: u32, page_size: u32) -> Page<Arc<Transaction>> {
        let Some(owned) = self.by_owner.get(&owner_id) else {
            return Page {
                items: Vec::new(),
                page,
                page_size,
                total: 0,
            };
        };

        let entries = owned.lock();
        let total = entries.len();
        let items = if page == 0 || page_size == 0 {
            Vec::new()
        } else {
            let skip = (page as usize - 1) * page_size as usize;
            entries
                .iter()
                .rev()
                .skip(skip)
                .take(page_size as usize)
                .cloned()
                .collect()
        };

        Page {
            items,
            page,
            page_size,
            total,
        }
    }

    /// Total entries across all owners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
