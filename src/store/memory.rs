// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use dashmap::DashMap;

use crate::store::{AoR, Store};

/// In-memory registration store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    aors: DashMap<String, AoR>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_aor_data(&self, aor_id: &str) -> Option<AoR> {
        self.aors.get(aor_id).map(|entry| entry.clone())
    }

    fn set_aor_data(&self, aor_id: &str, aor: AoR) -> bool {
        self.aors.insert(aor_id.to_string(), aor);
        true
    }

    fn flush_all(&self) {
        self.aors.clear();
    }
}
