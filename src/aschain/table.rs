// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use tracing::debug;

use crate::{
    aschain::{chain::AsChain, link::AsChainLink},
    utils::create_random_token,
};

/// Registry mapping ODI tokens to chain positions.
///
/// Holds `Weak` chain references: registration does not keep a chain
/// alive, and a lookup racing a chain teardown fails the upgrade instead
/// of resurrecting the chain. One mutex covers all three operations.
/// The table is injected into chain construction rather than being a
/// process singleton, so tests run against isolated instances.
#[derive(Debug, Default)]
pub struct AsChainTable {
    map: Mutex<HashMap<String, (Weak<AsChain>, usize)>>,
}

impl AsChainTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `size + 1` fresh tokens for a chain and maps each to its
    /// position. Returns the tokens in index order.
    pub(crate) fn register_(&self, chain: &Arc<AsChain>) -> Vec<String> {
        let count = chain.size() + 1;
        let mut tokens = Vec::with_capacity(count);
        let mut map =
            self.map.lock().unwrap_or_else(PoisonError::into_inner);
        for index in 0..count {
            let token = create_random_token();
            map.insert(token.clone(), (Arc::downgrade(chain), index));
            tokens.push(token);
        }
        debug!(trail = chain.trail(), count, "registered ODI tokens");
        tokens
    }

    /// Removes tokens from the map. Unknown tokens are ignored.
    pub(crate) fn unregister(&self, tokens: &[String]) {
        let mut map =
            self.map.lock().unwrap_or_else(PoisonError::into_inner);
        for token in tokens {
            map.remove(token);
        }
    }

    /// Recovers the link a token points at, acquiring a reference on the
    /// chain. None for unknown tokens and for chains already tearing
    /// down.
    pub fn lookup(&self, token: &str) -> Option<AsChainLink> {
        let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        let (chain, index) = map.get(token)?;
        let chain = chain.upgrade()?;
        Some(AsChainLink::at(chain, *index))
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
