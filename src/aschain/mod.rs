// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Application-server chains.
//!
//! One chain records a sequenced walk through a served user's filter
//! criteria in one direction. The chain is shared: the creator holds the
//! first link, every ODI re-entry acquires another, and the chain's
//! teardown (accounting flush, token unregistration) runs when the last
//! link goes away.

pub mod chain;
pub mod link;
pub mod table;

pub use chain::{AsChain, AsInfo};
pub use link::{AsChainLink, Disposition};
pub use table::AsChainTable;
