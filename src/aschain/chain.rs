// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    acr::Acr,
    aschain::table::AsChainTable,
    ifc::{criteria::Ifcs, session_case::SessionCase},
    sip::message::SipMessage,
    utils::TrailId,
};

/// What one chain slot learned about its application server. Slot `i` is
/// written only by the link standing at index `i`; the whole vector is
/// read once more in the chain's teardown, after every link has been
/// released.
#[derive(Debug, Clone, Default)]
pub struct AsInfo {
    /// Request-URI the request carried when it reached this slot.
    pub request_uri: String,
    /// Server invoked from this slot; empty when the rule did not match.
    pub as_uri: String,
    /// Last final status the server answered with.
    pub status_code: Option<u16>,
    pub timeout: bool,
}

/// Shared state of one walk through a served user's filter criteria.
///
/// Reference counting is the `Arc` holding it: the creator's link is the
/// initial reference, every table lookup acquires another. Teardown runs
/// in `Drop`, exactly once, after the last link is released.
pub struct AsChain {
    table: Arc<AsChainTable>,
    session_case: SessionCase,
    served_user: String,
    is_registered: bool,
    trail: TrailId,
    ifcs: Ifcs,
    as_info: Vec<Mutex<AsInfo>>,
    /// Set once immediately after construction, when the chain has an
    /// `Arc` identity the table can point back at.
    odi_tokens: OnceCell<Vec<String>>,
    acr: Mutex<Option<Box<dyn Acr>>>,
}

impl AsChain {
    /// Builds a chain and registers its ODI tokens. Callers go through
    /// `AsChainLink::create_as_chain`.
    pub(crate) fn create(
        table: Arc<AsChainTable>,
        session_case: SessionCase,
        served_user: String,
        is_registered: bool,
        trail: TrailId,
        ifcs: Ifcs,
        acr: Option<Box<dyn Acr>>,
    ) -> Arc<Self> {
        let slots = ifcs.len() + 1;
        let chain = Arc::new(Self {
            table,
            session_case,
            served_user,
            is_registered,
            trail,
            ifcs,
            as_info: (0..slots).map(|_| Mutex::new(AsInfo::default())).collect(),
            odi_tokens: OnceCell::new(),
            acr: Mutex::new(acr),
        });
        debug!(
            trail,
            ifcs = chain.size(),
            session_case = %chain.session_case,
            "creating AS chain"
        );
        let tokens = chain.table.register_(&chain);
        let _ = chain.odi_tokens.set(tokens);
        chain
    }

    /// Number of filter criteria in the chain (one less than the number
    /// of slots).
    pub fn size(&self) -> usize {
        self.ifcs.len()
    }

    pub fn session_case(&self) -> SessionCase {
        self.session_case
    }

    pub fn served_user(&self) -> &str {
        &self.served_user
    }

    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    pub fn trail(&self) -> TrailId {
        self.trail
    }

    pub(crate) fn ifcs(&self) -> &Ifcs {
        &self.ifcs
    }

    /// Whether the message still targets this chain's served user. Only
    /// meaningful on terminating chains, where a changed target means the
    /// request was diverted. Alias URIs are not supported: the test is
    /// string equality of canonical forms, nothing wider.
    pub fn matches_target(&self, msg: &SipMessage) -> bool {
        debug_assert!(self.session_case.is_terminating());
        SessionCase::Terminating.served_user(msg).as_deref()
            == Some(self.served_user.as_str())
    }

    /// Runs `f` against the ACR attached to this chain, if any. The
    /// chain keeps ownership; transaction handlers use this to feed
    /// message observations into the record the chain will emit.
    pub fn with_acr<R>(&self, f: impl FnOnce(&mut dyn Acr) -> R) -> Option<R> {
        let mut guard =
            self.acr.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().map(|acr| f(acr.as_mut()))
    }

    pub(crate) fn odi_token(&self, index: usize) -> Option<&str> {
        self.odi_tokens
            .get()
            .and_then(|tokens| tokens.get(index))
            .map(String::as_str)
    }

    pub(crate) fn with_as_info<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut AsInfo) -> R,
    ) -> R {
        let mut guard = self.as_info[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl Drop for AsChain {
    fn drop(&mut self) {
        debug!(trail = self.trail, "destroying AS chain");

        let acr = self
            .acr
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut acr) = acr {
            let slots: Vec<AsInfo> = self
                .as_info
                .iter_mut()
                .map(|m| {
                    m.get_mut().unwrap_or_else(PoisonError::into_inner).clone()
                })
                .collect();

            // The last slot never names a server, it only witnesses the
            // Request-URI after the final AS. saturating_sub keeps a
            // zero-IFC chain out of trouble.
            for index in 0..slots.len().saturating_sub(1) {
                let info = &slots[index];
                if info.as_uri.is_empty() {
                    continue;
                }
                let diverted = slots[index + 1].request_uri
                    != info.request_uri;
                acr.as_info(
                    &info.as_uri,
                    if diverted { &slots[index + 1].request_uri } else { "" },
                    info.status_code.unwrap_or(0),
                    info.timeout,
                );
            }

            debug!(trail = self.trail, "sending ACR from AS chain");
            acr.send_message();
        }

        if let Some(tokens) = self.odi_tokens.get() {
            self.table.unregister(tokens);
        }
    }
}
