// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use crate::{
    acr::Acr,
    aschain::{chain::AsChain, table::AsChainTable},
    ifc::{
        criteria::{DefaultHandling, Ifcs},
        session_case::SessionCase,
    },
    sip::message::SipMessage,
    utils::TrailId,
};

/// What the proxy should do after offering an initial request to a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// No filter criteria left; route the request to its destination.
    Complete,
    /// This rule did not match; advance to the next link and ask again.
    Next,
    /// Matched: forward the request to the named server, skipping local
    /// routing, with the next ODI token on the Route.
    Skip(String),
    /// Abandon the chain and reject the transaction.
    Stop,
}

/// One position in a chain. The only surface proxy code touches: holds a
/// reference on the chain, so the chain lives at least as long as the
/// link. Dropping the link releases the reference.
pub struct AsChainLink {
    chain: Arc<AsChain>,
    index: usize,
    default_handling: DefaultHandling,
    responsive: bool,
}

impl AsChainLink {
    /// Creates a new chain for a served user and returns the link at its
    /// head. The chain stays alive while this link (or any link cloned
    /// off the table) exists.
    #[allow(clippy::too_many_arguments)]
    pub fn create_as_chain(
        table: &Arc<AsChainTable>,
        session_case: SessionCase,
        served_user: String,
        is_registered: bool,
        trail: TrailId,
        ifcs: Ifcs,
        acr: Option<Box<dyn Acr>>,
    ) -> Self {
        let chain = AsChain::create(
            table.clone(),
            session_case,
            served_user,
            is_registered,
            trail,
            ifcs,
            acr,
        );
        Self::at(chain, 0)
    }

    pub(crate) fn at(chain: Arc<AsChain>, index: usize) -> Self {
        Self {
            chain,
            index,
            default_handling: DefaultHandling::default(),
            responsive: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True when the walk has passed the last filter criterion.
    pub fn complete(&self) -> bool {
        self.index == self.chain.size()
    }

    pub fn session_case(&self) -> SessionCase {
        self.chain.session_case()
    }

    pub fn served_user(&self) -> &str {
        self.chain.served_user()
    }

    pub fn trail(&self) -> TrailId {
        self.chain.trail()
    }

    pub fn matches_target(&self, msg: &SipMessage) -> bool {
        self.chain.matches_target(msg)
    }

    /// Access to the chain's ACR; see [`AsChain::with_acr`].
    pub fn with_acr<R>(&self, f: impl FnOnce(&mut dyn Acr) -> R) -> Option<R> {
        self.chain.with_acr(f)
    }

    /// Default handling of the server this link invoked; drives recovery
    /// after `on_not_responding`.
    pub fn default_handling(&self) -> DefaultHandling {
        self.default_handling
    }

    /// Whether the invoked server showed any sign of life.
    pub fn responsive(&self) -> bool {
        self.responsive
    }

    /// The link one step further along the same chain.
    pub fn next(&self) -> Self {
        debug_assert!(!self.complete(), "advancing a complete link");
        Self::at(self.chain.clone(), self.index + 1)
    }

    /// Offers an initial request to this link: records the Request-URI
    /// seen at this position, evaluates the filter criterion and decides
    /// how the proxy proceeds.
    pub fn on_initial_request(&mut self, msg: &SipMessage) -> Disposition {
        let requri = msg.request_uri().unwrap_or_default();
        self.chain.with_as_info(self.index, |info| {
            info.request_uri = requri.to_string();
        });

        if self.complete() {
            debug!(trail = self.trail(), "no ASs left in chain");
            return Disposition::Complete;
        }

        let Some(ifc) = self.chain.ifcs().get(self.index) else {
            return Disposition::Complete;
        };
        if !ifc.filter_matches(
            self.chain.session_case(),
            self.chain.is_registered(),
            false,
            msg,
            self.trail(),
        ) {
            debug!(trail = self.trail(), link = %self, "no match");
            return Disposition::Next;
        }

        let invocation = ifc.as_invocation();
        self.default_handling = invocation.default_handling;

        let server_name = invocation.server_name.clone();
        if !is_routable_uri(&server_name) {
            warn!(
                trail = self.trail(),
                server = %server_name,
                "matched rule names an unroutable server"
            );
            return match self.default_handling {
                DefaultHandling::SessionContinued => Disposition::Next,
                DefaultHandling::SessionTerminated => Disposition::Stop,
            };
        }

        self.chain.with_as_info(self.index, |info| {
            info.as_uri = server_name.clone();
        });
        debug!(trail = self.trail(), link = %self, server = %server_name, "invoking AS");
        Disposition::Skip(server_name)
    }

    /// Feeds back a response status from the invoked server.
    pub fn on_response(&mut self, status_code: u16) {
        if status_code == 100 {
            // 100 Trying proves the server is alive even before a final
            // response.
            self.responsive = true;
        } else if status_code >= 200 {
            self.chain.with_as_info(self.index, |info| {
                info.status_code = Some(status_code);
            });
        }
    }

    /// The invoked server never answered within the stack's timer. The
    /// caller consults `default_handling` to either abort the chain or
    /// advance and re-offer the original request.
    pub fn on_not_responding(&mut self) {
        self.chain.with_as_info(self.index, |info| {
            info.timeout = true;
        });
    }

    /// The token a returning request will present to resume at the next
    /// position. Only defined while the link is not complete.
    pub fn next_odi_token(&self) -> Option<&str> {
        debug_assert!(!self.complete(), "no ODI token past the chain end");
        self.chain.odi_token(self.index + 1)
    }
}

/// A server URI we are prepared to route an initial request toward.
fn is_routable_uri(uri: &str) -> bool {
    uri.starts_with("sip:") || uri.starts_with("sips:") || uri.starts_with("tel:")
}

impl fmt::Display for AsChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AsChain-{}[{:p}]:{}/{}",
            self.chain.session_case(),
            Arc::as_ptr(&self.chain),
            self.index + 1,
            self.chain.size()
        )
    }
}
