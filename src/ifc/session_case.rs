// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use crate::sip::{
    message::SipMessage,
    uri::{canonical_addr_spec, canonical_uri},
};

/// Which direction of a session the node is handling for the served user.
/// Selects the IFC set to walk and how the served user is derived from a
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCase {
    Originating,
    Terminating,
    /// Originating processing applied after call diversion retargeted a
    /// terminating request.
    OriginatingCdiv,
}

impl SessionCase {
    pub fn is_originating(self) -> bool {
        matches!(self, Self::Originating | Self::OriginatingCdiv)
    }

    pub fn is_terminating(self) -> bool {
        matches!(self, Self::Terminating)
    }

    /// Canonical served user for a request in this session case.
    ///
    /// Originating cases identify the caller: P-Served-User if the edge
    /// proxy asserted one, else P-Asserted-Identity, else the From header.
    /// The terminating case is the canonical Request-URI.
    pub fn served_user(self, msg: &SipMessage) -> Option<String> {
        match self {
            Self::Originating | Self::OriginatingCdiv => msg
                .header("P-Served-User")
                .or_else(|| msg.header("P-Asserted-Identity"))
                .or_else(|| msg.header("From"))
                .map(canonical_addr_spec),
            Self::Terminating => msg.request_uri().map(canonical_uri),
        }
    }
}

impl fmt::Display for SessionCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Originating => "orig",
            Self::Terminating => "term",
            Self::OriginatingCdiv => "orig-cdiv",
        })
    }
}
