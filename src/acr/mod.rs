// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Accounting records for the Rf charging interface.
//!
//! An [`Acr`] absorbs the SIP messages a transaction handler sees plus the
//! outcome of each application-server invocation, and serialises one
//! accounting record at the session boundary. The trait's default methods
//! are all no-ops; [`NullAcr`] is exactly those defaults, handed out when
//! billing is unconfigured so call sites never need to branch.

pub mod factory;
pub mod ralf;
pub mod rf;
pub mod sink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use factory::AcrFactory;
pub use ralf::RalfAcr;
pub use sink::{ChannelSink, MemorySink, RfSink};

use crate::{hss::types::ServerCapabilities, sip::message::SipMessage};

/// Which CSCF this node is acting as; fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeFunctionality {
    Pcscf,
    Icscf,
    Scscf,
}

impl NodeFunctionality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pcscf => "PCSCF",
            Self::Icscf => "ICSCF",
            Self::Scscf => "SCSCF",
        }
    }
}

/// Side of the session this record accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Originating,
    Terminating,
}

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Originating => "originating",
            Self::Terminating => "terminating",
        }
    }
}

/// Which party started the transaction being accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    CallingParty,
    CalledParty,
}

/// Accounting-record kind, derived from the triggering request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Event = 1,
    Start = 2,
    Interim = 3,
    Stop = 4,
}

/// Per-transaction accounting state machine.
///
/// Observation operations are cheap and infallible; nothing here blocks.
/// `get_message` may be called any number of times, `send_message`
/// delivers the record to the configured sink (typically from the AS
/// chain destructor).
pub trait Acr: Send {
    fn rx_request(&mut self, _msg: &SipMessage, _ts: DateTime<Utc>) {}

    fn tx_request(&mut self, _msg: &SipMessage, _ts: DateTime<Utc>) {}

    fn rx_response(&mut self, _msg: &SipMessage, _ts: DateTime<Utc>) {}

    fn tx_response(&mut self, _msg: &SipMessage, _ts: DateTime<Utc>) {}

    /// Records one application-server invocation outcome inline.
    fn as_info(
        &mut self,
        _as_uri: &str,
        _redirect_uri: &str,
        _status_code: u16,
        _timeout: bool,
    ) {
    }

    /// Records the capability set returned by a user-authorization query.
    fn server_capabilities(&mut self, _caps: &ServerCapabilities) {}

    /// Clones the session identifier from a peer's record.
    fn override_session_id(&mut self, _call_id: &str) {}

    /// Serialises the record as it stands. Empty string when there is
    /// nothing to bill.
    fn get_message(&self, _ts: DateTime<Utc>) -> String {
        String::new()
    }

    /// Delivers the record via the configured sink.
    fn send_message(&mut self) {}
}

/// The do-nothing ACR used when billing is not configured.
#[derive(Debug, Default)]
pub struct NullAcr;

impl Acr for NullAcr {}
