// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fmt};

use crate::ifc::criteria::Ifcs;

/// Registration state reported by the subscriber database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Registered,
    /// Known subscriber with no active binding (unregistered services may
    /// still apply).
    Unregistered,
    NotRegistered,
}

impl RegistrationState {
    pub fn from_xml_text(text: &str) -> Option<Self> {
        Some(match text {
            "REGISTERED" => Self::Registered,
            "UNREGISTERED" => Self::Unregistered,
            "NOT_REGISTERED" => Self::NotRegistered,
            _ => return None,
        })
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registered => "REGISTERED",
            Self::Unregistered => "UNREGISTERED",
            Self::NotRegistered => "NOT_REGISTERED",
        })
    }
}

/// Everything one reg-data exchange returns: the subscriber's state, the
/// filter criteria per public identity, and all identities of the
/// implicit registration set in document order.
#[derive(Debug, Clone)]
pub struct RegistrationData {
    pub regstate: RegistrationState,
    pub ifcs_map: HashMap<String, Ifcs>,
    pub associated_uris: Vec<String>,
}

/// Why the registration state is being touched; serialised into the
/// request body toward the subscriber database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Reg,
    Call,
    DeregAdmin,
    DeregUser,
    DeregTimeout,
}

impl RequestType {
    pub fn as_reqtype(self) -> &'static str {
        match self {
            Self::Reg => "reg",
            Self::Call => "call",
            Self::DeregAdmin => "dereg-admin",
            Self::DeregUser => "dereg-user",
            Self::DeregTimeout => "dereg-timeout",
        }
    }
}

/// Result of an I-CSCF user-authorization query: the assigned S-CSCF, or
/// the capability lists to select one by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub scscf: String,
    pub mandatory_caps: Vec<u32>,
    pub optional_caps: Vec<u32>,
}
