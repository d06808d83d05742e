// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Service Point Triggers (3GPP TS 29.228 Annex B/F).
//!
//! One `<SPT>` element names exactly one trigger; a trigger point combines
//! them in conjunctive or disjunctive normal form. Triggers the parser
//! does not recognise become [`UnknownSpt`], which poisons the owning rule
//! into never matching (logged once at evaluation).

use enum_dispatch::enum_dispatch;
use regex::Regex;
use tracing::warn;

use crate::{
    ifc::session_case::SessionCase,
    sip::message::{Method, SipMessage},
};

/// Everything a trigger may inspect when deciding whether it fires.
pub struct SptContext<'a> {
    pub session_case: SessionCase,
    pub is_registered: bool,
    pub is_initial_registration: bool,
    pub msg: &'a SipMessage,
}

#[enum_dispatch]
pub trait SptMatch {
    fn matches(&self, ctx: &SptContext<'_>) -> bool;
}

/// `<Method>` — request method equals the given token. A REGISTER
/// trigger may be qualified by `<RegistrationType>` values in its
/// extension; the method then only matches REGISTERs of one of the
/// listed kinds.
#[derive(Debug)]
pub struct MethodSpt {
    pub method: Method,
    pub registration_types: Vec<RegistrationType>,
}

impl SptMatch for MethodSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        if ctx.msg.method() != Some(&self.method) {
            return false;
        }
        self.registration_types.is_empty()
            || self
                .registration_types
                .iter()
                .any(|rt| RegistrationTypeSpt { reg_type: *rt }.matches(ctx))
    }
}

/// `<SessionCase>` — direction and registration state of the served user.
/// Values per TS 29.228: 0 originating, 1 terminating-registered,
/// 2 terminating-unregistered, 3 originating-unregistered, 4 cdiv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCaseTrigger {
    Originating = 0,
    TerminatingRegistered = 1,
    TerminatingUnregistered = 2,
    OriginatingUnregistered = 3,
    OriginatingCdiv = 4,
}

impl SessionCaseTrigger {
    pub fn from_value(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Originating,
            1 => Self::TerminatingRegistered,
            2 => Self::TerminatingUnregistered,
            3 => Self::OriginatingUnregistered,
            4 => Self::OriginatingCdiv,
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub struct SessionCaseSpt {
    pub case: SessionCaseTrigger,
}

impl SptMatch for SessionCaseSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        match self.case {
            SessionCaseTrigger::Originating => {
                ctx.session_case == SessionCase::Originating && ctx.is_registered
            },
            SessionCaseTrigger::TerminatingRegistered => {
                ctx.session_case.is_terminating() && ctx.is_registered
            },
            SessionCaseTrigger::TerminatingUnregistered => {
                ctx.session_case.is_terminating() && !ctx.is_registered
            },
            SessionCaseTrigger::OriginatingUnregistered => {
                ctx.session_case == SessionCase::Originating && !ctx.is_registered
            },
            SessionCaseTrigger::OriginatingCdiv => {
                ctx.session_case == SessionCase::OriginatingCdiv
            },
        }
    }
}

/// `<RequestURI>` — regex over the Request-URI.
#[derive(Debug)]
pub struct RequestUriSpt {
    pub pattern: Regex,
}

impl SptMatch for RequestUriSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        ctx.msg
            .request_uri()
            .is_some_and(|uri| self.pattern.is_match(uri))
    }
}

/// `<SIPHeader>` — header present and, when a content pattern is given,
/// at least one instance matching it.
#[derive(Debug)]
pub struct SipHeaderSpt {
    pub name: String,
    pub content: Option<Regex>,
}

impl SptMatch for SipHeaderSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        let mut values = ctx.msg.headers(&self.name).peekable();
        match &self.content {
            None => values.peek().is_some(),
            Some(re) => values.any(|v| re.is_match(v)),
        }
    }
}

/// `<SessionDescription>` — some SDP line whose type matches `line` and
/// whose value matches `content` (when given).
#[derive(Debug)]
pub struct SessionDescriptionSpt {
    pub line: Regex,
    pub content: Option<Regex>,
}

impl SptMatch for SessionDescriptionSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        ctx.msg.body().lines().any(|sdp_line| {
            let Some((key, value)) = sdp_line.split_once('=') else {
                return false;
            };
            self.line.is_match(key)
                && self.content.as_ref().is_none_or(|re| re.is_match(value))
        })
    }
}

/// `<RegistrationType>` — kind of REGISTER transaction. Values per
/// TS 29.228: 0 initial, 1 re-registration, 2 de-registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationType {
    Initial = 0,
    ReRegistration = 1,
    DeRegistration = 2,
}

impl RegistrationType {
    pub fn from_value(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Initial,
            1 => Self::ReRegistration,
            2 => Self::DeRegistration,
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub struct RegistrationTypeSpt {
    pub reg_type: RegistrationType,
}

impl SptMatch for RegistrationTypeSpt {
    fn matches(&self, ctx: &SptContext<'_>) -> bool {
        if ctx.msg.method() != Some(&Method::Register) {
            return false;
        }
        let deregister = ctx.msg.expires() == Some(0);
        match self.reg_type {
            RegistrationType::Initial => {
                ctx.is_initial_registration && !deregister
            },
            RegistrationType::ReRegistration => {
                !ctx.is_initial_registration && !deregister
            },
            RegistrationType::DeRegistration => deregister,
        }
    }
}

/// A trigger the parser did not recognise. Never matches; evaluation of a
/// rule containing one short-circuits to non-matching.
#[derive(Debug)]
pub struct UnknownSpt {
    pub element: String,
}

impl SptMatch for UnknownSpt {
    fn matches(&self, _ctx: &SptContext<'_>) -> bool {
        false
    }
}

#[enum_dispatch(SptMatch)]
#[derive(Debug)]
pub enum Spt {
    Method(MethodSpt),
    SessionCase(SessionCaseSpt),
    RequestUri(RequestUriSpt),
    SipHeader(SipHeaderSpt),
    SessionDescription(SessionDescriptionSpt),
    RegistrationType(RegistrationTypeSpt),
    Unknown(UnknownSpt),
}

/// One SPT instance inside a trigger point: the trigger itself plus its
/// group id and negation flag.
#[derive(Debug)]
pub struct SptClause {
    pub group: u32,
    pub negated: bool,
    pub spt: Spt,
}

impl SptClause {
    fn evaluate(&self, ctx: &SptContext<'_>) -> bool {
        self.spt.matches(ctx) != self.negated
    }

    fn is_unknown(&self) -> bool {
        matches!(self.spt, Spt::Unknown(_))
    }
}

/// The `<TriggerPoint>` of one filter criterion.
#[derive(Debug)]
pub struct TriggerPoint {
    /// True: conjunction of disjunctions (AND across groups, OR inside a
    /// group). False: disjunction of conjunctions.
    pub condition_type_cnf: bool,
    pub clauses: Vec<SptClause>,
}

impl TriggerPoint {
    pub fn evaluate(&self, ctx: &SptContext<'_>) -> bool {
        if let Some(unknown) = self.clauses.iter().find(|c| c.is_unknown()) {
            if let Spt::Unknown(u) = &unknown.spt {
                warn!(element = %u.element, "unrecognised SPT, treating rule as non-matching");
            }
            return false;
        }

        let mut groups: Vec<u32> =
            self.clauses.iter().map(|c| c.group).collect();
        groups.sort_unstable();
        groups.dedup();

        let group_result = |group: u32, all: bool| {
            let mut members =
                self.clauses.iter().filter(|c| c.group == group);
            if all {
                members.all(|c| c.evaluate(ctx))
            } else {
                members.any(|c| c.evaluate(ctx))
            }
        };

        if self.condition_type_cnf {
            groups.iter().all(|g| group_result(*g, false))
        } else {
            groups.iter().any(|g| group_result(*g, true))
        }
    }
}
