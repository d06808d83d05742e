// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Initial Filter Criteria: the per-subscriber rules naming which
//! application servers to invoke for which requests.

use std::sync::Arc;

use regex::Regex;
use roxmltree::Node;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    ifc::{
        session_case::SessionCase,
        spt::{
            MethodSpt, RegistrationType, RegistrationTypeSpt, RequestUriSpt,
            SessionCaseSpt, SessionCaseTrigger, SessionDescriptionSpt,
            SipHeaderSpt, Spt, SptClause, SptContext, TriggerPoint,
            UnknownSpt,
        },
    },
    sip::message::{Method, SipMessage},
    utils::TrailId,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IfcError {
    #[error("malformed iFC: {0}")]
    Malformed(String),
}

/// What to do when the named application server does not respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultHandling {
    /// Continue the chain past the dead server.
    #[default]
    SessionContinued,
    /// Abort the transaction.
    SessionTerminated,
}

/// The `<ApplicationServer>` part of one rule.
#[derive(Debug, Clone)]
pub struct AsInvocation {
    pub server_name: String,
    pub default_handling: DefaultHandling,
    pub service_info: Option<String>,
    pub include_register_request: bool,
    pub include_register_response: bool,
}

/// One parsed `<InitialFilterCriteria>` rule. Immutable after parse.
#[derive(Debug)]
pub struct Ifc {
    priority: i32,
    trigger_point: Option<TriggerPoint>,
    as_invocation: AsInvocation,
}

impl Ifc {
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn as_invocation(&self) -> &AsInvocation {
        &self.as_invocation
    }

    /// Evaluates the rule's trigger point against a request. A rule with
    /// no trigger point matches unconditionally.
    pub fn filter_matches(
        &self,
        session_case: SessionCase,
        is_registered: bool,
        is_initial_registration: bool,
        msg: &SipMessage,
        trail: TrailId,
    ) -> bool {
        let matched = match &self.trigger_point {
            None => true,
            Some(tp) => tp.evaluate(&SptContext {
                session_case,
                is_registered,
                is_initial_registration,
                msg,
            }),
        };
        debug!(
            trail,
            server = %self.as_invocation.server_name,
            priority = self.priority,
            matched,
            "evaluated filter criterion"
        );
        matched
    }

    /// Parses one `<InitialFilterCriteria>` element.
    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, IfcError> {
        let priority = match child_text(node, "Priority") {
            None => 0,
            Some(text) => text.trim().parse::<i32>().map_err(|_| {
                IfcError::Malformed(format!("bad Priority {text:?}"))
            })?,
        };

        let trigger_point = node
            .children()
            .find(|c| c.has_tag_name("TriggerPoint"))
            .map(parse_trigger_point)
            .transpose()?;

        let as_node = node
            .children()
            .find(|c| c.has_tag_name("ApplicationServer"))
            .ok_or_else(|| {
                IfcError::Malformed("missing ApplicationServer".to_string())
            })?;
        let as_invocation = parse_application_server(as_node)?;

        Ok(Self {
            priority,
            trigger_point,
            as_invocation,
        })
    }
}

/// Priority-ordered snapshot of one service profile's rules. Cheap to
/// clone; chains hold one for their whole lifetime while the parsed
/// profile stays shared and immutable.
#[derive(Debug, Clone, Default)]
pub struct Ifcs {
    rules: Arc<Vec<Ifc>>,
}

impl Ifcs {
    pub fn new(mut rules: Vec<Ifc>) -> Self {
        // Ascending priority; document order breaks ties (stable sort).
        rules.sort_by_key(Ifc::priority);
        Self { rules: Arc::new(rules) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Ifc> {
        self.rules.get(index)
    }

    /// Parses the `<InitialFilterCriteria>` children of one
    /// `<ServiceProfile>` element.
    pub fn from_service_profile(profile: Node<'_, '_>) -> Result<Self, IfcError> {
        let mut rules = Vec::new();
        for child in profile.children() {
            if child.has_tag_name("InitialFilterCriteria") {
                rules.push(Ifc::from_xml(child)?);
            }
        }
        Ok(Self::new(rules))
    }

    /// Convenience for tests and tools: parses an `<IMSSubscription>`
    /// document and returns the first service profile's rules.
    pub fn from_ims_subscription(xml: &str) -> Result<Self, IfcError> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| IfcError::Malformed(e.to_string()))?;
        let root = doc.root_element();
        if !root.has_tag_name("IMSSubscription") {
            return Err(IfcError::Malformed(
                "expected IMSSubscription root".to_string(),
            ));
        }
        let profile = root
            .children()
            .find(|c| c.has_tag_name("ServiceProfile"))
            .ok_or_else(|| {
                IfcError::Malformed("missing ServiceProfile".to_string())
            })?;
        Self::from_service_profile(profile)
    }
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
}

fn parse_trigger_point(node: Node<'_, '_>) -> Result<TriggerPoint, IfcError> {
    let condition_type_cnf = match child_text(node, "ConditionTypeCNF") {
        None => false,
        Some(text) => text.trim() == "1",
    };

    let mut clauses = Vec::new();
    for spt in node.children().filter(|c| c.has_tag_name("SPT")) {
        parse_spt(spt, &mut clauses);
    }

    Ok(TriggerPoint { condition_type_cnf, clauses })
}

/// Parses one `<SPT>` element into clauses. A `<Method>REGISTER</Method>`
/// trigger may carry `<RegistrationType>` values in its extension; each
/// becomes an extra clause in the same group (disjoint under CNF).
fn parse_spt(node: Node<'_, '_>, clauses: &mut Vec<SptClause>) {
    let negated = child_text(node, "ConditionNegated")
        .map(|t| t.trim() == "1")
        .unwrap_or(false);
    let group = child_text(node, "Group")
        .and_then(|t| t.trim().parse::<u32>().ok())
        .unwrap_or(0);

    let push = |clauses: &mut Vec<SptClause>, spt: Spt| {
        clauses.push(SptClause { group, negated, spt });
    };

    let trigger = node.children().find(|c| {
        c.is_element()
            && !c.has_tag_name("ConditionNegated")
            && !c.has_tag_name("Group")
            && !c.has_tag_name("Extension")
    });

    let Some(trigger) = trigger else {
        push(clauses, Spt::Unknown(UnknownSpt { element: "(empty SPT)".to_string() }));
        return;
    };

    let text = trigger.text().unwrap_or("").trim();
    let tag = trigger.tag_name().name();
    match tag {
        "Method" => {
            // RegistrationType values in the extension qualify a
            // REGISTER trigger rather than standing alone.
            let mut registration_types = Vec::new();
            let mut bad_extension = false;
            for reg in node
                .children()
                .filter(|c| c.has_tag_name("Extension"))
                .flat_map(|e| e.children())
                .filter(|c| c.has_tag_name("RegistrationType"))
            {
                let value = reg.text().unwrap_or("").trim().parse::<u32>().ok();
                match value.and_then(RegistrationType::from_value) {
                    Some(reg_type) => registration_types.push(reg_type),
                    None => bad_extension = true,
                }
            }
            if bad_extension {
                push(
                    clauses,
                    Spt::Unknown(UnknownSpt {
                        element: "RegistrationType".to_string(),
                    }),
                );
            } else {
                push(
                    clauses,
                    Spt::Method(MethodSpt {
                        method: Method::from_token(text),
                        registration_types,
                    }),
                );
            }
        },
        "SessionCase" => {
            let case = text
                .parse::<u32>()
                .ok()
                .and_then(SessionCaseTrigger::from_value);
            match case {
                Some(case) => push(clauses, Spt::SessionCase(SessionCaseSpt { case })),
                None => push(
                    clauses,
                    Spt::Unknown(UnknownSpt { element: "SessionCase".to_string() }),
                ),
            }
        },
        "RequestURI" => match Regex::new(text) {
            Ok(pattern) => {
                push(clauses, Spt::RequestUri(RequestUriSpt { pattern }))
            },
            Err(e) => {
                warn!(error = %e, "bad RequestURI pattern in SPT");
                push(
                    clauses,
                    Spt::Unknown(UnknownSpt { element: "RequestURI".to_string() }),
                );
            },
        },
        "SIPHeader" => {
            let name = child_text(trigger, "Header").map(str::trim);
            let content = child_text(trigger, "Content")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(Regex::new);
            match (name, content) {
                (Some(name), None) => push(
                    clauses,
                    Spt::SipHeader(SipHeaderSpt {
                        name: name.to_string(),
                        content: None,
                    }),
                ),
                (Some(name), Some(Ok(re))) => push(
                    clauses,
                    Spt::SipHeader(SipHeaderSpt {
                        name: name.to_string(),
                        content: Some(re),
                    }),
                ),
                _ => {
                    warn!("bad SIPHeader SPT");
                    push(
                        clauses,
                        Spt::Unknown(UnknownSpt { element: "SIPHeader".to_string() }),
                    );
                },
            }
        },
        "SessionDescription" => {
            let line = child_text(trigger, "Line").map(str::trim).map(Regex::new);
            let content = child_text(trigger, "Content")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(Regex::new);
            match (line, content) {
                (Some(Ok(line)), None) => push(
                    clauses,
                    Spt::SessionDescription(SessionDescriptionSpt {
                        line,
                        content: None,
                    }),
                ),
                (Some(Ok(line)), Some(Ok(re))) => push(
                    clauses,
                    Spt::SessionDescription(SessionDescriptionSpt {
                        line,
                        content: Some(re),
                    }),
                ),
                _ => {
                    warn!("bad SessionDescription SPT");
                    push(
                        clauses,
                        Spt::Unknown(UnknownSpt {
                            element: "SessionDescription".to_string(),
                        }),
                    );
                },
            }
        },
        "RegistrationType" => {
            let value = text.parse::<u32>().ok();
            match value.and_then(RegistrationType::from_value) {
                Some(reg_type) => push(
                    clauses,
                    Spt::RegistrationType(RegistrationTypeSpt { reg_type }),
                ),
                None => push(
                    clauses,
                    Spt::Unknown(UnknownSpt {
                        element: "RegistrationType".to_string(),
                    }),
                ),
            }
        },
        other => {
            push(
                clauses,
                Spt::Unknown(UnknownSpt { element: other.to_string() }),
            );
        },
    }
}

fn parse_application_server(node: Node<'_, '_>) -> Result<AsInvocation, IfcError> {
    let server_name = child_text(node, "ServerName")
        .map(str::trim)
        .ok_or_else(|| IfcError::Malformed("missing ServerName".to_string()))?
        .to_string();

    let default_handling = match child_text(node, "DefaultHandling").map(str::trim) {
        None | Some("0") => DefaultHandling::SessionContinued,
        Some("1") => DefaultHandling::SessionTerminated,
        Some(other) => {
            warn!(value = other, "bad DefaultHandling, assuming continue");
            DefaultHandling::SessionContinued
        },
    };

    let service_info = child_text(node, "ServiceInfo")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let has_ext_flag = |name: &str| {
        node.children()
            .filter(|c| c.has_tag_name("Extension"))
            .flat_map(|e| e.children())
            .any(|c| c.has_tag_name(name))
    };

    Ok(AsInvocation {
        server_name,
        default_handling,
        service_info,
        include_register_request: has_ext_flag("IncludeRegisterRequest"),
        include_register_response: has_ext_flag("IncludeRegisterResponse"),
    })
}
