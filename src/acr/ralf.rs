// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The billing-enabled ACR implementation.
//!
//! The first received request is the trigger: it fixes the session id,
//! the charging correlation fields (icid and orig-ioi from
//! P-Charging-Vector, CCF/ECF lists from P-Charging-Function-Addresses),
//! the party addresses and, for INVITE, the media description. Later
//! hops of the same transaction may only move the final forwarded
//! Request-URI; responses contribute status, timing and the terminating
//! operator identifier.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    acr::{
        Acr, Initiator, NodeFunctionality, NodeRole, RecordType,
        rf::{
            AsInformation, ChargingFunctions, EventType, ImsInformation,
            InterOperatorIdentifiers, RfRecord, SdpMediaComponent,
            ServerCapabilitiesInfo, ServiceInformation, SubscriptionId,
            TimeStamps,
        },
        sink::RfSink,
    },
    hss::types::ServerCapabilities,
    sip::{
        charging::{ChargingFunctionAddresses, ChargingVector},
        message::{Method, SipMessage},
        uri::addr_spec,
    },
    utils::TrailId,
};

/// Snapshot of the triggering request. Immutable once taken.
struct Trigger {
    method: Method,
    record_type: RecordType,
    call_id: Option<String>,
    initial_requri: String,
    calling_party: Option<String>,
    register_target: Option<String>,
    subscription_ids: Vec<SubscriptionId>,
    icid: Option<String>,
    orig_ioi: Option<String>,
    charging_functions: ChargingFunctionAddresses,
    contact: Option<String>,
    expires: Option<u32>,
    sdp_session: Vec<String>,
    sdp_media: Vec<SdpMediaComponent>,
}

pub struct RalfAcr {
    trail: TrailId,
    node_functionality: NodeFunctionality,
    node_role: NodeRole,
    initiator: Initiator,
    sink: Arc<dyn RfSink>,

    trigger: Option<Trigger>,
    /// Request-URI the request finally left with; the trigger keeps the
    /// URI it arrived with.
    final_requri: Option<String>,
    request_ts: Option<DateTime<Utc>>,
    provisional_ts: Option<DateTime<Utc>>,
    response_ts: Option<DateTime<Utc>>,
    final_status: Option<u16>,
    term_ioi: Option<String>,
    reason_header: Option<String>,
    as_information: Vec<AsInformation>,
    server_caps: Option<ServerCapabilities>,
    session_id_override: Option<String>,
    last_ts: Option<DateTime<Utc>>,
}

impl RalfAcr {
    pub fn new(
        trail: TrailId,
        node_functionality: NodeFunctionality,
        node_role: NodeRole,
        initiator: Initiator,
        sink: Arc<dyn RfSink>,
    ) -> Self {
        Self {
            trail,
            node_functionality,
            node_role,
            initiator,
            sink,
            trigger: None,
            final_requri: None,
            request_ts: None,
            provisional_ts: None,
            response_ts: None,
            final_status: None,
            term_ioi: None,
            reason_header: None,
            as_information: Vec::new(),
            server_caps: None,
            session_id_override: None,
            last_ts: None,
        }
    }

    fn absorb_request(&mut self, msg: &SipMessage, ts: DateTime<Utc>) {
        self.last_ts = Some(ts);
        let Some(requri) = msg.request_uri() else {
            warn!(trail = self.trail, "response passed to a request observation");
            return;
        };

        match &self.trigger {
            None => {
                self.trigger =
                    Some(Trigger::from_message(msg, self.initiator));
                self.request_ts = Some(ts);
            },
            Some(trigger) => {
                // Same transaction re-observed on a later hop: only the
                // final forwarded Request-URI may move.
                if trigger.call_id.as_deref() == msg.call_id() {
                    self.final_requri = Some(requri.to_string());
                }
            },
        }
    }

    fn absorb_response(&mut self, msg: &SipMessage, ts: DateTime<Utc>, tx: bool) {
        self.last_ts = Some(ts);
        let Some(status) = msg.status_code() else {
            warn!(trail = self.trail, "request passed to a response observation");
            return;
        };

        if status == 100 {
            // First provisional on the upstream leg marks the proxy as
            // having answered.
            if tx && self.provisional_ts.is_none() {
                self.provisional_ts = Some(ts);
            }
            return;
        }

        if status >= 200 && self.final_status.is_none() {
            self.final_status = Some(status);
            self.response_ts = Some(ts);
            self.reason_header =
                msg.header("Reason").map(str::to_string);
        }

        if self.term_ioi.is_none() {
            if let Some(pcv) = msg.header("P-Charging-Vector") {
                self.term_ioi = ChargingVector::parse(pcv).term_ioi;
            }
        }
    }

    fn build_record(&self, ts: DateTime<Utc>) -> Option<RfRecord> {
        let trigger = self.trigger.as_ref()?;

        let called_party = match trigger.method {
            Method::Register => trigger.register_target.clone(),
            _ => Some(
                self.final_requri
                    .clone()
                    .unwrap_or_else(|| trigger.initial_requri.clone()),
            ),
        };
        let requested_party = match &called_party {
            Some(called)
                if trigger.method != Method::Register
                    && *called != trigger.initial_requri =>
            {
                Some(trigger.initial_requri.clone())
            },
            _ => None,
        };

        let iois = if trigger.orig_ioi.is_some() || self.term_ioi.is_some() {
            vec![InterOperatorIdentifiers {
                originating_ioi: trigger.orig_ioi.clone(),
                terminating_ioi: self.term_ioi.clone(),
            }]
        } else {
            Vec::new()
        };

        let cause_code = self.final_status.map(|status| {
            if status < 300 { 0 } else { i32::from(status) }
        });

        let server_capabilities =
            self.server_caps.as_ref().map(|caps| ServerCapabilitiesInfo {
                server_name: (!caps.scscf.is_empty())
                    .then(|| caps.scscf.clone()),
                mandatory_capability: caps.mandatory_caps.clone(),
                optional_capability: caps.optional_caps.clone(),
            });

        Some(RfRecord {
            event: trigger.method.to_string(),
            record_type: trigger.record_type as u32,
            timestamp: ts.timestamp_millis(),
            role_of_node: self.node_role.as_str().to_string(),
            node_functionality: self.node_functionality.as_str().to_string(),
            user_session_id: self
                .session_id_override
                .clone()
                .or_else(|| trigger.call_id.clone()),
            calling_party_address: trigger.calling_party.clone(),
            called_party_address: called_party,
            requested_party_address: requested_party,
            subscription_id: trigger.subscription_ids.clone(),
            charging_function_addresses: (!trigger.charging_functions.is_empty())
                .then(|| ChargingFunctions {
                    ccf: trigger.charging_functions.ccf.clone(),
                    ecf: trigger.charging_functions.ecf.clone(),
                }),
            service_information: ServiceInformation {
                ims_information: ImsInformation {
                    role_of_node: self.node_role.as_str().to_string(),
                    node_functionality: self
                        .node_functionality
                        .as_str()
                        .to_string(),
                    event_type: EventType {
                        sip_method: trigger.method.to_string(),
                        expires: trigger.expires,
                        contact: trigger.contact.clone(),
                    },
                    ims_charging_identifier: trigger.icid.clone(),
                    inter_operator_identifiers: iois,
                    sdp_session_description: trigger.sdp_session.clone(),
                    sdp_media_component: trigger.sdp_media.clone(),
                    application_servers_information: self
                        .as_information
                        .clone(),
                    server_capabilities,
                    cause_code,
                    reason_header: self.reason_header.clone(),
                },
            },
            time_stamps: TimeStamps {
                sip_request_timestamp: self
                    .request_ts
                    .map(|t| t.timestamp_millis()),
                sip_provisional_response_timestamp: self
                    .provisional_ts
                    .map(|t| t.timestamp_millis()),
                sip_response_timestamp: self
                    .response_ts
                    .map(|t| t.timestamp_millis()),
            },
        })
    }
}

impl Acr for RalfAcr {
    fn rx_request(&mut self, msg: &SipMessage, ts: DateTime<Utc>) {
        self.absorb_request(msg, ts);
    }

    fn tx_request(&mut self, msg: &SipMessage, ts: DateTime<Utc>) {
        self.absorb_request(msg, ts);
    }

    fn rx_response(&mut self, msg: &SipMessage, ts: DateTime<Utc>) {
        self.absorb_response(msg, ts, false);
    }

    fn tx_response(&mut self, msg: &SipMessage, ts: DateTime<Utc>) {
        self.absorb_response(msg, ts, true);
    }

    fn as_info(
        &mut self,
        as_uri: &str,
        redirect_uri: &str,
        status_code: u16,
        timeout: bool,
    ) {
        self.as_information.push(AsInformation {
            application_server: as_uri.to_string(),
            application_provided_called_party_address: (!redirect_uri
                .is_empty())
            .then(|| redirect_uri.to_string()),
            status_as_code_ext: (status_code != 0).then_some(status_code),
            timeout,
        });
    }

    fn server_capabilities(&mut self, caps: &ServerCapabilities) {
        self.server_caps = Some(caps.clone());
    }

    fn override_session_id(&mut self, call_id: &str) {
        self.session_id_override = Some(call_id.to_string());
    }

    fn get_message(&self, ts: DateTime<Utc>) -> String {
        match self.build_record(ts) {
            Some(record) => record.to_json(),
            None => {
                warn!(trail = self.trail, "no trigger request absorbed, empty ACR");
                String::new()
            },
        }
    }

    fn send_message(&mut self) {
        let ts = self.last_ts.unwrap_or_else(Utc::now);
        let message = self.get_message(ts);
        if message.is_empty() {
            return;
        }
        debug!(trail = self.trail, "sending Rf ACR");
        self.sink.send(self.trail, message);
    }
}

impl Trigger {
    fn from_message(msg: &SipMessage, initiator: Initiator) -> Self {
        let method =
            msg.method().cloned().unwrap_or(Method::Other(String::new()));
        let record_type = match method {
            Method::Invite if msg.to_tag().is_some() => RecordType::Interim,
            Method::Invite => RecordType::Start,
            Method::Bye => RecordType::Stop,
            _ => RecordType::Event,
        };

        let asserted: Vec<&str> =
            msg.headers("P-Asserted-Identity").collect();
        // Without an asserted identity the calling party comes from
        // whichever end started this transaction.
        let calling_fallback = match initiator {
            Initiator::CallingParty => msg.header("From"),
            Initiator::CalledParty => msg.header("To"),
        };
        let calling_party = asserted
            .first()
            .copied()
            .or(calling_fallback)
            .map(|v| addr_spec(v).to_string());

        let mut subscription_ids: Vec<SubscriptionId> = asserted
            .iter()
            .map(|v| subscription_id(addr_spec(v)))
            .collect();
        if subscription_ids.is_empty() {
            // No asserted identity (REGISTER): bill the identity being
            // registered.
            if let Some(to) = msg.header("To") {
                subscription_ids.push(subscription_id(addr_spec(to)));
            }
        }

        let pcv = msg
            .header("P-Charging-Vector")
            .map(ChargingVector::parse)
            .unwrap_or_default();
        let charging_functions = msg
            .header("P-Charging-Function-Addresses")
            .map(ChargingFunctionAddresses::parse)
            .unwrap_or_default();

        let (contact, expires, register_target) =
            if method == Method::Register {
                (
                    msg.header("Contact").map(|v| addr_spec(v).to_string()),
                    msg.expires(),
                    msg.header("To").map(|v| addr_spec(v).to_string()),
                )
            } else {
                (None, None, None)
            };

        let (sdp_session, sdp_media) = if method == Method::Invite {
            split_sdp(msg.body())
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            method,
            record_type,
            call_id: msg.call_id().map(str::to_string),
            initial_requri: msg.request_uri().unwrap_or_default().to_string(),
            calling_party,
            register_target,
            subscription_ids,
            icid: pcv.icid,
            orig_ioi: pcv.orig_ioi,
            charging_functions,
            contact,
            expires,
            sdp_session,
            sdp_media,
        }
    }
}

fn subscription_id(uri: &str) -> SubscriptionId {
    // tel URIs are E.164 subscriptions, everything else a SIP URI.
    let id_type = if uri.starts_with("tel:") { 0 } else { 2 };
    SubscriptionId { id_type, data: uri.to_string() }
}

/// Splits an SDP body into the session-level lines and one component per
/// `m=` section.
fn split_sdp(body: &str) -> (Vec<String>, Vec<SdpMediaComponent>) {
    let mut session = Vec::new();
    let mut media: Vec<SdpMediaComponent> = Vec::new();

    for line in body.lines().map(str::trim_end) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with("m=") {
            media.push(SdpMediaComponent {
                sdp_media_name: line.to_string(),
                sdp_media_description: Vec::new(),
            });
        } else if let Some(component) = media.last_mut() {
            component.sdp_media_description.push(line.to_string());
        } else {
            session.push(line.to_string());
        }
    }

    (session, media)
}
