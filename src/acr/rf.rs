// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed model of the Rf accounting record. The serialised field set is
//! normative: regression tests compare records structurally against the
//! expected-output files under `tests/fixtures/`.

use serde::Serialize;

/// One complete accounting record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RfRecord {
    /// SIP method of the triggering request.
    pub event: String,
    /// 1 EVENT, 2 START, 3 INTERIM, 4 STOP.
    #[serde(rename = "record-type")]
    pub record_type: u32,
    /// Milliseconds since epoch at serialisation time.
    pub timestamp: i64,
    #[serde(rename = "role-of-node")]
    pub role_of_node: String,
    #[serde(rename = "node-functionality")]
    pub node_functionality: String,
    #[serde(rename = "user-session-id", skip_serializing_if = "Option::is_none")]
    pub user_session_id: Option<String>,
    #[serde(
        rename = "calling-party-address",
        skip_serializing_if = "Option::is_none"
    )]
    pub calling_party_address: Option<String>,
    #[serde(
        rename = "called-party-address",
        skip_serializing_if = "Option::is_none"
    )]
    pub called_party_address: Option<String>,
    /// Original target when the request was retargeted downstream.
    #[serde(
        rename = "requested-party-address",
        skip_serializing_if = "Option::is_none"
    )]
    pub requested_party_address: Option<String>,
    #[serde(rename = "subscription-id", skip_serializing_if = "Vec::is_empty")]
    pub subscription_id: Vec<SubscriptionId>,
    #[serde(
        rename = "charging-function-addresses",
        skip_serializing_if = "Option::is_none"
    )]
    pub charging_function_addresses: Option<ChargingFunctions>,
    #[serde(rename = "service-information")]
    pub service_information: ServiceInformation,
    #[serde(rename = "time-stamps")]
    pub time_stamps: TimeStamps,
}

impl RfRecord {
    pub fn to_json(&self) -> String {
        // Serialisation of a value built from owned strings and integers
        // cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionId {
    /// 0 END_USER_E164, 2 END_USER_SIP_URI.
    #[serde(rename = "subscription-id-type")]
    pub id_type: u32,
    #[serde(rename = "subscription-id-data")]
    pub data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ChargingFunctions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ccf: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ecf: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceInformation {
    #[serde(rename = "ims-information")]
    pub ims_information: ImsInformation,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImsInformation {
    #[serde(rename = "role-of-node")]
    pub role_of_node: String,
    #[serde(rename = "node-functionality")]
    pub node_functionality: String,
    #[serde(rename = "event-type")]
    pub event_type: EventType,
    #[serde(
        rename = "ims-charging-identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub ims_charging_identifier: Option<String>,
    #[serde(
        rename = "inter-operator-identifiers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub inter_operator_identifiers: Vec<InterOperatorIdentifiers>,
    #[serde(
        rename = "sdp-session-description",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sdp_session_description: Vec<String>,
    #[serde(rename = "sdp-media-component", skip_serializing_if = "Vec::is_empty")]
    pub sdp_media_component: Vec<SdpMediaComponent>,
    #[serde(
        rename = "application-servers-information",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub application_servers_information: Vec<AsInformation>,
    #[serde(
        rename = "server-capabilities",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_capabilities: Option<ServerCapabilitiesInfo>,
    #[serde(rename = "cause-code", skip_serializing_if = "Option::is_none")]
    pub cause_code: Option<i32>,
    #[serde(rename = "reason-header", skip_serializing_if = "Option::is_none")]
    pub reason_header: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventType {
    #[serde(rename = "sip-method")]
    pub sip_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct InterOperatorIdentifiers {
    #[serde(rename = "originating-ioi", skip_serializing_if = "Option::is_none")]
    pub originating_ioi: Option<String>,
    #[serde(rename = "terminating-ioi", skip_serializing_if = "Option::is_none")]
    pub terminating_ioi: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SdpMediaComponent {
    #[serde(rename = "sdp-media-name")]
    pub sdp_media_name: String,
    #[serde(
        rename = "sdp-media-description",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sdp_media_description: Vec<String>,
}

/// One application-server invocation as billed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AsInformation {
    #[serde(rename = "application-server")]
    pub application_server: String,
    /// Set when the server retargeted the request.
    #[serde(
        rename = "application-provided-called-party-address",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_provided_called_party_address: Option<String>,
    #[serde(
        rename = "status-as-code-ext",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_as_code_ext: Option<u16>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerCapabilitiesInfo {
    #[serde(rename = "server-name", skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(
        rename = "mandatory-capability",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub mandatory_capability: Vec<u32>,
    #[serde(
        rename = "optional-capability",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub optional_capability: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct TimeStamps {
    /// Milliseconds since epoch of the triggering request.
    #[serde(
        rename = "sip-request-timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub sip_request_timestamp: Option<i64>,
    #[serde(
        rename = "sip-provisional-response-timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub sip_provisional_response_timestamp: Option<i64>,
    #[serde(
        rename = "sip-response-timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub sip_response_timestamp: Option<i64>,
}
