// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end walks of the proxy-side contract: IFC evaluation, ODI
//! route emission, chain re-entry from the Route header, and the
//! accounting record flushed at chain teardown.

use std::sync::Arc;

use chrono::DateTime;
use cscf_core_rs::{
    acr::{Acr, AcrFactory, Initiator, MemorySink, NodeFunctionality, NodeRole},
    aschain::{AsChainLink, AsChainTable, Disposition},
    ifc::{criteria::Ifcs, session_case::SessionCase},
    sip::{
        message::SipMessage,
        odi::{build_odi_route, extract_odi_token},
    },
};
use serde_json::Value;

const LOCAL_HOST: &str = "sprout.homedomain";
const LOCAL_PORT: u16 = 5054;

const IFC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<IMSSubscription>
  <ServiceProfile>
    <PublicIdentity><Identity>sip:6505550000@homedomain</Identity></PublicIdentity>
    <InitialFilterCriteria>
      <Priority>1</Priority>
      <TriggerPoint>
        <ConditionTypeCNF>1</ConditionTypeCNF>
        <SPT>
          <ConditionNegated>0</ConditionNegated>
          <Group>0</Group>
          <Method>INVITE</Method>
        </SPT>
      </TriggerPoint>
      <ApplicationServer>
        <ServerName>sip:as1.homedomain:5060;transport=TCP</ServerName>
        <DefaultHandling>0</DefaultHandling>
      </ApplicationServer>
    </InitialFilterCriteria>
  </ServiceProfile>
</IMSSubscription>"#;

fn invite(requri: &str, route: &str) -> SipMessage {
    let route_hdr = if route.is_empty() {
        String::new()
    } else {
        format!("Route: {route}\r\n")
    };
    SipMessage::parse(&format!(
        "INVITE {requri} SIP/2.0\r\n\
         Via: SIP/2.0/TCP 10.83.18.38:36530;rport\r\n\
         {route_hdr}\
         To: \"6505550001\" <sip:6505550001@homedomain>\r\n\
         From: \"6505550000\" <sip:6505550000@homedomain>;tag=12345678\r\n\
         Call-ID: 0123456789abcdef-10.83.18.38\r\n\
         CSeq: 1 INVITE\r\n\
         P-Asserted-Identity: \"6505550000\" <sip:6505550000@homedomain>\r\n\
         P-Charging-Vector: icid-value=1234bc9876e;orig-ioi=homedomain\r\n\
         Content-Length: 0\r\n\r\n",
    ))
    .expect("failed to parse INVITE")
}

/// Originating INVITE with one matching criterion: forwarded to the AS
/// with an ODI route, re-entered off that route, completed, billed.
#[test]
fn test_invite_via_as_round_trip() {
    let table = Arc::new(AsChainTable::new());
    let sink = Arc::new(MemorySink::new());
    let factory = AcrFactory::new(NodeFunctionality::Scscf, sink.clone());
    let ts = |ms: i64| DateTime::from_timestamp_millis(ms).expect("bad ts");

    let initial = invite("sip:6505550001@homedomain", "");
    let mut acr =
        factory.get_acr(7, Initiator::CallingParty, NodeRole::Originating);
    acr.rx_request(&initial, ts(1000));

    let ifcs = Ifcs::from_ims_subscription(IFC_XML).expect("bad profile");
    let mut link = AsChainLink::create_as_chain(
        &table,
        SessionCase::Originating,
        "sip:6505550000@homedomain".to_string(),
        true,
        7,
        ifcs,
        Some(acr),
    );

    // The criterion matches; the proxy forwards toward the AS carrying
    // the ODI route.
    let server = match link.on_initial_request(&initial) {
        Disposition::Skip(server) => server,
        other => panic!("expected Skip, got {other:?}"),
    };
    assert_eq!(server, "sip:as1.homedomain:5060;transport=TCP");

    let odi_route = build_odi_route(
        link.next_odi_token().expect("missing token"),
        LOCAL_HOST,
        LOCAL_PORT,
    );
    link.with_acr(|acr| {
        acr.tx_request(&invite("sip:6505550001@homedomain", &odi_route), ts(1010))
    });

    // The AS proxies the request back; the top Route re-enters the
    // chain one position on.
    let returned = invite("sip:6505550001@homedomain", &odi_route);
    let route_value =
        returned.header("Route").expect("returned request lost its route");
    let token = extract_odi_token(route_value).expect("not an ODI route");
    let mut resumed = table.lookup(token).expect("token not found");
    assert_eq!(resumed.index(), 1);
    assert_eq!(resumed.on_initial_request(&returned), Disposition::Complete);

    // The AS answers 200 and the transaction finishes.
    link.on_response(200);
    let ok = SipMessage::parse(
        "SIP/2.0 200 OK\r\nCSeq: 1 INVITE\r\n\
         P-Charging-Vector: icid-value=1234bc9876e;orig-ioi=homedomain;term-ioi=homedomain\r\n\r\n",
    )
    .expect("failed to parse 200");
    link.with_acr(|acr| {
        acr.rx_response(&ok, ts(1040));
        acr.tx_response(&ok, ts(1050));
    });

    drop(resumed);
    drop(link);

    // Exactly one record, carrying the AS invocation, and no tokens left
    // behind.
    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record: Value = serde_json::from_str(&records[0]).expect("bad JSON");
    assert_eq!(record["event"], "INVITE");
    assert_eq!(record["record-type"], 2);
    let as_info = &record["service-information"]["ims-information"]
        ["application-servers-information"];
    assert_eq!(
        as_info[0]["application-server"],
        "sip:as1.homedomain:5060;transport=TCP"
    );
    assert_eq!(as_info[0]["status-as-code-ext"], 200);
    assert!(table.is_empty());
}

/// A terminating request whose Request-URI was rewritten by an AS no
/// longer matches the chain's served user; the proxy must restart
/// terminating processing for the new target.
#[test]
fn test_retarget_detection_on_terminating_chain() {
    let table = Arc::new(AsChainTable::new());
    let link = AsChainLink::create_as_chain(
        &table,
        SessionCase::Terminating,
        "sip:6505550001@homedomain".to_string(),
        true,
        0,
        Ifcs::empty(),
        None,
    );

    assert!(link.matches_target(&invite("sip:6505550001@homedomain;user=phone", "")));
    assert!(!link.matches_target(&invite("sip:6505559999@homedomain", "")));
}

/// A token from a foreign (already destroyed) chain must not resume
/// anything.
#[test]
fn test_stale_token_does_not_resume() {
    let table = Arc::new(AsChainTable::new());
    let ifcs = Ifcs::from_ims_subscription(IFC_XML).expect("bad profile");
    let link = AsChainLink::create_as_chain(
        &table,
        SessionCase::Originating,
        "sip:6505550000@homedomain".to_string(),
        true,
        0,
        ifcs,
        None,
    );
    let token = link.next_odi_token().expect("missing token").to_string();
    drop(link);

    assert!(table.lookup(&token).is_none());
    assert!(table.is_empty());
}
