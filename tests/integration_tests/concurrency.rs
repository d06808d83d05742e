// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Races between ODI re-entry and chain release. A chain must tear down
//! exactly once, emit exactly one record, and leave no tokens behind, no
//! matter how lookups and releases interleave across threads.

use std::{sync::Arc, thread};

use chrono::DateTime;
use cscf_core_rs::{
    acr::{Acr, AcrFactory, Initiator, MemorySink, NodeFunctionality, NodeRole},
    aschain::{AsChainLink, AsChainTable},
    ifc::{criteria::Ifcs, session_case::SessionCase},
    sip::message::SipMessage,
};

const ROUNDS: usize = 200;

fn two_as_profile() -> Ifcs {
    Ifcs::from_ims_subscription(
        r#"<?xml version="1.0"?><IMSSubscription><ServiceProfile>
           <PublicIdentity><Identity>sip:6505550000@homedomain</Identity></PublicIdentity>
           <InitialFilterCriteria><Priority>1</Priority>
             <ApplicationServer><ServerName>sip:as1.homedomain</ServerName><DefaultHandling>0</DefaultHandling></ApplicationServer>
           </InitialFilterCriteria>
           <InitialFilterCriteria><Priority>2</Priority>
             <ApplicationServer><ServerName>sip:as2.homedomain</ServerName><DefaultHandling>0</DefaultHandling></ApplicationServer>
           </InitialFilterCriteria>
         </ServiceProfile></IMSSubscription>"#,
    )
    .expect("bad profile")
}

fn billed_acr(factory: &AcrFactory) -> Box<dyn Acr> {
    let msg = SipMessage::parse(
        "INVITE sip:6505550001@homedomain SIP/2.0\r\n\
         From: <sip:6505550000@homedomain>;tag=1\r\n\
         To: <sip:6505550001@homedomain>\r\n\
         Call-ID: race-test\r\n\
         CSeq: 1 INVITE\r\n\r\n",
    )
    .expect("failed parse");
    let mut acr =
        factory.get_acr(0, Initiator::CallingParty, NodeRole::Originating);
    acr.rx_request(
        &msg,
        DateTime::from_timestamp_millis(1000).expect("bad ts"),
    );
    acr
}

/// Two links on different threads release simultaneously.
#[test]
fn test_concurrent_release_destroys_chain_once() {
    for _ in 0..ROUNDS {
        let table = Arc::new(AsChainTable::new());
        let sink = Arc::new(MemorySink::new());
        let factory =
            AcrFactory::new(NodeFunctionality::Scscf, sink.clone());

        let link0 = AsChainLink::create_as_chain(
            &table,
            SessionCase::Originating,
            "sip:6505550000@homedomain".to_string(),
            true,
            0,
            two_as_profile(),
            Some(billed_acr(&factory)),
        );

        // Resume at the last position the way a returning request would.
        let last_token = link0
            .next()
            .next()
            .next_odi_token()
            .expect("missing token")
            .to_string();
        let link2 = table.lookup(&last_token).expect("lookup failed");

        let t1 = thread::spawn(move || drop(link0));
        let t2 = thread::spawn(move || drop(link2));
        t1.join().expect("releasing thread panicked");
        t2.join().expect("releasing thread panicked");

        assert!(table.is_empty(), "tokens left after destruction");
        assert_eq!(sink.records().len(), 1, "chain must bill exactly once");
    }
}

/// A lookup racing the final release either acquires the chain or misses
/// it; it never resurrects a dying chain or double-bills.
#[test]
fn test_lookup_races_final_release() {
    for _ in 0..ROUNDS {
        let table = Arc::new(AsChainTable::new());
        let sink = Arc::new(MemorySink::new());
        let factory =
            AcrFactory::new(NodeFunctionality::Scscf, sink.clone());

        let link0 = AsChainLink::create_as_chain(
            &table,
            SessionCase::Originating,
            "sip:6505550000@homedomain".to_string(),
            true,
            0,
            two_as_profile(),
            Some(billed_acr(&factory)),
        );
        let token = link0
            .next_odi_token()
            .expect("missing token")
            .to_string();

        let table_for_lookup = table.clone();
        let t1 = thread::spawn(move || drop(link0));
        let t2 = thread::spawn(move || {
            if let Some(link) = table_for_lookup.lookup(&token) {
                drop(link);
            }
        });
        t1.join().expect("releasing thread panicked");
        t2.join().expect("looking-up thread panicked");

        assert!(table.is_empty(), "tokens left after destruction");
        assert_eq!(sink.records().len(), 1, "chain must bill exactly once");
    }
}

/// Each token of a live chain resolves to its own position; none survive
/// the chain.
#[test]
fn test_every_position_has_one_token() {
    let table = Arc::new(AsChainTable::new());
    let link0 = AsChainLink::create_as_chain(
        &table,
        SessionCase::Originating,
        "sip:6505550000@homedomain".to_string(),
        true,
        0,
        two_as_profile(),
        None,
    );

    // One token per slot, including the trailing one.
    assert_eq!(table.len(), 3);

    let token1 =
        link0.next_odi_token().expect("missing token").to_string();
    let token2 = link0
        .next()
        .next_odi_token()
        .expect("missing token")
        .to_string();
    assert_ne!(token1, token2);

    assert_eq!(table.lookup(&token1).expect("lookup failed").index(), 1);
    assert_eq!(table.lookup(&token2).expect("lookup failed").index(), 2);

    drop(link0);
    assert!(table.lookup(&token1).is_none());
    assert!(table.is_empty());
}
