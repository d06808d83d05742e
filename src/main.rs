// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use cscf_core_rs::{
    acr::{Acr, AcrFactory, ChannelSink, Initiator, NodeRole},
    aschain::{AsChainLink, AsChainTable, Disposition},
    cfg::{
        cli::{config_path_from_args, resolve_config_path},
        config::Config,
        logger::init_logger,
    },
    ifc::{criteria::Ifcs, session_case::SessionCase},
    sip::{message::SipMessage, odi::build_odi_route},
};
use tokio::time::sleep;
use tracing::info;

/// Canned subscriber profile: one filter criterion invoking an external
/// AS for every INVITE.
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

const INVITE: &str = "INVITE sip:6505550001@homedomain SIP/2.0\r\n\
    Via: SIP/2.0/TCP 10.83.18.38:36530;rport\r\n\
    Max-Forwards: 68\r\n\
    To: \"6505550001\" <sip:6505550001@homedomain>\r\n\
    From: \"6505550000\" <sip:6505550000@homedomain>;tag=12345678\r\n\
    Call-ID: 0123456789abcdef-10.83.18.38\r\n\
    CSeq: 1 INVITE\r\n\
    P-Asserted-Identity: \"6505550000\" <sip:6505550000@homedomain>\r\n\
    P-Charging-Vector: icid-value=1234bc9876e;orig-ioi=homedomain\r\n\
    Content-Length: 0\r\n\r\n";

/// Walks one canned originating INVITE through an AS chain and prints the
/// accounting record the chain emits on teardown.
#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logger("config/logger.yaml")?;

    let cfg = resolve_config_path(&config_path_from_args())
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let factory = if cfg.billing.enabled {
        AcrFactory::new(cfg.node.functionality, Arc::new(ChannelSink::new(tx)))
    } else {
        drop(tx);
        AcrFactory::disabled(cfg.node.functionality)
    };
    let drain = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            println!("{record}");
        }
    });

    let table = Arc::new(AsChainTable::new());
    let trail = 1u64;

    let invite = SipMessage::parse(INVITE).context("bad canned INVITE")?;
    let mut acr =
        factory.get_acr(trail, Initiator::CallingParty, NodeRole::Originating);
    acr.rx_request(&invite, Utc::now());

    let ifcs = Ifcs::from_ims_subscription(IFC_XML)
        .context("bad canned subscriber profile")?;
    let mut link = AsChainLink::create_as_chain(
        &table,
        SessionCase::Originating,
        "sip:6505550000@homedomain".to_string(),
        true,
        trail,
        ifcs,
        Some(acr),
    );

    match link.on_initial_request(&invite) {
        Disposition::Skip(server) => {
            let token =
                link.next_odi_token().context("chain lost its tokens")?;
            let route =
                build_odi_route(token, &cfg.node.local_host, cfg.node.port);
            info!(server, route, "forwarding INVITE toward AS");
        },
        other => anyhow::bail!("expected AS invocation, got {other:?}"),
    }

    // The AS sends the request straight back; the ODI route re-enters the
    // chain one position further on.
    let token = link
        .next_odi_token()
        .context("chain lost its tokens")?
        .to_string();
    let mut resumed = table.lookup(&token).context("ODI token vanished")?;
    let disposition = resumed.on_initial_request(&invite);
    info!(
        complete = matches!(disposition, Disposition::Complete),
        "chain walk finished"
    );

    // AS answers 200; the transaction completes.
    link.on_response(200);
    let ok = SipMessage::parse("SIP/2.0 200 OK\r\nCSeq: 1 INVITE\r\n\r\n")
        .context("bad canned response")?;
    link.with_acr(|acr| {
        acr.rx_response(&ok, Utc::now());
        acr.tx_response(&ok, Utc::now());
    });

    // Last links released: the chain tears down and emits its record.
    drop(resumed);
    drop(link);
    drop(factory);

    sleep(Duration::from_millis(50)).await;
    drain.await.context("record drain task failed")?;
    Ok(())
}
