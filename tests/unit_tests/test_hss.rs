// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use cscf_core_rs::hss::{
    HssConnection, HssError, RegistrationData, RegistrationState, RequestType,
    xml::parse_reg_data,
};
use cscf_core_rs::utils::TrailId;

const REGISTERED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ClearwaterRegData>
  <RegistrationState>REGISTERED</RegistrationState>
  <IMSSubscription>
    <ServiceProfile>
      <PublicIdentity><Identity>sip:123@example.com</Identity></PublicIdentity>
      <PublicIdentity><Identity>sip:456@example.com</Identity></PublicIdentity>
      <InitialFilterCriteria>
        <TriggerPoint>
          <ConditionTypeCNF>0</ConditionTypeCNF>
          <SPT>
            <ConditionNegated>0</ConditionNegated>
            <Group>0</Group>
            <Method>INVITE</Method>
            <Extension></Extension>
          </SPT>
        </TriggerPoint>
        <ApplicationServer>
          <ServerName>mmtel.narcissi.example.com</ServerName>
          <DefaultHandling>0</DefaultHandling>
        </ApplicationServer>
      </InitialFilterCriteria>
    </ServiceProfile>
  </IMSSubscription>
</ClearwaterRegData>"#;

const NOT_REGISTERED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ClearwaterRegData>
  <RegistrationState>NOT_REGISTERED</RegistrationState>
</ClearwaterRegData>"#;

const UNREGISTERED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ClearwaterRegData>
  <RegistrationState>UNREGISTERED</RegistrationState>
  <IMSSubscription>
  </IMSSubscription>
</ClearwaterRegData>"#;

#[test]
fn test_registered_with_associated_uris() {
    let data = parse_reg_data(REGISTERED, 0).expect("failed parse");
    assert_eq!(data.regstate, RegistrationState::Registered);
    assert_eq!(
        data.associated_uris,
        vec!["sip:123@example.com", "sip:456@example.com"]
    );
    // Both identities share the profile's filter criteria.
    assert_eq!(data.ifcs_map.len(), 2);
    let ifcs = &data.ifcs_map["sip:123@example.com"];
    assert_eq!(ifcs.len(), 1);
}

#[test]
fn test_not_registered() {
    let data = parse_reg_data(NOT_REGISTERED, 0).expect("failed parse");
    assert_eq!(data.regstate, RegistrationState::NotRegistered);
    assert!(data.associated_uris.is_empty());
    assert!(data.ifcs_map.is_empty());
}

#[test]
fn test_unregistered_with_empty_subscription() {
    let data = parse_reg_data(UNREGISTERED, 0).expect("failed parse");
    assert_eq!(data.regstate, RegistrationState::Unregistered);
    assert!(data.ifcs_map.is_empty());
}

#[test]
fn test_truncated_document_is_malformed() {
    let result = parse_reg_data(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Grou",
        0,
    );
    assert_eq!(result.unwrap_err(), HssError::MalformedXml);
}

#[test]
fn test_unknown_child_is_malformed() {
    let xml = r#"<?xml version="1.0"?>
<ClearwaterRegData>
  <RegistrationState>REGISTERED</RegistrationState>
  <NonsenseWord>
    <ServiceProfile>
      <PublicIdentity><Identity>sip:123@example.com</Identity></PublicIdentity>
    </ServiceProfile>
  </NonsenseWord>
</ClearwaterRegData>"#;
    assert_eq!(parse_reg_data(xml, 0).unwrap_err(), HssError::MalformedXml);
}

#[test]
fn test_missing_registration_state_is_malformed() {
    let xml = r#"<?xml version="1.0"?>
<ClearwaterRegData>
  <IMSSubscription></IMSSubscription>
</ClearwaterRegData>"#;
    assert_eq!(parse_reg_data(xml, 0).unwrap_err(), HssError::MalformedXml);
}

#[test]
fn test_missing_root_is_malformed() {
    let xml = r#"<?xml version="1.0"?>
<C>
  <RegistrationState>NOT_REGISTERED</RegistrationState>
  <IMSSubscription></IMSSubscription>
</C>"#;
    assert_eq!(parse_reg_data(xml, 0).unwrap_err(), HssError::MalformedXml);
}

#[test]
fn test_unexpected_state_text_is_malformed() {
    let xml = r#"<?xml version="1.0"?>
<ClearwaterRegData>
  <RegistrationState>SORT_OF_REGISTERED</RegistrationState>
</ClearwaterRegData>"#;
    assert_eq!(parse_reg_data(xml, 0).unwrap_err(), HssError::MalformedXml);
}

/// In-memory stand-in for the subscriber database client, good enough to
/// exercise the connection trait's contract.
struct FakeHss {
    responses: HashMap<String, String>,
}

impl FakeHss {
    fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert("pubid42/".to_string(), REGISTERED.to_string());
        responses.insert("pubid42/reg".to_string(), REGISTERED.to_string());
        responses.insert("pubid50/call".to_string(), UNREGISTERED.to_string());
        responses
            .insert("pubid50/dereg-admin".to_string(), NOT_REGISTERED.to_string());
        Self { responses }
    }

    fn respond(
        &self,
        key: String,
        trail: TrailId,
    ) -> Result<RegistrationData, HssError> {
        match self.responses.get(&key) {
            Some(xml) => parse_reg_data(xml, trail),
            None => Err(HssError::HttpStatus(404)),
        }
    }
}

impl HssConnection for FakeHss {
    fn get_registration_data(
        &self,
        public_id: &str,
        trail: TrailId,
    ) -> Result<RegistrationData, HssError> {
        self.respond(format!("{public_id}/"), trail)
    }

    fn update_registration_state(
        &self,
        public_id: &str,
        _private_id: &str,
        request_type: RequestType,
        trail: TrailId,
    ) -> Result<RegistrationData, HssError> {
        self.respond(
            format!("{public_id}/{}", request_type.as_reqtype()),
            trail,
        )
    }
}

#[test]
fn test_connection_get_and_update() {
    let hss = FakeHss::new();

    let data = hss
        .get_registration_data("pubid42", 0)
        .expect("failed get");
    assert_eq!(data.regstate, RegistrationState::Registered);

    let data = hss
        .update_registration_state("pubid50", "", RequestType::Call, 0)
        .expect("failed update");
    assert_eq!(data.regstate, RegistrationState::Unregistered);

    let data = hss
        .update_registration_state("pubid50", "", RequestType::DeregAdmin, 0)
        .expect("failed update");
    assert_eq!(data.regstate, RegistrationState::NotRegistered);
}

#[test]
fn test_unknown_subscriber_is_typed_404() {
    let hss = FakeHss::new();
    let err = hss
        .get_registration_data("pubid44", 0)
        .expect_err("expected failure");
    assert!(err.is_not_found());
    assert_eq!(err, HssError::HttpStatus(404));
}
