// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parser for the reg-data XML returned by the subscriber database.
//!
//! Normative shape: a `ClearwaterRegData` root holding a
//! `RegistrationState` and optionally an `IMSSubscription` with one or
//! more `ServiceProfile` children. Anything else under the root is a
//! malformed document: the caller gets an error and an empty result,
//! never a partial one.

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::{
    hss::{
        connection::HssError,
        types::{RegistrationData, RegistrationState},
    },
    ifc::criteria::Ifcs,
    utils::TrailId,
};

/// Parses a ClearwaterRegData document.
pub fn parse_reg_data(xml: &str, trail: TrailId) -> Result<RegistrationData, HssError> {
    let doc = Document::parse(xml).map_err(|e| {
        warn!(trail, error = %e, "Malformed HSS XML: unparseable document");
        HssError::MalformedXml
    })?;

    let root = doc.root_element();
    if !root.has_tag_name("ClearwaterRegData") {
        warn!(trail, "Malformed HSS XML: no ClearwaterRegData element");
        return Err(HssError::MalformedXml);
    }

    let mut regstate = None;
    let mut subscription = None;
    for child in root.children().filter(Node::is_element) {
        if child.has_tag_name("RegistrationState") {
            regstate = child.text().map(str::trim);
        } else if child.has_tag_name("IMSSubscription") {
            subscription = Some(child);
        } else {
            warn!(
                trail,
                element = child.tag_name().name(),
                "Malformed HSS XML: unexpected element"
            );
            return Err(HssError::MalformedXml);
        }
    }

    let regstate = regstate
        .and_then(RegistrationState::from_xml_text)
        .ok_or_else(|| {
            warn!(trail, "Malformed HSS XML: no valid RegistrationState");
            HssError::MalformedXml
        })?;

    let mut data = RegistrationData {
        regstate,
        ifcs_map: Default::default(),
        associated_uris: Vec::new(),
    };

    if let Some(subscription) = subscription {
        for profile in subscription
            .children()
            .filter(|c| c.has_tag_name("ServiceProfile"))
        {
            let ifcs = Ifcs::from_service_profile(profile).map_err(|e| {
                warn!(trail, error = %e, "Malformed HSS XML: bad service profile");
                HssError::MalformedXml
            })?;

            for identity in profile
                .children()
                .filter(|c| c.has_tag_name("PublicIdentity"))
                .filter_map(|p| {
                    p.children()
                        .find(|c| c.has_tag_name("Identity"))
                        .and_then(|c| c.text())
                })
            {
                let identity = identity.trim().to_string();
                data.associated_uris.push(identity.clone());
                data.ifcs_map.insert(identity, ifcs.clone());
            }
        }
    }

    debug!(
        trail,
        regstate = %data.regstate,
        uris = data.associated_uris.len(),
        "parsed registration data"
    );
    Ok(data)
}
