// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! P-Charging-Vector and P-Charging-Function-Addresses header values
//! (RFC 7315). Both are semicolon-separated parameter lists; unknown
//! parameters are ignored.

/// Parsed P-Charging-Vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargingVector {
    pub icid: Option<String>,
    pub icid_generated_at: Option<String>,
    pub orig_ioi: Option<String>,
    pub term_ioi: Option<String>,
}

impl ChargingVector {
    pub fn parse(value: &str) -> Self {
        let mut pcv = Self::default();
        for (name, val) in params(value) {
            match name {
                "icid-value" => pcv.icid = Some(val.to_string()),
                "icid-generated-at" => {
                    pcv.icid_generated_at = Some(val.to_string())
                },
                "orig-ioi" => pcv.orig_ioi = Some(val.to_string()),
                "term-ioi" => pcv.term_ioi = Some(val.to_string()),
                _ => {},
            }
        }
        pcv
    }
}

/// Parsed P-Charging-Function-Addresses: charging (ccf) and event-charging
/// (ecf) function addresses, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargingFunctionAddresses {
    pub ccf: Vec<String>,
    pub ecf: Vec<String>,
}

impl ChargingFunctionAddresses {
    pub fn parse(value: &str) -> Self {
        let mut pcfa = Self::default();
        for (name, val) in params(value) {
            match name {
                "ccf" => pcfa.ccf.push(val.to_string()),
                "ecf" => pcfa.ecf.push(val.to_string()),
                _ => {},
            }
        }
        pcfa
    }

    pub fn is_empty(&self) -> bool {
        self.ccf.is_empty() && self.ecf.is_empty()
    }
}

fn params(value: &str) -> impl Iterator<Item = (&str, &str)> {
    value.split(';').filter_map(|p| {
        let (name, val) = p.split_once('=')?;
        Some((name.trim(), val.trim().trim_matches('"')))
    })
}
