// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Original Dialog Identifier routing.
//!
//! When a request is forwarded to an application server the proxy appends
//! a Route header pointing back at itself, with the ODI token as the user
//! part. The returning request carries the same Route; stripping it and
//! looking the token up in the chain table recovers the exact chain
//! position to resume from.

/// User-part prefix marking an ODI Route header.
pub const ODI_PREFIX: &str = "odi_";

/// Builds the Route header value routing a request back to this node:
/// `<sip:odi_<token>@<host>:<port>;transport=TCP;lr>`.
pub fn build_odi_route(token: &str, host: &str, port: u16) -> String {
    format!("<sip:{ODI_PREFIX}{token}@{host}:{port};transport=TCP;lr>")
}

/// Extracts the ODI token from a Route header value, or None when the
/// route's user part is not an ODI token.
pub fn extract_odi_token(route_value: &str) -> Option<&str> {
    let uri = crate::sip::uri::addr_spec(route_value);
    let rest = uri.strip_prefix("sip:").or_else(|| uri.strip_prefix("sips:"))?;
    let user = &rest[..rest.find('@')?];
    user.strip_prefix(ODI_PREFIX)
}
