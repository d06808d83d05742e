// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

use crate::{
    hss::types::{RegistrationData, RequestType},
    utils::TrailId,
};

/// Failures of a subscriber-database exchange. Parse failures never leak
/// a panic or partial data; HTTP-level failures keep their status code so
/// callers can distinguish "no such subscriber" from server trouble.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HssError {
    #[error("Malformed HSS XML")]
    MalformedXml,
    #[error("HSS request failed with HTTP status {0}")]
    HttpStatus(u16),
    #[error("HSS transport failure: {0}")]
    Transport(String),
}

impl HssError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus(404))
    }
}

/// The two subscriber-database operations the signalling core consumes.
/// The HTTP transport behind them lives outside this crate; tests use an
/// in-memory fake.
pub trait HssConnection: Send + Sync {
    /// Fetches the registration data for a public identity without
    /// changing its state.
    fn get_registration_data(
        &self,
        public_id: &str,
        trail: TrailId,
    ) -> Result<RegistrationData, HssError>;

    /// Updates the registration state of a public identity and returns
    /// the resulting registration data.
    fn update_registration_state(
        &self,
        public_id: &str,
        private_id: &str,
        request_type: RequestType,
        trail: TrailId,
    ) -> Result<RegistrationData, HssError>;
}
