// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod connection;
pub mod types;
pub mod xml;

pub use connection::{HssConnection, HssError};
pub use types::{
    RegistrationData, RegistrationState, RequestType, ServerCapabilities,
};
