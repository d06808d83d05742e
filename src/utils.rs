// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use rand::RngExt;

/// Correlation id threaded through log lines so a single call flow can be
/// followed across components.
pub type TrailId = u64;

/// Number of random bytes behind one ODI token. 128 bits keeps the
/// per-token collision probability under 2^-96 for any realistic process
/// lifetime.
const TOKEN_BYTES: usize = 16;

/// Generates one opaque ODI token: `TOKEN_BYTES` bytes from the
/// thread-local CSPRNG, hex-encoded.
pub fn create_random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
