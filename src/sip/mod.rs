// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod charging;
pub mod message;
pub mod odi;
pub mod uri;
