// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Delivery of finished accounting records.
//!
//! The core never performs I/O: `send` hands the serialised record over
//! and returns. The production wiring pushes records onto an unbounded
//! channel drained by whatever task talks to the billing service.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::utils::TrailId;

/// One-way, non-blocking record delivery.
pub trait RfSink: Send + Sync {
    fn send(&self, trail: TrailId, record: String);
}

/// Sink feeding a tokio channel.
pub struct ChannelSink {
    tx: UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl RfSink for ChannelSink {
    fn send(&self, trail: TrailId, record: String) {
        if self.tx.send(record).is_err() {
            warn!(trail, "billing sink closed, dropping accounting record");
        }
    }
}

/// Sink collecting records in memory; used by tests and the demo driver.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl RfSink for MemorySink {
    fn send(&self, _trail: TrailId, record: String) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
