// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use crate::{
    acr::{
        Acr, Initiator, NodeFunctionality, NodeRole, NullAcr, ralf::RalfAcr,
        sink::RfSink,
    },
    utils::TrailId,
};

/// Produces ACRs bound to this node's functionality. With no sink
/// configured every ACR is the null object, so transaction handlers can
/// feed their ACR unconditionally.
pub struct AcrFactory {
    node_functionality: NodeFunctionality,
    sink: Option<Arc<dyn RfSink>>,
}

impl AcrFactory {
    pub fn new(
        node_functionality: NodeFunctionality,
        sink: Arc<dyn RfSink>,
    ) -> Self {
        Self { node_functionality, sink: Some(sink) }
    }

    /// Factory for a deployment without Rf billing.
    pub fn disabled(node_functionality: NodeFunctionality) -> Self {
        Self { node_functionality, sink: None }
    }

    pub fn get_acr(
        &self,
        trail: TrailId,
        initiator: Initiator,
        role: NodeRole,
    ) -> Box<dyn Acr> {
        match &self.sink {
            Some(sink) => Box::new(RalfAcr::new(
                trail,
                self.node_functionality,
                role,
                initiator,
                sink.clone(),
            )),
            None => Box::new(NullAcr),
        }
    }
}
