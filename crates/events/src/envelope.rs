use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reportflow_core::ExportJobId;

use crate::event::Event;

/// Envelope for an event, carrying delivery metadata.
///
/// `job_id` names the export job the payload is about so consumers can route
/// or deduplicate without decoding the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    job_id: ExportJobId,
    event_type: String,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(event_id: Uuid, job_id: ExportJobId, event_type: impl Into<String>, payload: E) -> Self {
        Self {
            event_id,
            job_id,
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn job_id(&self) -> ExportJobId {
        self.job_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, taking the type name from the event itself.
    pub fn wrap(job_id: ExportJobId, payload: E) -> Self {
        let event_type = payload.event_type();
        Self::new(Uuid::now_v7(), job_id, event_type, payload)
    }
}
