//! Evento inmutable del log de un widget.
//!
//! Rol en el protocolo:
//! - Cada escritura aceptada (create o update) agrega exactamente un evento.
//! - `version` es la versión *posterior* a la mutación: el primer evento de un
//!   widget lleva versión 1.
//! - `value` es el delta crudo enviado por el caller, nunca el valor acumulado
//!   (el acumulado vive en la vista).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetEvent {
    pub widget_id: Uuid,
    pub version: u64,
    pub value: String,
    pub recorded_at: DateTime<Utc>, // metadato, no participa del fold
}

impl WidgetEvent {
    pub fn new(widget_id: Uuid, version: u64, value: impl Into<String>) -> Self {
        Self { widget_id,
               version,
               value: value.into(),
               recorded_at: Utc::now() }
    }
}
