//! Modelo de dominio: `Widget` (vista materializada) y la función de fold.
//!
//! El fold de este dominio es concatenación: aplicar un evento a un estado
//! previo agrega el delta al final del valor acumulado. El backend Postgres
//! ejecuta el mismo fold en SQL (`value || $delta`), por lo que cualquier
//! cambio aquí debe reflejarse en la sentencia de update.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::event::WidgetEvent;

/// Estado materializado de un widget.
///
/// Invariante: `version == 0` sólo para widgets aún no persistidos; todo
/// widget leído del store tiene `version >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub version: u64,
    pub value: String,
}

impl Widget {
    /// Widget nuevo (no persistido) con versión 0.
    pub fn new(id: Uuid, value: impl Into<String>) -> Self {
        Self { id,
               version: 0,
               value: value.into() }
    }

    /// Copia del widget con otro valor, conservando id y versión leída.
    /// Es la forma natural de preparar un `update` a partir de un `find`.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self { id: self.id,
               version: self.version,
               value: value.into() }
    }

    /// Aplica un evento sobre el estado actual (versión y fold del valor).
    pub fn apply(&mut self, event: &WidgetEvent) {
        self.version = event.version;
        self.value = fold_value(&self.value, &event.value);
    }

    /// Reconstruye un widget desde su log de eventos.
    ///
    /// Devuelve `Ok(None)` si no hay eventos. Exige versiones contiguas
    /// empezando en 1 y que todos los eventos pertenezcan a `id`.
    pub fn replay(id: Uuid, events: &[WidgetEvent]) -> Result<Option<Widget>, ReplayError> {
        let mut state: Option<Widget> = None;
        for (expected, ev) in (1u64..).zip(events.iter()) {
            if ev.widget_id != id {
                return Err(ReplayError::ForeignEvent { expected: id,
                                                       found: ev.widget_id });
            }
            if ev.version != expected {
                return Err(ReplayError::VersionGap { expected, found: ev.version });
            }
            state.get_or_insert_with(|| Widget::new(id, "")).apply(ev);
        }
        Ok(state)
    }
}

/// Fold del dominio: concatena el delta al valor acumulado.
pub fn fold_value(acc: &str, delta: &str) -> String {
    let mut out = String::with_capacity(acc.len() + delta.len());
    out.push_str(acc);
    out.push_str(delta);
    out
}

/// Fold de una secuencia de deltas crudos en orden.
pub fn fold_all<'a, I>(deltas: I) -> String
    where I: IntoIterator<Item = &'a str>
{
    deltas.into_iter().fold(String::new(), |acc, d| fold_value(&acc, d))
}

/// Defectos detectables al reconstruir un widget desde el log.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum ReplayError {
    #[error("version gap: expected {expected}, found {found}")]
    VersionGap { expected: u64, found: u64 },
    #[error("event of widget {found} in stream of {expected}")]
    ForeignEvent { expected: Uuid, found: Uuid },
}
