//! Trait `WidgetStore` y verificación vista ↔ log.

mod memory;

pub use memory::InMemoryWidgetStore;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::event::WidgetEvent;
use crate::model::{fold_all, ReplayError, Widget};

/// Almacenamiento de widgets: log de eventos append-only + vista actual.
///
/// Contrato común a todos los backends:
/// - `create` y `update` escriben vista y evento como una unidad atómica.
/// - `update` es un compare-and-swap sobre `(id, version)`: sólo una escritura
///   concurrente por versión puede tener éxito; el resto recibe `Conflict`.
/// - Ningún método reintenta por su cuenta.
///
/// Los métodos toman `&self`: el store se comparte entre hilos y la
/// coordinación queda a cargo del backend.
pub trait WidgetStore: Send + Sync {
    /// Persiste un widget nuevo con versión 1. Ignora `widget.version`.
    fn create(&self, widget: &Widget) -> Result<Widget, StoreError>;

    /// Aplica `widget.value` como delta si la versión almacenada es
    /// `widget.version`. Devuelve el estado resultante.
    fn update(&self, widget: &Widget) -> Result<Widget, StoreError>;

    /// Lee la vista materializada.
    fn find(&self, id: Uuid) -> Result<Widget, StoreError>;

    /// Lista eventos de un widget (orden ascendente por versión). Vacío si el
    /// widget no existe.
    fn events(&self, id: Uuid) -> Result<Vec<WidgetEvent>, StoreError>;

    /// Fold de los deltas del log, independiente de la vista.
    fn event_values(&self, id: Uuid) -> Result<String, StoreError> {
        let events = self.events(id)?;
        if events.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(fold_all(events.iter().map(|e| e.value.as_str())))
    }

    /// Compara la vista con la reconstrucción desde el log.
    ///
    /// La implementación por defecto hace dos lecturas separadas; un backend
    /// con escrituras concurrentes debe sobrescribirla para leer vista y log
    /// desde un mismo snapshot.
    fn verify(&self, id: Uuid) -> Result<Verification, StoreError> {
        let view = self.find(id)?;
        let events = self.events(id)?;
        Ok(Verification::compare(view, &events))
    }
}

/// Resultado de `WidgetStore::verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub view: Widget,
    pub replayed: Option<Widget>,
    pub event_count: usize,
    pub log_defect: Option<ReplayError>,
}

impl Verification {
    /// Reconstruye el widget desde `events` y lo contrasta con `view`. Ambos
    /// deben provenir del mismo snapshot.
    pub fn compare(view: Widget, events: &[WidgetEvent]) -> Self {
        match Widget::replay(view.id, events) {
            Ok(replayed) => Verification { view,
                                           replayed,
                                           event_count: events.len(),
                                           log_defect: None },
            Err(defect) => Verification { view,
                                          replayed: None,
                                          event_count: events.len(),
                                          log_defect: Some(defect) },
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.log_defect.is_none() && self.replayed.as_ref() == Some(&self.view)
    }
}
