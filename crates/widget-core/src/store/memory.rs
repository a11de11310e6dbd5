use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use uuid::Uuid;

use super::{Verification, WidgetStore};
use crate::errors::StoreError;
use crate::event::WidgetEvent;
use crate::model::{fold_all, fold_value, Widget};

/// Vista + log de un widget. Ambos viven bajo la misma entrada del mapa, de
/// modo que el guard de escritura de la entrada cubre la pareja completa.
#[derive(Debug, Clone)]
struct WidgetStream {
    view: Widget,
    events: Vec<WidgetEvent>,
}

/// Backend en memoria con la misma semántica observable que el backend
/// Postgres. Útil para tests y para correr la demo sin base de datos.
///
/// El lock por entrada de `DashMap` cumple el rol del lock de fila de la base:
/// comparar versión, actualizar vista y agregar evento ocurren sin que otro
/// writer pueda intercalarse.
#[derive(Debug, Default)]
pub struct InMemoryWidgetStore {
    streams: DashMap<Uuid, WidgetStream>,
}

impl InMemoryWidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cantidad de widgets almacenados.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl WidgetStore for InMemoryWidgetStore {
    fn create(&self, widget: &Widget) -> Result<Widget, StoreError> {
        debug!("create:start widget_id={}", widget.id);
        match self.streams.entry(widget.id) {
            Entry::Occupied(_) => {
                warn!("create:conflict widget_id={} (already exists)", widget.id);
                Err(StoreError::Conflict { id: widget.id, expected: 0 })
            }
            Entry::Vacant(slot) => {
                let view = Widget { id: widget.id,
                                    version: 1,
                                    value: widget.value.clone() };
                let event = WidgetEvent::new(widget.id, 1, widget.value.clone());
                slot.insert(WidgetStream { view: view.clone(),
                                           events: vec![event] });
                debug!("create:done widget_id={} version=1", widget.id);
                Ok(view)
            }
        }
    }

    fn update(&self, widget: &Widget) -> Result<Widget, StoreError> {
        debug!("update:start widget_id={} version={}", widget.id, widget.version);
        let conflict = StoreError::Conflict { id: widget.id,
                                              expected: widget.version };
        let Some(mut stream) = self.streams.get_mut(&widget.id) else {
            warn!("update:conflict widget_id={} (missing)", widget.id);
            return Err(conflict);
        };
        if stream.view.version != widget.version {
            warn!("update:conflict widget_id={} presented={} stored={}",
                  widget.id,
                  widget.version,
                  stream.view.version);
            return Err(conflict);
        }
        let next = widget.version + 1;
        let folded = fold_value(&stream.view.value, &widget.value);
        stream.view.value = folded;
        stream.view.version = next;
        stream.events.push(WidgetEvent::new(widget.id, next, widget.value.clone()));
        debug!("update:done widget_id={} version={next}", widget.id);
        Ok(stream.view.clone())
    }

    fn find(&self, id: Uuid) -> Result<Widget, StoreError> {
        debug!("find:start widget_id={id}");
        let view = self.streams
                       .get(&id)
                       .map(|s| s.view.clone())
                       .ok_or(StoreError::NotFound(id))?;
        debug!("find:done widget_id={id} version={}", view.version);
        Ok(view)
    }

    fn events(&self, id: Uuid) -> Result<Vec<WidgetEvent>, StoreError> {
        debug!("events:start widget_id={id}");
        let events = self.streams.get(&id).map(|s| s.events.clone()).unwrap_or_default();
        debug!("events:done widget_id={id} count={}", events.len());
        Ok(events)
    }

    fn event_values(&self, id: Uuid) -> Result<String, StoreError> {
        debug!("event_values:start widget_id={id}");
        let stream = self.streams.get(&id).ok_or(StoreError::NotFound(id))?;
        if stream.events.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        let folded = fold_all(stream.events.iter().map(|e| e.value.as_str()));
        debug!("event_values:done widget_id={id} events={}", stream.events.len());
        Ok(folded)
    }

    // Vista y log se copian bajo el mismo guard de lectura.
    fn verify(&self, id: Uuid) -> Result<Verification, StoreError> {
        debug!("verify:start widget_id={id}");
        let (view, events) = {
            let stream = self.streams.get(&id).ok_or(StoreError::NotFound(id))?;
            (stream.view.clone(), stream.events.clone())
        };
        let verification = Verification::compare(view, &events);
        debug!("verify:done widget_id={id} consistent={}", verification.is_consistent());
        Ok(verification)
    }
}
