//! widget-events
//!
//! Fachada del workspace:
//! - Reexporta el contrato (`widget_core`) y el backend Postgres
//!   (`widget_persistence`).
//! - Expone `contention`, el arnés de writers concurrentes usado por la demo
//!   y por los tests de integración.

pub mod contention;

pub use widget_core::{InMemoryWidgetStore, StoreError, Verification, Widget, WidgetEvent, WidgetStore};
pub use widget_persistence as persistence;
