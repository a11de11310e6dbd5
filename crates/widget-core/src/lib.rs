//! widget-core: modelo, errores y contrato del store de widgets.
//!
//! Un widget se muta agregando eventos versionados a un log append-only y,
//! en la misma unidad atómica, actualizando su vista materializada sólo si la
//! versión almacenada coincide con la que presenta el caller.
pub mod errors;
pub mod event;
pub mod model;
pub mod store;

pub use errors::StoreError;
pub use event::WidgetEvent;
pub use model::{fold_all, fold_value, ReplayError, Widget};
pub use store::{InMemoryWidgetStore, Verification, WidgetStore};
