//! Errores observables del store de widgets.
//!
//! Taxonomía:
//! - `Conflict`: la escritura condicional no afectó filas (create sobre un
//!   widget existente o update con versión obsoleta). Recuperable: el caller
//!   relee y decide si reintentar. El store nunca reintenta solo.
//! - `NotFound`: lectura de un widget inexistente.
//! - `StorageFault`: cualquier otro fallo del backend. La transacción ya fue
//!   revertida cuando el error llega al caller.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("conflict on widget {id}: expected version {expected}")]
    Conflict { id: Uuid, expected: u64 },
    #[error("widget {0} not found")]
    NotFound(Uuid),
    #[error("storage fault: {0}")]
    StorageFault(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Fallo no recuperable para la operación en curso (no así para el store).
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::StorageFault(_))
    }
}
