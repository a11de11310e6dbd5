//! Errores de persistencia.
//! Mapea errores de Diesel / pool a variantes semánticas y luego a
//! `StoreError`, que es lo único que ve el caller del store.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use uuid::Uuid;
use widget_core::StoreError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("not found")]
    NotFound,
    /// La escritura condicional no afectó filas (versión obsoleta o widget
    /// inexistente). Provoca rollback de la transacción.
    #[error("conditional write affected no rows")]
    NoRowsAffected,
    #[error("serialization conflict")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl PersistenceError {
    /// Traduce a `StoreError` en el contexto de una escritura sobre `id` con
    /// versión presentada `expected`.
    ///
    /// Las violaciones de unicidad (vista o log) y las escrituras sin filas son
    /// conflictos; todo lo demás es un fallo de almacenamiento.
    pub fn into_write_error(self, id: Uuid, expected: u64) -> StoreError {
        match self {
            Self::UniqueViolation(_) | Self::NoRowsAffected => StoreError::Conflict { id, expected },
            other => StoreError::StorageFault(other.to_string()),
        }
    }

    /// Traduce a `StoreError` en el contexto de una lectura de `id`.
    pub fn into_read_error(self, id: Uuid) -> StoreError {
        match self {
            Self::NotFound => StoreError::NotFound(id),
            other => StoreError::StorageFault(other.to_string()),
        }
    }
}
