//! Implementación Postgres (Diesel) de `WidgetStore`.
//!
//! Objetivo general del módulo:
//! - Proveer el backend durable del store con paridad 1:1 respecto al backend
//!   en memoria de `widget-core`.
//! - Encapsular el protocolo de escritura: update condicional de la vista +
//!   insert del evento dentro de una única transacción.
//! - Aislar el mapeo dominio ↔ filas de DB del crate core.
//!
//! Protocolo:
//! - `create`: INSERT en `views` (versión 1) + INSERT en `events` (versión 1).
//!   Los índices únicos `views(widget_id)` y `events(widget_id, version)`
//!   detectan la colisión.
//! - `update`: un solo `UPDATE views ... WHERE widget_id = $id AND version =
//!   $v` que incrementa versión y concatena el delta. Si no afecta filas la
//!   transacción se revierte antes de tocar `events`.
//! - Sin reintentos: los conflictos y fallos se devuelven al caller.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, error, warn};
use uuid::Uuid;
use widget_core::{fold_all, StoreError, Verification, Widget, WidgetEvent, WidgetStore};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{events, views};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo con `build_pool` se corren las migraciones pendientes (una
/// sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o un
/// proveedor alternativo sin acoplar el store a r2d2.
///
/// Contrato:
/// - Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}
impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila para insertar en `views`.
#[derive(Insertable, Debug)]
#[diesel(table_name = views)]
pub struct NewViewRow<'a> {
    pub widget_id: &'a Uuid,
    pub version: i64,
    pub value: &'a str,
}

/// Fila para insertar en `events`. `recorded_at` lo asigna la base (DEFAULT
/// now()).
#[derive(Insertable, Debug)]
#[diesel(table_name = events)]
pub struct NewEventRow<'a> {
    pub widget_id: &'a Uuid,
    pub version: i64,
    pub value: &'a str,
}

/// Fila mapeada de la tabla `events` para lecturas.
///
/// Campos:
/// - `id`: SERIAL global a la tabla (no participa del protocolo).
/// - `version`: versión posterior a la mutación, única por `widget_id`.
/// - `value`: delta crudo.
#[derive(Queryable, Debug)]
pub struct EventRow {
    pub id: i32,
    pub widget_id: Uuid,
    pub version: i64,
    pub value: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<EventRow> for WidgetEvent {
    fn from(row: EventRow) -> Self {
        WidgetEvent { widget_id: row.widget_id,
                      version: row.version as u64, // CHECK (version >= 1)
                      value: row.value,
                      recorded_at: row.recorded_at }
    }
}

/// Store Postgres de widgets.
///
/// Los métodos `*_tx`/`load_*` trabajan con `PersistenceError`; la
/// implementación de `WidgetStore` los traduce a `StoreError` y registra el
/// resultado.
pub struct PgWidgetStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgWidgetStore<P> {
    /// Crea un `PgWidgetStore` a partir de un `ConnectionProvider`
    /// (generalmente `PoolProvider`).
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Transacción de alta: vista y evento con versión 1.
    fn create_tx(&self, widget: &Widget) -> Result<(), PersistenceError> {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx| {
                diesel::insert_into(views::table)
                    .values(NewViewRow { widget_id: &widget.id,
                                         version: 1,
                                         value: &widget.value })
                    .execute(tx)?;
                diesel::insert_into(events::table)
                    .values(NewEventRow { widget_id: &widget.id,
                                          version: 1,
                                          value: &widget.value })
                    .execute(tx)?;
                Ok::<(), PersistenceError>(())
            })
    }

    /// Transacción de update. Devuelve (versión, valor) resultantes.
    fn update_tx(&self, widget: &Widget, expected: i64) -> Result<(i64, String), PersistenceError> {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx| {
                // Paso 1: compare-and-swap sobre la vista. Chequeo, incremento y fold
                // ocurren en la misma sentencia.
                let updated: Option<(i64, String)> =
                    diesel::update(views::table.filter(views::widget_id.eq(widget.id))
                                               .filter(views::version.eq(expected)))
                        .set((views::version.eq(views::version + 1i64),
                              views::value.eq(views::value.concat(widget.value.as_str()))))
                        .returning((views::version, views::value))
                        .get_result(tx)
                        .optional()?;
                let Some((version, value)) = updated else {
                    return Err(PersistenceError::NoRowsAffected);
                };

                // Paso 2: agregar el delta crudo al log con la nueva versión.
                diesel::insert_into(events::table)
                    .values(NewEventRow { widget_id: &widget.id,
                                          version,
                                          value: &widget.value })
                    .execute(tx)?;
                Ok((version, value))
            })
    }

    fn load_view(&self, id: Uuid) -> Result<(i64, String), PersistenceError> {
        let mut conn = self.provider.connection()?;
        let row = views::table.filter(views::widget_id.eq(id))
                              .select((views::version, views::value))
                              .first::<(i64, String)>(&mut conn)?;
        Ok(row)
    }

    fn load_events(&self, id: Uuid) -> Result<Vec<EventRow>, PersistenceError> {
        let mut conn = self.provider.connection()?;
        let rows = events::table.filter(events::widget_id.eq(id))
                                .order(events::version.asc())
                                .load::<EventRow>(&mut conn)?;
        Ok(rows)
    }

    /// Vista y log leídos en una misma transacción REPEATABLE READ, de modo
    /// que ambos reflejan el mismo snapshot aunque haya writers concurrentes.
    fn load_snapshot(&self, id: Uuid) -> Result<((i64, String), Vec<EventRow>), PersistenceError> {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .repeatable_read()
            .read_only()
            .run(|tx| {
                let view = views::table.filter(views::widget_id.eq(id))
                                       .select((views::version, views::value))
                                       .first::<(i64, String)>(tx)?;
                let rows = events::table.filter(events::widget_id.eq(id))
                                        .order(events::version.asc())
                                        .load::<EventRow>(tx)?;
                Ok::<_, PersistenceError>((view, rows))
            })
    }

    fn load_event_values(&self, id: Uuid) -> Result<Vec<String>, PersistenceError> {
        let mut conn = self.provider.connection()?;
        let values = events::table.filter(events::widget_id.eq(id))
                                  .order(events::version.asc())
                                  .select(events::value)
                                  .load::<String>(&mut conn)?;
        Ok(values)
    }

    /// Traduce y registra el fallo de una escritura.
    fn write_failure(&self, op: &str, id: Uuid, expected: u64, err: PersistenceError) -> StoreError {
        let mapped = err.into_write_error(id, expected);
        match &mapped {
            StoreError::Conflict { .. } => warn!("{op}:conflict widget_id={id} expected_version={expected}"),
            other => error!("{op}:fault widget_id={id} err={other}"),
        }
        mapped
    }

    fn read_failure(&self, op: &str, id: Uuid, err: PersistenceError) -> StoreError {
        let mapped = err.into_read_error(id);
        if mapped.is_fault() {
            error!("{op}:fault widget_id={id} err={mapped}");
        }
        mapped
    }
}

impl<P: ConnectionProvider> WidgetStore for PgWidgetStore<P> {
    fn create(&self, widget: &Widget) -> Result<Widget, StoreError> {
        debug!("create:start widget_id={}", widget.id);
        self.create_tx(widget)
            .map_err(|e| self.write_failure("create", widget.id, 0, e))?;
        debug!("create:done widget_id={} version=1", widget.id);
        Ok(Widget { id: widget.id,
                    version: 1,
                    value: widget.value.clone() })
    }

    fn update(&self, widget: &Widget) -> Result<Widget, StoreError> {
        debug!("update:start widget_id={} version={}", widget.id, widget.version);
        // Una versión fuera de rango de BIGINT no puede coincidir con ninguna fila.
        let Ok(expected) = i64::try_from(widget.version) else {
            warn!("update:conflict widget_id={} version out of range", widget.id);
            return Err(StoreError::Conflict { id: widget.id,
                                              expected: widget.version });
        };
        let (version, value) = self.update_tx(widget, expected)
                                   .map_err(|e| self.write_failure("update", widget.id, widget.version, e))?;
        debug!("update:done widget_id={} version={version}", widget.id);
        Ok(Widget { id: widget.id,
                    version: version as u64,
                    value })
    }

    fn find(&self, id: Uuid) -> Result<Widget, StoreError> {
        debug!("find:start widget_id={id}");
        let (version, value) = self.load_view(id).map_err(|e| self.read_failure("find", id, e))?;
        debug!("find:done widget_id={id} version={version}");
        Ok(Widget { id,
                    version: version as u64,
                    value })
    }

    fn events(&self, id: Uuid) -> Result<Vec<WidgetEvent>, StoreError> {
        debug!("events:start widget_id={id}");
        let rows = self.load_events(id).map_err(|e| self.read_failure("events", id, e))?;
        debug!("events:done widget_id={id} count={}", rows.len());
        Ok(rows.into_iter().map(WidgetEvent::from).collect())
    }

    /// Lee sólo la columna `value` del log (no la vista) y la pliega en orden
    /// de versión.
    fn event_values(&self, id: Uuid) -> Result<String, StoreError> {
        debug!("event_values:start widget_id={id}");
        let values = self.load_event_values(id)
                         .map_err(|e| self.read_failure("event_values", id, e))?;
        if values.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        debug!("event_values:done widget_id={id} events={}", values.len());
        Ok(fold_all(values.iter().map(String::as_str)))
    }

    fn verify(&self, id: Uuid) -> Result<Verification, StoreError> {
        debug!("verify:start widget_id={id}");
        let ((version, value), rows) = self.load_snapshot(id)
                                           .map_err(|e| self.read_failure("verify", id, e))?;
        let view = Widget { id,
                            version: version as u64,
                            value };
        let events: Vec<WidgetEvent> = rows.into_iter().map(WidgetEvent::from).collect();
        let verification = Verification::compare(view, &events);
        debug!("verify:done widget_id={id} consistent={}", verification.is_consistent());
        Ok(verification)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL.
///
/// Comportamiento:
/// - Tamaños en cero se elevan a 1; si `min_size > max_size`, usa
///   `min_size = max_size`.
/// - Ejecuta migraciones inmediatamente tras el primer `get()`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

/// Atajo: store Postgres sobre un pool ya construido.
pub fn store_from_pool(pool: PgPool) -> PgWidgetStore<PoolProvider> {
    PgWidgetStore::new(PoolProvider { pool })
}
