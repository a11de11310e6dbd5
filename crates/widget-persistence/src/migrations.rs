//! Wrapper para correr las migraciones embebidas.
//!
//! Las migraciones viven en `migrations/` dentro de este crate y se embeben en
//! el binario. `build_pool` las ejecuta una vez al construir el pool.

use crate::error::PersistenceError;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, error};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// Clave del advisory lock que serializa migraciones entre procesos/pools.
const MIGRATION_LOCK_KEY: i64 = 0x7769_6467_6574;

pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    conn.batch_execute(&format!("SELECT pg_advisory_lock({MIGRATION_LOCK_KEY});"))?;
    let result = conn.run_pending_migrations(MIGRATIONS)
                     .map(|applied| applied.len())
                     .map_err(|e| PersistenceError::Migration(e.to_string()));
    // El lock es de sesión: se libera siempre, aun si las migraciones fallaron,
    // porque la conexión vuelve al pool.
    let unlocked = release_migration_lock(conn);
    let applied = result?;
    unlocked?;
    debug!("migrations applied={applied}");
    Ok(())
}

fn release_migration_lock(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    conn.batch_execute(&format!("SELECT pg_advisory_unlock({MIGRATION_LOCK_KEY});"))
        .map_err(|e| {
            error!("migrations:unlock failed key={MIGRATION_LOCK_KEY} err={e}");
            PersistenceError::from(e)
        })
}
