//! Pruebas básicas de configuración y pool (requiere DATABASE_URL válido en entorno).

use diesel::connection::SimpleConnection;
use diesel::sql_types::Bool;
use diesel::{QueryableByName, RunQueryDsl};
use widget_persistence::migrations::run_pending_migrations;
use widget_persistence::{build_pool, DbConfig};

#[derive(QueryableByName)]
struct LockProbe {
    #[diesel(sql_type = Bool)]
    locked: bool,
}

#[test]
fn create_pool_from_env() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL no definido: omitiendo test");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections).expect("pool");
    let mut conn = pool.get().expect("conn");
    conn.batch_execute("SELECT 1;").expect("select 1");
}

#[test]
fn migrations_are_idempotent_and_create_tables() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    // Dos construcciones seguidas: la segunda no tiene migraciones pendientes.
    let _first = build_pool(&cfg.url, 1, 1).expect("pool 1");
    let pool = build_pool(&cfg.url, 1, 1).expect("pool 2");
    let mut conn = pool.get().expect("conn");
    for table in ["events", "views"] {
        let res = diesel::sql_query(format!("SELECT 1 FROM {table} LIMIT 1")).execute(&mut conn);
        assert!(res.is_ok(), "tabla {table} debe existir");
    }
}

#[test]
fn min_greater_than_max_is_clamped() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, 4, 2).expect("pool");
    assert_eq!(pool.max_size(), 2);
}

#[test]
fn migration_lock_is_released_after_running() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, 1, 1).expect("pool");
    let mut migrator = pool.get().expect("conn migraciones");
    run_pending_migrations(&mut migrator).expect("migraciones");

    // La misma sesión (que vuelve al pool) no debe conservar advisory locks.
    let held: LockProbe = diesel::sql_query("SELECT EXISTS (SELECT 1 FROM pg_locks \
                                             WHERE locktype = 'advisory' AND pid = pg_backend_pid()) AS locked")
        .get_result(&mut migrator)
        .expect("consulta pg_locks");
    assert!(!held.locked, "el lock de migraciones quedó tomado por la sesión");
}
