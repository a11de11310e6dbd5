#![allow(dead_code)]

use once_cell::sync::Lazy;
use widget_persistence::config::DbConfig;
use widget_persistence::pg::{build_pool, store_from_pool, PgPool, PgWidgetStore, PoolProvider};

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    if std::env::var("DATABASE_URL").is_err() {
        return None;
    }
    let cfg = match DbConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config de test inválida: {e}");
            return None;
        }
    };
    // 1 mínimo, 8 máximo: suficiente para los tests con writers concurrentes
    match build_pool(&cfg.url, 1, 8) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn with_pool<F, R>(f: F) -> Option<R>
    where F: FnOnce(&PgPool) -> R
{
    TEST_POOL.as_ref().map(f)
}

pub fn test_store() -> Option<PgWidgetStore<PoolProvider>> {
    with_pool(|p| store_from_pool(p.clone()))
}
