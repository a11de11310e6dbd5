//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        Ok(Self::from_parts(url,
                            env::var("DATABASE_MIN_CONNECTIONS").ok(),
                            env::var("DATABASE_MAX_CONNECTIONS").ok()))
    }

    /// Arma la configuración a partir de valores crudos; los tamaños inválidos
    /// o ausentes caen a sus defaults.
    pub fn from_parts(url: String, min: Option<String>, max: Option<String>) -> Self {
        let min_connections = min.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_MIN_CONNECTIONS);
        let max_connections = max.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Self { url, min_connections, max_connections }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_default_when_missing_or_invalid() {
        let cfg = DbConfig::from_parts("postgres://x".into(), None, Some("muchas".into()));
        assert_eq!(cfg.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn sizes_are_parsed() {
        let cfg = DbConfig::from_parts("postgres://x".into(), Some("1".into()), Some("4".into()));
        assert_eq!(cfg, DbConfig { url: "postgres://x".into(), min_connections: 1, max_connections: 4 });
    }
}
