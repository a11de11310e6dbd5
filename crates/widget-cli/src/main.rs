use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;
use widget_core::{StoreError, Widget, WidgetStore};
use widget_persistence::{build_dev_pool_from_env, init_dotenv, store_from_pool};

/// Operaciones sobre el store de widgets (backend Postgres)
#[derive(Parser, Debug)]
#[command(name = "widget-cli")]
#[command(about = "Event-sourced widget store with optimistic concurrency", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crea un widget (versión 1)
    Create {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        value: String,
    },
    /// Agrega un delta si la versión almacenada coincide con --version
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        version: u64,
        #[arg(long)]
        value: String,
    },
    /// Lee la vista materializada
    Find {
        #[arg(long)]
        id: Uuid,
    },
    /// Lista el log de eventos
    Events {
        #[arg(long)]
        id: Uuid,
    },
    /// Compara la vista con la reconstrucción desde el log
    Verify {
        #[arg(long)]
        id: Uuid,
    },
}

// Códigos de salida: 0 ok, 2 uso (clap), 3 conflicto, 4 no encontrado, 5 fallo de
// almacenamiento, 6 vista y log divergentes (verify).
fn exit_code_for(err: &StoreError) -> u8 {
    match err {
        StoreError::Conflict { .. } => 3,
        StoreError::NotFound(_) => 4,
        StoreError::StorageFault(_) => 5,
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[widget-cli] serialize error: {e}");
            ExitCode::from(5)
        }
    }
}

fn run<S: WidgetStore>(store: &S, command: Command) -> Result<ExitCode, StoreError> {
    let code = match command {
        Command::Create { id, value } => print_json(&store.create(&Widget::new(id, value))?),
        Command::Update { id, version, value } => print_json(&store.update(&Widget { id, version, value })?),
        Command::Find { id } => print_json(&store.find(id)?),
        Command::Events { id } => print_json(&store.events(id)?),
        Command::Verify { id } => {
            let verification = store.verify(id)?;
            let code = print_json(&verification);
            if !verification.is_consistent() {
                eprintln!("[widget-cli] vista y log divergen para {id}");
                return Ok(ExitCode::from(6));
            }
            code
        }
    };
    Ok(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Cargar .env si existe para obtener DATABASE_URL
    init_dotenv();
    let pool = match build_dev_pool_from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[widget-cli] pool error: {e}");
            return ExitCode::from(5);
        }
    };
    let store = store_from_pool(pool);
    match run(&store, cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[widget-cli] {e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
