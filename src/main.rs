//! widget-demo: escenario de referencia + corrida de contención.
//!
//! Usa Postgres si hay `DATABASE_URL` (o `.env`), salvo que se compile con el
//! feature `inmemory_demo`; en otro caso corre sobre el backend en memoria.

use std::process::ExitCode;

use uuid::Uuid;
use widget_events::contention::{hammer, ContentionPlan};
use widget_events::persistence::{build_dev_pool_from_env, init_dotenv, store_from_pool};
use widget_events::{InMemoryWidgetStore, StoreError, Widget, WidgetStore};

/// create "a" → update "b" → update obsoleto "c" (debe ser Conflict).
fn run_reference_scenario<S: WidgetStore>(store: &S) -> Result<(), StoreError> {
    let id = Uuid::new_v4();
    let created = store.create(&Widget::new(id, "a"))?;
    println!("[scenario] create   -> v{} {:?}", created.version, created.value);

    let read = store.find(id)?;
    let updated = store.update(&read.with_value("b"))?;
    println!("[scenario] update   -> v{} {:?}", updated.version, updated.value);

    match store.update(&read.with_value("c")) {
        Err(e @ StoreError::Conflict { .. }) => println!("[scenario] stale    -> rechazado: {e}"),
        Err(e) => return Err(e),
        Ok(w) => {
            return Err(StoreError::StorageFault(format!("update obsoleto aceptado: v{}", w.version)));
        }
    }
    let view = store.find(id)?;
    println!("[scenario] final    -> v{} {:?}", view.version, view.value);
    Ok(())
}

fn run_contention<S: WidgetStore>(store: &S) -> Result<bool, StoreError> {
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "a"))?;
    let report = hammer(store, id, ContentionPlan::default()).map_err(|e| StoreError::StorageFault(e.to_string()))?;
    let widget = store.find(id)?;
    let event_values = store.event_values(id)?;
    println!("[contention] report: {}",
             serde_json::to_string(&report).unwrap_or_else(|_| format!("{report:?}")));
    println!("[contention] widget version: {}", widget.version);
    println!("[contention] widget value:   {}", widget.value);
    println!("[contention] event values:   {event_values}");
    let consistent = widget.value == event_values && widget.version == 1 + report.accepted;
    Ok(consistent)
}

fn run_all<S: WidgetStore>(store: &S) -> ExitCode {
    if let Err(e) = run_reference_scenario(store) {
        eprintln!("[widget-demo] escenario falló: {e}");
        return ExitCode::FAILURE;
    }
    match run_contention(store) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("[widget-demo] vista y log divergen");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("[widget-demo] contención falló: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_dotenv();
    if cfg!(feature = "inmemory_demo") || std::env::var("DATABASE_URL").is_err() {
        println!("[widget-demo] backend: memoria");
        return run_all(&InMemoryWidgetStore::new());
    }
    match build_dev_pool_from_env() {
        Ok(pool) => {
            println!("[widget-demo] backend: postgres");
            run_all(&store_from_pool(pool))
        }
        Err(e) => {
            eprintln!("[widget-demo] pool error: {e}");
            ExitCode::from(5)
        }
    }
}
