//! Cada operación del store deja una línea `debug!` de inicio y otra de fin.

use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};
use uuid::Uuid;
use widget_core::{InMemoryWidgetStore, Widget, WidgetStore};

struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger { lines: Mutex::new(Vec::new()) };

#[test]
fn read_operations_log_start_and_done() {
    log::set_logger(&LOGGER).expect("logger único en este binario de test");
    log::set_max_level(LevelFilter::Debug);

    let store = InMemoryWidgetStore::new();
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "a")).unwrap();
    store.find(id).unwrap();
    store.events(id).unwrap();
    store.event_values(id).unwrap();
    store.verify(id).unwrap();

    let lines = LOGGER.lines.lock().unwrap().clone();
    for op in ["create", "find", "events", "event_values", "verify"] {
        for phase in ["start", "done"] {
            let prefix = format!("{op}:{phase} widget_id={id}");
            assert!(lines.iter().any(|l| l.starts_with(&prefix)),
                    "falta `{prefix}` en {lines:?}");
        }
    }
}
