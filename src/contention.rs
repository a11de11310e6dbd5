//! Arnés de contención: varios writers hacen read-modify-write sobre el mismo
//! widget, sin reintentar ante conflicto.
//!
//! Invariante verificable tras `hammer`: `find(id).version == 1 + accepted`
//! y `find(id).value == event_values(id)`.

use std::time::Duration;

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;
use widget_core::{StoreError, WidgetStore};

/// Parámetros de una corrida de contención.
#[derive(Debug, Clone, Copy)]
pub struct ContentionPlan {
    pub writers: usize,
    pub rounds: usize,
    /// Pausa antes de cada lectura; acerca a los writers entre sí.
    pub pause: Duration,
}

impl Default for ContentionPlan {
    fn default() -> Self {
        Self { writers: 10,
               rounds: 10,
               pause: Duration::from_millis(10) }
    }
}

/// Conteo agregado de resultados de todos los writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentionReport {
    pub accepted: u64,
    pub conflicts: u64,
    /// Cualquier error distinto de `Conflict` (incluye `NotFound` del read).
    pub faults: u64,
}

impl ContentionReport {
    pub fn attempts(&self) -> u64 {
        self.accepted + self.conflicts + self.faults
    }

    fn merge(self, other: Self) -> Self {
        Self { accepted: self.accepted + other.accepted,
               conflicts: self.conflicts + other.conflicts,
               faults: self.faults + other.faults }
    }
}

/// Letra mayúscula pseudoaleatoria (A..Y) tomada de un UUID v4.
pub fn random_letter() -> String {
    let byte = Uuid::new_v4().as_bytes()[0];
    char::from(b'A' + byte % 25).to_string()
}

fn run_writer<S: WidgetStore>(store: &S, id: Uuid, plan: &ContentionPlan) -> ContentionReport {
    let mut report = ContentionReport::default();
    for _ in 0..plan.rounds {
        if !plan.pause.is_zero() {
            std::thread::sleep(plan.pause);
        }
        let outcome = store.find(id)
                           .and_then(|current| store.update(&current.with_value(random_letter())));
        match outcome {
            Ok(_) => report.accepted += 1,
            Err(StoreError::Conflict { .. }) => report.conflicts += 1,
            Err(e) => {
                debug!("writer fault widget_id={id} err={e}");
                report.faults += 1;
            }
        }
    }
    report
}

/// Corre `plan.writers` writers en paralelo sobre `id` (que ya debe existir).
///
/// Usa un pool de rayon dedicado con un hilo por writer, para que todos
/// compitan de verdad aunque haya menos núcleos.
pub fn hammer<S: WidgetStore>(store: &S, id: Uuid, plan: ContentionPlan) -> Result<ContentionReport, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(plan.writers.max(1))
                                              .build()?;
    let report = pool.install(|| {
                         (0..plan.writers).into_par_iter()
                                          .map(|_| run_writer(store, id, &plan))
                                          .reduce(ContentionReport::default, ContentionReport::merge)
                     });
    info!("hammer widget_id={id} accepted={} conflicts={} faults={}",
          report.accepted,
          report.conflicts,
          report.faults);
    Ok(report)
}
