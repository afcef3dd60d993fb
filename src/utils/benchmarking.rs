use std::future::Future;
use std::time::{Duration, Instant};

/// A completed phase with its duration
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub duration: Duration,
}

/// Records how long each phase of one capture took, in execution order
#[derive(Debug, Clone)]
pub struct PhaseTimer {
    started: Instant,
    phases: Vec<PhaseTiming>,
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            phases: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &'static str, duration: Duration) {
        self.phases.push(PhaseTiming { name, duration });
    }

    /// Awaits `operation` and records its duration under `name`
    pub async fn time<F, T>(&mut self, name: &'static str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let result = operation.await;
        self.record(name, start.elapsed());
        result
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }

    /// One line per phase plus the total, for the log
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        for (idx, phase) in self.phases.iter().enumerate() {
            report.push_str(&format!(
                "{}. {} - {} ms\n",
                idx + 1,
                phase.name,
                phase.duration.as_millis()
            ));
        }
        report.push_str(&format!("Total: {} ms", self.total().as_millis()));
        report
    }

    /// Value for a `Server-Timing` response header
    pub fn server_timing(&self) -> String {
        self.phases
            .iter()
            .map(|phase| format!("{};dur={}", phase.name, phase.duration.as_millis()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
