//! Level status reports
//!
//! Snapshot of every signal of every level, for diagnostics. Building a
//! report only reads signals, it never changes cache state.

use crate::signal::{Severity, Signal};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Health status of a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every signal is responding
    Healthy,
    /// A non-critical signal is breached; the level is shedding objects
    Degraded,
    /// A critical signal is breached; new objects skip this level
    Unhealthy,
}

/// State of one signal at the time of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReport {
    pub name: String,
    pub severity: Severity,
    pub responding: bool,
    pub limit: String,
    pub current: String,
}

impl SignalReport {
    pub fn from_signal(signal: &dyn Signal) -> Self {
        Self {
            name: signal.name().to_string(),
            severity: signal.severity(),
            responding: signal.is_responding(),
            limit: signal.present_limit(),
            current: signal.present_current(),
        }
    }
}

/// State of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub level: String,
    pub index: usize,
    pub status: HealthStatus,
    pub signals: Vec<SignalReport>,
}

impl LevelReport {
    pub fn new(level: impl Into<String>, index: usize, signals: Vec<SignalReport>) -> Self {
        let critical_breached = signals
            .iter()
            .any(|s| !s.responding && s.severity == Severity::Critical);
        let any_breached = signals.iter().any(|s| !s.responding);

        let status = if critical_breached {
            HealthStatus::Unhealthy
        } else if any_breached {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            level: level.into(),
            index,
            status,
            signals,
        }
    }
}

/// State of a whole hierarchy, fastest level first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyReport {
    pub levels: Vec<LevelReport>,
}

impl HierarchyReport {
    pub fn new(levels: Vec<LevelReport>) -> Self {
        Self { levels }
    }

    /// Whether every level reports `Healthy`.
    pub fn is_healthy(&self) -> bool {
        self.levels.iter().all(|l| l.status == HealthStatus::Healthy)
    }

    /// Multi-line human-readable dump.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for level in &self.levels {
            let _ = writeln!(
                out,
                "level #{} [{}] status: {:?}",
                level.index, level.level, level.status
            );
            for signal in &level.signals {
                let _ = writeln!(
                    out,
                    "   signal {} [{}] {}",
                    signal.name,
                    signal.severity,
                    if signal.responding { "is FINE" } else { "is NOT FINE" }
                );
                let _ = writeln!(out, "       configured value: {}", signal.limit);
                let _ = writeln!(out, "       current value: {}", signal.current);
            }
        }
        out
    }
}
