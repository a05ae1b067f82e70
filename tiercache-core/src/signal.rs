//! Threshold signals
//!
//! A signal compares a live measurement of a level (object count, occupied
//! bytes, ...) against a configured limit. The migration strategy only ever
//! looks at whether a signal is responding and at its severity; what is being
//! measured stays private to the level that owns the signal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// How much a breached signal matters to the strategy.
///
/// `Critical` gates placement of new objects. `Warn` and `Critical` both
/// trigger demotion out of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Read-only view of a health signal.
pub trait Signal: Send + Sync {
    /// Short identifier, e.g. `object_count`.
    fn name(&self) -> &str;

    /// Whether the current measurement is within the configured limit.
    ///
    /// A signal that has never been measured is not responding.
    fn is_responding(&self) -> bool;

    fn severity(&self) -> Severity;

    /// Human-readable rendering of the current measurement.
    fn present_current(&self) -> String;

    /// Human-readable rendering of the configured limit.
    fn present_limit(&self) -> String;
}

/// Comparison of `(current, limit)`; `true` means within bounds.
pub type Checker<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Renders a limit value.
pub type LimitPresenter<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Renders a current value, which may not have been measured yet.
pub type CurrentPresenter<T> = Box<dyn Fn(Option<&T>) -> String + Send + Sync>;

/// A signal built from a limit, a checker and two presenters.
///
/// The owning level calls [`ThresholdSignal::set_current`] after every change
/// to its storage. Everyone else sees it through [`Signal`].
pub struct ThresholdSignal<T> {
    name: String,
    limit: T,
    current: RwLock<Option<T>>,
    severity: Severity,
    checker: Checker<T>,
    present_limit: LimitPresenter<T>,
    present_current: CurrentPresenter<T>,
}

impl<T> ThresholdSignal<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        limit: T,
        severity: Severity,
        checker: Checker<T>,
        present_limit: LimitPresenter<T>,
        present_current: CurrentPresenter<T>,
    ) -> Self {
        Self {
            name: name.into(),
            limit,
            current: RwLock::new(None),
            severity,
            checker,
            present_limit,
            present_current,
        }
    }

    /// Record a new measurement.
    pub fn set_current(&self, value: T) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(value);
    }

    /// Forget the measurement; the signal stops responding.
    pub fn clear_current(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = None;
    }

    /// Last recorded measurement.
    pub fn current(&self) -> Option<T> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn limit(&self) -> &T {
        &self.limit
    }
}

impl ThresholdSignal<usize> {
    /// Responding while `current <= max`.
    pub fn max_count(name: impl Into<String>, max: usize, severity: Severity) -> Self {
        Self::new(
            name,
            max,
            severity,
            Box::new(|current, max| current <= max),
            Box::new(|max| format!("Max amount of objects = {}", max)),
            Box::new(|current| match current {
                Some(count) => format!("Current amount of objects = {}", count),
                None => "Current amount of objects is not measured".to_string(),
            }),
        )
    }

    /// Responding while `current` objects fill at most `danger_percent` of
    /// `capacity`.
    ///
    /// The measured value is an object count and the limit is a percentage.
    /// With a zero danger percentage (or zero capacity) only an empty level
    /// is within bounds.
    pub fn load_percent(
        name: impl Into<String>,
        capacity: usize,
        danger_percent: u8,
        severity: Severity,
    ) -> Self {
        Self::new(
            name,
            usize::from(danger_percent),
            severity,
            Box::new(move |current, danger| {
                if *danger == 0 || capacity == 0 {
                    return *current == 0;
                }
                current.saturating_mul(100) <= danger.saturating_mul(capacity)
            }),
            Box::new(|danger| format!("Load should not exceed {}%", danger)),
            Box::new(move |current| match current {
                Some(_) if capacity == 0 => {
                    "Load cannot be computed for a zero capacity".to_string()
                }
                Some(count) => {
                    let load = (*count as f64 * 100.0) / capacity as f64;
                    format!("Current load is {:.1}%", load)
                }
                None => "Current load is not measured".to_string(),
            }),
        )
    }
}

impl ThresholdSignal<u64> {
    /// Responding while `current < max_bytes`.
    pub fn byte_limit(name: impl Into<String>, max_bytes: u64, severity: Severity) -> Self {
        Self::new(
            name,
            max_bytes,
            severity,
            Box::new(|current, max| current < max),
            Box::new(|max| format!("Max allowed occupied size in bytes is {}", max)),
            Box::new(|current| match current {
                Some(bytes) => format!("Current occupied size in bytes is {}", bytes),
                None => "Current occupied size is not measured".to_string(),
            }),
        )
    }
}

impl<T> Signal for ThresholdSignal<T>
where
    T: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_responding(&self) -> bool {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(value) => (self.checker)(value, &self.limit),
            None => false,
        }
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn present_current(&self) -> String {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        (self.present_current)(current.as_ref())
    }

    fn present_limit(&self) -> String {
        (self.present_limit)(&self.limit)
    }
}

impl<T> fmt::Debug for ThresholdSignal<T>
where
    T: Clone + Send + Sync + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdSignal")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("current", &self.current())
            .field("severity", &self.severity)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
