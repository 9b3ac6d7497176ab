//! Stat trackers and the tracker variable types.
//!
//! A stat tracker is a per-variable time series owned by exactly one worker.
//! The interpreter starts every variable's trackers before the first
//! instruction and stops them after the last; the job driver collects them
//! when the job ends.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_INTEGER, TYPE_STRING,
};
use crate::error::ScriptResult;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Identity of the job and worker a tracker's data belongs to.
#[derive(Debug, Clone)]
pub struct StatContext {
    pub client_id: String,
    pub thread_id: usize,
}

impl StatContext {
    pub fn new(client_id: impl Into<String>, thread_id: usize) -> Self {
        Self {
            client_id: client_id.into(),
            thread_id,
        }
    }
}

impl Default for StatContext {
    fn default() -> Self {
        Self::new("standalone", 0)
    }
}

/// The kind of series a tracker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerKind {
    /// A running event count.
    Counter,
    /// Occurrence counts keyed by category string.
    Categorical,
    /// A distribution of integer observations.
    ValueDistribution,
    /// A distribution of measured durations.
    Duration,
}

/// One collected time series.
#[derive(Debug, Clone)]
pub struct StatTracker {
    kind: TrackerKind,
    display_name: String,
    client_id: String,
    thread_id: usize,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
    count: u64,
    total: i64,
    categories: HashMap<String, u64>,
    durations_ms: Vec<u64>,
    active_timer: Option<Instant>,
}

impl StatTracker {
    /// Creates an idle tracker of the given kind.
    pub fn new(kind: TrackerKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            client_id: String::new(),
            thread_id: 0,
            started_at: None,
            elapsed: None,
            count: 0,
            total: 0,
            categories: HashMap::new(),
            durations_ms: Vec::new(),
            active_timer: None,
        }
    }

    /// Begins collection for the given job context.
    pub fn start(&mut self, context: &StatContext) {
        self.client_id = context.client_id.clone();
        self.thread_id = context.thread_id;
        self.started_at = Some(Instant::now());
        self.elapsed = None;
    }

    /// Ends collection. Stopping an already-stopped tracker is a no-op.
    pub fn stop(&mut self) {
        if self.elapsed.is_none() {
            if let Some(started) = self.started_at {
                self.elapsed = Some(started.elapsed());
            }
        }
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.elapsed.is_none()
    }

    /// Records one event.
    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// Records `amount` events at once.
    pub fn add(&mut self, amount: i64) {
        self.count += 1;
        self.total += amount;
    }

    /// Records one occurrence of a category.
    pub fn observe_category(&mut self, category: &str) {
        *self.categories.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Records one integer observation.
    pub fn add_value(&mut self, value: i64) {
        self.count += 1;
        self.total += value;
    }

    /// Starts the duration timer. A second start discards the first.
    pub fn start_timer(&mut self) {
        self.active_timer = Some(Instant::now());
    }

    /// Stops the duration timer and records the measured interval. Without
    /// a running timer this is a no-op.
    pub fn stop_timer(&mut self) {
        if let Some(started) = self.active_timer.take() {
            self.durations_ms.push(started.elapsed().as_millis() as u64);
            self.count += 1;
        }
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    /// Number of recorded events or observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of recorded amounts or observations.
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Category counts for categorical trackers.
    pub fn categories(&self) -> &HashMap<String, u64> {
        &self.categories
    }

    /// Recorded durations for duration trackers, in milliseconds.
    pub fn durations_ms(&self) -> &[u64] {
        &self.durations_ms
    }

    /// Collection time between start and stop, when complete.
    pub fn collection_time(&self) -> Option<Duration> {
        self.elapsed
    }

    /// One-line summary for job-end reporting.
    pub fn summary_string(&self) -> String {
        match self.kind {
            TrackerKind::Counter => {
                format!("{}: count {}", self.display_name, self.count)
            }
            TrackerKind::Categorical => {
                let mut entries: Vec<String> = self
                    .categories
                    .iter()
                    .map(|(category, count)| format!("{}={}", category, count))
                    .collect();
                entries.sort();
                format!("{}: {}", self.display_name, entries.join(", "))
            }
            TrackerKind::ValueDistribution => {
                let average = if self.count == 0 {
                    0.0
                } else {
                    self.total as f64 / self.count as f64
                };
                format!(
                    "{}: count {}, total {}, average {:.2}",
                    self.display_name, self.count, self.total, average
                )
            }
            TrackerKind::Duration => {
                let total_ms: u64 = self.durations_ms.iter().sum();
                let average = if self.durations_ms.is_empty() {
                    0.0
                } else {
                    total_ms as f64 / self.durations_ms.len() as f64
                };
                format!(
                    "{}: {} timings, average {:.2}ms",
                    self.display_name,
                    self.durations_ms.len(),
                    average
                )
            }
        }
    }
}

const SET_TRACKER_NAME: usize = 0;

macro_rules! tracker_common {
    ($type_name:literal) => {
        fn type_name(&self) -> &'static str {
            $type_name
        }

        fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
            Err(assign_type_error($type_name, value))
        }

        fn value_string(&self) -> String {
            self.tracker.summary_string()
        }

        fn start_stat_trackers(&mut self, context: &StatContext) {
            self.tracker.start(context);
        }

        fn stop_stat_trackers(&mut self) {
            self.tracker.stop();
        }

        fn stat_trackers(&self) -> Vec<StatTracker> {
            vec![self.tracker.clone()]
        }
    };
}

/// Script variable tracking a running event count.
pub struct IncrementalTrackerVariable {
    tracker: StatTracker,
}

impl Default for IncrementalTrackerVariable {
    fn default() -> Self {
        Self {
            tracker: StatTracker::new(TrackerKind::Counter, "Events"),
        }
    }
}

const INCREMENTAL_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "settrackername",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "increment",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "add",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
];

const INCREMENTAL_INCREMENT: usize = 1;
const INCREMENTAL_ADD: usize = 2;

impl Variable for IncrementalTrackerVariable {
    tracker_common!("incrementaltracker");

    fn method_table(&self) -> &'static [MethodSignature] {
        INCREMENTAL_METHODS
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        match method_index {
            SET_TRACKER_NAME => {
                self.tracker.set_display_name(arguments[0].display_string());
            }
            INCREMENTAL_INCREMENT => self.tracker.increment(),
            INCREMENTAL_ADD => self.tracker.add(arguments[0].expect_integer(0)?),
            other => return Err(invalid_invocation("incrementaltracker", other)),
        }
        Ok(VariableValue::Null)
    }
}

/// Script variable tracking occurrence counts by category.
pub struct CategoricalTrackerVariable {
    tracker: StatTracker,
}

impl Default for CategoricalTrackerVariable {
    fn default() -> Self {
        Self {
            tracker: StatTracker::new(TrackerKind::Categorical, "Categories"),
        }
    }
}

const CATEGORICAL_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "settrackername",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "addobservation",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
];

const CATEGORICAL_ADD_OBSERVATION: usize = 1;

impl Variable for CategoricalTrackerVariable {
    tracker_common!("categoricaltracker");

    fn method_table(&self) -> &'static [MethodSignature] {
        CATEGORICAL_METHODS
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        match method_index {
            SET_TRACKER_NAME => {
                self.tracker.set_display_name(arguments[0].display_string());
            }
            CATEGORICAL_ADD_OBSERVATION => {
                self.tracker.observe_category(&arguments[0].display_string());
            }
            other => return Err(invalid_invocation("categoricaltracker", other)),
        }
        Ok(VariableValue::Null)
    }
}

/// Script variable tracking a distribution of integer observations.
pub struct IntegerValueTrackerVariable {
    tracker: StatTracker,
}

impl Default for IntegerValueTrackerVariable {
    fn default() -> Self {
        Self {
            tracker: StatTracker::new(TrackerKind::ValueDistribution, "Values"),
        }
    }
}

const INTEGER_VALUE_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "settrackername",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "addvalue",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
];

const INTEGER_VALUE_ADD_VALUE: usize = 1;

impl Variable for IntegerValueTrackerVariable {
    tracker_common!("integervaluetracker");

    fn method_table(&self) -> &'static [MethodSignature] {
        INTEGER_VALUE_METHODS
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        match method_index {
            SET_TRACKER_NAME => {
                self.tracker.set_display_name(arguments[0].display_string());
            }
            INTEGER_VALUE_ADD_VALUE => {
                self.tracker.add_value(arguments[0].expect_integer(0)?);
            }
            other => return Err(invalid_invocation("integervaluetracker", other)),
        }
        Ok(VariableValue::Null)
    }
}

/// Script variable measuring elapsed time between timer calls.
pub struct TimeTrackerVariable {
    tracker: StatTracker,
}

impl Default for TimeTrackerVariable {
    fn default() -> Self {
        Self {
            tracker: StatTracker::new(TrackerKind::Duration, "Timings"),
        }
    }
}

const TIME_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "settrackername",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "starttimer",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "stoptimer",
        argument_types: &[],
        return_type: None,
    },
];

const TIME_START_TIMER: usize = 1;
const TIME_STOP_TIMER: usize = 2;

impl Variable for TimeTrackerVariable {
    tracker_common!("timetracker");

    fn method_table(&self) -> &'static [MethodSignature] {
        TIME_METHODS
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        match method_index {
            SET_TRACKER_NAME => {
                self.tracker.set_display_name(arguments[0].display_string());
            }
            TIME_START_TIMER => self.tracker.start_timer(),
            TIME_STOP_TIMER => self.tracker.stop_timer(),
            other => return Err(invalid_invocation("timetracker", other)),
        }
        Ok(VariableValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_tracker() {
        let mut tracker = StatTracker::new(TrackerKind::Counter, "Requests");
        tracker.start(&StatContext::new("client-1", 3));
        tracker.increment();
        tracker.increment();
        tracker.stop();
        assert_eq!(tracker.count(), 2);
        assert_eq!(tracker.client_id(), "client-1");
        assert_eq!(tracker.thread_id(), 3);
        assert!(tracker.collection_time().is_some());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut tracker = StatTracker::new(TrackerKind::Counter, "Requests");
        tracker.start(&StatContext::default());
        tracker.stop();
        let first = tracker.collection_time();
        tracker.stop();
        assert_eq!(tracker.collection_time(), first);
    }

    #[test]
    fn test_categorical_summary() {
        let mut tracker = StatTracker::new(TrackerKind::Categorical, "Outcomes");
        tracker.observe_category("pass");
        tracker.observe_category("pass");
        tracker.observe_category("fail");
        assert_eq!(tracker.summary_string(), "Outcomes: fail=1, pass=2");
    }

    #[test]
    fn test_timer_without_start_is_noop() {
        let mut tracker = StatTracker::new(TrackerKind::Duration, "Latency");
        tracker.stop_timer();
        assert_eq!(tracker.count(), 0);
        assert!(tracker.durations_ms().is_empty());
    }

    #[test]
    fn test_tracker_variable_dispatch() {
        let mut variable = IncrementalTrackerVariable::default();
        variable
            .invoke(SET_TRACKER_NAME, &[VariableValue::Text("Pages".into())])
            .unwrap();
        variable.invoke(INCREMENTAL_INCREMENT, &[]).unwrap();
        variable
            .invoke(INCREMENTAL_ADD, &[VariableValue::Integer(4)])
            .unwrap();
        let trackers = variable.stat_trackers();
        assert_eq!(trackers.len(), 1);
        assert_eq!(trackers[0].display_name(), "Pages");
        assert_eq!(trackers[0].count(), 2);
        assert_eq!(trackers[0].total(), 4);
    }
}
