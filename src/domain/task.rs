//! Task domain model
//!
//! A task is a named planned window with at most one finish-to-start
//! predecessor. Time is measured in whole [`TimeUnit`]s.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::TaskId;

/// Granularity used for durations, lag and snapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Whole days (24 hours)
    #[default]
    Day,
    /// Quarter days (6-hour boundaries)
    #[serde(alias = "quarter-day")]
    #[value(alias = "quarter_day")]
    QuarterDay,
}

impl TimeUnit {
    /// Length of one unit in hours
    pub fn hours(self) -> i64 {
        match self {
            TimeUnit::Day => 24,
            TimeUnit::QuarterDay => 6,
        }
    }

    fn seconds(self) -> i64 {
        self.hours() * 3600
    }

    /// Moves `at` by `count` units, saturating at the representable range
    pub fn shift(self, at: DateTime<Utc>, count: i64) -> DateTime<Utc> {
        self.hours()
            .checked_mul(count)
            .and_then(Duration::try_hours)
            .and_then(|delta| at.checked_add_signed(delta))
            .unwrap_or(if count < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    /// Whole units from `from` to `to`, truncated toward zero
    pub fn units_between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        (to - from).num_seconds() / self.seconds()
    }

    /// Rounds down to the previous unit boundary (UTC)
    pub fn floor(self, at: DateTime<Utc>) -> DateTime<Utc> {
        let secs = at.timestamp();
        let floored = secs - secs.rem_euclid(self.seconds());
        DateTime::from_timestamp(floored, 0).unwrap_or(at)
    }

    /// Rounds up to the next unit boundary, leaving boundaries untouched
    pub fn ceil(self, at: DateTime<Utc>) -> DateTime<Utc> {
        let down = self.floor(at);
        if down == at {
            at
        } else {
            self.shift(down, 1)
        }
    }

    /// Short suffix used when printing lag values
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Day => "d",
            TimeUnit::QuarterDay => "q",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::QuarterDay => "quarter_day",
        }
    }
}

/// The task a task waits on, if any
///
/// Serialized as an optional task ID so stored tasks stay flat:
/// `"predecessor": "t-1234567"` or no field at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<TaskId>", into = "Option<TaskId>")]
pub enum Predecessor {
    #[default]
    None,
    Task(TaskId),
}

impl Predecessor {
    pub fn is_none(&self) -> bool {
        matches!(self, Predecessor::None)
    }

    /// Returns the referenced task ID
    pub fn id(&self) -> Option<&TaskId> {
        match self {
            Predecessor::None => None,
            Predecessor::Task(id) => Some(id),
        }
    }
}

impl From<Option<TaskId>> for Predecessor {
    fn from(value: Option<TaskId>) -> Self {
        match value {
            Some(id) => Predecessor::Task(id),
            None => Predecessor::None,
        }
    }
}

impl From<Predecessor> for Option<TaskId> {
    fn from(value: Predecessor) -> Self {
        match value {
            Predecessor::None => None,
            Predecessor::Task(id) => Some(id),
        }
    }
}

fn is_zero(val: &i64) -> bool {
    *val == 0
}

/// A schedulable unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Display label; only used as an ordering tie-break
    pub name: String,

    /// Manually planned start
    pub planned_start: DateTime<Utc>,

    /// Manually planned end (may precede the start; see [`Task::clamped_end`])
    pub planned_end: DateTime<Utc>,

    /// Finish-to-start predecessor
    #[serde(default, skip_serializing_if = "Predecessor::is_none")]
    pub predecessor: Predecessor,

    /// Units to wait after the predecessor ends
    #[serde(default, skip_serializing_if = "is_zero")]
    pub lag: i64,
}

impl Task {
    /// Creates an unconstrained task
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        planned_start: DateTime<Utc>,
        planned_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            planned_start,
            planned_end,
            predecessor: Predecessor::None,
            lag: 0,
        }
    }

    /// Builder form of [`Task::set_predecessor`]
    pub fn after(mut self, predecessor: TaskId, lag: i64) -> Self {
        self.set_predecessor(predecessor, lag);
        self
    }

    /// Makes this task wait for `predecessor` plus `lag` units
    pub fn set_predecessor(&mut self, predecessor: TaskId, lag: i64) {
        self.predecessor = Predecessor::Task(predecessor);
        self.lag = lag;
    }

    /// Removes the predecessor and resets lag; returns true if one was set
    pub fn clear_predecessor(&mut self) -> bool {
        let had = !self.predecessor.is_none();
        self.predecessor = Predecessor::None;
        self.lag = 0;
        had
    }

    /// Planned end, never earlier than the planned start
    pub fn clamped_end(&self) -> DateTime<Utc> {
        self.planned_end.max(self.planned_start)
    }

    /// Planned length in whole units, at least one
    pub fn duration_units(&self, unit: TimeUnit) -> i64 {
        unit.units_between(self.planned_start, self.clamped_end())
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    #[test]
    fn duration_is_whole_days() {
        let task = Task::new(id("t-1"), "Design", at(2, 0), at(7, 0));
        assert_eq!(task.duration_units(TimeUnit::Day), 5);
    }

    #[test]
    fn partial_days_truncate() {
        let task = Task::new(id("t-1"), "Design", at(2, 0), at(4, 23));
        assert_eq!(task.duration_units(TimeUnit::Day), 2);
        assert_eq!(task.duration_units(TimeUnit::QuarterDay), 11);
    }

    #[test]
    fn inverted_window_is_clamped() {
        let task = Task::new(id("t-1"), "Backwards", at(10, 0), at(3, 0));
        assert_eq!(task.clamped_end(), at(10, 0));
        assert_eq!(task.duration_units(TimeUnit::Day), 1);
    }

    #[test]
    fn zero_window_still_lasts_one_unit() {
        let task = Task::new(id("t-1"), "Milestone", at(5, 0), at(5, 0));
        assert_eq!(task.duration_units(TimeUnit::Day), 1);
        assert_eq!(task.duration_units(TimeUnit::QuarterDay), 1);
    }

    #[test]
    fn floor_and_ceil_quarter_day() {
        let unit = TimeUnit::QuarterDay;
        let t = Utc.with_ymd_and_hms(2025, 3, 2, 7, 30, 0).unwrap();

        assert_eq!(unit.floor(t), at(2, 6));
        assert_eq!(unit.ceil(t), at(2, 12));
        assert_eq!(unit.ceil(at(2, 18)), at(2, 18));
    }

    #[test]
    fn shift_saturates_instead_of_overflowing() {
        assert_eq!(TimeUnit::Day.shift(at(1, 0), 2), at(3, 0));
        assert_eq!(TimeUnit::QuarterDay.shift(at(1, 0), -1), at(1, 0) - Duration::hours(6));
        assert_eq!(TimeUnit::Day.shift(at(1, 0), i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(TimeUnit::Day.shift(at(1, 0), i64::MIN), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn floor_day_is_utc_midnight() {
        let t = Utc.with_ymd_and_hms(2025, 3, 2, 23, 59, 59).unwrap();
        assert_eq!(TimeUnit::Day.floor(t), at(2, 0));
        assert_eq!(TimeUnit::Day.ceil(t), at(3, 0));
    }

    #[test]
    fn predecessor_builder_and_clear() {
        let mut task = Task::new(id("t-2"), "Build", at(1, 0), at(3, 0)).after(id("t-1"), 2);
        assert_eq!(task.predecessor.id(), Some(&id("t-1")));
        assert_eq!(task.lag, 2);

        assert!(task.clear_predecessor());
        assert!(task.predecessor.is_none());
        assert_eq!(task.lag, 0);
        assert!(!task.clear_predecessor());
    }

    #[test]
    fn serialization_omits_empty_predecessor() {
        let task = Task::new(id("t-1"), "Solo", at(1, 0), at(2, 0));
        let json = serde_json::to_string(&task).unwrap();
        assert!(!json.contains("predecessor"));
        assert!(!json.contains("lag"));

        let linked = task.clone().after(id("t-0"), 1);
        let json = serde_json::to_string(&linked).unwrap();
        assert!(json.contains("\"predecessor\":\"t-0\""));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, linked);
    }

    #[test]
    fn deserializes_null_predecessor() {
        let json = r#"{"id":"t-1","name":"A","planned_start":"2025-03-01T00:00:00Z","planned_end":"2025-03-02T00:00:00Z","predecessor":null}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.predecessor.is_none());
    }
}
