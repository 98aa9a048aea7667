/// One task's time spent on a single day, as reported by TimeFlip.
///
/// `total_time_min` is derived from `total_time_sec` in `from_seconds` and
/// is recomputed on every normalization pass; it is never stored on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskDuration {
    pub name: String,
    pub total_time_sec: u64,
    pub total_time_min: u64,
}

impl TaskDuration {
    pub fn from_seconds(name: String, total_time_sec: u64) -> Self {
        Self {
            name,
            total_time_sec,
            total_time_min: round_to_minutes(total_time_sec),
        }
    }

    /// Only active tasks are ever written to a note. A task can legitimately
    /// appear in a report with under half a minute of tracked time.
    pub fn is_active(&self) -> bool {
        self.total_time_min > 0
    }
}

/// Rounds seconds to whole minutes, half-up.
pub fn round_to_minutes(seconds: u64) -> u64 {
    (seconds + 30) / 60
}

/// Normalized record of one calendar date's task durations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyReport {
    pub date_str: String,
    pub tasks: Vec<TaskDuration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_to_minutes(0), 0);
        assert_eq!(round_to_minutes(29), 0);
        assert_eq!(round_to_minutes(30), 1);
        assert_eq!(round_to_minutes(89), 1);
        assert_eq!(round_to_minutes(90), 2);
        assert_eq!(round_to_minutes(1850), 31);
    }

    #[test]
    fn from_seconds_derives_minutes() {
        let task = TaskDuration::from_seconds("Writing".to_string(), 1850);
        assert_eq!(task.total_time_sec, 1850);
        assert_eq!(task.total_time_min, 31);
        assert!(task.is_active());
    }

    #[test]
    fn sub_half_minute_task_is_inactive() {
        let task = TaskDuration::from_seconds("Blip".to_string(), 29);
        assert_eq!(task.total_time_min, 0);
        assert!(!task.is_active());
    }
}
