use chrono::Timelike;
use crate::config::ScheduleConfig;

/// Hour-based gate deciding when scanning and cleaning may happen.
///
/// Holds no state beyond the configured hours; every check is recomputed
/// from the time passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionWindow {
    enabled: bool,
    start_hour: u32,
    end_hour: u32,
}

impl ExecutionWindow {
    pub fn new(schedule: &ScheduleConfig) -> Self {
        Self {
            enabled: schedule.enabled,
            start_hour: schedule.start_hour,
            end_hour: schedule.end_hour,
        }
    }

    /// A window that never closes
    pub fn always_open() -> Self {
        Self {
            enabled: false,
            start_hour: 0,
            end_hour: 0,
        }
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn wraps_midnight(&self) -> bool {
        self.start_hour > self.end_hour
    }

    /// True while `now` lies inside `[start, end)`
    pub fn may_scan_now<T: Timelike>(&self, now: &T) -> bool {
        self.may_scan_at_hour(now.hour())
    }

    /// True unless `now` is at or past the end boundary.
    ///
    /// Work queued shortly before the window opens is still allowed to start.
    pub fn may_start_work_now<T: Timelike>(&self, now: &T) -> bool {
        self.may_start_work_at_hour(now.hour())
    }

    pub fn may_scan_at_hour(&self, hour: u32) -> bool {
        if !self.enabled {
            return true;
        }
        if self.wraps_midnight() {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            self.start_hour <= hour && hour < self.end_hour
        }
    }

    pub fn may_start_work_at_hour(&self, hour: u32) -> bool {
        if !self.enabled {
            return true;
        }
        if self.wraps_midnight() {
            hour < self.end_hour || hour >= self.start_hour
        } else {
            hour < self.end_hour
        }
    }
}
