//! Resource capacity ledger over non-aggregated usage intervals.
//!
//! Each resource carries the raw list of reservations it has accepted.
//! Intervals are deliberately never merged: overlapping commitments stack
//! at query time, and exact-match removal keeps every allocation
//! individually releasable.

use chrono::{Days, NaiveDate};

use crate::config::PlanningConfig;
use crate::error::ScheduleError;
use crate::models::{Resource, TaskId, UsageInterval};

impl Resource {
    /// Whether `quantity` more units fit over `[start, end)` at every
    /// instant, given the already committed intervals.
    ///
    /// The load profile only changes at interval boundaries, so it is
    /// enough to evaluate the stacked load at `start` and at each
    /// committed interval start inside the window.
    pub fn has_capacity(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Result<bool, ScheduleError> {
        self.validate_request(start, end, quantity)?;
        Ok(self.peak_load(start, end) + quantity <= self.capacity)
    }

    /// Commits a reservation after re-validating capacity.
    pub fn add_usage(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
        task: TaskId,
    ) -> Result<(), ScheduleError> {
        if !self.has_capacity(start, end, quantity)? {
            return Err(ScheduleError::CapacityExceeded {
                resource: self.id,
                capacity: self.capacity,
                requested: self.peak_load(start, end) + quantity,
            });
        }
        self.usage.push(UsageInterval {
            start,
            end,
            quantity,
            task,
        });
        Ok(())
    }

    /// Commits a reservation without the capacity check.
    ///
    /// Only the forced-assignment path uses this; the resulting overload
    /// is intentional and observable in the ledger.
    pub fn add_usage_forced(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
        task: TaskId,
    ) -> Result<(), ScheduleError> {
        if quantity == 0 || start >= end {
            return Err(ScheduleError::InvalidRequest(format!(
                "malformed usage [{start}, {end}) x{quantity} on resource {}",
                self.id
            )));
        }
        self.usage.push(UsageInterval {
            start,
            end,
            quantity,
            task,
        });
        Ok(())
    }

    /// Releases one reservation matching all four fields exactly.
    ///
    /// Duplicates held by other tasks are left untouched.
    pub fn remove_usage(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
        task: TaskId,
    ) -> Result<(), ScheduleError> {
        let target = UsageInterval {
            start,
            end,
            quantity,
            task,
        };
        let position = self
            .usage
            .iter()
            .position(|u| *u == target)
            .ok_or(ScheduleError::UsageNotFound(self.id))?;
        self.usage.remove(position);
        Ok(())
    }

    /// Releases the reservation held by `task`, wherever its window now
    /// sits, and returns it.
    ///
    /// A recomputation can move a committed task's window after another
    /// task is edited, so releases key on the task id rather than the
    /// recorded dates.
    pub fn remove_usage_for_task(&mut self, task: TaskId) -> Result<UsageInterval, ScheduleError> {
        let position = self
            .usage
            .iter()
            .position(|u| u.task == task)
            .ok_or(ScheduleError::UsageNotFound(self.id))?;
        Ok(self.usage.remove(position))
    }

    /// First date `d >= from` such that `[d, d + duration_days)` has room
    /// for `quantity` units.
    ///
    /// The stacked load can only drop at an interval end, so candidates
    /// are `from` plus every committed end date; with no usage this
    /// returns `from` immediately. The scan is bounded by the configured
    /// horizon.
    pub fn next_available_date(
        &self,
        duration_days: u32,
        quantity: u32,
        from: NaiveDate,
        config: &PlanningConfig,
    ) -> Result<NaiveDate, ScheduleError> {
        if duration_days == 0 {
            return Err(ScheduleError::InvalidRequest(format!(
                "zero-duration availability query on resource {}",
                self.id
            )));
        }
        let horizon = from + chrono::Duration::days(config.scan_horizon_days);

        let mut candidates: Vec<NaiveDate> = self
            .usage
            .iter()
            .map(|u| u.end)
            .filter(|&end| end > from && end <= horizon)
            .collect();
        candidates.push(from);
        candidates.sort();
        candidates.dedup();

        for candidate in candidates {
            let end = candidate
                .checked_add_days(Days::new(duration_days as u64))
                .ok_or_else(|| {
                    ScheduleError::InvalidRequest(format!(
                        "date overflow scanning resource {}",
                        self.id
                    ))
                })?;
            if self.has_capacity(candidate, end, quantity)? {
                return Ok(candidate);
            }
        }

        Err(ScheduleError::InvalidRequest(format!(
            "no available date on resource {} within {} days",
            self.id, config.scan_horizon_days
        )))
    }

    /// Highest stacked load over the half-open window.
    fn peak_load(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        // Critical points: the window start and each committed start
        // inside the window.
        let mut peak = self.load_at(start);
        for interval in &self.usage {
            if interval.start > start && interval.start < end {
                peak = peak.max(self.load_at(interval.start));
            }
        }
        peak
    }

    /// Stacked quantity committed at one instant.
    fn load_at(&self, instant: NaiveDate) -> u32 {
        self.usage
            .iter()
            .filter(|u| u.covers(instant))
            .map(|u| u.quantity)
            .sum()
    }

    fn validate_request(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    ) -> Result<(), ScheduleError> {
        if quantity == 0 || quantity > self.capacity {
            return Err(ScheduleError::InvalidRequest(format!(
                "quantity {quantity} out of range 1..={} for resource {}",
                self.capacity, self.id
            )));
        }
        if start >= end {
            return Err(ScheduleError::InvalidRequest(format!(
                "empty interval [{start}, {end}) on resource {}",
                self.id
            )));
        }
        Ok(())
    }
}
