//! Job scheduler driven by a logical clock.
//!
//! Jobs are payload values tagged with an execution timestamp and a
//! priority. The host advances the clock with [`JobQueue::advance_clock`]
//! on its own timer and then drains due jobs with [`JobQueue::pop_due`].
//! While the scheduler is inactive the clock is frozen and new jobs are
//! dropped.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Options for [`JobQueue::add_job`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobOptions {
    /// Lower runs first among jobs with the same timestamp
    pub priority: u8,
    /// Re-enqueue interval in milliseconds, 0 for one-shot jobs
    pub repeat_ms: u64,
    pub label: &'static str,
}

impl JobOptions {
    pub fn priority(priority: u8) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn repeating(repeat_ms: u64) -> Self {
        Self {
            repeat_ms,
            ..Self::default()
        }
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

/// Scheduler-shaped collaborator used by the engine
pub trait JobQueue<J> {
    fn start(&mut self);
    fn stop(&mut self);
    fn toggle(&mut self);
    fn is_active(&self) -> bool;
    /// Clear all jobs, stop, and rewind the clock to 0
    fn reset(&mut self);
    /// Schedule `payload` at `now + delay_ms`; ignored while inactive
    fn add_job(&mut self, delay_ms: u64, payload: J, options: JobOptions);
    /// Drop all pending jobs without touching the clock or active flag
    fn clear_jobs(&mut self);
    /// Advance the logical clock; ignored while inactive
    fn advance_clock(&mut self, delta_ms: u64);
    /// Remove and return the next job due at or before `now`
    fn pop_due(&mut self) -> Option<J>;
    fn now_ms(&self) -> u64;
}

/// Heap entry; ordering is (timestamp, priority, insertion sequence)
struct Job<J> {
    timestamp: u64,
    priority: u8,
    seq: u64,
    repeat_ms: u64,
    label: &'static str,
    payload: J,
}

impl<J> Job<J> {
    fn key(&self) -> (u64, u8, u64) {
        (self.timestamp, self.priority, self.seq)
    }
}

impl<J> PartialEq for Job<J> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<J> Eq for Job<J> {}

impl<J> PartialOrd for Job<J> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<J> Ord for Job<J> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Discrete-event scheduler with a pausable logical clock
pub struct Scheduler<J> {
    active: bool,
    now_ms: u64,
    seq: u64,
    jobs: BinaryHeap<Reverse<Job<J>>>,
}

impl<J> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> Scheduler<J> {
    pub fn new() -> Self {
        Self {
            active: false,
            now_ms: 0,
            seq: 0,
            jobs: BinaryHeap::new(),
        }
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn push(
        &mut self,
        timestamp: u64,
        priority: u8,
        repeat_ms: u64,
        label: &'static str,
        payload: J,
    ) {
        let seq = self.seq;
        self.seq += 1;
        self.jobs.push(Reverse(Job {
            timestamp,
            priority,
            seq,
            repeat_ms,
            label,
            payload,
        }));
    }
}

impl<J: Clone> JobQueue<J> for Scheduler<J> {
    fn start(&mut self) {
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn toggle(&mut self) {
        self.active = !self.active;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.clear_jobs();
        self.active = false;
        self.now_ms = 0;
    }

    fn add_job(&mut self, delay_ms: u64, payload: J, options: JobOptions) {
        if !self.active {
            tracing::trace!("Scheduler inactive, dropping job {:?}", options.label);
            return;
        }
        let timestamp = self.now_ms + delay_ms;
        self.push(
            timestamp,
            options.priority,
            options.repeat_ms,
            options.label,
            payload,
        );
    }

    fn clear_jobs(&mut self) {
        self.jobs.clear();
    }

    fn advance_clock(&mut self, delta_ms: u64) {
        if self.active {
            self.now_ms += delta_ms;
        }
    }

    fn pop_due(&mut self) -> Option<J> {
        if !self.active {
            return None;
        }
        let due = self
            .jobs
            .peek()
            .is_some_and(|Reverse(job)| job.timestamp <= self.now_ms);
        if !due {
            return None;
        }
        let Reverse(job) = self.jobs.pop()?;
        tracing::trace!("Running job {:?} due at {}ms", job.label, job.timestamp);

        // The next occurrence is queued before the payload runs, so a
        // clear_jobs() issued by the payload cancels it.
        if job.repeat_ms > 0 {
            self.push(
                self.now_ms + job.repeat_ms,
                job.priority,
                job.repeat_ms,
                job.label,
                job.payload.clone(),
            );
        }
        Some(job.payload)
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler<&'static str>) -> Vec<&'static str> {
        std::iter::from_fn(|| s.pop_due()).collect()
    }

    #[test]
    fn test_add_job_ignored_while_inactive() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.add_job(0, "a", JobOptions::default());
        assert!(s.is_empty());

        s.start();
        s.add_job(0, "a", JobOptions::default());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_jobs_run_in_timestamp_then_priority_order() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(1000, "complete", JobOptions::priority(1));
        s.add_job(1000, "tick", JobOptions::priority(0));
        s.add_job(500, "early", JobOptions::default());
        s.add_job(1000, "tick-2", JobOptions::priority(0));

        s.advance_clock(900);
        assert_eq!(drain(&mut s), vec!["early"]);

        s.advance_clock(100);
        assert_eq!(drain(&mut s), vec!["tick", "tick-2", "complete"]);
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(200, "a", JobOptions::default());

        s.advance_clock(100);
        s.toggle();
        assert!(!s.is_active());
        s.advance_clock(1000);
        assert_eq!(s.now_ms(), 100);
        assert!(s.pop_due().is_none());

        s.toggle();
        s.advance_clock(100);
        assert_eq!(drain(&mut s), vec!["a"]);
    }

    #[test]
    fn test_repeating_job_reenqueues() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(1000, "count", JobOptions::repeating(1000));

        let mut fired = 0;
        for _ in 0..35 {
            s.advance_clock(100);
            fired += drain(&mut s).len();
        }
        assert_eq!(fired, 3);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_clear_jobs_keeps_clock_and_flag() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(100, "a", JobOptions::repeating(100));
        s.advance_clock(50);
        s.clear_jobs();

        assert!(s.is_empty());
        assert!(s.is_active());
        assert_eq!(s.now_ms(), 50);
    }

    #[test]
    fn test_clear_during_drain_cancels_repeat() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(100, "repeat", JobOptions::repeating(100));
        s.advance_clock(100);

        assert_eq!(s.pop_due(), Some("repeat"));
        s.clear_jobs();
        s.advance_clock(100);
        assert!(s.pop_due().is_none());
    }

    #[test]
    fn test_reset_rewinds() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(100, "a", JobOptions::default());
        s.advance_clock(300);
        s.reset();

        assert!(!s.is_active());
        assert_eq!(s.now_ms(), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn test_zero_delay_job_added_mid_drain_runs_same_tick() {
        let mut s: Scheduler<&'static str> = Scheduler::new();
        s.start();
        s.add_job(100, "first", JobOptions::default());
        s.advance_clock(100);

        assert_eq!(s.pop_due(), Some("first"));
        s.add_job(0, "follow-up", JobOptions::default());
        assert_eq!(s.pop_due(), Some("follow-up"));
    }
}
