//! Countdown / count-up helper shared by hold, inhale, exhale and text steps.
//!
//! A finite step counts down from `count` to `00` and then completes once.
//! An open-ended step (count 0) counts up every second and never completes;
//! the user advances it.

use crate::scheduler::{JobOptions, JobQueue};

const SECOND_MS: u64 = 1000;

/// Scheduled work for a timed step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimedStepJob {
    /// Countdown tick showing `remaining` seconds
    Tick { remaining: u32 },
    /// Countdown finished; runs after the final tick at the same timestamp
    Complete,
    /// Self-repeating count-up tick
    CountUp,
}

/// What the owner of a timed step should do with a fired job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimedStepEvent {
    Sublabel(String),
    Complete,
}

/// Zero-padded seconds as shown in sublabels
pub fn pad(seconds: u32) -> String {
    format!("{:02}", seconds)
}

/// Running state of one timed step
#[derive(Clone, Debug)]
pub struct TimedStep {
    count: u32,
    elapsed: u32,
    completed: bool,
}

impl TimedStep {
    /// Schedule the step's jobs on `queue`
    ///
    /// Returns the executor and the initial sublabel, which the caller
    /// emits immediately.
    pub fn begin<J, Q>(count: u32, queue: &mut Q) -> (Self, String)
    where
        J: From<TimedStepJob>,
        Q: JobQueue<J>,
    {
        if count > 0 {
            for t in 1..=count {
                queue.add_job(
                    u64::from(t) * SECOND_MS,
                    TimedStepJob::Tick {
                        remaining: count - t,
                    }
                    .into(),
                    JobOptions::priority(0).label("countdown"),
                );
            }
            queue.add_job(
                u64::from(count) * SECOND_MS,
                TimedStepJob::Complete.into(),
                JobOptions::priority(1).label("countdown-complete"),
            );
        } else {
            queue.add_job(
                SECOND_MS,
                TimedStepJob::CountUp.into(),
                JobOptions::repeating(SECOND_MS).label("count-up"),
            );
        }

        let step = Self {
            count,
            elapsed: 0,
            completed: false,
        };
        (step, pad(count))
    }

    pub fn is_open_ended(&self) -> bool {
        self.count == 0
    }

    /// Apply a fired job; `None` once the step has already completed
    pub fn on_job(&mut self, job: TimedStepJob) -> Option<TimedStepEvent> {
        if self.completed {
            return None;
        }
        match job {
            TimedStepJob::Tick { remaining } => Some(TimedStepEvent::Sublabel(pad(remaining))),
            TimedStepJob::Complete => {
                self.completed = true;
                Some(TimedStepEvent::Complete)
            }
            TimedStepJob::CountUp => {
                self.elapsed += 1;
                Some(TimedStepEvent::Sublabel(pad(self.elapsed)))
            }
        }
    }
}
