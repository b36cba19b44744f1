//! Outbound port between the engine and its host.
//!
//! The engine never touches audio, haptics or rendering directly. A host
//! (terminal, GUI, test recorder) implements [`EnginePort`] and receives one
//! call per notification kind. The option hooks have defaults so simple
//! hosts only implement the notifications.

use crate::{Cue, EngineState, RepeatProgress, VibratePattern};

/// Notifications and host options consumed by the engine
pub trait EnginePort {
    fn on_state_change(&mut self, state: &EngineState);
    fn on_play_sound(&mut self, cue: Cue);
    fn on_vibrate(&mut self, pattern: VibratePattern);
    /// Animate the breath ring toward `target` (0 closed, 1 open)
    fn on_animate_breath(&mut self, target: f64, duration_secs: f64);
    fn on_haptic(&mut self);
    fn on_pause_change(&mut self, paused: bool);
    fn on_repeat_change(&mut self, progress: Option<RepeatProgress>);

    /// Exercise to select when the engine is built
    fn initial_exercise_index(&self) -> usize {
        0
    }

    /// Persist the selected exercise
    fn save_exercise_index(&mut self, _index: usize) {}

    fn is_sound_enabled(&self) -> bool {
        true
    }

    fn is_haptics_enabled(&self) -> bool {
        true
    }
}
