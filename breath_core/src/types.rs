//! Core domain types for the breathing exercise engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their steps (the authored wire format)
//! - Sound cues and vibration patterns
//! - Observable engine state and repeat progress

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Exercise Definitions
// ============================================================================

/// One step of an exercise sequence
///
/// Serialized with a `type` discriminator, e.g.
/// `{"type": "breath", "value": [4, 4, 4, 4], "count": 10}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Step {
    /// Paced breathing: `[inhale, hold, exhale, hold]` seconds per cycle.
    /// A `count` of 0 cycles runs until the user advances.
    Breath {
        value: [f64; 4],
        #[serde(default)]
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
    Inhale {
        #[serde(default)]
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
    Exhale {
        #[serde(default)]
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
    Hold {
        #[serde(default)]
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
    /// On-screen text shown for `count` seconds
    Text {
        text: String,
        #[serde(default)]
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
    /// `[first inhale, pause, second inhale]` seconds, never ramped
    DoubleInhale { value: [f64; 3] },
    /// Replays the `value[0]` preceding steps until the block has run
    /// `count` times in total
    Repeat {
        value: [usize; 1],
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ramp: Option<f64>,
    },
}

impl Step {
    /// Authored count and ramp, if this step type has them
    pub fn count_and_ramp(&self) -> Option<(u32, Option<f64>)> {
        match self {
            Step::Breath { count, ramp, .. }
            | Step::Inhale { count, ramp }
            | Step::Exhale { count, ramp }
            | Step::Hold { count, ramp }
            | Step::Text { count, ramp, .. }
            | Step::Repeat { count, ramp, .. } => Some((*count, *ramp)),
            Step::DoubleInhale { .. } => None,
        }
    }

    /// Count after applying the ramp for the given sequence loop
    ///
    /// `None` for step types with fixed timing (double inhale).
    pub fn effective_count(&self, loop_index: u32) -> Option<u32> {
        self.count_and_ramp()
            .map(|(count, ramp)| crate::ramp::effective_count(count, ramp, loop_index))
    }

    /// Wire name of the step type
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Breath { .. } => "breath",
            Step::Inhale { .. } => "inhale",
            Step::Exhale { .. } => "exhale",
            Step::Hold { .. } => "hold",
            Step::Text { .. } => "text",
            Step::DoubleInhale { .. } => "double-inhale",
            Step::Repeat { .. } => "repeat",
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Step::Repeat { .. })
    }

    pub fn is_breath(&self) -> bool {
        matches!(self, Step::Breath { .. })
    }
}

/// A complete exercise definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub loopable: bool,
    pub seq: Vec<Step>,
}

// ============================================================================
// Side-effect Types
// ============================================================================

/// Named sound trigger associated with a phase
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    Inhale,
    Exhale,
    Hold,
}

impl Cue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::Inhale => "inhale",
            Cue::Exhale => "exhale",
            Cue::Hold => "hold",
        }
    }
}

/// Cue (and label) of each breath phase: inhale, hold, exhale, hold
pub const BREATH_PHASE_CUES: [Cue; 4] = [Cue::Inhale, Cue::Hold, Cue::Exhale, Cue::Hold];

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vibration patterns emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibratePattern {
    /// Start of a breath phase
    PhaseChange,
    /// Pause between the two halves of a double inhale
    Light,
    /// Last phase of a breath step followed by another breath step
    SameStepType,
    /// Last phase of a breath step followed by a different step type
    StepTypeChange,
}

impl VibratePattern {
    /// Get timing pattern in milliseconds
    pub fn timings(&self) -> &'static [u32] {
        match self {
            Self::PhaseChange => &[100],
            Self::Light => &[50],
            Self::SameStepType => &[400],
            Self::StepTypeChange => &[300, 300],
        }
    }
}

// ============================================================================
// Observable State
// ============================================================================

/// Which face the UI should render, with its labels
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct EngineState {
    pub label: String,
    pub sublabel: String,
    pub is_breathing: bool,
    pub is_text: bool,
    pub is_hie: bool,
}

impl EngineState {
    pub fn breathing(label: impl Into<String>, sublabel: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sublabel: sublabel.into(),
            is_breathing: true,
            ..Self::default()
        }
    }

    pub fn text(label: impl Into<String>, sublabel: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sublabel: sublabel.into(),
            is_text: true,
            ..Self::default()
        }
    }

    pub fn hie(label: impl Into<String>, sublabel: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sublabel: sublabel.into(),
            is_hie: true,
            ..Self::default()
        }
    }
}

/// Progress through a repeat block; `round` counts the in-line pass as 1
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct RepeatProgress {
    pub round: u32,
    pub total: u32,
}
