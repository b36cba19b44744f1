//! Exercise catalog: built-in routines and JSON catalog files.
//!
//! A catalog file is a JSON array of exercises in the step wire format,
//! e.g. `[{"id": "box", "name": "Box", "loopable": true, "seq": [...]}]`.

use crate::config::Config;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Ordered list of exercises offered to the engine
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

/// Cached default catalog - built once and reused
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn breath(value: [f64; 4], count: u32) -> Step {
    Step::Breath {
        value,
        count,
        ramp: None,
    }
}

fn text(text: &str, count: u32) -> Step {
    Step::Text {
        text: text.into(),
        count,
        ramp: None,
    }
}

/// Builds the built-in exercises
///
/// Prefer `get_default_catalog()` outside of tests.
pub fn build_default_catalog() -> Catalog {
    let exercises = vec![
        Exercise {
            id: "box".into(),
            name: "Box Breathing".into(),
            loopable: true,
            seq: vec![breath([4.0, 4.0, 4.0, 4.0], 8)],
        },
        Exercise {
            id: "4-7-8".into(),
            name: "4-7-8 Relaxing Breath".into(),
            loopable: false,
            seq: vec![breath([4.0, 7.0, 8.0, 0.0], 4)],
        },
        Exercise {
            id: "coherent".into(),
            name: "Coherent Breathing".into(),
            loopable: true,
            // Runs until the user moves on
            seq: vec![breath([5.5, 0.0, 5.5, 0.0], 0)],
        },
        Exercise {
            id: "sigh".into(),
            name: "Physiological Sigh".into(),
            loopable: true,
            seq: vec![
                Step::DoubleInhale {
                    value: [2.0, 0.5, 1.0],
                },
                Step::Exhale {
                    count: 6,
                    ramp: None,
                },
                Step::Repeat {
                    value: [2],
                    count: 5,
                    ramp: None,
                },
            ],
        },
        Exercise {
            id: "retention".into(),
            name: "Paced Retention".into(),
            loopable: false,
            seq: vec![
                text("Settle in", 5),
                breath([1.5, 0.0, 1.5, 0.0], 30),
                Step::Exhale {
                    count: 2,
                    ramp: None,
                },
                Step::Hold {
                    count: 30,
                    ramp: Some(1.5),
                },
                Step::Inhale {
                    count: 2,
                    ramp: None,
                },
                Step::Hold {
                    count: 15,
                    ramp: None,
                },
                Step::Repeat {
                    value: [5],
                    count: 3,
                    ramp: None,
                },
                text("Breathe normally", 10),
            ],
        },
    ];

    Catalog { exercises }
}

impl Catalog {
    /// Parse and validate a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }
        Ok(catalog)
    }

    /// Load a catalog file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        tracing::debug!(
            "Loaded {} exercises from {}",
            catalog.exercises.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Catalog selected by config: the configured file, else the built-ins
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.exercises.file {
            Some(path) => Self::load_from(path),
            None => Ok(get_default_catalog().clone()),
        }
    }

    /// Resolve an exercise by id, falling back to a numeric index
    pub fn find(&self, query: &str) -> Result<(usize, &Exercise)> {
        if let Some(found) = self.exercises.iter().enumerate().find(|(_, e)| e.id == query) {
            return Ok(found);
        }
        query
            .parse::<usize>()
            .ok()
            .and_then(|index| self.exercises.get(index).map(|e| (index, e)))
            .ok_or_else(|| Error::UnknownExercise(query.to_string()))
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (index, exercise) in self.exercises.iter().enumerate() {
            let id = &exercise.id;
            if id.is_empty() {
                errors.push(format!("Exercise #{} has empty ID", index));
            } else if !seen.insert(id.as_str()) {
                errors.push(format!("Duplicate exercise ID '{}'", id));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.seq.is_empty() {
                errors.push(format!("Exercise '{}' has no steps", id));
            }

            for (step_index, step) in exercise.seq.iter().enumerate() {
                let durations: &[f64] = match step {
                    Step::Breath { value, .. } => value,
                    Step::DoubleInhale { value } => value,
                    _ => &[],
                };
                if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
                    errors.push(format!(
                        "Exercise '{}' step {}: {} durations must be finite and >= 0",
                        id,
                        step_index,
                        step.kind()
                    ));
                }

                if let Some((_, Some(ramp))) = step.count_and_ramp() {
                    if !ramp.is_finite() || ramp <= 0.0 {
                        errors.push(format!(
                            "Exercise '{}' step {}: ramp {} must be finite and > 0",
                            id, step_index, ramp
                        ));
                    }
                }

                if let Step::Repeat { value: [0], .. } = step {
                    errors.push(format!(
                        "Exercise '{}' step {}: repeat lookback is 0",
                        id, step_index
                    ));
                }

                if let Step::Breath { value, .. } = step {
                    if value.iter().all(|d| *d == 0.0) {
                        errors.push(format!(
                            "Exercise '{}' step {}: breath step has no timed phase",
                            id, step_index
                        ));
                    }
                }
            }

            if !exercise.seq.is_empty() && exercise.seq.iter().all(Step::is_repeat) {
                errors.push(format!("Exercise '{}' has only repeat steps", id));
            }
        }

        errors
    }
}
