//! JSON layout scenarios.
//!
//! A scenario describes comment cards by anchor position and height; solving
//! it runs the layout engine once and reports where each card lands.
//!
//! ```json
//! { "comments": [{ "id": 1, "anchor": 150, "height": 80 }], "pinned": 1 }
//! ```
//!
//! Cards without a height are registered but not measured, so they are left
//! out of the layout just like an unrendered card would be.

use crate::layout::{Annotation, FixedAnnotation, LayoutController, LayoutParams};
use crate::model::LocalId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Errors reading or validating a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario file does not exist.
    #[error("Scenario file not found: {path:?}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// I/O error while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON or wrong shape.
    #[error("Invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two comments share an id.
    #[error("Duplicate comment id {0}")]
    DuplicateId(u64),

    /// An anchor or height is not a usable number.
    #[error("Comment {id} has invalid {field}: {value}")]
    InvalidNumber {
        /// Comment id.
        id: u64,
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// One comment card in a scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioComment {
    /// Comment id.
    pub id: u64,
    /// Desired position of the annotation, before the offset.
    pub anchor: f64,
    /// Measured card height; absent means not rendered yet.
    #[serde(default)]
    pub height: Option<f64>,
}

/// A layout problem.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Cards in registration order.
    pub comments: Vec<ScenarioComment>,
    /// Pinned comment id.
    #[serde(default)]
    pub pinned: Option<u64>,
}

/// Where one card landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    /// Comment id.
    pub id: u64,
    /// Top offset in pixels.
    pub top: f64,
}

/// Solved layout, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutReport {
    /// Placements of every laid-out card.
    pub positions: Vec<Placement>,
}

impl LayoutReport {
    /// Serialize as JSON.
    ///
    /// # Errors
    ///
    /// Serialization failure (not expected for finite positions).
    pub fn to_json(&self, pretty: bool) -> Result<String, ScenarioError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

impl Scenario {
    /// Parse and validate a scenario from JSON text.
    ///
    /// # Errors
    ///
    /// Malformed JSON, duplicate ids, or non-finite / negative numbers.
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read a scenario from any reader (e.g. stdin).
    ///
    /// # Errors
    ///
    /// I/O errors plus everything [`from_json`](Self::from_json) reports.
    pub fn read(mut reader: impl Read) -> Result<Self, ScenarioError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json(&text)
    }

    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Missing file, I/O errors, and everything [`from_json`](Self::from_json)
    /// reports.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        let mut seen = HashSet::new();
        for comment in &self.comments {
            if !seen.insert(comment.id) {
                return Err(ScenarioError::DuplicateId(comment.id));
            }
            if !comment.anchor.is_finite() {
                return Err(ScenarioError::InvalidNumber {
                    id: comment.id,
                    field: "anchor",
                    value: comment.anchor,
                });
            }
            if let Some(height) = comment.height {
                if !height.is_finite() || height < 0.0 {
                    return Err(ScenarioError::InvalidNumber {
                        id: comment.id,
                        field: "height",
                        value: height,
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the layout engine over the scenario.
    ///
    /// `pin` overrides the scenario's own pin when given.
    pub fn solve(&self, params: LayoutParams, pin: Option<u64>) -> LayoutReport {
        let mut layout = LayoutController::new(params);

        // The layout only holds weak handles; keep the anchors alive here.
        let anchors: Vec<Rc<dyn Annotation>> = self
            .comments
            .iter()
            .map(|comment| {
                let id = LocalId::new(comment.id);
                let anchor: Rc<dyn Annotation> = Rc::new(FixedAnnotation::new(comment.anchor));
                layout.set_annotation(id, &anchor);
                layout.register_comment(id);
                if let Some(height) = comment.height {
                    layout.set_height(id, height);
                }
                anchor
            })
            .collect();

        layout.set_pinned(pin.or(self.pinned).map(LocalId::new));
        layout.refresh();

        tracing::debug!(
            comments = anchors.len(),
            placed = layout.positions().len(),
            "scenario solved"
        );

        LayoutReport {
            positions: layout
                .positions()
                .into_iter()
                .map(|(id, top)| Placement { id: id.get(), top })
                .collect(),
        }
    }
}
