//! # Scheduling Context
//!
//! Everything one pass owns: the cluster model, the color and action arenas,
//! and the diagnostics collected along the way. A context is built at the
//! start of a pass and dropped at the end; nothing survives between passes.

use crate::allocate::ColorDetails;
use crate::model::ClusterModel;
use crate::synth::ActionTable;
use crate::types::ColorId;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Recoverable problems found during a pass.
///
/// Each entry is also emitted as a `tracing` event when recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub config_errors: Vec<String>,
    pub config_warnings: Vec<String>,
    pub processing_errors: Vec<String>,
    pub processing_warnings: Vec<String>,
}

impl Diagnostics {
    /// A constraint or definition was skipped.
    pub fn config_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(kind = "config", "{}", message);
        self.config_errors.push(message);
    }

    pub fn config_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = "config", "{}", message);
        self.config_warnings.push(message);
    }

    /// Something in the cluster state needs operator attention.
    pub fn processing_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(kind = "processing", "{}", message);
        self.processing_errors.push(message);
    }

    pub fn processing_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = "processing", "{}", message);
        self.processing_warnings.push(message);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.config_errors.is_empty() || !self.processing_errors.is_empty()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.has_errors()
            && self.config_warnings.is_empty()
            && self.processing_warnings.is_empty()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// State of one scheduling pass.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub model: ClusterModel,
    pub colors: Vec<ColorDetails>,
    pub actions: ActionTable,
    pub diagnostics: Diagnostics,
}

impl SchedulingContext {
    #[must_use]
    pub fn new(model: ClusterModel, diagnostics: Diagnostics) -> Self {
        Self {
            model,
            colors: Vec::new(),
            actions: ActionTable::default(),
            diagnostics,
        }
    }

    /// Allocate a new color.
    pub fn new_color(&mut self, details: ColorDetails) -> ColorId {
        let id = ColorId(self.colors.len() as u32);
        let mut details = details;
        details.id = id;
        self.colors.push(details);
        id
    }

    #[must_use]
    pub fn color(&self, id: ColorId) -> &ColorDetails {
        &self.colors[id.index()]
    }

    pub fn color_mut(&mut self, id: ColorId) -> &mut ColorDetails {
        &mut self.colors[id.index()]
    }
}

// =============================================================================
// TESTS
// =============================================================================
