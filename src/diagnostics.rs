// ABOUTME: Diagnostics accumulator for non-fatal warnings during a run.
// ABOUTME: Collects warnings that shouldn't fail a run but should be shown to users.

/// Collects non-fatal warnings during a run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// An optional hook failed or returned nothing.
    pub fn optional_hook_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OptionalHookFailed,
            message: message.into(),
        }
    }

    /// The plan ended up with no stacks at all.
    pub fn no_stacks_detected() -> Self {
        Self {
            kind: WarningKind::NoStacksDetected,
            message: "No stacks detected (error in config?)".to_string(),
        }
    }

    /// A destroy was requested without `--force`.
    pub fn destroy_not_forced() -> Self {
        Self {
            kind: WarningKind::DestroyNotForced,
            message: "not destroying anything without --force".to_string(),
        }
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// An optional hook raised an error or returned a falsy result.
    OptionalHookFailed,
    /// No stacks matched the config and targets.
    NoStacksDetected,
    /// Destroy ran as an outline only.
    DestroyNotForced,
}
