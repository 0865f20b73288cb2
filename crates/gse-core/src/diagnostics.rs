//! Non-fatal findings collected while building the model.
//!
//! Structural problems are hard errors ([`crate::StructuralError`]). Anything
//! that is legal but suspicious (a line switched open at both ends, a sensor
//! on a disconnected terminal) is recorded here instead so the caller can
//! surface it without aborting the estimation.
//!
//! ```
//! use gse_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("topology", "line is open at both ends", "line 3");
//! assert_eq!(diag.warning_count(), 1);
//! ```

use serde::Serialize;

/// Category of findings about the switching state of the network.
pub const TOPOLOGY: &str = "topology";
/// Category of findings about sensors and their terminals.
pub const MEASUREMENT: &str = "measurement";

/// Every category the model builders emit, in reporting order.
pub const CATEGORIES: [&str; 2] = [TOPOLOGY, MEASUREMENT];

/// A single diagnostic finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    /// Category for grouping (e.g. "topology", "measurement")
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g. "line 3", "sensor 14")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[warning:{}] {}", self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Collection of warnings for one model build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    /// Add a warning with entity reference
    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len()
    }

    pub fn has_warnings(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        match self.warning_count() {
            0 => "No issues".to_string(),
            1 => "1 warning".to_string(),
            w => format!("{} warnings", w),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
