//! Structured outcomes of executed operations

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by all backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Success,
    /// Target (or a parent of it) is absent
    NotFound,
    /// Create or move collided with an existing entry
    AlreadyExists,
    /// Target is held by another process; retrying may succeed
    Busy,
    PermissionDenied,
    /// The shell itself reported the request as unsupported
    Unsupported,
    /// Failure text no rule recognized, or the process timed out
    Unknown,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Success => "success",
            Category::NotFound => "not found",
            Category::AlreadyExists => "already exists",
            Category::Busy => "busy",
            Category::PermissionDenied => "permission denied",
            Category::Unsupported => "unsupported",
            Category::Unknown => "unknown failure",
        };
        f.write_str(name)
    }
}

/// Category plus the raw backend text it was derived from.
///
/// The raw text is kept because free-text classification is lossy;
/// assertion messages should always include it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedOutcome {
    category: Category,
    raw_text: String,
}

impl ClassifiedOutcome {
    pub fn new(category: Category, raw_text: impl Into<String>) -> Self {
        Self {
            category,
            raw_text: raw_text.into(),
        }
    }

    pub fn success(raw_text: impl Into<String>) -> Self {
        Self::new(Category::Success, raw_text)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn succeeded(&self) -> bool {
        self.category == Category::Success
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Whether the failure is worth retrying
    pub fn is_busy(&self) -> bool {
        self.category == Category::Busy
    }
}

impl std::fmt::Display for ClassifiedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.raw_text.trim().is_empty() {
            write!(f, "{}", self.category)
        } else {
            write!(f, "{}: {}", self.category, self.raw_text.trim())
        }
    }
}

/// An outcome carrying the value derived from it.
///
/// `value` is present exactly when the outcome succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<T> {
    outcome: ClassifiedOutcome,
    value: Option<T>,
}

impl<T> Classified<T> {
    /// Pair a successful outcome with its value
    pub fn ok(outcome: ClassifiedOutcome, value: T) -> Self {
        debug_assert!(outcome.succeeded());
        Self {
            outcome,
            value: Some(value),
        }
    }

    /// A failed outcome with no value
    pub fn failed(outcome: ClassifiedOutcome) -> Self {
        debug_assert!(!outcome.succeeded());
        Self {
            outcome,
            value: None,
        }
    }

    pub fn outcome(&self) -> &ClassifiedOutcome {
        &self.outcome
    }

    pub fn category(&self) -> Category {
        self.outcome.category()
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Split into the value or the failed outcome
    pub fn into_result(self) -> std::result::Result<T, ClassifiedOutcome> {
        match self.value {
            Some(value) => Ok(value),
            None => Err(self.outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_raw_text() {
        let outcome = ClassifiedOutcome::new(Category::NotFound, "Could Not Find C:\\x\n");
        assert_eq!(outcome.to_string(), "not found: Could Not Find C:\\x");
    }

    #[test]
    fn test_classified_splits_value_and_failure() {
        let ok = Classified::ok(ClassifiedOutcome::success(""), 5u64);
        assert_eq!(ok.into_result(), Ok(5));

        let failed: Classified<u64> =
            Classified::failed(ClassifiedOutcome::new(Category::Busy, "in use"));
        assert!(failed.outcome().is_busy());
        assert!(failed.into_result().is_err());
    }
}
