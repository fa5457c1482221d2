//! Bounded, fixed-delay directory deletion
//!
//! Directory deletion races with processes that still hold files open
//! (indexers, antivirus, a child that has not exited yet). The deleter
//! re-checks existence before every attempt and waits a fixed delay after
//! each failed one.

use std::path::Path;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::outcome::{Category, ClassifiedOutcome};

/// Retry limits for [`RetryingDirectoryDeleter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    /// Consecutive failures before the escalation signal fires
    pub escalation_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(500),
            escalation_threshold: 10,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_escalation_threshold(mut self, threshold: u32) -> Self {
        self.escalation_threshold = threshold;
        self
    }
}

pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// What the deleter needs from a file system
pub trait DirectoryRemover {
    fn directory_exists(&self, path: &Path) -> Result<bool>;

    /// One recursive, forceful removal attempt
    fn remove_directory(&self, path: &Path) -> Result<ClassifiedOutcome>;
}

/// Final state of a deletion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The directory is gone (possibly it never existed)
    Succeeded { attempts: u32 },
    /// Still present after every attempt; `last` is the final attempt's outcome
    Failed {
        attempts: u32,
        last: Option<ClassifiedOutcome>,
    },
}

impl DeletionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, DeletionOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeletionOutcome::Succeeded { attempts } | DeletionOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

type EscalationHook = Box<dyn Fn(&Path, u32) + Send + Sync>;

/// Deletes a directory, retrying while it keeps reappearing or resisting
pub struct RetryingDirectoryDeleter {
    policy: RetryPolicy,
    on_escalation: Option<EscalationHook>,
}

impl std::fmt::Debug for RetryingDirectoryDeleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingDirectoryDeleter")
            .field("policy", &self.policy)
            .field("on_escalation", &self.on_escalation.is_some())
            .finish()
    }
}

impl RetryingDirectoryDeleter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            on_escalation: None,
        }
    }

    /// Call `hook(path, attempts)` whenever the escalation threshold is hit
    pub fn on_escalation(mut self, hook: impl Fn(&Path, u32) + Send + Sync + 'static) -> Self {
        self.on_escalation = Some(Box::new(hook));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delete `path` through `remover` within the policy's limits.
    ///
    /// Existence is checked before each attempt, so a directory that is
    /// already absent succeeds with zero attempts. There is no wait after
    /// the final attempt.
    pub fn delete<R>(&self, remover: &R, path: &Path) -> DeletionOutcome
    where
        R: DirectoryRemover + ?Sized,
    {
        let mut delay = Constant::new(self.policy.delay);
        let mut attempts = 0;
        let mut consecutive = 0;
        let mut last = None;

        loop {
            let present = match remover.directory_exists(path) {
                Ok(present) => present,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Existence check failed, assuming present"
                    );
                    true
                }
            };
            if !present {
                tracing::debug!(path = %path.display(), attempts, "Directory deleted");
                return DeletionOutcome::Succeeded { attempts };
            }
            if attempts >= self.policy.max_attempts {
                tracing::warn!(path = %path.display(), attempts, "Giving up on directory deletion");
                return DeletionOutcome::Failed { attempts, last };
            }

            attempts += 1;
            let outcome = remover
                .remove_directory(path)
                .unwrap_or_else(|e| ClassifiedOutcome::new(Category::Unknown, e.to_string()));
            tracing::debug!(
                path = %path.display(),
                attempts,
                category = %outcome.category(),
                "Delete attempt"
            );

            if outcome.succeeded() {
                consecutive = 0;
                last = Some(outcome);
                continue;
            }

            consecutive += 1;
            let threshold = self.policy.escalation_threshold;
            if threshold > 0 && consecutive >= threshold {
                tracing::warn!(
                    path = %path.display(),
                    attempts,
                    last = %outcome,
                    "Directory deletion keeps failing"
                );
                if let Some(hook) = &self.on_escalation {
                    hook(path, attempts);
                }
                consecutive = 0;
            }
            last = Some(outcome);

            if attempts < self.policy.max_attempts {
                if let Some(wait) = delay.next_backoff() {
                    std::thread::sleep(wait);
                }
            }
        }
    }
}

impl Default for RetryingDirectoryDeleter {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
