//! Detector trait for pluggable vulnerability rules.
//!
//! A detector looks at one [`SourceUnit`] and reports candidate findings for a
//! single vulnerability class. Detectors own no mutable state, so the registry
//! can run any number of them over any number of units on a worker pool.
//!
//! The set of detectors is closed: [`crate::runner::DetectorRegistry::with_defaults`]
//! registers the built-in rules in a fixed order, and that order becomes the
//! tie-breaker between findings that otherwise sort equal.
//!
//! A detector must be deterministic. Given the same unit it returns the same
//! findings in the same order; the reports depend on it.

use crate::core::{Confidence, Finding, Severity};
use crate::model::SourceUnit;
use anyhow::Result;

pub trait Detector: Send + Sync {
    /// Stable rule id, also used as the finding's `rule_id`.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    fn severity(&self) -> Severity;

    fn confidence(&self) -> Confidence;

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>>;
}

#[macro_export]
macro_rules! impl_detector {
    (
        $detector:ty,
        id: $id:expr,
        name: $name:expr,
        severity: $severity:expr,
        confidence: $confidence:expr
        $(, description: $description:expr)?
    ) => {
        impl $crate::core::Detector for $detector {
            fn id(&self) -> &'static str {
                $id
            }

            fn name(&self) -> &'static str {
                $name
            }

            fn severity(&self) -> $crate::core::Severity {
                $severity
            }

            fn confidence(&self) -> $crate::core::Confidence {
                $confidence
            }

            $(
                fn description(&self) -> &'static str {
                    $description
                }
            )?

            fn detect(
                &self,
                unit: &$crate::model::SourceUnit,
            ) -> anyhow::Result<Vec<$crate::core::Finding>> {
                self.detect_impl(unit)
            }
        }
    };
}
