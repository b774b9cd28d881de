// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decides which classified events warrant a metric.

use std::collections::BTreeSet;

use crate::classifier::ClassifiedEvent;

/// Outcome of correlating a classified event against the terminal-state set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// The workflow reached a terminal state; fetch its record and publish
    /// its total duration.
    FetchWorkflow { workflow_id: String },
    /// Publish the reported operation duration directly.
    PublishOperation {
        operation_type: String,
        duration_ms: u64,
    },
    /// Nothing to publish.
    Ineligible,
}

#[derive(Debug, Clone)]
pub struct Correlator {
    terminal_states: BTreeSet<String>,
}

impl Correlator {
    #[must_use]
    pub fn new(terminal_states: BTreeSet<String>) -> Self {
        Self { terminal_states }
    }

    #[must_use]
    pub fn terminal_states(&self) -> &BTreeSet<String> {
        &self.terminal_states
    }

    /// State comparison is exact and case-sensitive.
    #[must_use]
    pub fn correlate(&self, event: &ClassifiedEvent) -> Eligibility {
        match event {
            ClassifiedEvent::WorkflowState { workflow_id, state }
                if self.terminal_states.contains(state) =>
            {
                Eligibility::FetchWorkflow {
                    workflow_id: workflow_id.clone(),
                }
            }
            ClassifiedEvent::OperationDuration {
                operation_type,
                duration_ms,
            } => Eligibility::PublishOperation {
                operation_type: operation_type.clone(),
                duration_ms: *duration_ms,
            },
            ClassifiedEvent::WorkflowState { .. } | ClassifiedEvent::Unclassified => {
                Eligibility::Ineligible
            }
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(BTreeSet::from([
            "FAILED".to_string(),
            "SUCCEEDED".to_string(),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(workflow_id: &str, state: &str) -> ClassifiedEvent {
        ClassifiedEvent::WorkflowState {
            workflow_id: workflow_id.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_terminal_states_fetch() {
        let correlator = Correlator::default();
        for terminal in ["FAILED", "SUCCEEDED"] {
            assert_eq!(
                correlator.correlate(&state("12345", terminal)),
                Eligibility::FetchWorkflow {
                    workflow_id: "12345".to_string()
                }
            );
        }
    }

    #[test]
    fn test_non_terminal_states_are_ineligible() {
        let correlator = Correlator::default();
        for other in ["RUNNING", "INSTANTIATED", "PAUSED", "succeeded", "Failed"] {
            assert_eq!(
                correlator.correlate(&state("1", other)),
                Eligibility::Ineligible,
                "{other} should not be terminal"
            );
        }
    }

    #[test]
    fn test_operation_duration_is_always_eligible() {
        let event = ClassifiedEvent::OperationDuration {
            operation_type: "encode".to_string(),
            duration_ms: 4200,
        };
        assert_eq!(
            Correlator::new(BTreeSet::new()).correlate(&event),
            Eligibility::PublishOperation {
                operation_type: "encode".to_string(),
                duration_ms: 4200,
            }
        );
    }

    #[test]
    fn test_unclassified_is_ineligible() {
        assert_eq!(
            Correlator::default().correlate(&ClassifiedEvent::Unclassified),
            Eligibility::Ineligible
        );
    }

    #[test]
    fn test_custom_terminal_states() {
        let correlator = Correlator::new(BTreeSet::from(["STOPPED".to_string()]));
        assert!(matches!(
            correlator.correlate(&state("7", "STOPPED")),
            Eligibility::FetchWorkflow { .. }
        ));
        assert_eq!(
            correlator.correlate(&state("7", "SUCCEEDED")),
            Eligibility::Ineligible
        );
    }
}
