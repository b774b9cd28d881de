// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Classification of free-text log messages into typed workflow events.
//!
//! Message shapes are described by an ordered table of
//! `(name, pattern, constructor)` entries. Each message is searched (not
//! full-line matched, since log lines carry level and logger prefixes) against
//! the table in order and the first entry that both matches and accepts its
//! captures claims the message:
//!
//! | matcher              | shape                                   | event               |
//! |----------------------|-----------------------------------------|---------------------|
//! | `workflow_state`     | `Workflow <digits> state set to <word>` | `WorkflowState`     |
//! | `operation_duration` | `Operation <lower-hyphen> took <digits>`| `OperationDuration` |
//!
//! Adding a new message shape means adding a row to [`MATCHERS`].

use regex::{Captures, Regex};

/// A log message interpreted as a workflow lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// A workflow transitioned to a new state.
    WorkflowState { workflow_id: String, state: String },
    /// A workflow operation reported how long it ran.
    OperationDuration {
        operation_type: String,
        duration_ms: u64,
    },
    /// No known message shape matched.
    Unclassified,
}

/// Builds an event from a successful pattern match. Returning `None` declines
/// the message and lets later matchers try.
pub type Constructor = fn(&Captures<'_>) -> Option<ClassifiedEvent>;

/// Matcher table in priority order.
pub const MATCHERS: &[(&str, &str, Constructor)] = &[
    (
        "workflow_state",
        r"Workflow (\d+) state set to (\w+)",
        workflow_state,
    ),
    (
        "operation_duration",
        r"Operation ([a-z-]+) took (\d+)",
        operation_duration,
    ),
];

fn workflow_state(captures: &Captures<'_>) -> Option<ClassifiedEvent> {
    Some(ClassifiedEvent::WorkflowState {
        workflow_id: captures.get(1)?.as_str().to_string(),
        state: captures.get(2)?.as_str().to_string(),
    })
}

fn operation_duration(captures: &Captures<'_>) -> Option<ClassifiedEvent> {
    Some(ClassifiedEvent::OperationDuration {
        operation_type: captures.get(1)?.as_str().to_string(),
        duration_ms: captures.get(2)?.as_str().parse().ok()?,
    })
}

/// A compiled matcher table entry.
#[derive(Clone, Debug)]
pub struct Matcher {
    pub name: &'static str,
    pub regex: Regex,
    pub build: Constructor,
}

/// Applies the matcher table to log messages.
#[derive(Clone, Debug)]
pub struct Classifier {
    matchers: Vec<Matcher>,
}

impl Classifier {
    /// Compiles the given matcher table, preserving its order.
    pub fn new(table: &[(&'static str, &str, Constructor)]) -> Result<Self, regex::Error> {
        let matchers = table
            .iter()
            .map(|&(name, pattern, build)| {
                Ok(Matcher {
                    name,
                    regex: Regex::new(pattern)?,
                    build,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { matchers })
    }

    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Classifies a message. Pure: no I/O, no state.
    #[must_use]
    pub fn classify(&self, message: &str) -> ClassifiedEvent {
        for matcher in &self.matchers {
            let Some(captures) = matcher.regex.captures(message) else {
                continue;
            };
            if let Some(event) = (matcher.build)(&captures) {
                return event;
            }
            tracing::debug!(
                "Matcher {} matched but declined message: {message}",
                matcher.name
            );
        }
        ClassifiedEvent::Unclassified
    }
}

impl Default for Classifier {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new(MATCHERS).expect("built-in matcher patterns must compile")
    }
}
