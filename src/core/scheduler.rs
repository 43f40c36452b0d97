// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Time-window scheduler
//!
//! [`Scheduler::get_target_state`] is a pure function of wall-clock time, the
//! current state and the loaded rules. Rules are sorted by priority
//! (descending) once, when the scheduler is built.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{BehaviorError, Params, State, StateRegistry};

/// Seconds an hourly pulse lasts when the rule does not say
pub const DEFAULT_HOURLY_DURATION_SECS: u32 = 10;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M";

/// States a rule may interrupt when it lists none
fn default_interruptible() -> BTreeSet<State> {
    [State::ACTIVE, State::SQUINTING, State::THINKING, State::SLEEPING, State::WAKING]
        .into_iter()
        .collect()
}

/// When a rule is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleWindow {
    /// `[start, end)` each day at minute resolution; wraps midnight when `start > end`
    Daily { start: NaiveTime, end: NaiveTime },
    /// Absolute `[start, end)`
    Date { start: NaiveDateTime, end: NaiveDateTime },
    /// First `duration_secs` seconds of every hour
    Hourly { duration_secs: u32 },
}

impl RuleWindow {
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        match self {
            RuleWindow::Daily { start, end } => {
                let minute_of_day = |t: NaiveTime| t.hour() * 60 + t.minute();
                let current = minute_of_day(now.time());
                let start = minute_of_day(*start);
                let end = minute_of_day(*end);
                if start > end {
                    current >= start || current < end
                } else {
                    start <= current && current < end
                }
            }
            RuleWindow::Date { start, end } => *start <= now && now < *end,
            RuleWindow::Hourly { duration_secs } => now.minute() * 60 + now.second() < *duration_secs,
        }
    }
}

/// A time-windowed request for a state
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRule {
    pub name: Option<String>,
    pub window: RuleWindow,
    pub target_state: State,
    pub params: Option<Params>,
    pub priority: i32,
    pub interruptible_states: BTreeSet<State>,
}

impl ScheduleRule {
    pub fn new(window: RuleWindow, target_state: State) -> Self {
        Self {
            name: None,
            window,
            target_state,
            params: None,
            priority: 0,
            interruptible_states: default_interruptible(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn interrupting<I: IntoIterator<Item = State>>(mut self, states: I) -> Self {
        self.interruptible_states = states.into_iter().collect();
        self
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.target_state.as_str())
    }
}

/// On-disk shape of one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    pub state: State,
    #[serde(default)]
    pub params: Option<Params>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub interruptible_states: Option<Vec<State>>,
}

impl TryFrom<RuleRecord> for ScheduleRule {
    type Error = BehaviorError;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        let label = record.name.clone().unwrap_or_else(|| record.state.to_string());
        let bound = |value: &Option<String>, field: &str| {
            value
                .clone()
                .ok_or_else(|| BehaviorError::Schedule(format!("rule '{}' is missing {}", label, field)))
        };

        let window = match record.kind.to_ascii_lowercase().as_str() {
            "daily" => {
                let parse = |s: String| {
                    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|e| {
                        BehaviorError::Schedule(format!("rule '{}': bad time '{}': {}", label, s, e))
                    })
                };
                RuleWindow::Daily {
                    start: parse(bound(&record.start_time, "start_time")?)?,
                    end: parse(bound(&record.end_time, "end_time")?)?,
                }
            }
            "date" => {
                let parse = |s: String| {
                    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).map_err(|e| {
                        BehaviorError::Schedule(format!(
                            "rule '{}': bad datetime '{}' (use YYYY-MM-DD HH:MM:SS): {}",
                            label, s, e
                        ))
                    })
                };
                RuleWindow::Date {
                    start: parse(bound(&record.start_datetime, "start_datetime")?)?,
                    end: parse(bound(&record.end_datetime, "end_datetime")?)?,
                }
            }
            "hourly" => {
                let from_params = record
                    .params
                    .as_ref()
                    .and_then(|p| p.get("duration"))
                    .and_then(|v| v.as_u64())
                    .map(|v| v.min(u32::MAX as u64) as u32);
                RuleWindow::Hourly {
                    duration_secs: record
                        .duration
                        .or(from_params)
                        .unwrap_or(DEFAULT_HOURLY_DURATION_SECS),
                }
            }
            other => {
                return Err(BehaviorError::Schedule(format!(
                    "rule '{}' has unknown type '{}'",
                    label, other
                )))
            }
        };

        Ok(ScheduleRule {
            name: record.name,
            window,
            target_state: record.state,
            params: record.params,
            priority: record.priority,
            interruptible_states: record
                .interruptible_states
                .map(|states| states.into_iter().collect())
                .unwrap_or_else(default_interruptible),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScheduleDocument {
    Rules(Vec<RuleRecord>),
    Wrapped { schedule: Vec<RuleRecord> },
}

/// Sorted rule set
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    rules: Vec<ScheduleRule>,
}

impl Scheduler {
    pub fn new(mut rules: Vec<ScheduleRule>) -> Self {
        // stable: equal priorities keep file order
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        info!("Loaded {} scheduled events", rules.len());
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parse a rule document; malformed rules are skipped with a warning
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records = match serde_json::from_str::<ScheduleDocument>(json)? {
            ScheduleDocument::Rules(records) => records,
            ScheduleDocument::Wrapped { schedule } => schedule,
        };

        let rules = records
            .into_iter()
            .filter_map(|record| match ScheduleRule::try_from(record) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("Skipping schedule rule: {}", e);
                    None
                }
            })
            .collect();
        Ok(Self::new(rules))
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading schedule {:?}", path))?;
        Self::from_json_str(&content).with_context(|| format!("parsing schedule {:?}", path))
    }

    /// Load rules from `path`, or fall back to an empty (disabled) schedule
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Schedule disabled: {:#}", e);
                Self::empty()
            }
        }
    }

    /// Drop rules whose target is not in `registry`. Returns how many were dropped.
    pub fn retain_registered(&mut self, registry: &StateRegistry) -> usize {
        let before = self.rules.len();
        self.rules.retain(|rule| {
            let known = registry.contains(&rule.target_state);
            if !known {
                warn!("Skipping schedule rule '{}': unknown state {}", rule.label(), rule.target_state);
            }
            known
        });
        before - self.rules.len()
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The state the schedule wants right now, if any
    ///
    /// Returns the first active rule (by priority) that either already
    /// matches `current_state` or is allowed to interrupt it.
    pub fn get_target_state(&self, now: NaiveDateTime, current_state: &State) -> Option<(State, Params)> {
        for rule in &self.rules {
            if !rule.window.is_active(now) {
                continue;
            }

            let hit = || Some((rule.target_state.clone(), rule.params.clone().unwrap_or_default()));

            if *current_state == rule.target_state {
                return hit();
            }
            if rule.interruptible_states.contains(current_state) {
                return hit();
            }
            tracing::trace!("{} protected from rule '{}'", current_state, rule.label());
        }
        None
    }
}
