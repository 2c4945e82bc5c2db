//! Conversation-scoped session state
//!
//! Agents communicate through named slots in [`SessionState`]: each role
//! reads the slots its instruction references and writes its result to its
//! `output_key`. A [`Session`] adds the coordinator's message history.
//! Nothing here outlives the process.

use crate::error::{AppealError, AppealResult};
use crate::llm::provider::Message;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Well-known state keys
pub mod keys {
    pub const DENIAL_DATE: &str = "denial_date";
    pub const EVIDENCE: &str = "evidence";
    pub const APPEAL_LETTER: &str = "appealletter";
    pub const REVIEW_RESULT: &str = "review_result";
    pub const FINAL_APPEAL_LETTER: &str = "final_appeal_letter";
}

/// Literal the reviewer emits when the letter needs no more work
pub const APPROVED: &str = "APPROVED";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(\?)?\}").expect("placeholder regex"));

/// String key/value slots shared by the agents of one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    values: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// True when `key` holds exactly `expected`
    pub fn is(&self, key: &str, expected: &str) -> bool {
        self.get(key) == Some(expected)
    }

    /// Copy every slot of `other` into this state, overwriting
    pub fn merge(&mut self, other: &SessionState) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Substitute `{key}` placeholders from state
///
/// `{key?}` renders as empty text when the key is absent; a plain `{key}`
/// that is absent fails with [`AppealError::MissingStateKey`].
pub fn render_instruction(template: &str, state: &SessionState) -> AppealResult<String> {
    let mut missing: Option<String> = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        let optional = caps.get(2).is_some();
        match state.get(key) {
            Some(value) => value.to_string(),
            None if optional => String::new(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(key) => Err(AppealError::MissingStateKey { key }),
        None => Ok(rendered.into_owned()),
    }
}

/// One user conversation: state slots plus coordinator history
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub history: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::new(),
            history: Vec::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
