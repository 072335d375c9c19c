//! In-progress agent edits.
//!
//! The store hands out `Arc` snapshots; every mutation copies on write so a
//! snapshot taken before an edit never observes it.

use std::{str::FromStr, sync::Arc};

use serde_json::{Map, Value};
use shared::protocol::{AgentRecord, UNCENSORED_FLAG};

use crate::error::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    Persona,
    Instructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    Commands,
}

/// Boolean fields that travel to the server only as entries of `flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
    Uncensored,
}

impl ToggleField {
    pub const ALL: [ToggleField; 1] = [ToggleField::Uncensored];

    pub fn flag(self) -> &'static str {
        match self {
            ToggleField::Uncensored => UNCENSORED_FLAG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Text(TextField),
    Set(SetField),
    Toggle(ToggleField),
}

impl FromStr for FieldName {
    type Err = FormError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "name" => Ok(FieldName::Text(TextField::Name)),
            "persona" => Ok(FieldName::Text(TextField::Persona)),
            "instructions" => Ok(FieldName::Text(TextField::Instructions)),
            "commands" => Ok(FieldName::Set(SetField::Commands)),
            "uncensored" => Ok(FieldName::Toggle(ToggleField::Uncensored)),
            other => Err(FormError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentDraft {
    pub name: String,
    pub persona: String,
    pub instructions: String,
    pub commands: Vec<String>,
    pub uncensored: bool,
    /// Stored keys the form does not edit, written back on save.
    pub extra: Map<String, Value>,
}

impl AgentDraft {
    pub fn from_record(record: &AgentRecord) -> Self {
        let mut commands: Vec<String> = Vec::with_capacity(record.commands.len());
        for command in &record.commands {
            if !commands.contains(command) {
                commands.push(command.clone());
            }
        }
        Self {
            name: record.name.clone(),
            persona: record.persona.clone(),
            instructions: record.instructions.clone(),
            commands,
            uncensored: record.has_flag(UNCENSORED_FLAG),
            extra: record.extra.clone(),
        }
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Name => &self.name,
            TextField::Persona => &self.persona,
            TextField::Instructions => &self.instructions,
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Name => &mut self.name,
            TextField::Persona => &mut self.persona,
            TextField::Instructions => &mut self.instructions,
        }
    }

    pub fn members(&self, field: SetField) -> &[String] {
        match field {
            SetField::Commands => &self.commands,
        }
    }

    fn members_mut(&mut self, field: SetField) -> &mut Vec<String> {
        match field {
            SetField::Commands => &mut self.commands,
        }
    }

    pub fn toggle(&self, field: ToggleField) -> bool {
        match field {
            ToggleField::Uncensored => self.uncensored,
        }
    }

    fn toggle_mut(&mut self, field: ToggleField) -> &mut bool {
        match field {
            ToggleField::Uncensored => &mut self.uncensored,
        }
    }

    pub fn derived_flags(&self) -> Vec<String> {
        ToggleField::ALL
            .into_iter()
            .filter(|toggle| self.toggle(*toggle))
            .map(|toggle| toggle.flag().to_string())
            .collect()
    }

    /// Wire form of the draft; toggles are folded into `flags`.
    pub fn to_payload(&self) -> AgentRecord {
        AgentRecord {
            name: self.name.clone(),
            persona: self.persona.clone(),
            instructions: self.instructions.clone(),
            commands: self.commands.clone(),
            flags: self.derived_flags(),
            extra: self.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    current: Arc<AgentDraft>,
    revision: u64,
    dirty: bool,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<AgentDraft> {
        Arc::clone(&self.current)
    }

    pub fn draft(&self) -> &AgentDraft {
        &self.current
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    pub fn set_field(&mut self, field: TextField, value: impl Into<String>) {
        let value = value.into();
        if self.current.text(field) == value {
            return;
        }
        *Arc::make_mut(&mut self.current).text_mut(field) = value;
        self.touch();
    }

    pub fn set_toggle(&mut self, field: ToggleField, value: bool) {
        if self.current.toggle(field) == value {
            return;
        }
        *Arc::make_mut(&mut self.current).toggle_mut(field) = value;
        self.touch();
    }

    /// Returns whether membership changed.
    pub fn toggle_set_member(&mut self, field: SetField, member: &str, included: bool) -> bool {
        let present = self.current.members(field).iter().any(|m| m == member);
        match (present, included) {
            (false, true) => {
                Arc::make_mut(&mut self.current)
                    .members_mut(field)
                    .push(member.to_string());
            }
            (true, false) => {
                Arc::make_mut(&mut self.current)
                    .members_mut(field)
                    .retain(|m| m != member);
            }
            _ => return false,
        }
        self.touch();
        true
    }

    /// String-keyed update used at input boundaries.
    ///
    /// Set fields take a comma separated list that replaces the membership;
    /// toggles accept `true/false`, `yes/no`, `on/off` and `1/0`.
    pub fn set_raw(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        match field.parse::<FieldName>()? {
            FieldName::Text(text) => self.set_field(text, value),
            FieldName::Toggle(toggle) => {
                let parsed = parse_toggle(value)
                    .ok_or_else(|| FormError::UnknownField(format!("{field}={value}")))?;
                self.set_toggle(toggle, parsed);
            }
            FieldName::Set(set) => {
                let wanted: Vec<&str> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|member| !member.is_empty())
                    .collect();
                let stale: Vec<String> = self
                    .current
                    .members(set)
                    .iter()
                    .filter(|member| !wanted.contains(&member.as_str()))
                    .cloned()
                    .collect();
                for member in stale {
                    self.toggle_set_member(set, &member, false);
                }
                for member in wanted {
                    self.toggle_set_member(set, member, true);
                }
            }
        }
        Ok(())
    }

    /// Replaces the whole draft; never merges with the previous one.
    pub fn reset(&mut self, draft: AgentDraft) {
        self.current = Arc::new(draft);
        self.revision += 1;
        self.dirty = false;
    }
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
