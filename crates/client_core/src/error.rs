use std::fmt;

use thiserror::Error;

/// First required field found empty during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Name,
    Persona,
    Instructions,
}

impl MissingField {
    pub fn field_name(self) -> &'static str {
        match self {
            MissingField::Name => "name",
            MissingField::Persona => "persona",
            MissingField::Instructions => "instructions",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Name => f.write_str("Name is required"),
            MissingField::Persona => f.write_str("Persona is required"),
            MissingField::Instructions => f.write_str("Instructions are required"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("request to {path} failed with status {status}")]
    Fetch { path: String, status: u16 },
    #[error("request to {path} could not be completed: {reason}")]
    Transport { path: String, reason: String },
    #[error("malformed response from {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("{0}")]
    Validation(MissingField),
    #[error("{0}")]
    Submission(String),
    #[error("form cannot be edited while {state}")]
    NotEditable { state: &'static str },
    #[error("unknown agent field '{0}'")]
    UnknownField(String),
}

impl FormError {
    pub fn transport(path: impl Into<String>, err: reqwest::Error) -> Self {
        FormError::Transport {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn parse(path: impl Into<String>, err: serde_json::Error) -> Self {
        FormError::Parse {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn missing_field(&self) -> Option<MissingField> {
        match self {
            FormError::Validation(field) => Some(*field),
            _ => None,
        }
    }
}
