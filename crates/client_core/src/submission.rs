//! Validation and transport of a finished draft.

use shared::{domain::Scope, protocol::AgentRecord};
use tracing::info;

use crate::{
    backend::AdminBackend,
    draft::{AgentDraft, TextField},
    error::{FormError, MissingField},
};

/// Identity the draft was opened under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOrigin {
    New,
    Existing { name: String },
}

impl DraftOrigin {
    pub fn is_new(&self) -> bool {
        matches!(self, DraftOrigin::New)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    Create { scope: Scope },
    Update { scope: Scope, name: String },
}

impl SubmitTarget {
    pub fn for_origin(scope: Scope, origin: &DraftOrigin) -> Self {
        match origin {
            DraftOrigin::New => SubmitTarget::Create { scope },
            DraftOrigin::Existing { name } => SubmitTarget::Update {
                scope,
                name: name.clone(),
            },
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            SubmitTarget::Create { .. } => "POST",
            SubmitTarget::Update { .. } => "PUT",
        }
    }

    pub fn segments(&self) -> Vec<String> {
        match self {
            SubmitTarget::Create { scope } => vec!["agents".into(), scope.as_str().into()],
            SubmitTarget::Update { scope, name } => {
                vec!["agents".into(), scope.as_str().into(), name.clone()]
            }
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }
}

const REQUIRED_FIELDS: [(TextField, MissingField); 3] = [
    (TextField::Name, MissingField::Name),
    (TextField::Persona, MissingField::Persona),
    (TextField::Instructions, MissingField::Instructions),
];

/// Reports the first required field that is blank after trimming.
pub fn validate(draft: &AgentDraft) -> Result<(), MissingField> {
    match REQUIRED_FIELDS
        .iter()
        .find(|(field, _)| draft.text(*field).trim().is_empty())
    {
        Some((_, missing)) => Err(*missing),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSubmission {
    pub target: SubmitTarget,
    pub payload: AgentRecord,
}

pub fn prepare(
    scope: Scope,
    origin: &DraftOrigin,
    draft: &AgentDraft,
) -> Result<PreparedSubmission, FormError> {
    validate(draft).map_err(FormError::Validation)?;
    Ok(PreparedSubmission {
        target: SubmitTarget::for_origin(scope, origin),
        payload: draft.to_payload(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub target: SubmitTarget,
    pub saved: AgentRecord,
}

pub async fn send_prepared<B>(
    backend: &B,
    prepared: PreparedSubmission,
) -> Result<SubmitOutcome, FormError>
where
    B: AdminBackend + ?Sized,
{
    let saved = backend
        .save_agent(&prepared.target, &prepared.payload)
        .await?;
    info!(
        method = prepared.target.method(),
        path = %prepared.target.path(),
        agent = %saved.name,
        "agent saved"
    );
    Ok(SubmitOutcome {
        target: prepared.target,
        saved,
    })
}

pub async fn submit<B>(
    backend: &B,
    scope: Scope,
    origin: &DraftOrigin,
    draft: &AgentDraft,
) -> Result<SubmitOutcome, FormError>
where
    B: AdminBackend + ?Sized,
{
    let prepared = prepare(scope, origin, draft)?;
    send_prepared(backend, prepared).await
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
