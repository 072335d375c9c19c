//! Async driver that executes controller requests against a backend.

use std::sync::Arc;

use futures::future::join_all;
use shared::domain::Scope;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{
    backend::AdminBackend,
    controller::{Confirm, Dispatch, FormController, FormState, Outcome, Request},
    draft::{TextField, ToggleField},
    error::FormError,
    submission::send_prepared,
};

/// Runs a single request to completion. Failures are carried inside the
/// outcome so the controller can turn them into status text.
pub async fn execute<B>(backend: &B, request: Request) -> Outcome
where
    B: AdminBackend + ?Sized,
{
    match request {
        Request::Personas { ticket } => Outcome::Personas {
            ticket,
            result: backend.list_personas(ticket.scope).await,
        },
        Request::Commands => Outcome::Commands {
            result: backend.list_commands().await,
        },
        Request::Agents { ticket } => Outcome::Agents {
            ticket,
            result: backend.list_agents(ticket.scope).await,
        },
        Request::Agent { ticket, name } => Outcome::Agent {
            ticket,
            result: backend.fetch_agent(ticket.scope, &name).await,
        },
        Request::Save { ticket, submission } => Outcome::Saved {
            ticket,
            result: send_prepared(backend, submission).await,
        },
        Request::ScanImport { request } => Outcome::ScanImported {
            result: backend.scan_and_import(&request).await,
        },
        Request::GithubImport { request } => Outcome::GithubImported {
            result: backend.import_github(&request).await,
        },
    }
}

/// Worker-style execution for hosts that feed outcomes back later.
pub fn spawn_request<B>(backend: Arc<B>, request: Request) -> JoinHandle<Outcome>
where
    B: AdminBackend + ?Sized + 'static,
{
    tokio::spawn(async move { execute(backend.as_ref(), request).await })
}

pub struct EditorSession<B: AdminBackend + ?Sized> {
    backend: Arc<B>,
    controller: FormController,
}

impl<B> EditorSession<B>
where
    B: AdminBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, scope: Scope) -> Self {
        Self {
            backend,
            controller: FormController::new(scope),
        }
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FormController {
        &mut self.controller
    }

    /// Executes a batch concurrently, then follow-ups until none remain.
    pub async fn run(&mut self, mut requests: Vec<Request>) {
        let backend = Arc::clone(&self.backend);
        while !requests.is_empty() {
            debug!(count = requests.len(), "executing request batch");
            let outcomes = join_all(
                requests
                    .into_iter()
                    .map(|request| execute(backend.as_ref(), request)),
            )
            .await;
            requests = outcomes
                .into_iter()
                .flat_map(|outcome| self.controller.apply(outcome))
                .collect();
        }
    }

    async fn run_dispatch(&mut self, dispatch: Dispatch) -> bool {
        if dispatch.is_declined() {
            return false;
        }
        self.run(dispatch.into_requests()).await;
        true
    }

    pub async fn mount(&mut self) {
        let requests = self.controller.mount();
        self.run(requests).await;
    }

    pub async fn refresh_agents(&mut self) {
        let request = self.controller.refresh_agents();
        self.run(vec![request]).await;
    }

    pub async fn refresh_personas(&mut self) {
        let request = self.controller.refresh_personas();
        self.run(vec![request]).await;
    }

    pub async fn refresh_commands(&mut self) {
        let request = self.controller.refresh_commands();
        self.run(vec![request]).await;
    }

    /// Returns `false` when the user declined to discard edits.
    pub async fn change_scope(&mut self, scope: Scope, confirm: &dyn Confirm) -> bool {
        let dispatch = self.controller.change_scope(scope, confirm);
        self.run_dispatch(dispatch).await
    }

    pub async fn new_agent(&mut self, confirm: &dyn Confirm) -> bool {
        let dispatch = self.controller.new_agent(confirm);
        self.run_dispatch(dispatch).await
    }

    pub async fn select_agent(&mut self, name: &str, confirm: &dyn Confirm) -> bool {
        let dispatch = self.controller.select_agent(name, confirm);
        self.run_dispatch(dispatch).await
    }

    pub fn set_field(&mut self, field: TextField, value: impl Into<String>) -> Result<(), FormError> {
        self.controller.set_field(field, value)
    }

    pub fn set_toggle(&mut self, field: ToggleField, value: bool) -> Result<(), FormError> {
        self.controller.set_toggle(field, value)
    }

    pub fn toggle_command(&mut self, command: &str, included: bool) -> Result<(), FormError> {
        self.controller.toggle_command(command, included)
    }

    pub fn set_raw(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        self.controller.set_raw(field, value)
    }

    /// Validates and saves the draft. On failure the reason is also left in
    /// the controller's error message.
    pub async fn submit(&mut self) -> Result<(), FormError> {
        let request = self.controller.submit()?;
        self.run(vec![request]).await;
        match self.controller.state() {
            FormState::Error => Err(FormError::Submission(
                self.controller
                    .error_message()
                    .unwrap_or_default()
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub async fn scan_import(&mut self, directory: &str) {
        if let Some(request) = self.controller.scan_import(directory) {
            self.run(vec![request]).await;
        }
    }

    pub async fn github_import(&mut self, repo_path: &str, tag: Option<&str>) {
        if let Some(request) = self.controller.github_import(repo_path, tag) {
            self.run(vec![request]).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
