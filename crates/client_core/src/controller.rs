//! Agent form state machine.
//!
//! User actions return the backend `Request`s they need; the host executes
//! them (concurrently or on a worker) and feeds each `Outcome` back through
//! [`FormController::apply`]. Every issued request yields exactly one outcome,
//! which keeps the in-flight counter honest even when requests fail.

use shared::{
    domain::Scope,
    protocol::{
        AgentRecord, AgentSummary, GithubImportRequest, Persona, ScanImportRequest,
        ScanImportResponse,
    },
};
use tracing::{debug, info, warn};

use crate::{
    backend::{CommandCatalog, GithubImportReply},
    catalog::{group_catalog, CommandGroup},
    draft::{AgentDraft, DraftStore, SetField, TextField, ToggleField},
    error::FormError,
    status::{StatusKind, StatusLine, IMPORT_STATUS_DISMISS, SAVE_STATUS_DISMISS},
    submission::{prepare, DraftOrigin, PreparedSubmission, SubmitOutcome},
};

pub const CONFIRM_SWITCH_SCOPE: &str =
    "Switching scope will discard any unsaved changes. Continue?";
pub const CONFIRM_LOAD_AGENT: &str =
    "Loading a different agent will discard any unsaved changes. Continue?";
pub const CONFIRM_NEW_AGENT: &str =
    "Creating a new agent will discard any unsaved changes. Continue?";
pub const SAVE_SUCCESS_MESSAGE: &str = "Agent saved successfully";
pub const REPO_PATH_REQUIRED: &str = "Error: Repository path is required";

pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Empty,
    Loading,
    Editing,
    Submitting,
    Error,
}

impl FormState {
    pub fn label(self) -> &'static str {
        match self {
            FormState::Empty => "no agent is selected",
            FormState::Loading => "an agent is loading",
            FormState::Editing => "editing",
            FormState::Submitting => "a save is in progress",
            FormState::Error => "showing an error",
        }
    }

    fn accepts_edits(self) -> bool {
        matches!(self, FormState::Editing | FormState::Error)
    }
}

/// Generation stamp attached to scope-bound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Personas { ticket: Ticket },
    Commands,
    Agents { ticket: Ticket },
    Agent { ticket: Ticket, name: String },
    Save { ticket: Ticket, submission: PreparedSubmission },
    ScanImport { request: ScanImportRequest },
    GithubImport { request: GithubImportRequest },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Personas { .. } => "load_personas",
            Request::Commands => "load_commands",
            Request::Agents { .. } => "load_agents",
            Request::Agent { .. } => "load_agent",
            Request::Save { .. } => "save_agent",
            Request::ScanImport { .. } => "scan_import",
            Request::GithubImport { .. } => "github_import",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Personas {
        ticket: Ticket,
        result: Result<Vec<Persona>, FormError>,
    },
    Commands {
        result: Result<CommandCatalog, FormError>,
    },
    Agents {
        ticket: Ticket,
        result: Result<Vec<AgentSummary>, FormError>,
    },
    Agent {
        ticket: Ticket,
        result: Result<AgentRecord, FormError>,
    },
    Saved {
        ticket: Ticket,
        result: Result<SubmitOutcome, FormError>,
    },
    ScanImported {
        result: Result<ScanImportResponse, FormError>,
    },
    GithubImported {
        result: Result<GithubImportReply, FormError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Declined,
    Issue(Vec<Request>),
}

impl Dispatch {
    pub fn is_declined(&self) -> bool {
        matches!(self, Dispatch::Declined)
    }

    pub fn into_requests(self) -> Vec<Request> {
        match self {
            Dispatch::Declined => Vec::new(),
            Dispatch::Issue(requests) => requests,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LatestTickets {
    personas: u64,
    agents: u64,
    agent: u64,
    save: u64,
}

pub struct FormController {
    scope: Scope,
    state: FormState,
    origin: Option<DraftOrigin>,
    draft: DraftStore,
    personas: Vec<Persona>,
    agents: Vec<AgentSummary>,
    commands: Vec<CommandGroup>,
    error_message: Option<String>,
    save_status: StatusLine,
    import_status: StatusLine,
    github_status: StatusLine,
    in_flight: usize,
    generation: u64,
    latest: LatestTickets,
}

impl FormController {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            state: FormState::Empty,
            origin: None,
            draft: DraftStore::new(),
            personas: Vec::new(),
            agents: Vec::new(),
            commands: Vec::new(),
            error_message: None,
            save_status: StatusLine::new(SAVE_STATUS_DISMISS),
            import_status: StatusLine::new(IMPORT_STATUS_DISMISS),
            github_status: StatusLine::new(IMPORT_STATUS_DISMISS),
            in_flight: 0,
            generation: 0,
            latest: LatestTickets::default(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn origin(&self) -> Option<&DraftOrigin> {
        self.origin.as_ref()
    }

    pub fn draft(&self) -> &AgentDraft {
        self.draft.draft()
    }

    pub fn draft_store(&self) -> &DraftStore {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.is_dirty()
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn agents(&self) -> &[AgentSummary] {
        &self.agents
    }

    pub fn command_groups(&self) -> &[CommandGroup] {
        &self.commands
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn save_status(&self) -> &StatusLine {
        &self.save_status
    }

    pub fn import_status(&self) -> &StatusLine {
        &self.import_status
    }

    pub fn github_status(&self) -> &StatusLine {
        &self.github_status
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        Ticket {
            generation: self.generation,
            scope: self.scope,
        }
    }

    fn issue(&mut self, request: Request) -> Request {
        self.in_flight += 1;
        debug!(request = request.name(), in_flight = self.in_flight, "issued request");
        request
    }

    fn personas_request(&mut self) -> Request {
        let ticket = self.next_ticket();
        self.latest.personas = ticket.generation;
        self.issue(Request::Personas { ticket })
    }

    fn agents_request(&mut self) -> Request {
        let ticket = self.next_ticket();
        self.latest.agents = ticket.generation;
        self.issue(Request::Agents { ticket })
    }

    fn is_current(&self, ticket: Ticket, latest: u64) -> bool {
        ticket.scope == self.scope && ticket.generation == latest
    }

    /// Any pending agent load or save can no longer write into the draft.
    fn invalidate_draft_requests(&mut self) {
        self.generation += 1;
        self.latest.agent = self.generation;
        self.latest.save = self.generation;
    }

    fn may_discard(&self, confirm: &dyn Confirm, prompt: &str) -> bool {
        !self.draft.is_dirty() || confirm.confirm(prompt)
    }

    /// Initial catalog fetches; the three are independent of each other.
    pub fn mount(&mut self) -> Vec<Request> {
        let personas = self.personas_request();
        let commands = self.issue(Request::Commands);
        let agents = self.agents_request();
        vec![personas, commands, agents]
    }

    pub fn refresh_agents(&mut self) -> Request {
        self.agents_request()
    }

    pub fn refresh_personas(&mut self) -> Request {
        self.personas_request()
    }

    pub fn refresh_commands(&mut self) -> Request {
        self.issue(Request::Commands)
    }

    pub fn change_scope(&mut self, scope: Scope, confirm: &dyn Confirm) -> Dispatch {
        if scope == self.scope {
            return Dispatch::Issue(Vec::new());
        }
        if !self.may_discard(confirm, CONFIRM_SWITCH_SCOPE) {
            debug!(from = %self.scope, to = %scope, "scope switch declined");
            return Dispatch::Declined;
        }

        info!(from = %self.scope, to = %scope, "switching scope");
        self.scope = scope;
        self.invalidate_draft_requests();
        self.draft.reset(AgentDraft::default());
        self.origin = None;
        self.state = FormState::Empty;
        self.error_message = None;
        self.agents.clear();
        self.personas.clear();

        let personas = self.personas_request();
        let agents = self.agents_request();
        Dispatch::Issue(vec![personas, agents])
    }

    pub fn new_agent(&mut self, confirm: &dyn Confirm) -> Dispatch {
        if !self.may_discard(confirm, CONFIRM_NEW_AGENT) {
            return Dispatch::Declined;
        }
        self.invalidate_draft_requests();
        self.draft.reset(AgentDraft::default());
        self.origin = Some(DraftOrigin::New);
        self.state = FormState::Editing;
        self.error_message = None;
        Dispatch::Issue(Vec::new())
    }

    pub fn select_agent(&mut self, name: &str, confirm: &dyn Confirm) -> Dispatch {
        if !self.may_discard(confirm, CONFIRM_LOAD_AGENT) {
            return Dispatch::Declined;
        }
        let name = name.trim();
        self.invalidate_draft_requests();
        self.draft.reset(AgentDraft::default());
        self.error_message = None;
        if name.is_empty() {
            self.origin = None;
            self.state = FormState::Empty;
            return Dispatch::Issue(Vec::new());
        }

        self.origin = Some(DraftOrigin::Existing {
            name: name.to_string(),
        });
        self.state = FormState::Loading;
        let ticket = self.next_ticket();
        self.latest.agent = ticket.generation;
        Dispatch::Issue(vec![self.issue(Request::Agent {
            ticket,
            name: name.to_string(),
        })])
    }

    fn begin_edit(&mut self) -> Result<(), FormError> {
        if !self.state.accepts_edits() {
            return Err(FormError::NotEditable {
                state: self.state.label(),
            });
        }
        self.state = FormState::Editing;
        self.error_message = None;
        Ok(())
    }

    pub fn set_field(&mut self, field: TextField, value: impl Into<String>) -> Result<(), FormError> {
        self.begin_edit()?;
        self.draft.set_field(field, value);
        Ok(())
    }

    pub fn set_toggle(&mut self, field: ToggleField, value: bool) -> Result<(), FormError> {
        self.begin_edit()?;
        self.draft.set_toggle(field, value);
        Ok(())
    }

    pub fn toggle_command(&mut self, command: &str, included: bool) -> Result<(), FormError> {
        self.begin_edit()?;
        self.draft
            .toggle_set_member(SetField::Commands, command, included);
        Ok(())
    }

    pub fn set_raw(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        self.begin_edit()?;
        self.draft.set_raw(field, value)
    }

    pub fn submit(&mut self) -> Result<Request, FormError> {
        if !self.state.accepts_edits() {
            return Err(FormError::NotEditable {
                state: self.state.label(),
            });
        }
        let origin = self.origin.clone().unwrap_or(DraftOrigin::New);
        match prepare(self.scope, &origin, self.draft.draft()) {
            Ok(submission) => {
                self.state = FormState::Submitting;
                self.error_message = None;
                let ticket = self.next_ticket();
                self.latest.save = ticket.generation;
                Ok(self.issue(Request::Save { ticket, submission }))
            }
            Err(err) => {
                if let FormError::Validation(missing) = &err {
                    debug!(field = missing.field_name(), "draft failed validation");
                }
                self.state = FormState::Error;
                self.error_message = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn scan_import(&mut self, directory: &str) -> Option<Request> {
        let directory = directory.trim();
        if directory.is_empty() {
            return None;
        }
        let request = ScanImportRequest {
            directory: directory.to_string(),
            scope: self.scope,
        };
        Some(self.issue(Request::ScanImport { request }))
    }

    pub fn github_import(&mut self, repo_path: &str, tag: Option<&str>) -> Option<Request> {
        let repo_path = repo_path.trim();
        if repo_path.is_empty() {
            self.github_status.pin(StatusKind::Error, REPO_PATH_REQUIRED);
            return None;
        }
        let tag = tag
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);
        let request = GithubImportRequest {
            repo_path: repo_path.to_string(),
            scope: self.scope,
            tag,
        };
        Some(self.issue(Request::GithubImport { request }))
    }

    /// Reconciles one outcome and returns any follow-up requests.
    pub fn apply(&mut self, outcome: Outcome) -> Vec<Request> {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            Outcome::Personas { ticket, result } => {
                if !self.is_current(ticket, self.latest.personas) {
                    debug!(generation = ticket.generation, "dropping stale persona list");
                    return Vec::new();
                }
                match result {
                    Ok(personas) => self.personas = personas,
                    Err(err) => self.report("Error loading personas", &err),
                }
                Vec::new()
            }
            Outcome::Commands { result } => {
                match result {
                    Ok(catalog) => self.commands = group_catalog(&catalog),
                    Err(err) => self.report("Error loading commands", &err),
                }
                Vec::new()
            }
            Outcome::Agents { ticket, result } => {
                if !self.is_current(ticket, self.latest.agents) {
                    debug!(generation = ticket.generation, "dropping stale agent list");
                    return Vec::new();
                }
                match result {
                    Ok(agents) => self.agents = agents,
                    Err(err) => self.report("Error loading agents", &err),
                }
                Vec::new()
            }
            Outcome::Agent { ticket, result } => {
                if !self.is_current(ticket, self.latest.agent) {
                    debug!(generation = ticket.generation, "dropping stale agent detail");
                    return Vec::new();
                }
                match result {
                    Ok(record) => {
                        self.draft.reset(AgentDraft::from_record(&record));
                        self.state = FormState::Editing;
                    }
                    Err(err) => {
                        self.state = FormState::Error;
                        self.report("Error loading agent", &err);
                    }
                }
                Vec::new()
            }
            Outcome::Saved { ticket, result } => {
                if !self.is_current(ticket, self.latest.save) {
                    debug!(generation = ticket.generation, "dropping stale save result");
                    return Vec::new();
                }
                match result {
                    Ok(outcome) => {
                        self.origin = Some(DraftOrigin::Existing {
                            name: outcome.saved.name.clone(),
                        });
                        self.draft.reset(AgentDraft::from_record(&outcome.saved));
                        self.state = FormState::Editing;
                        self.save_status.success(SAVE_SUCCESS_MESSAGE);
                        vec![self.agents_request()]
                    }
                    Err(err) => {
                        self.state = FormState::Error;
                        self.report("Error saving agent", &err);
                        Vec::new()
                    }
                }
            }
            Outcome::ScanImported { result } => match result {
                Ok(response) if response.success => {
                    self.import_status.success(format!(
                        "Success: Imported {} agents",
                        response.imported_agents.len()
                    ));
                    vec![self.agents_request()]
                }
                Ok(response) => {
                    let message = response
                        .message
                        .unwrap_or_else(|| "import failed".to_string());
                    self.import_status.error(format!("Error: {message}"));
                    Vec::new()
                }
                Err(err) => {
                    self.import_status.error(format!("Error: {err}"));
                    Vec::new()
                }
            },
            Outcome::GithubImported { result } => match result {
                Ok(GithubImportReply::Imported { message }) => {
                    self.github_status.success(format!("Success: {message}"));
                    vec![self.agents_request()]
                }
                Ok(GithubImportReply::Rejected { reason }) => {
                    self.github_status.error(format!("Error: {reason}"));
                    Vec::new()
                }
                Err(err) => {
                    self.github_status.error(format!("Error: {err}"));
                    Vec::new()
                }
            },
        }
    }

    fn report(&mut self, context: &str, err: &FormError) {
        warn!(error = %err, "{context}");
        self.error_message = Some(format!("{context}: {err}"));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
