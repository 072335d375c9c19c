//! In-memory backend double shared by controller, session and submission tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use shared::{
    domain::Scope,
    protocol::{
        AgentRecord, AgentSummary, CommandInfo, GithubImportRequest, Persona, ScanImportRequest,
        ScanImportResponse,
    },
};

use crate::{
    backend::{AdminBackend, CommandCatalog, GithubImportReply},
    error::FormError,
    submission::SubmitTarget,
};

#[derive(Default)]
pub struct FakeBackend {
    pub personas: Mutex<HashMap<Scope, Result<Vec<Persona>, FormError>>>,
    pub agents: Mutex<HashMap<Scope, Vec<AgentRecord>>>,
    pub agent_list_error: Mutex<Option<FormError>>,
    pub commands: Mutex<Option<Result<CommandCatalog, FormError>>>,
    pub save_error: Mutex<Option<FormError>>,
    pub scan_response: Mutex<Option<Result<ScanImportResponse, FormError>>>,
    pub github_reply: Mutex<Option<Result<GithubImportReply, FormError>>>,
    pub calls: Mutex<Vec<String>>,
    pub saves: Mutex<Vec<(SubmitTarget, AgentRecord)>>,
}

pub fn agent(name: &str, persona: &str, instructions: &str) -> AgentRecord {
    AgentRecord {
        name: name.into(),
        persona: persona.into(),
        instructions: instructions.into(),
        ..AgentRecord::default()
    }
}

pub fn persona(name: &str) -> Persona {
    Persona { name: name.into() }
}

impl FakeBackend {
    pub fn with_agents(scope: Scope, agents: Vec<AgentRecord>) -> Self {
        let backend = Self::default();
        backend.agents.lock().expect("lock").insert(scope, agents);
        backend
    }

    pub fn with_personas(self, scope: Scope, personas: Vec<Persona>) -> Self {
        self.personas
            .lock()
            .expect("lock")
            .insert(scope, Ok(personas));
        self
    }

    pub fn with_commands(self, catalog: CommandCatalog) -> Self {
        *self.commands.lock().expect("lock") = Some(Ok(catalog));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn saves(&self) -> Vec<(SubmitTarget, AgentRecord)> {
        self.saves.lock().expect("lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock").push(call);
    }
}

#[async_trait]
impl AdminBackend for FakeBackend {
    async fn list_personas(&self, scope: Scope) -> Result<Vec<Persona>, FormError> {
        self.record(format!("GET /personas/{scope}"));
        self.personas
            .lock()
            .expect("lock")
            .get(&scope)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_agents(&self, scope: Scope) -> Result<Vec<AgentSummary>, FormError> {
        self.record(format!("GET /agents/{scope}"));
        if let Some(err) = self.agent_list_error.lock().expect("lock").clone() {
            return Err(err);
        }
        Ok(self
            .agents
            .lock()
            .expect("lock")
            .get(&scope)
            .map(|agents| {
                agents
                    .iter()
                    .map(|agent| AgentSummary {
                        name: agent.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_agent(&self, scope: Scope, name: &str) -> Result<AgentRecord, FormError> {
        self.record(format!("GET /agents/{scope}/{name}"));
        self.agents
            .lock()
            .expect("lock")
            .get(&scope)
            .and_then(|agents| agents.iter().find(|agent| agent.name == name).cloned())
            .ok_or_else(|| FormError::Fetch {
                path: format!("/agents/{scope}/{name}"),
                status: 404,
            })
    }

    async fn list_commands(&self) -> Result<CommandCatalog, FormError> {
        self.record("GET /commands".to_string());
        self.commands
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| {
                Ok(vec![(
                    "search_web".to_string(),
                    vec![CommandInfo {
                        provider: Some("web".into()),
                        docstring: None,
                        flags: Vec::new(),
                    }],
                )])
            })
    }

    async fn save_agent(
        &self,
        target: &SubmitTarget,
        payload: &AgentRecord,
    ) -> Result<AgentRecord, FormError> {
        self.record(format!("{} {}", target.method(), target.path()));
        if let Some(err) = self.save_error.lock().expect("lock").clone() {
            return Err(err);
        }
        self.saves
            .lock()
            .expect("lock")
            .push((target.clone(), payload.clone()));

        let scope = match target {
            SubmitTarget::Create { scope } | SubmitTarget::Update { scope, .. } => *scope,
        };
        let mut agents = self.agents.lock().expect("lock");
        let list = agents.entry(scope).or_default();
        if let SubmitTarget::Update { name, .. } = target {
            list.retain(|agent| &agent.name != name);
        }
        list.push(payload.clone());
        Ok(payload.clone())
    }

    async fn scan_and_import(
        &self,
        request: &ScanImportRequest,
    ) -> Result<ScanImportResponse, FormError> {
        self.record(format!(
            "POST /scan-and-import-agents {} {}",
            request.directory, request.scope
        ));
        self.scan_response
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| Ok(ScanImportResponse::default()))
    }

    async fn import_github(
        &self,
        request: &GithubImportRequest,
    ) -> Result<GithubImportReply, FormError> {
        self.record(format!(
            "POST /import-github-agent {} {} {:?}",
            request.repo_path, request.scope, request.tag
        ));
        self.github_reply
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| {
                Ok(GithubImportReply::Imported {
                    message: "imported".into(),
                })
            })
    }
}
