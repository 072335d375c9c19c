use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use client_core::{
    find_command, status::StatusLine, CommandGroup, EditorSession, FormState, HttpAdminBackend,
    TextField, ToggleField,
};
use tracing::warn;

type Session = EditorSession<HttpAdminBackend>;

/// Answers every discard prompt with yes; the CLI never holds unsaved edits
/// across invocations.
fn discard_ok(_prompt: &str) -> bool {
    true
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub persona: String,
    #[arg(long, conflicts_with = "instructions_file")]
    pub instructions: Option<String>,
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,
    /// Command to enable; repeatable.
    #[arg(long = "command")]
    pub commands: Vec<String>,
    #[arg(long)]
    pub uncensored: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub name: String,
    /// `field=value` assignment; repeatable. Commands take a comma list.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub assignments: Vec<String>,
    #[arg(long = "add-command")]
    pub add_commands: Vec<String>,
    #[arg(long = "remove-command")]
    pub remove_commands: Vec<String>,
    #[arg(long)]
    pub uncensored: Option<bool>,
}

fn warn_on_load_error(session: &Session) {
    if let Some(message) = session.controller().error_message() {
        warn!(%message, "catalog load reported an error");
    }
}

fn ensure_no_error(session: &Session) -> Result<()> {
    match session.controller().error_message() {
        Some(message) => Err(anyhow!(message.to_string())),
        None => Ok(()),
    }
}

fn report_status(line: &StatusLine) -> Result<()> {
    match line.current() {
        Some(message) if message.is_success() => {
            println!("{}", message.text);
            Ok(())
        }
        Some(message) => Err(anyhow!(message.text)),
        None => Ok(()),
    }
}

/// Rejects command names missing from the loaded catalog. Skipped when the
/// catalog could not be loaded.
fn ensure_known_command(groups: &[CommandGroup], name: &str) -> Result<()> {
    if groups.is_empty() || find_command(groups, name).is_some() {
        return Ok(());
    }
    bail!("unknown command `{name}`; run `agent-admin commands` to list them")
}

fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim(), value))
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got `{raw}`"))
}

pub fn list_agents(session: &Session) -> Result<()> {
    warn_on_load_error(session);
    for agent in session.controller().agents() {
        println!("{}", agent.name);
    }
    Ok(())
}

pub fn list_personas(session: &Session) -> Result<()> {
    warn_on_load_error(session);
    for persona in session.controller().personas() {
        println!("{}", persona.name);
    }
    Ok(())
}

pub fn list_commands(session: &Session) -> Result<()> {
    warn_on_load_error(session);
    for group in session.controller().command_groups() {
        println!("{}:", group.key);
        for command in &group.commands {
            match command.docstring.as_deref().filter(|doc| !doc.trim().is_empty()) {
                Some(doc) => println!("  {:<24} {}", command.name, doc.trim()),
                None => println!("  {}", command.name),
            }
        }
    }
    Ok(())
}

async fn load(session: &mut Session, name: &str) -> Result<()> {
    session.select_agent(name, &discard_ok).await;
    if session.controller().state() != FormState::Editing {
        ensure_no_error(session)?;
        bail!("agent `{name}` could not be loaded");
    }
    Ok(())
}

pub async fn show(session: &mut Session, name: &str) -> Result<()> {
    load(session, name).await?;
    let payload = session.controller().draft().to_payload();
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

pub async fn create(session: &mut Session, args: CreateArgs) -> Result<()> {
    let instructions = match (args.instructions, args.instructions_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => String::new(),
    };

    session.new_agent(&discard_ok).await;
    session.set_field(TextField::Name, args.name)?;
    session.set_field(TextField::Persona, args.persona)?;
    session.set_field(TextField::Instructions, instructions)?;
    for command in &args.commands {
        ensure_known_command(session.controller().command_groups(), command)?;
        session.toggle_command(command, true)?;
    }
    session.set_toggle(ToggleField::Uncensored, args.uncensored)?;

    session.submit().await?;
    report_status(session.controller().save_status())
}

pub async fn edit(session: &mut Session, args: EditArgs) -> Result<()> {
    load(session, &args.name).await?;

    for raw in &args.assignments {
        let (field, value) = parse_assignment(raw)?;
        session.set_raw(field, value)?;
    }
    for command in &args.add_commands {
        ensure_known_command(session.controller().command_groups(), command)?;
        session.toggle_command(command, true)?;
    }
    for command in &args.remove_commands {
        session.toggle_command(command, false)?;
    }
    if let Some(uncensored) = args.uncensored {
        session.set_toggle(ToggleField::Uncensored, uncensored)?;
    }

    if !session.controller().is_dirty() {
        println!("No changes to save");
        return Ok(());
    }
    session.submit().await?;
    report_status(session.controller().save_status())
}

pub async fn scan_import(session: &mut Session, directory: &str) -> Result<()> {
    if directory.trim().is_empty() {
        bail!("directory is required");
    }
    session.scan_import(directory).await;
    report_status(session.controller().import_status())
}

pub async fn github_import(session: &mut Session, repo_path: &str, tag: Option<&str>) -> Result<()> {
    session.github_import(repo_path, tag).await;
    report_status(session.controller().github_status())
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
