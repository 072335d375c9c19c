//! Reference catalogs used to populate the agent form.

use shared::protocol::CommandInfo;

const FALLBACK_GROUP: &str = "Other";
const NAME_DELIMITER: char = '_';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
    pub docstring: Option<String>,
    pub flags: Vec<String>,
    pub provider: Option<String>,
}

impl CommandEntry {
    /// Builds an entry from the first info object the server listed for `name`.
    pub fn from_infos(name: impl Into<String>, infos: &[CommandInfo]) -> Self {
        let info = infos.first().cloned().unwrap_or_default();
        Self {
            name: name.into(),
            docstring: info.docstring,
            flags: info.flags,
            provider: info.provider,
        }
    }

    pub fn group_key(&self) -> String {
        if let Some(provider) = self.provider.as_deref().filter(|p| !p.trim().is_empty()) {
            return provider.to_string();
        }
        let prefix = self
            .name
            .split(NAME_DELIMITER)
            .next()
            .unwrap_or_default();
        if prefix.is_empty() {
            FALLBACK_GROUP.to_string()
        } else {
            prefix.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    pub key: String,
    pub commands: Vec<CommandEntry>,
}

/// Groups commands by provider (or name prefix), keeping groups in first-seen
/// order and commands in received order.
pub fn group_commands(entries: impl IntoIterator<Item = CommandEntry>) -> Vec<CommandGroup> {
    let mut groups: Vec<CommandGroup> = Vec::new();
    for entry in entries {
        let key = entry.group_key();
        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => group.commands.push(entry),
            None => groups.push(CommandGroup {
                key,
                commands: vec![entry],
            }),
        }
    }
    groups
}

/// Groups the raw `GET /commands` catalog.
pub fn group_catalog(catalog: &[(String, Vec<CommandInfo>)]) -> Vec<CommandGroup> {
    group_commands(
        catalog
            .iter()
            .map(|(name, infos)| CommandEntry::from_infos(name.clone(), infos)),
    )
}

pub fn find_command<'a>(groups: &'a [CommandGroup], name: &str) -> Option<&'a CommandEntry> {
    groups
        .iter()
        .flat_map(|group| group.commands.iter())
        .find(|entry| entry.name == name)
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
