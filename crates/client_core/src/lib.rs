//! Client-side agent form lifecycle: catalogs, drafts, submission and the
//! controller that ties them together.

pub mod backend;
pub mod catalog;
pub mod controller;
pub mod draft;
pub mod error;
pub mod session;
pub mod status;
pub mod submission;

pub use backend::{AdminBackend, BackendConfig, GithubImportReply, HttpAdminBackend};
pub use catalog::{find_command, group_catalog, group_commands, CommandEntry, CommandGroup};
pub use controller::{Confirm, Dispatch, FormController, FormState, Outcome, Request, Ticket};
pub use draft::{AgentDraft, DraftStore, FieldName, SetField, TextField, ToggleField};
pub use error::{FormError, MissingField};
pub use session::EditorSession;
pub use submission::{DraftOrigin, SubmitOutcome, SubmitTarget};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
