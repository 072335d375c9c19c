use super::*;
use crate::test_support::{agent, persona, FakeBackend};

fn accept(_: &str) -> bool {
    true
}

fn decline(_: &str) -> bool {
    false
}

#[tokio::test]
async fn mount_populates_all_catalogs() {
    let backend = Arc::new(
        FakeBackend::with_agents(Scope::Local, vec![agent("a1", "p1", "hi")])
            .with_personas(Scope::Local, vec![persona("p1"), persona("p2")]),
    );
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);

    session.mount().await;

    let controller = session.controller();
    assert_eq!(controller.personas().len(), 2);
    assert_eq!(controller.agents()[0].name, "a1");
    assert_eq!(controller.command_groups()[0].key, "web");
    assert!(!controller.is_loading());
    assert_eq!(controller.error_message(), None);
}

#[tokio::test]
async fn load_edit_save_refresh_cycle() {
    let backend = Arc::new(FakeBackend::with_agents(
        Scope::Local,
        vec![agent("helper", "p1", "be helpful")],
    ));
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);
    session.mount().await;

    assert!(session.select_agent("helper", &accept).await);
    assert_eq!(session.controller().state(), FormState::Editing);
    assert_eq!(session.controller().draft().instructions, "be helpful");

    session
        .set_field(TextField::Instructions, "be brief")
        .expect("edit");
    session.toggle_command("search_web", true).expect("edit");
    session.submit().await.expect("saved");

    let saves = backend.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0.path(), "/agents/local/helper");
    assert_eq!(saves[0].1.commands, vec!["search_web".to_string()]);

    let calls = backend.calls();
    assert_eq!(calls.last().map(String::as_str), Some("GET /agents/local"));
    assert!(!session.controller().is_dirty());
    assert!(!session.controller().is_loading());
}

#[tokio::test]
async fn update_writes_back_keys_the_form_does_not_edit() {
    let mut stored = agent("helper", "p1", "be helpful");
    stored
        .extra
        .insert("thumbnail".into(), serde_json::json!("/imgs/helper.png"));
    let backend = Arc::new(FakeBackend::with_agents(Scope::Local, vec![stored]));
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);
    session.mount().await;

    assert!(session.select_agent("helper", &accept).await);
    session.set_raw("persona", "p2").expect("edit");
    session.submit().await.expect("saved");

    let saves = backend.saves();
    assert_eq!(saves[0].1.persona, "p2");
    assert_eq!(
        saves[0].1.extra.get("thumbnail"),
        Some(&serde_json::json!("/imgs/helper.png"))
    );
}

#[tokio::test]
async fn create_new_uncensored_agent_posts_to_collection() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);

    assert!(session.new_agent(&accept).await);
    session.set_raw("name", "a1").expect("edit");
    session.set_raw("persona", "p1").expect("edit");
    session.set_raw("instructions", "hi").expect("edit");
    session
        .set_toggle(ToggleField::Uncensored, true)
        .expect("edit");
    session.submit().await.expect("saved");

    let saves = backend.saves();
    assert_eq!(saves[0].0.method(), "POST");
    assert_eq!(saves[0].0.path(), "/agents/local");
    assert_eq!(saves[0].1.flags, vec!["uncensored".to_string()]);
    assert_eq!(session.controller().agents()[0].name, "a1");
}

#[tokio::test]
async fn validation_failure_skips_backend() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);
    session.new_agent(&accept).await;
    session.set_raw("persona", "p1").expect("edit");
    session.set_raw("instructions", "hi").expect("edit");

    let err = session.submit().await.expect_err("must fail");

    assert_eq!(err.to_string(), "Name is required");
    assert!(backend.saves().is_empty());
}

#[tokio::test]
async fn rejected_save_surfaces_server_reason() {
    let backend = Arc::new(FakeBackend::default());
    *backend.save_error.lock().expect("lock") =
        Some(FormError::Submission("persona does not exist".into()));
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);
    session.new_agent(&accept).await;
    session.set_raw("name", "a1").expect("edit");
    session.set_raw("persona", "ghost").expect("edit");
    session.set_raw("instructions", "hi").expect("edit");

    let err = session.submit().await.expect_err("must fail");

    assert!(err.to_string().contains("persona does not exist"));
    assert_eq!(session.controller().state(), FormState::Error);
    assert!(!session.controller().is_loading());
}

#[tokio::test]
async fn scope_switch_prompts_only_with_unsaved_edits() {
    let backend = Arc::new(
        FakeBackend::with_agents(Scope::Shared, vec![agent("team", "p", "i")])
            .with_personas(Scope::Shared, vec![persona("shared-persona")]),
    );
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);
    session.new_agent(&accept).await;
    session.set_raw("name", "unsaved").expect("edit");

    assert!(!session.change_scope(Scope::Shared, &decline).await);
    assert_eq!(session.controller().draft().name, "unsaved");
    assert!(backend.calls().is_empty());

    assert!(session.change_scope(Scope::Shared, &accept).await);
    assert_eq!(session.controller().draft().name, "");
    assert_eq!(session.controller().agents()[0].name, "team");
    assert_eq!(session.controller().personas()[0].name, "shared-persona");
    let calls = backend.calls();
    assert!(calls.contains(&"GET /agents/shared".to_string()));
    assert!(calls.contains(&"GET /personas/shared".to_string()));
}

#[tokio::test]
async fn imports_refresh_agent_list_on_success() {
    let backend = Arc::new(FakeBackend::default());
    *backend.scan_response.lock().expect("lock") = Some(Ok(
        shared::protocol::ScanImportResponse {
            success: true,
            imported_agents: vec![serde_json::json!({"name": "x"})],
            message: None,
        },
    ));
    let mut session = EditorSession::new(Arc::clone(&backend), Scope::Local);

    session.scan_import("/srv/agents").await;
    session.github_import("owner/repo", None).await;

    let calls = backend.calls();
    assert_eq!(
        calls,
        vec![
            "POST /scan-and-import-agents /srv/agents local".to_string(),
            "GET /agents/local".to_string(),
            "POST /import-github-agent owner/repo local None".to_string(),
            "GET /agents/local".to_string(),
        ]
    );
    assert_eq!(
        session.controller().import_status().text().as_deref(),
        Some("Success: Imported 1 agents")
    );
    assert_eq!(
        session.controller().github_status().text().as_deref(),
        Some("Success: imported")
    );
}

#[tokio::test]
async fn spawned_requests_feed_back_into_controller() {
    let backend = Arc::new(FakeBackend::with_agents(
        Scope::Local,
        vec![agent("a1", "p1", "hi")],
    ));
    let mut controller = FormController::new(Scope::Local);
    let request = controller.refresh_agents();

    let outcome = spawn_request(Arc::clone(&backend), request)
        .await
        .expect("join");
    controller.apply(outcome);

    assert_eq!(controller.agents()[0].name, "a1");
}
