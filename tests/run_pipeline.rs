use std::sync::Arc;

use action_flow::{AbortReason, RepairOracle, RunStatus, ScriptedOracle};
use softlight_cli::cli::execute_plan;
use softlight_cli::{detect_app, plan_task, AppConfig, KnowledgeBase, RuleBasedPlanner};
use softlight_core_types::Plan;
use softlight_snapshot_store::SUMMARY_HEADER;
use surface_driver::{
    Key, MemoryElement, MemorySurface, SessionCookie, SessionStore, StorageMap, SurfaceDriver,
    SurfaceEvent,
};
use tempfile::TempDir;

const TODO_ORIGIN: &str = "https://demo.playwright.dev";

fn config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.capture.dataset_dir = dir.path().join("dataset");
    config.session.state_dir = dir.path().join("state");
    config
}

/// TodoMVC-like page: typing into the new-todo field and pressing Enter
/// reveals the "Buy milk" row.
fn todo_surface() -> Arc<MemorySurface> {
    let surface = Arc::new(MemorySurface::new());
    let app = surface.add(MemoryElement::new("section").class("todoapp"));
    surface.add_child(
        app,
        MemoryElement::new("input")
            .class("new-todo")
            .attr("placeholder", "What needs to be done?"),
    );
    let list = surface.add_child(app, MemoryElement::new("ul").class("todo-list"));
    let row = surface.add_child(list, MemoryElement::new("li").text("Buy milk").hidden());
    surface.reveal_on_key(Key::Enter, row);
    surface
}

#[tokio::test]
async fn todo_template_runs_and_persists_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let plan = plan_task(&RuleBasedPlanner, &KnowledgeBase::default(), "add todo items", 2)
        .await
        .unwrap();
    let app = detect_app(&config.apps, &plan);
    assert_eq!(app, "todomvc");

    let surface = todo_surface();
    surface.set_storage(
        TODO_ORIGIN,
        StorageMap::from([("todos".to_string(), "[]".to_string())]),
    );
    let result = execute_plan(&config, &app, plan, surface.clone(), None, None)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.records.len(), 6);
    assert!(result.run_dir.starts_with(config.capture.dataset_dir.join("todomvc")));

    let summary = std::fs::read_to_string(result.summary_path.unwrap()).unwrap();
    let mut lines = summary.lines();
    assert_eq!(lines.next().unwrap(), SUMMARY_HEADER.join(","));
    assert_eq!(lines.count(), 6);

    let saved = SessionStore::new(&config.session.state_dir)
        .load("todomvc")
        .await;
    assert_eq!(
        saved.entries_for(TODO_ORIGIN).and_then(|entries| entries.get("todos")),
        Some(&"[]".to_string())
    );
}

#[tokio::test]
async fn aborted_run_still_saves_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let plan = Plan::parse(
        "- action: open\n  target: https://shop.test/\n- action: fill\n  target: '#missing-field'\n  value: Ada\n",
    )
    .unwrap();
    let surface = Arc::new(MemorySurface::new());
    surface.add(MemoryElement::new("div").text("Welcome"));
    surface.set_storage(
        "https://shop.test",
        StorageMap::from([("cart".to_string(), "1".to_string())]),
    );
    let oracle = Arc::new(ScriptedOracle::replies(["not: [a plan"]));

    let result = execute_plan(
        &config,
        "shop",
        plan,
        surface,
        Some(oracle.clone() as Arc<dyn RepairOracle>),
        Some(1),
    )
    .await
    .unwrap();

    assert_eq!(result.status, RunStatus::Aborted);
    assert!(matches!(result.abort_reason, Some(AbortReason::MalformedPlan(_))));
    assert_eq!(oracle.calls(), 1);
    assert_eq!(result.records.len(), 2);
    assert!(result.summary_path.is_some());

    let saved = SessionStore::new(&config.session.state_dir).load("shop").await;
    assert_eq!(
        saved.entries_for("https://shop.test").and_then(|entries| entries.get("cart")),
        Some(&"1".to_string())
    );
}

#[tokio::test]
async fn max_repairs_override_of_zero_skips_the_oracle() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let plan = Plan::parse("- action: find_and_click\n  target: '#nowhere'\n").unwrap();
    let surface: Arc<dyn SurfaceDriver> = Arc::new(MemorySurface::new());
    let oracle = Arc::new(ScriptedOracle::default());

    let result = execute_plan(
        &config,
        "generic",
        plan,
        surface,
        Some(oracle.clone() as Arc<dyn RepairOracle>),
        Some(0),
    )
    .await
    .unwrap();

    assert_eq!(
        result.abort_reason,
        Some(AbortReason::RepairBudgetExhausted { max_repairs: 0 })
    );
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn unusable_dataset_dir_still_closes_the_browser() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    config.capture.dataset_dir = blocker;
    let plan = Plan::parse("- action: open\n  target: https://example.com\n").unwrap();
    let surface = Arc::new(MemorySurface::new());

    let err = execute_plan(&config, "generic", plan, surface.clone(), None, None)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to prepare capture directory"));
    assert_eq!(surface.events(), vec![SurfaceEvent::Close]);
}

#[tokio::test]
async fn login_cookie_is_saved_with_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let plan = Plan::parse("- action: open\n  target: https://www.saucedemo.com/\n").unwrap();
    let surface = Arc::new(MemorySurface::new());
    let login = SessionCookie::new("session-username", "standard_user");
    surface.set_cookies("https://www.saucedemo.com", vec![login.clone()]);

    let result = execute_plan(&config, "saucedemo", plan, surface, None, None)
        .await
        .unwrap();
    assert_eq!(result.status, RunStatus::Success);

    let saved = SessionStore::new(&config.session.state_dir)
        .load("saucedemo")
        .await;
    assert_eq!(
        saved.cookies_for("https://www.saucedemo.com"),
        Some(&[login][..])
    );
}
