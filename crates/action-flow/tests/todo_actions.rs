use std::sync::Arc;

use action_flow::{EngineConfig, PlanExecutor, RunContext, RunResult, RunStatus};
use action_locator::TieredResolver;
use softlight_core_types::{Action, ActionKind, Plan};
use surface_driver::{Key, MemoryElement, MemorySurface, SurfaceEvent};

struct TodoPage {
    surface: Arc<MemorySurface>,
    items: Vec<usize>,
    toggles: Vec<usize>,
}

fn todo_page(labels: &[&str], clear_button: bool) -> TodoPage {
    let surface = Arc::new(MemorySurface::new());
    let app = surface.add(MemoryElement::new("section").class("todoapp"));
    surface.add_child(app, MemoryElement::new("input").class("new-todo").attr("placeholder", "What needs to be done?"));
    let list = surface.add_child(app, MemoryElement::new("ul").class("todo-list"));

    let mut items = Vec::new();
    let mut toggles = Vec::new();
    for label in labels {
        let item = surface.add_child(list, MemoryElement::new("li"));
        let view = surface.add_child(item, MemoryElement::new("div").class("view"));
        let toggle = surface.add_child(
            view,
            MemoryElement::new("input").class("toggle").attr("type", "checkbox"),
        );
        surface.add_child(view, MemoryElement::new("label").text(*label));
        let destroy = surface.add_child(view, MemoryElement::new("button").class("destroy"));
        surface.remove_on_click(destroy, item);
        items.push(item);
        toggles.push(toggle);
    }

    if clear_button {
        let footer = surface.add_child(app, MemoryElement::new("footer").class("footer"));
        let clear = surface.add_child(
            footer,
            MemoryElement::new("button").class("clear-completed").text("Clear completed"),
        );
        if let Some(first) = items.first() {
            surface.remove_on_click(clear, *first);
        }
    }

    TodoPage {
        surface,
        items,
        toggles,
    }
}

async fn run(surface: &Arc<MemorySurface>, steps: Vec<Action>) -> RunResult {
    let dir = tempfile::tempdir().unwrap();
    let executor = PlanExecutor::new(
        EngineConfig::default(),
        Arc::new(TieredResolver::default()),
        None,
    );
    let ctx = RunContext::create("todomvc", surface.clone(), dir.path(), 3).unwrap();
    executor.run(Plan::new(steps), ctx).await
}

fn step(kind: ActionKind, target: Option<&str>) -> Action {
    Action::new(kind, target, None).unwrap()
}

#[tokio::test]
async fn add_and_complete_a_todo() {
    let page = todo_page(&["Buy milk", "Walk dog"], false);
    let result = run(
        &page.surface,
        vec![
            Action::new(ActionKind::Fill, Some("What needs to be done?"), Some("Read book")).unwrap(),
            step(ActionKind::Press, Some("Enter")),
            step(ActionKind::MarkCompleted, Some("Walk dog")),
        ],
    )
    .await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(page.surface.events().contains(&SurfaceEvent::Press(Key::Enter)));
    assert_eq!(page.surface.attribute(page.toggles[1], "checked").as_deref(), Some("checked"));
    assert_eq!(page.surface.attribute(page.toggles[0], "checked"), None);
    assert_eq!(result.records[2].action, "mark_Walk dog");
}

#[tokio::test]
async fn mark_requires_exact_label() {
    let page = todo_page(&["Buy milk"], false);
    let result = run(&page.surface, vec![step(ActionKind::MarkCompleted, Some("Buy"))]).await;
    assert_eq!(result.status, RunStatus::Aborted);
    assert_eq!(result.records[0].action, "error_mark_completed");
}

#[tokio::test]
async fn delete_hovers_then_destroys() {
    let page = todo_page(&["Buy milk", "Walk dog"], false);
    let result = run(&page.surface, vec![step(ActionKind::DeleteTodo, Some("Buy milk"))]).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(page.surface.is_removed(page.items[0]));
    assert!(!page.surface.is_removed(page.items[1]));

    let events = page.surface.events();
    let hover = events
        .iter()
        .position(|event| *event == SurfaceEvent::Hover(MemorySurface::handle(page.items[0])))
        .unwrap();
    let click = events
        .iter()
        .position(|event| matches!(event, SurfaceEvent::Click(_)))
        .unwrap();
    assert!(hover < click);
}

#[tokio::test]
async fn clear_completed_prefers_footer_control() {
    let page = todo_page(&["Buy milk", "Walk dog"], true);
    let result = run(&page.surface, vec![step(ActionKind::ClearCompleted, None)]).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(page.surface.is_removed(page.items[0]));
    assert!(!page.surface.is_removed(page.items[1]));
}

#[tokio::test]
async fn clear_completed_falls_back_to_deleting_each_item() {
    let page = todo_page(&["Buy milk", "Walk dog", "Read book"], false);
    let result = run(&page.surface, vec![step(ActionKind::ClearCompleted, None)]).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(page.items.iter().all(|item| page.surface.is_removed(*item)));
}

#[tokio::test]
async fn clear_completed_on_empty_list_is_inert() {
    let page = todo_page(&[], false);
    let result = run(&page.surface, vec![step(ActionKind::ClearCompleted, None)]).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(!page
        .surface
        .events()
        .iter()
        .any(|event| matches!(event, SurfaceEvent::Click(_))));
}

#[tokio::test]
async fn press_clicks_named_button_or_falls_back_to_enter() {
    let surface = Arc::new(MemorySurface::new());
    let login = surface.add(MemoryElement::new("input").id("login-button").attr("type", "submit").attr("value", "Login"));
    let result = run(&surface, vec![step(ActionKind::Press, Some("#login-button"))]).await;
    assert_eq!(result.status, RunStatus::Success);
    assert!(surface
        .events()
        .contains(&SurfaceEvent::Click(MemorySurface::handle(login))));

    let surface = Arc::new(MemorySurface::new());
    let field = surface.add(MemoryElement::new("input").attr("type", "search"));
    let result = run(&surface, vec![step(ActionKind::Press, Some("submit search"))]).await;
    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(surface.focused(), Some(field));
    assert!(surface.events().contains(&SurfaceEvent::Press(Key::Enter)));

    let surface = Arc::new(MemorySurface::new());
    let result = run(&surface, vec![step(ActionKind::Press, Some("submit search"))]).await;
    assert_eq!(result.status, RunStatus::Aborted);
}
