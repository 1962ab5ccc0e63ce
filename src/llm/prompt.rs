use action_flow::RepairRequest;
use softlight_core_types::Plan;

const ACTION_OVERVIEW: &str = "Available actions:\n- open: open the URL in `target`\n- fill: type `value` into the input field named by `target`\n- press: press a keyboard key such as Enter\n- find_and_click: click the button or link named by `target`\n- expect: verify that the text or element in `target` is visible\n- wait_for: pause; optional `extras.timeout_ms`\n- mark_completed: check off the todo item whose text is `target`\n- delete_todo: delete the todo item whose text is `target`\n- clear_completed: click the \"Clear completed\" button\n";

const OUTPUT_RULES: &str = "Output a YAML list. Each item has the keys `action`, `target` and `value` (if any). Return ONLY the YAML, no markdown fences and no prose.";

pub struct PromptBuilder;

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn system_prompt(&self) -> &'static str {
        "You are Softlight's planning strategist. You turn browser automation tasks into short, deterministic YAML action plans that a step interpreter executes one action at a time."
    }

    pub fn build_plan_prompt(&self, task: &str, context: &str) -> String {
        let mut sections = Vec::new();
        sections.push(ACTION_OVERVIEW.to_string());
        sections.push(format!("Task: {}", task.trim()));
        if !context.trim().is_empty() {
            sections.push(format!("Context from knowledge base:\n{}", context.trim()));
        }
        sections.push(OUTPUT_RULES.to_string());
        sections.join("\n\n")
    }

    pub fn build_repair_prompt(&self, request: &RepairRequest) -> String {
        let mut sections = Vec::new();
        sections.push(ACTION_OVERVIEW.to_string());
        sections.push(format!(
            "App: {}\nRepair attempt: {}",
            request.app, request.attempt
        ));
        sections.push(format!(
            "Step {} of the plan failed:\n{}",
            request.failed_step,
            render_plan(&Plan::new(vec![request.action.clone()]))
        ));
        sections.push(format!("Error:\n{}", request.error.trim()));
        sections.push(format!("Current plan:\n{}", render_plan(&request.plan)));
        sections.push(format!(
            "Return the full corrected plan. Steps before step {} already ran and are not repeated; execution resumes at step {}. Returning the plan unchanged ends the run.",
            request.failed_step, request.failed_step
        ));
        sections.push(OUTPUT_RULES.to_string());
        sections.join("\n\n")
    }
}

fn render_plan(plan: &Plan) -> String {
    plan.to_yaml()
        .unwrap_or_else(|_| plan.iter().map(|a| format!("- {a}\n")).collect())
}
