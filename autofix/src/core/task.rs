//! Task text handed to the fixer agent.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const FIX_TASK_TEMPLATE: &str = include_str!("../prompts/fix_task.md");

/// Render the fixer task embedding the failing build logs.
///
/// The rendered task instructs the agent to edit files but never commit; the
/// loop owns the commit.
pub fn render_fix_task(logs: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("fix_task", FIX_TASK_TEMPLATE)
        .context("load fix task template")?;
    let template = env.get_template("fix_task")?;
    let rendered = template
        .render(context! { logs => logs.trim_end() })
        .context("render fix task")?;
    Ok(rendered)
}
