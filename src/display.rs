use crate::catalog::{self, ModelInfo};
use crate::dispatcher::DispatchReport;
use crate::store::ConversationState;
use crate::utils::text::{display_width, wrap_block};
use console::style;
use std::collections::HashMap;
use std::sync::Arc;
use termimad::MadSkin;

fn panel_width() -> usize {
    let term = console::Term::stdout();
    let terminal_width = term.size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), 120).max(50)
}

fn looks_like_markdown(text: &str) -> bool {
    text.contains("```")
        || text.contains("**")
        || text.contains('`')
        || text.lines().any(|l| l.starts_with('#') || l.starts_with("- "))
}

/// Render markdown with the terminal skin
pub fn display_markdown(text: &str) {
    let skin = MadSkin::default();
    skin.print_text(text);
}

fn header(title: &str, status: &str, width: usize) -> String {
    let used = display_width(title) + display_width(status) + 6;
    format!(
        "┌─ {} {}{} ┐",
        title,
        "─".repeat(width.saturating_sub(used)),
        status
    )
}

fn print_boxed(lines: &[String], width: usize) {
    let inner = width.saturating_sub(4);
    for line in lines {
        let padding = inner.saturating_sub(display_width(line));
        println!("│ {}{} │", line, " ".repeat(padding));
    }
}

/// One panel per model: latest answer, error or pending marker, and usage.
pub fn display_model_state(model: &str, state: Option<&ConversationState>) {
    let width = panel_width();
    let title = format!("{} ({})", catalog::label(model), model);

    let status = match state {
        Some(s) if s.loading => style("waiting").yellow().to_string(),
        Some(s) if s.error.is_some() => style("error").red().bold().to_string(),
        Some(s) if s.last_reply().is_some() => style("answered").green().to_string(),
        _ => style("idle").dim().to_string(),
    };

    println!();
    println!("{}", header(&style(&title).bold().cyan().to_string(), &status, width));

    match state {
        Some(s) if s.error.is_some() => {
            let error = s.error.as_deref().unwrap_or_default();
            let lines: Vec<String> = wrap_block(error, width.saturating_sub(4))
                .into_iter()
                .map(|l| style(l).red().to_string())
                .collect();
            print_boxed(&lines, width);
        }
        Some(s) => match s.last_reply() {
            Some(reply) if looks_like_markdown(&reply.content) => {
                println!("└{}┘", "─".repeat(width.saturating_sub(2)));
                display_markdown(&reply.content);
                display_usage_line(s, width);
                return;
            }
            Some(reply) => {
                print_boxed(&wrap_block(&reply.content, width.saturating_sub(4)), width);
            }
            None => print_boxed(&[style("no answer yet").dim().to_string()], width),
        },
        None => print_boxed(&[style("no conversation").dim().to_string()], width),
    }

    println!("└{}┘", "─".repeat(width.saturating_sub(2)));
    if let Some(s) = state {
        display_usage_line(s, width);
    }
}

fn display_usage_line(state: &ConversationState, width: usize) {
    if let Some(usage) = state.usage {
        let text = format!(
            "{} prompt · {} completion · {} total tokens",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
        let padding = width.saturating_sub(display_width(&text));
        println!("{}{}", " ".repeat(padding), style(text).dim());
    }
}

/// Panels for every selected model, in selection order
pub fn display_comparison(models: &[String], states: &HashMap<String, Arc<ConversationState>>) {
    for model in models {
        display_model_state(model, states.get(model).map(Arc::as_ref));
    }
}

pub fn display_report(report: &DispatchReport) {
    println!(
        "\n{} {}",
        style("✔").bold().green(),
        style(format!(
            "Received responses from {} of {} models",
            report.responded_count(),
            report.total()
        ))
        .bold()
    );
    for (model, reason) in &report.failed {
        println!(
            "  {} {}: {}",
            style("✘").red(),
            catalog::label(model),
            style(reason).red()
        );
    }
}

pub fn display_catalog(models: &[ModelInfo], selected: &[String]) {
    println!("\n{}", style("Available models").bold().underlined());
    for model in models {
        let marker = if selected.iter().any(|s| s == model.name) {
            style("●").green()
        } else {
            style("○").dim()
        };
        println!(
            "{} {:<30} {} {}",
            marker,
            model.label,
            style(model.name).dim(),
            style(format!("[{} · {}]", model.provider, model.pricing)).dim()
        );
    }
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("error:").bold().red(), message);
}

pub fn display_info(message: &str) {
    println!("{}", style(message).cyan());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_detection() {
        assert!(looks_like_markdown("# Title\nbody"));
        assert!(looks_like_markdown("use `cargo`"));
        assert!(looks_like_markdown("- one\n- two"));
        assert!(!looks_like_markdown("Plain answer. No formatting."));
    }

    #[test]
    fn header_fills_to_width() {
        let line = header("Model", "ok", 30);
        assert_eq!(display_width(&line), 30);
    }
}
