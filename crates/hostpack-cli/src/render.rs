use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use hostpack_operation::{OperationResult, OperationStatus};
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(stdout_is_terminal: bool, no_color: bool) -> OutputStyle {
    if stdout_is_terminal && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

/// Badges are plain ASCII so rich output stays readable when captured.
pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        "restart" => "[RESTART]",
        _ => "[..]",
    }
}

pub(crate) fn status_token(status: OperationStatus) -> &'static str {
    match status {
        OperationStatus::Success => "ok",
        OperationStatus::Cancel => "warn",
        OperationStatus::Failure => "err",
        OperationStatus::RestartRequired => "restart",
        OperationStatus::Progress => "step",
    }
}

pub(crate) fn exit_code_for(status: OperationStatus) -> u8 {
    match status {
        OperationStatus::Success | OperationStatus::RestartRequired => 0,
        OperationStatus::Cancel => 2,
        OperationStatus::Failure | OperationStatus::Progress => 1,
    }
}

pub(crate) fn format_result_lines(result: &OperationResult, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![render_status_line(
        style,
        status_token(result.status),
        &result.message,
    )];
    for package in &result.skipped {
        lines.push(render_status_line(
            style,
            "step",
            &format!("skipped {package}: provided by the host"),
        ));
    }
    lines
}

pub(crate) fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(colorize(section_style(), &format!("== {title} =="))),
    }
}

pub(crate) struct TerminalProgress {
    label: String,
    done: u64,
    total: u64,
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub(crate) fn start(style: OutputStyle, label: &str, total: u64) -> Self {
        Self {
            label: label.to_string(),
            done: 0,
            total,
            bar: (style == OutputStyle::Rich).then(|| step_bar(label, total)),
        }
    }

    pub(crate) fn set(&mut self, done: u64, step: &str) {
        self.done = done.min(self.total);
        if let Some(bar) = &self.bar {
            bar.set_position(self.done);
            bar.set_message(step.to_string());
        }
    }

    pub(crate) fn finish(self) {
        let Some(bar) = self.bar else {
            return;
        };
        let elapsed = bar.elapsed();
        bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            OutputStyle::Rich,
            &self.label,
            self.done,
            self.total,
            Some(elapsed),
        ) {
            println!("{line}");
        }
    }
}

fn step_bar(label: &str, total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total).with_message(label.to_string());
    if let Ok(template) = ProgressStyle::with_template("{msg:<40} [{bar:24.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(template.progress_chars("#>-"));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::Blue.into()))
        .effects(Effects::BOLD | Effects::UNDERLINE)
}

fn label_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Cyan.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{style}{text}{style:#}")
}

pub(crate) fn render_progress_line(
    style: OutputStyle,
    label: &str,
    done: u64,
    total: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let done = done.min(total);
    let percent = if total == 0 { 100 } else { done * 100 / total };
    let mut line = format!(
        "{} {}/{} steps ({percent}%)",
        colorize(label_style(), label),
        HumanCount(done),
        HumanCount(total)
    );
    if let Some(elapsed) = elapsed {
        line.push_str(&format!(" in {}", HumanDuration(elapsed)));
    }
    Some(line)
}
