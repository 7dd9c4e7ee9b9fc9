use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use pkgmark_state::MarkOutcome;

use crate::config::OutputStyleSetting;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style(setting: OutputStyleSetting) -> OutputStyle {
    resolve_output_style(
        setting,
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty()),
    )
}

pub(crate) fn resolve_output_style(
    setting: OutputStyleSetting,
    stdout_is_terminal: bool,
    no_color: bool,
) -> OutputStyle {
    match setting {
        OutputStyleSetting::Plain => OutputStyle::Plain,
        OutputStyleSetting::Rich => OutputStyle::Rich,
        OutputStyleSetting::Auto if stdout_is_terminal && !no_color => OutputStyle::Rich,
        OutputStyleSetting::Auto => OutputStyle::Plain,
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

pub(crate) fn render_error_line(style: OutputStyle, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("error: {message}"),
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(error_style(), status_badge("err"))
        ),
    }
}

pub(crate) fn format_mark_outcome_lines(outcome: &MarkOutcome, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    if !outcome.unchanged.is_empty() {
        lines.push(render_status_line(
            style,
            "info",
            &format!(
                "{} is already marked as {}.",
                outcome.name,
                join_naturally(&outcome.unchanged)
            ),
        ));
    }
    if !outcome.changed.is_empty() {
        lines.push(render_status_line(
            style,
            "ok",
            &format!(
                "{} is now marked as {}.",
                outcome.name,
                join_naturally(&outcome.changed)
            ),
        ));
    }
    lines
}

/// `a`, `a and b`, `a, b, and c`.
pub(crate) fn join_naturally(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn error_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
