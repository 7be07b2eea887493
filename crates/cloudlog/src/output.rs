use std::io::IsTerminal;

use chrono::SecondsFormat;
use cloudlog_core::model::frame::{FieldValues, Frame};
use cloudlog_core::query::DataResponse;
use owo_colors::OwoColorize;

/// One line per log frame: time, level, body, then the entry id.
pub fn print_frames_human(resp: &DataResponse) {
    if let Some(err) = &resp.error {
        eprintln!("error: {err}");
        return;
    }
    let color = std::io::stdout().is_terminal();
    for frame in &resp.frames {
        println!("{}", render_frame(frame, color));
    }
    println!("-- {} entries --", resp.frames.len());
}

pub fn print_list_human(items: &[String]) {
    for item in items {
        println!("{item}");
    }
}

fn render_frame(frame: &Frame, color: bool) -> String {
    let ts = match frame.field("time").map(|f| &f.values) {
        Some(FieldValues::Time(values)) => values
            .first()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| "-".to_string()),
        _ => "-".to_string(),
    };
    let content = frame.field("content");
    let body = match content.map(|f| &f.values) {
        Some(FieldValues::String(values)) => values.first().map(String::as_str).unwrap_or(""),
        _ => "",
    };
    let level = content
        .and_then(|f| f.labels.get("level"))
        .map(String::as_str)
        .unwrap_or("default");

    let level = if color { colored_level(level) } else { level.to_ascii_uppercase() };
    format!("{ts} {level} | {body} id={}", frame.name)
}

fn colored_level(level: &str) -> String {
    let label = level.to_ascii_uppercase();
    match level {
        "debug" => label.bright_black().to_string(),
        "info" | "notice" => label.green().to_string(),
        "warning" => label.yellow().to_string(),
        "error" => label.red().to_string(),
        "critical" | "alert" | "emergency" => label.magenta().to_string(),
        _ => label,
    }
}
