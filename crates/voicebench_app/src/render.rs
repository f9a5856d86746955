//! Plain-text rendering of list views and notifications for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Local};
use voicebench_core::{ListViewModel, LoadState, Notification, RowView, Variant};

pub(crate) fn table(view: &ListViewModel) -> String {
    let mut out = String::new();
    match &view.load {
        LoadState::Idle | LoadState::Loading => {
            let _ = writeln!(out, "{}: loading...", view.kind);
            return out;
        }
        LoadState::Failed(reason) => {
            let _ = writeln!(out, "{}: failed to load ({})", view.kind, reason);
            return out;
        }
        LoadState::Ready => {}
    }

    let _ = writeln!(
        out,
        "{}: {} total, {} in progress",
        view.kind,
        view.rows.len(),
        view.polling
    );
    for row in &view.rows {
        let _ = writeln!(out, "{}", row_line(row));
    }
    if let Some(err) = &view.validation_error {
        let _ = writeln!(out, "! {err}");
    }
    out
}

fn row_line(row: &RowView) -> String {
    let marker = if row.deleting {
        'x'
    } else if row.busy {
        '*'
    } else if row.polling {
        '~'
    } else {
        ' '
    };
    let active = if row.is_active { "on" } else { "off" };
    format!(
        "{marker} {:<14} {:<28} {:<18} {active}",
        row.id.as_str(),
        row.label,
        row.status
    )
}

pub(crate) fn notification_line(notification: &Notification, at: DateTime<Local>) -> String {
    let tag = match notification.variant {
        Variant::Success => "ok",
        Variant::Error => "error",
        Variant::Info => "info",
    };
    format!(
        "[{}] {tag:<5} {}: {}",
        at.format("%H:%M:%S"),
        notification.title,
        notification.message
    )
}
