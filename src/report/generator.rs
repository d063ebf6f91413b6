//! Plain-text report generation.
//!
//! Renders the active and inactive member tables printed at the end of an
//! audit. Columns are padded to their widest cell, numbers right-aligned.

use crate::models::{AuditOutcome, Member, RankedActive};

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Column gap between cells.
const GAP: &str = "  ";

/// Render a table with a header row and a dashed rule under each column.
pub fn render_table(headers: &[&str], align: &[Align], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut table = String::new();
    table.push_str(&format_row(headers, &widths, align));
    table.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    table.push_str(&rule.join(GAP));
    table.push('\n');

    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        table.push_str(&format_row(&cells, &widths, align));
        table.push('\n');
    }

    table
}

fn format_row(cells: &[&str], widths: &[usize], align: &[Align]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &width))| match align.get(i).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{:<width$}", cell, width = width),
            Align::Right => format!("{:>width$}", cell, width = width),
        })
        .collect();

    padded.join(GAP).trim_end().to_string()
}

/// Generate the active members table.
pub fn generate_active_table(active: &[RankedActive]) -> String {
    let rows: Vec<Vec<String>> = active
        .iter()
        .map(|entry| {
            vec![
                entry.record.member.display_name.clone(),
                entry.record.member.username.clone(),
                entry.record.message_count.to_string(),
                entry.age_days.to_string(),
            ]
        })
        .collect();

    render_table(
        &["Display Name", "Username", "Messages", "Latest (days ago)"],
        &[Align::Left, Align::Left, Align::Right, Align::Right],
        &rows,
    )
}

/// Generate the inactive members table.
pub fn generate_inactive_table(inactive: &[Member]) -> String {
    let rows: Vec<Vec<String>> = inactive
        .iter()
        .map(|member| vec![member.display_name.clone(), member.username.clone()])
        .collect();

    render_table(
        &["Display Name", "Username"],
        &[Align::Left, Align::Left],
        &rows,
    )
}

/// Generate the complete report: both tables with their headings.
pub fn generate_text_report(outcome: &AuditOutcome) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n--- Active members in '{}' ---\n",
        outcome.role.name
    ));
    output.push_str(&generate_active_table(&outcome.active));

    output.push_str(&format!(
        "\n--- Inactive members in '{}' (no messages in the last {} days) ---\n",
        outcome.role.name, outcome.lookback_days
    ));
    output.push_str(&generate_inactive_table(&outcome.inactive));

    output
}
