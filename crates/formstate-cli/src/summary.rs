use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use formstate_cli::logging::redact_json;
use formstate_cli::replay::{Mismatch, ReplayReport};
use formstate_model::{Feedback, FormSnapshot, ValidState};
use formstate_store::FormEvent;

use crate::commands::CheckOutcome;

pub fn print_report(report: &ReplayReport, mismatches: &[Mismatch]) {
    println!("Scenario: {}", report.scenario);
    println!(
        "Submits: {}  Validations: {}",
        report.payloads.len(),
        report.validations
    );

    print_state_table(report);
    print_field_table(report);
    print_event_table(&report.events);
    print_mismatch_table(mismatches);

    if mismatches.is_empty() {
        println!("Result: ok");
    } else {
        println!("Result: {} expectation(s) not met", mismatches.len());
    }
}

fn print_state_table(report: &ReplayReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Checkpoint"),
        header_cell("Valid"),
        header_cell("Saved"),
        header_cell("Unsaved"),
        header_cell("Validating"),
        header_cell("Submitting"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Center);
    }
    align_column(&mut table, 6, CellAlignment::Right);

    let rows = report
        .checkpoints
        .iter()
        .map(|c| (Cell::new(&c.label), &c.snapshot))
        .chain(std::iter::once((
            Cell::new("final").fg(Color::Cyan).add_attribute(Attribute::Bold),
            &report.final_snapshot,
        )));
    for (label, snapshot) in rows {
        table.add_row(state_row(label, snapshot));
    }
    println!("{table}");
}

fn state_row(label: Cell, snapshot: &FormSnapshot) -> Vec<Cell> {
    vec![
        label,
        valid_cell(snapshot.valid),
        flag_cell(snapshot.saved, Color::Green),
        flag_cell(snapshot.has_unsaved_changes, Color::Yellow),
        flag_cell(snapshot.validating, Color::Blue),
        flag_cell(snapshot.submitting, Color::Blue),
        count_cell(snapshot.error_count(), Color::Red),
    ]
}

fn print_field_table(report: &ReplayReport) {
    if report.fields.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Value"),
        header_cell("State"),
        header_cell("Messages"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for field in &report.fields {
        let value = field
            .value
            .as_ref()
            .map_or_else(|| dim_cell("-"), |v| Cell::new(redact_json(v)));
        table.add_row(vec![
            Cell::new(&field.path),
            value,
            state_cell(field.valid),
            messages_cell(&field.messages),
        ]);
    }
    println!("{table}");

    let global = &report.final_snapshot.messages.global;
    if !global.is_empty() {
        println!("Form messages:");
        for message in global {
            println!("  {}: {}", message.kind, message.message);
        }
    }
}

fn print_event_table(events: &[FormEvent]) {
    if events.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Event"), header_cell("Payload")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (idx, event) in events.iter().enumerate() {
        let payload = match event {
            FormEvent::Saved(data) | FormEvent::Autosaved(data) => redact_json(data),
            FormEvent::ValidationFail(messages) => format!("{} message(s)", messages.len()),
        };
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(event.name()).add_attribute(Attribute::Bold),
            Cell::new(payload),
        ]);
    }
    println!("{table}");
}

fn print_mismatch_table(mismatches: &[Mismatch]) {
    if mismatches.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Check"),
        header_cell("Expected"),
        header_cell("Actual"),
    ]);
    apply_table_style(&mut table);
    for mismatch in mismatches {
        let show = |value: &serde_json::Value| {
            if mismatch.check == "data" {
                redact_json(value)
            } else {
                value.to_string()
            }
        };
        table.add_row(vec![
            Cell::new(mismatch.check).fg(Color::Red).add_attribute(Attribute::Bold),
            Cell::new(show(&mismatch.expected)),
            Cell::new(show(&mismatch.actual)),
        ]);
    }
    println!("{table}");
}

pub fn print_check_summary(outcomes: &[CheckOutcome]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Scenario"),
        header_cell("File"),
        header_cell("Steps"),
        header_cell("Result"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);

    let mut failed = 0usize;
    for outcome in outcomes {
        let result = if let Some(error) = &outcome.error {
            failed += 1;
            Cell::new(format!("ERROR: {error}")).fg(Color::Red)
        } else if outcome.mismatches.is_empty() {
            Cell::new("PASS").fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            failed += 1;
            let checks: Vec<&str> = outcome.mismatches.iter().map(|m| m.check).collect();
            Cell::new(format!("FAIL ({})", checks.join(", ")))
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        };
        table.add_row(vec![
            outcome
                .scenario
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(outcome.path.display()),
            Cell::new(outcome.steps),
            result,
        ]);
    }
    println!("{table}");
    println!("{} passed, {failed} failed", outcomes.len() - failed);
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

fn valid_cell(valid: bool) -> Cell {
    if valid {
        Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn flag_cell(set: bool, color: Color) -> Cell {
    if set {
        Cell::new("●").fg(color)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn state_cell(state: Option<ValidState>) -> Cell {
    match state {
        Some(ValidState::Valid) => Cell::new("valid").fg(Color::Green),
        Some(ValidState::Invalid) => Cell::new("invalid").fg(Color::Red),
        None => dim_cell("-"),
    }
}

fn messages_cell(messages: &[Feedback]) -> Cell {
    if messages.is_empty() {
        return dim_cell("-");
    }
    let text: Vec<String> = messages
        .iter()
        .map(|m| format!("{}: {}", m.kind, m.message))
        .collect();
    let cell = Cell::new(text.join("\n"));
    if messages.iter().any(Feedback::is_error) {
        cell.fg(Color::Red)
    } else {
        cell.fg(Color::Yellow)
    }
}
