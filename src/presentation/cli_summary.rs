use crate::application::monitoring::PerfReport;
use crate::domain::agistment::Agistment;
use crate::domain::changes::FieldChange;
use crate::domain::session::{Rejection, SaveOutcome};
use crate::domain::value_objects::{EntityId, FieldErrors};
use colored::*;
use serde_json::Value;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

// ─── Listing summary ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct FactRow {
    field: String,
    value: String,
}

pub fn print_listing(listing: &Agistment) {
    println!();
    println!("{}", listing.basic_info.name.bold().cyan());
    println!("Listing: {}", listing.id.as_str().bright_yellow());
    if listing.hidden {
        println!("{}", "Hidden from search".italic().dimmed());
    }
    println!();

    let paddocks = listing
        .paddocks
        .kinds()
        .iter()
        .map(|(kind, p)| format!("{kind}: {}/{} free", p.available, p.total_paddocks))
        .collect::<Vec<_>>()
        .join(", ");

    let rows = vec![
        FactRow {
            field: "Property size".into(),
            value: format!("{} acres", listing.basic_info.property_size),
        },
        FactRow {
            field: "Location".into(),
            value: [
                listing.location.suburb.as_str(),
                listing.location.state.as_str(),
            ]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", "),
        },
        FactRow {
            field: "Contact".into(),
            value: format!(
                "{} <{}> {}",
                listing.contact.name, listing.contact.email, listing.contact.number
            ),
        },
        FactRow {
            field: "Paddocks".into(),
            value: paddocks,
        },
        FactRow {
            field: "Services".into(),
            value: listing.services.join(", "),
        },
        FactRow {
            field: "Photos".into(),
            value: listing.photos.len().to_string(),
        },
    ];

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
}

// ─── Pending changes ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ChangeRow {
    field: String,
    before: String,
    after: String,
}

/// Print the fields an edit session would send.
pub fn print_changes(group: &str, changes: &[FieldChange]) {
    println!();
    println!("{} {}", "PENDING CHANGES".bold().cyan(), group.dimmed());

    if changes.is_empty() {
        println!("{}", "No changes.".italic());
        return;
    }

    let rows: Vec<ChangeRow> = changes
        .iter()
        .map(|c| ChangeRow {
            field: c.field.bold().to_string(),
            before: render(&c.before).red().to_string(),
            after: render(&c.after).green().to_string(),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..=0)).with(Alignment::left()))
        .to_string();
    println!("{table}");
    println!();
}

pub fn print_field_errors(errors: &FieldErrors) {
    println!("{}", "Cannot save:".bold().red());
    for (field, message) in errors.iter() {
        println!("  {} {}", format!("{field}:").yellow(), message);
    }
}

/// Print what a save did. Returns `true` when the save went through.
pub fn print_outcome(outcome: &SaveOutcome<Agistment>) -> bool {
    match outcome {
        SaveOutcome::Saved {
            external_changes, ..
        } => {
            if !external_changes.is_empty() {
                println!();
                println!(
                    "{}",
                    "The server also returned changes made elsewhere:"
                        .bold()
                        .yellow()
                );
                for c in external_changes {
                    println!(
                        "  {}  {} → {}",
                        c.field.bold(),
                        render(&c.before).dimmed(),
                        render(&c.after).red()
                    );
                }
            }
            true
        }
        SaveOutcome::Rejected(Rejection::NotDirty) => {
            println!("{}", "Nothing to save.".italic());
            false
        }
        SaveOutcome::Rejected(Rejection::NotOpen) => {
            println!("{}", "No edit session is open.".italic());
            false
        }
        SaveOutcome::Invalid(errors) => {
            print_field_errors(errors);
            false
        }
        SaveOutcome::Failed { .. } | SaveOutcome::Cancelled => false,
    }
}

// ─── Drafts ───────────────────────────────────────────────────────────────────

pub fn print_drafts(ids: &[EntityId]) {
    if ids.is_empty() {
        println!("{}", "No drafts.".italic());
        return;
    }
    println!("{}", "DRAFTS".bold().cyan());
    for id in ids {
        println!("  {}", id.as_str().bright_yellow());
    }
}

// ─── Performance summary ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PerfRow {
    operation: String,
    listing: String,
    status: String,
    #[tabled(rename = "time (ms)")]
    duration_ms: String,
}

/// Print a timing table of the API calls made during the run.
pub fn print_perf_summary(report: &PerfReport) {
    if report.timings.is_empty() {
        return;
    }

    println!("{}", "API CALLS".bold().cyan());

    let rows: Vec<PerfRow> = report
        .timings
        .iter()
        .map(|t| PerfRow {
            operation: t.operation.dimmed().to_string(),
            listing: t.entity_id.bold().to_string(),
            status: if t.ok {
                "ok".green().to_string()
            } else if t.abandoned {
                "cancelled".yellow().to_string()
            } else {
                "failed".red().to_string()
            },
            duration_ms: format_duration(t.duration_ms),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..=3)).with(Alignment::right()))
        .to_string();

    println!("{table}");
    println!(
        "  Total: {} call(s), {} failed  ·  {} ms elapsed",
        report.timings.len().to_string().bold(),
        report.failures,
        format_duration(report.total_ms),
    );
    println!();
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_duration(ms: u128) -> String {
    if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0).yellow().to_string()
    } else if ms >= 100 {
        ms.to_string().yellow().to_string()
    } else {
        ms.to_string().green().to_string()
    }
}
