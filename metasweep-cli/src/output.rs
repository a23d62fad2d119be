use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use metasweep_core::catalog::{CatalogEntry, TargetSpec};
use metasweep_core::RunSummary;

/// Format a resolved plan as a table.
pub fn print_plan_table(spec: &TargetSpec, plan: &[CatalogEntry]) {
    if plan.is_empty() {
        println!(
            "{}",
            format!("No objects match '{}'.", spec.schema).yellow()
        );
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Schema"),
            Cell::new("Object"),
            Cell::new("Kind"),
        ]);

    for entry in plan {
        table.add_row(vec![
            Cell::new(&entry.schema),
            Cell::new(&entry.name),
            Cell::new(entry.kind.keyword()),
        ]);
    }

    println!("{table}");
    println!(
        "{}",
        format!("{} object(s) would be dropped in a sweep.", plan.len()).dimmed()
    );
}

/// Print the outcome of a sweep run.
pub fn print_summary(summary: &RunSummary) {
    if summary.total == 0 {
        println!("{}", "No objects matched. Nothing to drop.".green());
        return;
    }

    for outcome in &summary.outcomes {
        let mark = if outcome.succeeded {
            "✓".green()
        } else {
            "✗".red().bold()
        };
        println!("  {} {}", mark, outcome.statement);
        if let Some(ref err) = outcome.error {
            println!("      {}", err.red());
        }
    }

    let counts = format!(
        "{} total, {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    if summary.dry_run {
        println!(
            "{}",
            format!("Dry run complete: {}. Use --execute to apply.", counts)
                .yellow()
                .bold()
        );
    } else if summary.failed > 0 {
        println!("{}", format!("Completed with failures: {}.", counts).red().bold());
    } else {
        println!("{}", format!("Sweep complete: {}.", counts).green().bold());
    }
}
