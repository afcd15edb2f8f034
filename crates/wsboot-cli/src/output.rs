use serde::Serialize;
use wsboot_core::structure::Entry;
use wsboot_core::validate::ValidationReport;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// One `  <verb> <entry>` line per entry.
pub fn print_entries(verb: &str, entries: &[Entry]) {
    for e in entries {
        println!("  {verb} {e}");
    }
}

pub fn print_report(report: &ValidationReport) {
    if report.findings.is_empty() {
        println!("Workspace is valid for tier {}.", report.tier);
        return;
    }
    let rows = report
        .findings
        .iter()
        .map(|f| vec![f.severity.to_string(), f.path.clone(), f.message.clone()])
        .collect();
    print_table(&["SEVERITY", "PATH", "MESSAGE"], rows);
    println!();
    println!(
        "{} error(s), {} warning(s) against tier {}",
        report.error_count(),
        report.warnings().count(),
        report.tier
    );
}
