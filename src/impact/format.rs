//! Text and Mermaid rendering for impact reports

use colored::Colorize;

use super::types::{Classification, FunctionChange, ImpactItem, ImpactReport, Severity};

fn paint_severity(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.green().to_string(),
        Severity::Informational | Severity::None => label.dimmed().to_string(),
    }
}

fn item_lines(item: &ImpactItem, out: &mut Vec<String>) {
    out.push(format!(
        "  {:.1}  {:<13} {}",
        item.impact_score,
        paint_severity(item.severity),
        item.test_path.bold()
    ));
    for reason in &item.reasons {
        out.push(format!("        - {reason}"));
    }
    if item.suppressed_reasons > 0 {
        out.push(
            format!("        (+{} more)", item.suppressed_reasons)
                .dimmed()
                .to_string(),
        );
    }
}

/// Human-readable report for the terminal
pub fn format_report(report: &ImpactReport) -> String {
    let mut lines = vec![format!(
        "{} {}  {} {}",
        "Severity:".bold(),
        paint_severity(report.overall_severity),
        "Action:".bold(),
        report.suggested_action
    )];

    if report.impacted_tests.is_empty() {
        lines.push("No impacted tests.".dimmed().to_string());
        return lines.join("\n");
    }

    lines.push(format!("{} impacted:", report.impacted_tests.len()));
    for item in &report.impacted_tests {
        item_lines(item, &mut lines);
    }
    lines.join("\n")
}

/// One line per classified function, grouped by file order
pub fn format_function_changes(changes: &[FunctionChange]) -> String {
    if changes.is_empty() {
        return "No changed functions.".dimmed().to_string();
    }
    changes
        .iter()
        .map(|c| {
            let label = match c.classification {
                Classification::Functional => c.classification.to_string().red().to_string(),
                Classification::Mixed => c.classification.to_string().yellow().to_string(),
                Classification::NonFunctional => {
                    c.classification.to_string().green().to_string()
                }
            };
            format!(
                "{:<16} {}::{}  {}",
                label,
                c.containing_file,
                c.name.bold(),
                c.evidence.dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mermaid graph: every impacted test points at the change set node
pub fn report_to_mermaid(report: &ImpactReport) -> String {
    let mut lines = vec!["graph TD".to_string()];
    lines.push(format!(
        "    A[\"change set ({})\"]\n    style A fill:#f96",
        report.overall_severity
    ));
    for (i, item) in report.impacted_tests.iter().enumerate() {
        let id = node_letter(i + 1);
        lines.push(format!(
            "    {}{{\"{}\\nscore: {:.1}\"}}",
            id,
            mermaid_escape(&item.test_path),
            item.impact_score
        ));
        // Dotted edges for evidence below the caller tiers
        let edge = if item.impact_score >= 0.7 { "-->" } else { "-.->" };
        lines.push(format!("    {id} {edge} A"));
    }
    lines.join("\n")
}

/// Spreadsheet-style node id: A..Z, AA..AZ, BA..
fn node_letter(mut i: usize) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (i % 26) as u8) as char);
        if i < 26 {
            break;
        }
        i = i / 26 - 1;
    }
    result
}

fn mermaid_escape(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
