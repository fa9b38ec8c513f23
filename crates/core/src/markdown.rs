//! Markdown rendering of an [`AcceptanceReport`]

use crate::report::{AcceptanceReport, ReportSummary};
use crate::result::{FlowResult, MissingRequirement, RequirementKind};

/// Render the report as a markdown document.
///
/// Section order is fixed: header, Summary, Missing Requirements,
/// Results by Section, Test Flow Results, footer.
pub fn render_markdown(report: &AcceptanceReport) -> String {
    let mut out = String::new();
    render_header(&mut out, report);
    render_summary(&mut out, &report.summary);
    render_missing_requirements(&mut out, &report.missing_requirements);
    render_sections(&mut out, report);
    render_flows(&mut out, &report.flows);
    render_footer(&mut out, report);
    out
}

fn render_header(out: &mut String, report: &AcceptanceReport) {
    let meta = &report.metadata;
    out.push_str(&format!("# Acceptance Report: {}\n\n", report.title));
    out.push_str(&format!("- **Generated:** {}\n", report.timestamp.to_rfc3339()));
    out.push_str(&format!("- **Session:** `{}`\n", meta.session_id));
    if let Some(path) = &meta.source_path {
        out.push_str(&format!("- **Source:** `{}`\n", path.display()));
    }
    out.push_str(&format!("- **Duration:** {} ms\n\n", report.duration_ms));
}

fn render_summary(out: &mut String, summary: &ReportSummary) {
    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    let rows = [
        ("Total", summary.total.to_string()),
        ("✅ Passed", summary.passed.to_string()),
        ("❌ Failed", summary.failed.to_string()),
        ("⏭️ Skipped", summary.skipped.to_string()),
        ("🚧 Blocked", summary.blocked.to_string()),
        ("💥 Errors", summary.errors.to_string()),
        ("Pass rate", format!("{:.1}%", summary.pass_rate)),
        ("Testable", format!("{:.1}%", summary.testable_rate)),
    ];
    for (metric, value) in rows {
        out.push_str(&format!("| {} | {} |\n", metric, value));
    }
    out.push('\n');
}

fn render_missing_requirements(out: &mut String, requirements: &[MissingRequirement]) {
    out.push_str("## Missing Requirements\n\n");
    if requirements.is_empty() {
        out.push_str("No missing test hooks were detected.\n\n");
        return;
    }

    out.push_str("| Kind | Element | Suggested value | Owner | Reason |\n");
    out.push_str("|------|---------|-----------------|-------|--------|\n");
    for req in requirements {
        out.push_str(&format!(
            "| {} | {} | `{}` | {} | {} |\n",
            req.kind,
            cell(&req.element),
            req.suggested_value,
            req.owner,
            cell(&req.reason)
        ));
    }

    let example = &requirements[0];
    out.push_str("\n### Example fix\n\n");
    out.push_str(&format!("For \"{}\":\n\n", cell(&example.element)));
    out.push_str("```tsx\n");
    out.push_str(&fix_example(example));
    out.push_str("\n```\n\n");
}

fn fix_example(req: &MissingRequirement) -> String {
    let prop = match req.kind {
        RequirementKind::TestId => format!("testID=\"{}\"", req.suggested_value),
        RequirementKind::AccessibilityLabel => format!("accessibilityLabel=\"{}\"", req.suggested_value),
        RequirementKind::AccessibilityHint => format!("accessibilityHint=\"{}\"", req.suggested_value),
    };
    format!("<Pressable {}>\n  {{/* ... */}}\n</Pressable>", prop)
}

fn render_sections(out: &mut String, report: &AcceptanceReport) {
    out.push_str("## Results by Section\n\n");
    if report.sections.is_empty() {
        out.push_str("No criteria were executed.\n\n");
        return;
    }
    for section in &report.sections {
        out.push_str(&format!(
            "### {} ({}/{} passed)\n\n",
            section.name, section.summary.passed, section.summary.total
        ));
        for result in &section.results {
            out.push_str(&format!(
                "- {} **{}** {}: {}\n",
                result.status.icon(),
                result.criterion_id,
                result.description,
                cell(&result.message)
            ));
        }
        out.push('\n');
    }
}

fn render_flows(out: &mut String, flows: &[FlowResult]) {
    out.push_str("## Test Flow Results\n\n");
    if flows.is_empty() {
        out.push_str("No test flows were run.\n\n");
        return;
    }
    for flow in flows {
        let icon = if flow.success { "✅" } else { "❌" };
        out.push_str(&format!(
            "### {} Flow {}: {} ({}/{} steps)\n\n",
            icon, flow.flow_number, flow.flow_name, flow.completed_steps, flow.total_steps
        ));
        out.push_str("| Step | Description | Status | Message |\n");
        out.push_str("|------|-------------|--------|---------|\n");
        for step in &flow.step_results {
            out.push_str(&format!(
                "| {} | {} | {} {} | {} |\n",
                step.step_number,
                cell(&step.description),
                step.status.icon(),
                step.status,
                cell(&step.message)
            ));
        }
        if let Some(step) = flow.aborted_at {
            out.push_str(&format!("\nAborted at step {}.\n", step));
        }
        out.push('\n');
    }
}

fn render_footer(out: &mut String, report: &AcceptanceReport) {
    out.push_str("---\n\n");
    out.push_str(&format!(
        "*Generated by uatkit {} in {} ms*\n",
        report.metadata.tool_version, report.duration_ms
    ));
}

/// Keep a value on one table row
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_report;
    use crate::report::tests::{criterion_result, input, requirement};
    use crate::result::CheckStatus;

    #[test]
    fn test_section_order_is_fixed() {
        let report = build_report(input(vec![criterion_result("visual-1", "Visual", CheckStatus::Pass)], vec![]));
        let md = render_markdown(&report);

        let positions: Vec<usize> = [
            "# Acceptance Report: Login",
            "## Summary",
            "## Missing Requirements",
            "## Results by Section",
            "## Test Flow Results",
            "*Generated by uatkit",
        ]
        .iter()
        .map(|heading| md.find(heading).unwrap())
        .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_missing_requirements_table_and_example() {
        let mut blocked = criterion_result("visual-1", "Visual", CheckStatus::Blocked);
        blocked.missing_requirements = vec![
            requirement(RequirementKind::TestId, "login", "visual-1"),
            requirement(RequirementKind::AccessibilityLabel, "Login", "visual-1"),
        ];
        let md = render_markdown(&build_report(input(vec![blocked], vec![])));

        assert!(md.contains("| testID | login element | `login` | visual-1 |"));
        assert!(md.contains("accessibilityLabel"));
        assert!(md.contains("<Pressable testID=\"login\">"));
        assert_eq!(md.matches("### Example fix").count(), 1);
    }

    #[test]
    fn test_cells_escape_pipes() {
        assert_eq!(cell("a | b\nc"), "a \\| b c");
    }
}
