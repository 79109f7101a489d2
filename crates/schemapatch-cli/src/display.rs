//! Display formatting for CLI output

use console::style;
use schemapatch_core::PatchedCrd;
use similar::{ChangeTag, TextDiff};

/// Lines of context around each hunk
const CONTEXT_LINES: usize = 3;

/// One summary line for a patched CRD
pub fn summary_line(crd: &PatchedCrd) -> String {
    let marker = if crd.is_changed() {
        style("✓").green()
    } else {
        style("=").dim()
    };
    format!(
        "  {} {} ({}, {} schema, versions: {})",
        marker,
        crd.file_name,
        style(&crd.group_kind).cyan(),
        crd.placement,
        crd.patched_versions.join(", ")
    )
}

/// Unified diff between the manifest as read and as patched
pub fn unified_diff(crd: &PatchedCrd) -> String {
    let diff = TextDiff::from_lines(&crd.original, &crd.output);
    let old = format!("a/{}", crd.file_name);
    let new = format!("b/{}", crd.file_name);

    let mut out = String::new();
    out.push_str(&format!(
        "{}\n{}\n",
        style(format!("--- {}", old)).red(),
        style(format!("+++ {}", new)).green()
    ));
    for hunk in diff.unified_diff().context_radius(CONTEXT_LINES).iter_hunks() {
        out.push_str(&format!("{}\n", style(hunk.header()).cyan()));
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => style(format!("-{}", change.value())).red(),
                ChangeTag::Insert => style(format!("+{}", change.value())).green(),
                ChangeTag::Equal => style(format!(" {}", change.value())),
            };
            out.push_str(&line.to_string());
            if change.missing_newline() {
                out.push_str("\n\\ No newline at end of file\n");
            }
        }
    }
    out
}
