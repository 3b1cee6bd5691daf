//! Plain-text rendering of repositories, change requests and blame reports.

use std::fmt::Write;

use crate::blame::BlameReport;
use crate::data::{ChangeRequest, Repository};
use crate::provider::ProviderKind;

/// Starts a section: blank line, header, dashed underline of equal length.
fn section(header: &str) -> String {
    format!("\n{header}\n{}\n", "-".repeat(header.chars().count()))
}

/// Renders the numbered repository list shown before repository selection.
pub fn format_repository_list(repositories: &[Repository]) -> String {
    let mut out = section("Available Repositories:");
    for (i, repository) in repositories.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({})",
            i + 1,
            repository.full_name,
            repository.provider.as_str()
        );
    }
    out
}

/// Renders open change requests using the provider's own vocabulary.
pub fn format_change_request_list(kind: ProviderKind, change_requests: &[ChangeRequest]) -> String {
    let mut out = section(&format!("Open {}:", kind.change_request_label()));
    let sigil = kind.change_request_sigil();
    for (i, change_request) in change_requests.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {sigil}{}: {}",
            i + 1,
            change_request.number,
            change_request.title
        );
    }
    out
}

/// Renders the paths changed by a change request.
pub fn format_changed_files(files: &[String]) -> String {
    let mut out = section("Changed Files:");
    for file in files {
        let _ = writeln!(out, "- {file}");
    }
    out
}

/// Renders a blame report ranked by changed lines, highest first.
///
/// Authors with equal counts keep the order in which the aggregation first
/// encountered them.
pub fn format_blame_report(report: &BlameReport) -> String {
    let mut out = section("Authors and Lines Touched:");
    for contribution in report.ranked() {
        let _ = writeln!(out, "{}: {} lines", contribution.author, contribution.lines);
    }
    out
}
