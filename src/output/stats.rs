//! Console statistics report
//!
//! This module formats final crawl statistics for the terminal.

use crate::crawler::CrawlStats;

/// Formats statistics as a plain-text report
pub fn format_statistics(stats: &CrawlStats) -> String {
    let mut out = String::from("=== Crawl Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  URLs discovered: {}\n", stats.discovered_pages));
    out.push_str(&format!("  Fetch attempts: {}\n", stats.total_pages));
    out.push_str(&format!("  Successful: {}\n", stats.successful_pages));
    out.push_str(&format!("  Failed: {}\n", stats.failed_pages));
    out.push_str(&format!("  Still queued: {}\n", stats.queued_pages));
    if stats.foreign_links > 0 {
        out.push_str(&format!("  Owned by other workers: {}\n", stats.foreign_links));
    }
    out.push('\n');

    out.push_str("Extraction:\n");
    out.push_str(&format!("  Links found: {}\n", stats.total_links));
    out.push_str(&format!("  Forms found: {}\n", stats.total_forms));
    out.push('\n');

    if !stats.errors_by_kind.is_empty() {
        out.push_str("Error Summary:\n");
        let mut errors: Vec<_> = stats.errors_by_kind.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in errors {
            out.push_str(&format!("  {}: {}\n", kind, count));
        }
        out.push('\n');
    }

    if stats.successful_pages > 0 {
        out.push_str(&format!(
            "Average load time: {:.1} ms\n",
            stats.average_load_time_ms()
        ));
    }
    if let Some(duration) = stats.duration_secs() {
        out.push_str(&format!("Duration: {:.1} s\n", duration));
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} resolved pages)\n",
        stats.success_rate(),
        stats.successful_pages,
        stats.successful_pages + stats.failed_pages
    ));
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    print!("{}", format_statistics(stats));
}
