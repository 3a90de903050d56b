//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a finished
//! crawl: run information, page accounting, timing, depth breakdown, and
//! failures by kind.

use crate::crawler::CrawlStats;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a crawl to a file
///
/// # Arguments
///
/// * `seed` - The crawl's seed URL
/// * `stats` - Final statistics of the run
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    seed: &str,
    stats: &CrawlStats,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(seed, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(seed: &str, stats: &CrawlStats) -> String {
    let mut md = String::new();

    md.push_str("# Trawler Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", seed));
    if let Some(started) = stats.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = stats.duration_secs() {
        md.push_str(&format!("- **Duration**: {:.1} seconds\n", duration));
    }
    md.push_str(&format!("- **Status**: {}\n", run_status(stats)));
    if stats.resumed {
        md.push_str("- **Resumed**: yes\n");
    }
    if let Some(error) = &stats.state_load_error {
        md.push_str(&format!("- **Checkpoint ignored**: {}\n", error));
    }
    md.push('\n');

    md.push_str("## Page Accounting\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", stats.discovered_pages));
    md.push_str(&format!("| Fetch attempts | {} |\n", stats.total_pages));
    md.push_str(&format!("| Successful | {} |\n", stats.successful_pages));
    md.push_str(&format!("| Failed | {} |\n", stats.failed_pages));
    md.push_str(&format!("| Still queued | {} |\n", stats.queued_pages));
    md.push_str(&format!("| Denied by robots.txt | {} |\n", stats.robots_denied));
    md.push_str(&format!("| Owned by other workers | {} |\n\n", stats.foreign_links));

    md.push_str("## Extraction\n\n");
    md.push_str(&format!("- **Links found**: {}\n", stats.total_links));
    md.push_str(&format!("- **Forms found**: {}\n", stats.total_forms));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    if stats.successful_pages > 0 {
        md.push_str("## Load Times\n\n");
        md.push_str(&format!(
            "- **Average**: {:.1} ms\n",
            stats.average_load_time_ms()
        ));
        if let (Some(min), Some(max)) = (stats.min_load_time_ms, stats.max_load_time_ms) {
            md.push_str(&format!("- **Fastest**: {} ms\n", min));
            md.push_str(&format!("- **Slowest**: {} ms\n", max));
        }
        md.push('\n');
    }

    if !stats.pages_by_depth.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Fetches |\n");
        md.push_str("|-------|---------|\n");
        for (depth, count) in &stats.pages_by_depth {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !stats.errors_by_kind.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Type | Count |\n");
        md.push_str("|------------|-------|\n");

        let mut errors: Vec<_> = stats.errors_by_kind.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in errors {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md
}

fn run_status(stats: &CrawlStats) -> &'static str {
    if stats.stopped {
        "stopped"
    } else if stats.queued_pages > 0 {
        "page budget reached"
    } else {
        "completed"
    }
}
