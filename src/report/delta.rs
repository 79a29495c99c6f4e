use super::{DeltaRange, ReportTable, SketchesReport};
use crate::error::{Error, Result};
use crate::github::{comments::REPORT_KEY_BEGINNING, RepositoryName};
use log::debug;

const SIZE_DECREASE: &str = ":green_heart:";
const SIZE_INCREASE: &str = ":small_red_triangle:";
const SIZE_AMBIGUOUS: &str = ":grey_question:";

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

/// Summary table cell for the range of change of one memory type.
pub fn summary_value(range: &DeltaRange) -> String {
    let (minimum, maximum) = match (range.minimum.bytes(), range.maximum.bytes()) {
        (Some(minimum), Some(maximum)) => (minimum, maximum),
        (None, _) => return range.minimum.to_string(),
        (_, None) => return range.maximum.to_string(),
    };
    let marker = if minimum < 0 && maximum <= 0 {
        Some(SIZE_DECREASE)
    } else if minimum == 0 && maximum == 0 {
        None
    } else if minimum >= 0 && maximum > 0 {
        Some(SIZE_INCREASE)
    } else {
        Some(SIZE_AMBIGUOUS)
    };
    let value = format!("{} - {}", signed(minimum), signed(maximum));
    match marker {
        Some(marker) => format!("{} {}", marker, value),
        None => value,
    }
}

/// Commit hash shared by all reports of an artifact.
pub fn commit_hash(reports: &[SketchesReport]) -> Result<Option<&str>> {
    let mut reports = reports.iter();
    let first = match reports.next() {
        Some(first) => &first.commit_hash,
        None => return Ok(None),
    };
    if let Some(other) = reports.find(|r| &r.commit_hash != first) {
        return Err(Error::InconsistentArtifact {
            expected: first.clone(),
            found: other.commit_hash.clone(),
        });
    }
    Ok(Some(first))
}

pub fn summary_table(reports: &[SketchesReport]) -> ReportTable {
    let mut table = ReportTable::new();
    for report in reports {
        let row = table.add_row(&report.board);
        for size in &report.sizes {
            let column = table.column(&size.name);
            table.set(row, column, summary_value(&size.delta.absolute));
        }
    }
    table
}

pub fn detailed_table(reports: &[SketchesReport]) -> ReportTable {
    let mut table = ReportTable::new();
    for report in reports {
        let row = table.add_row(&report.board);
        for sketch in &report.sketches {
            for size in &sketch.sizes {
                let column = table.column(&format!("{}<br>{}", sketch.name, size.name));
                table.set(row, column, size.delta());
            }
        }
    }
    table
}

/// Markdown of the pull request comment for an artifact's reports.
pub fn generate(reports: &[SketchesReport], repository: &RepositoryName, pr_number: u64) -> Result<String> {
    let sha = commit_hash(reports)?.ok_or_else(|| Error::InconsistentArtifact {
        expected: "a commit hash".to_owned(),
        found: "no sketches reports".to_owned(),
    })?;
    let detailed = detailed_table(reports);

    let mut markdown = format!(
        "{}{}](https://github.com/{}/pull/{}/commits/{})**\n\n",
        REPORT_KEY_BEGINNING, sha, repository, pr_number, sha
    );
    markdown.push_str(&summary_table(reports).to_markdown());
    markdown.push_str("\n<details>\n<summary>Click for full report table</summary>\n\n");
    markdown.push_str(&detailed.to_markdown());
    markdown.push_str("\n</details>\n\n");
    markdown.push_str("<details>\n<summary>Click for full report CSV</summary>\n\n```\n");
    markdown.push_str(&detailed.to_csv());
    markdown.push_str("```\n</details>");

    debug!("Report:\n{}", markdown);
    Ok(markdown)
}
