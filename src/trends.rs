//! Appends the sizes of the current build to the trends spreadsheet.
use crate::config::SheetsSettings;
use crate::error::{Error, Result};
use crate::report::{ReportFile, Sketch, SketchesReport};
use crate::sheets::{SheetsClient, TrendsPublisher};
use glob::{glob_with, MatchOptions, Pattern};
use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Report layout with every board of a commit in one file.
#[derive(Debug, Deserialize)]
struct MultiBoardReport {
    commit_hash: String,
    #[serde(default)]
    commit_url: String,
    boards: Vec<BoardSketches>,
}

#[derive(Debug, Deserialize)]
struct BoardSketches {
    #[serde(alias = "fqbn")]
    board: String,
    sketches: Vec<Sketch>,
}

impl MultiBoardReport {
    fn into_reports(self) -> Vec<SketchesReport> {
        let MultiBoardReport {
            commit_hash,
            commit_url,
            boards,
        } = self;
        boards
            .into_iter()
            .map(|board| SketchesReport {
                board: board.board,
                commit_hash: commit_hash.clone(),
                commit_url: commit_url.clone(),
                sizes: vec![],
                sketches: board.sketches,
            })
            .collect()
    }
}

/// `*.json` files directly inside `directory`, in name order.
pub fn report_paths(directory: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.json", Pattern::escape(&directory.to_string_lossy()));
    let paths = glob_with(
        &pattern,
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        },
    )
    .map_err(|e| Error::Configuration(format!("invalid report path {}: {}", directory.display(), e)))?;

    let mut report_paths = vec![];
    for path in paths {
        let path = path.map_err(|e| e.into_error())?;
        if path.is_file() {
            report_paths.push(path);
        }
    }
    report_paths.sort();
    debug!("{} report files found", report_paths.len());
    Ok(report_paths)
}

/// Per board reports of one file. Legacy files give none.
pub fn load_reports(path: &Path) -> Result<Vec<SketchesReport>> {
    let context = path.display().to_string();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path)?).map_err(|e| Error::parse(&context, e))?;
    if value.get("boards").is_some() {
        let report: MultiBoardReport =
            serde_json::from_value(value).map_err(|e| Error::parse(&context, e))?;
        return Ok(report.into_reports());
    }
    Ok(match ReportFile::from_value(value, &context)? {
        ReportFile::Legacy => {
            warn!("Old format sketches report found, skipping {}", context);
            vec![]
        }
        ReportFile::WithoutDeltas(report) | ReportFile::Current(report) => vec![report],
    })
}

/// Publishes every report found under the configured path, returning how many board
/// reports were written.
pub fn run(settings: &SheetsSettings, client: &SheetsClient) -> Result<usize> {
    let directory = settings.report_path()?;
    let sheet_id = client.sheet_id(&settings.sheet_name)?;
    let publisher = TrendsPublisher::new(client, &settings.sheet_name, sheet_id);

    let mut published = 0;
    for path in report_paths(&directory)? {
        for report in load_reports(&path)? {
            info!(
                "Publishing sizes of {} at {}",
                report.board, report.commit_hash
            );
            publisher.publish(&report)?;
            published += 1;
        }
    }
    if published == 0 {
        warn!("No sketches reports found in {}", directory.display());
    }
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::report::SizeValue;
    use crate::sheets::client::tests::{settings, sheets_client};
    use crate::testing::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn finds_json_reports_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["b.json", "a.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("c.json")).unwrap();
        let names: Vec<String> = report_paths(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn loads_multi_board_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(
            &path,
            json!({
                "commit_hash": "asdf123",
                "commit_url": "https://example.com/foo",
                "boards": [{
                    "board": "arduino:avr:uno",
                    "sketches": [{"name": "examples/Foo", "sizes": [
                        {"name": "flash", "current": {"absolute": 444}}
                    ]}]
                }]
            })
            .to_string(),
        )
        .unwrap();
        let reports = load_reports(&path).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].board, "arduino:avr:uno");
        assert_eq!(reports[0].commit_hash, "asdf123");
        assert_eq!(
            reports[0].sketches[0].sizes[0].current.absolute,
            SizeValue::Bytes(444)
        );
    }

    #[test]
    fn legacy_reports_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        fs::write(&path, include_str!("report/testdata/legacy.json")).unwrap();
        assert!(load_reports(&path).unwrap().is_empty());
    }

    #[test]
    fn publishes_every_report_of_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("arduino-samd-mkrzero.json"),
            include_str!("report/testdata/without-deltas.json"),
        )
        .unwrap();
        let settings = SheetsSettings {
            sketches_report_path: dir.path().to_owned(),
            ..settings()
        };

        let transport = FakeTransport::new();
        transport
            .get(
                "/v4/spreadsheets/1a2b3c",
                ok_json(json!({"sheets": [{"properties": {"sheetId": 5, "title": "Sheet1"}}]})),
            )
            .get(
                "/v4/spreadsheets/1a2b3c/values/Sheet1!1:1",
                ok_json(json!({"values": [[
                    "Commit Timestamp",
                    "Commit Hash",
                    "arduino:samd:mkrzero\nexamples/Foo\nflash",
                    "arduino:samd:mkrzero\nexamples/Foo\nRAM for global variables"
                ]]})),
            )
            .get(
                "/v4/spreadsheets/1a2b3c/values/Sheet1!B:B",
                ok_json(json!({"values": [["Commit Hash"], ["asdf123"]]})),
            )
            .on(
                Method::Put,
                "/v4/spreadsheets/1a2b3c/values/Sheet1!C2:C2?valueInputOption=RAW",
                ok_json(json!({})),
            )
            .on(
                Method::Put,
                "/v4/spreadsheets/1a2b3c/values/Sheet1!D2:D2?valueInputOption=RAW",
                ok_json(json!({})),
            );

        let client = sheets_client(&transport);
        assert_eq!(run(&settings, &client).unwrap(), 1);
    }

    #[test]
    fn missing_sheet_stops_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SheetsSettings {
            sketches_report_path: dir.path().to_owned(),
            ..settings()
        };
        let transport = FakeTransport::new();
        transport.get("/v4/spreadsheets/1a2b3c", ok_json(json!({"sheets": []})));
        let client = sheets_client(&transport);
        assert!(matches!(
            run(&settings, &client),
            Err(Error::Configuration(_))
        ));
        assert_eq!(transport.requests().len(), 1);
    }
}
