//! Size reports produced by the compile step, one JSON file per board.
pub mod delta;
pub mod table;

use crate::error::{Error, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::{fmt, fs, path::Path};

pub use delta::generate;
pub use table::ReportTable;

/// Placeholder used by the compile step when a size could not be measured.
pub const NOT_APPLICABLE: &str = "N/A";

/// A size figure in bytes, or a text sentinel such as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    Bytes(i64),
    Unavailable(String),
}

impl SizeValue {
    pub fn bytes(&self) -> Option<i64> {
        match self {
            SizeValue::Bytes(bytes) => Some(*bytes),
            SizeValue::Unavailable(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SizeValue::Bytes(bytes) => serde_json::Value::from(*bytes),
            SizeValue::Unavailable(text) => serde_json::Value::from(text.as_str()),
        }
    }
}

impl Default for SizeValue {
    fn default() -> Self {
        SizeValue::Unavailable(NOT_APPLICABLE.to_owned())
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeValue::Bytes(bytes) => write!(f, "{}", bytes),
            SizeValue::Unavailable(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Absolute<T> {
    pub absolute: T,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaRange {
    pub minimum: SizeValue,
    pub maximum: SizeValue,
}

/// Change of one memory type across all sketches of a board.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardSize {
    pub name: String,
    pub delta: Absolute<DeltaRange>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SketchSize {
    pub name: String,
    pub current: Absolute<SizeValue>,
    #[serde(default)]
    pub previous: Option<Absolute<SizeValue>>,
    #[serde(default)]
    pub delta: Option<Absolute<SizeValue>>,
}

impl SketchSize {
    pub fn delta(&self) -> SizeValue {
        self.delta
            .as_ref()
            .map(|delta| delta.absolute.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sketch {
    pub name: String,
    #[serde(default)]
    pub compilation_success: Option<bool>,
    #[serde(default)]
    pub sizes: Vec<SketchSize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SketchesReport {
    #[serde(alias = "fqbn")]
    pub board: String,
    pub commit_hash: String,
    #[serde(default)]
    pub commit_url: String,
    #[serde(default)]
    pub sizes: Vec<BoardSize>,
    pub sketches: Vec<Sketch>,
}

/// What one report file turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportFile {
    /// Written by an old compile step, before per-sketch data existed.
    Legacy,
    /// Sizes of the current build only, no comparison with the base branch.
    WithoutDeltas(SketchesReport),
    Current(SketchesReport),
}

impl ReportFile {
    pub fn from_value(value: serde_json::Value, context: &str) -> Result<Self> {
        let has = |key: &str| value.get(key).is_some();
        if !has("sketches") {
            return Ok(ReportFile::Legacy);
        }
        let with_deltas = has("sizes");
        let report: SketchesReport =
            serde_json::from_value(value).map_err(|e| Error::parse(context, e))?;
        Ok(if with_deltas {
            ReportFile::Current(report)
        } else {
            ReportFile::WithoutDeltas(report)
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let context = path.display().to_string();
        let contents = fs::read_to_string(path)?;
        let value = serde_json::from_str(&contents).map_err(|e| Error::parse(&context, e))?;
        ReportFile::from_value(value, &context)
    }
}

/// Regular files of `directory`, sorted by name.
pub fn report_files(directory: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reports of `directory` that carry size deltas.
///
/// An empty result is not an error: the compile step only writes deltas when asked to.
pub fn parse(directory: &Path) -> Result<Vec<SketchesReport>> {
    let mut reports = vec![];
    for path in report_files(directory)? {
        debug!("Reading sketches report {}", path.display());
        match ReportFile::from_file(&path)? {
            ReportFile::Legacy => info!(
                "Old format sketches report found, skipping {}",
                path.display()
            ),
            ReportFile::WithoutDeltas(_) => {
                debug!("{} has no size deltas data", path.display())
            }
            ReportFile::Current(report) => reports.push(report),
        }
    }
    if reports.is_empty() {
        warn!(
            "No size deltas data found in workflow artifact for this PR. The compile-examples action's \
             enable-size-deltas-report input must be set to true to produce size deltas data."
        );
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write_fixtures(dir: &Path) {
        for (name, contents) in &[
            (
                "arduino-avr-leonardo.json",
                include_str!("testdata/arduino-avr-leonardo.json"),
            ),
            (
                "arduino-avr-uno.json",
                include_str!("testdata/arduino-avr-uno.json"),
            ),
            ("arduino-avr-nano.json", include_str!("testdata/legacy.json")),
            (
                "arduino-samd-mkrzero.json",
                include_str!("testdata/without-deltas.json"),
            ),
        ] {
            fs::write(dir.join(name), contents).unwrap();
        }
    }

    #[test]
    fn size_values_keep_sentinels() {
        let values: Vec<SizeValue> = serde_json::from_value(json!([-12, "N/A"])).unwrap();
        assert_eq!(
            values,
            vec![SizeValue::Bytes(-12), SizeValue::Unavailable("N/A".to_owned())]
        );
        assert_eq!(values[0].to_string(), "-12");
        assert_eq!(values[1].to_string(), "N/A");
        assert_eq!(values[1].to_json(), json!("N/A"));
    }

    #[test]
    fn classifies_report_files() {
        assert_eq!(
            ReportFile::from_value(json!({"fqbn": "arduino:avr:uno", "sizes": []}), "x").unwrap(),
            ReportFile::Legacy
        );
        match ReportFile::from_value(
            serde_json::from_str(include_str!("testdata/without-deltas.json")).unwrap(),
            "x",
        )
        .unwrap()
        {
            ReportFile::WithoutDeltas(report) => {
                assert_eq!(report.board, "arduino:samd:mkrzero");
                assert_eq!(
                    report.sketches[0].sizes[0].current.absolute,
                    SizeValue::Bytes(10580)
                );
                assert_eq!(report.sketches[0].sizes[0].delta(), SizeValue::default());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parse_keeps_only_reports_with_deltas_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        fs::create_dir(dir.path().join("nested")).unwrap();

        let reports = parse(dir.path()).unwrap();
        let boards: Vec<&str> = reports.iter().map(|r| r.board.as_str()).collect();
        assert_eq!(boards, vec!["arduino:avr:leonardo", "arduino:avr:uno"]);
        assert_eq!(reports[1].sizes[0].name, "flash");
        assert_eq!(
            reports[1].sizes[0].delta.absolute.minimum,
            SizeValue::Bytes(-994)
        );
        assert_eq!(reports[1].sketches[0].compilation_success, Some(true));
    }

    #[test]
    fn directory_without_deltas_gives_no_reports() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            include_str!("testdata/without-deltas.json"),
        )
        .unwrap();
        assert!(parse(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn undecodable_report_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{not json").unwrap();
        assert!(matches!(parse(dir.path()), Err(Error::Parse { .. })));
    }
}
