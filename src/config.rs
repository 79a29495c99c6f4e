use crate::error::{Error, Result};
use crate::github::RepositoryName;
use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com";

const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
const ENV_ARTIFACT_NAME: &str = "INPUT_SIZE-DELTAS-REPORTS-ARTIFACT-NAME";
const ENV_TOKEN: &str = "INPUT_GITHUB-TOKEN";
const ENV_REPORT_PATH: &str = "INPUT_SKETCHES-REPORT-PATH";
const ENV_GOOGLE_KEY: &str = "INPUT_GOOGLE-KEY-FILE";
const ENV_SPREADSHEET_ID: &str = "INPUT_SPREADSHEET-ID";
const ENV_SHEET_NAME: &str = "INPUT_SHEET-NAME";
const ENV_WORKSPACE: &str = "GITHUB_WORKSPACE";

fn default_github_api_url() -> String {
    GITHUB_API_URL.to_owned()
}

fn default_sheets_api_url() -> String {
    SHEETS_API_URL.to_owned()
}

#[derive(PartialEq, Debug, Deserialize)]
pub struct GithubSettings {
    pub repository: RepositoryName,
    pub artifact_name: String,
    pub token: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

#[derive(PartialEq, Debug, Deserialize)]
pub struct SheetsSettings {
    pub sketches_report_path: PathBuf,
    /// Contents of the service account JSON key, not a path.
    pub google_key_file: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    #[serde(default = "default_sheets_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

#[derive(PartialEq, Debug, Deserialize)]
pub struct Config {
    pub github: Option<GithubSettings>,
    pub sheets: Option<SheetsSettings>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let file_path = file_path.as_ref();
        let config_s = fs::read_to_string(file_path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", file_path.display(), e))
        })?;
        toml::from_str(&config_s).map_err(|e| {
            Error::Configuration(format!("invalid config file {}: {}", file_path.display(), e))
        })
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Configuration(format!("environment variable {} is not set", name)))
}

impl GithubSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(GithubSettings {
            repository: RepositoryName(required(&lookup, ENV_REPOSITORY)?),
            artifact_name: required(&lookup, ENV_ARTIFACT_NAME)?,
            token: required(&lookup, ENV_TOKEN)?,
            api_url: default_github_api_url(),
        })
    }
}

impl SheetsSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(SheetsSettings {
            sketches_report_path: PathBuf::from(required(&lookup, ENV_REPORT_PATH)?),
            google_key_file: required(&lookup, ENV_GOOGLE_KEY)?,
            spreadsheet_id: required(&lookup, ENV_SPREADSHEET_ID)?,
            sheet_name: required(&lookup, ENV_SHEET_NAME)?,
            api_url: default_sheets_api_url(),
            workspace: lookup(ENV_WORKSPACE).map(PathBuf::from),
        })
    }

    /// Relative report paths are relative to the CI workspace (the repository
    /// checkout) when one is known.
    pub fn report_path(&self) -> Result<PathBuf> {
        let path = if self.sketches_report_path.is_absolute() {
            self.sketches_report_path.clone()
        } else {
            match &self.workspace {
                Some(workspace) => workspace.join(&self.sketches_report_path),
                None => std::env::current_dir()?.join(&self.sketches_report_path),
            }
        };
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "Sketches report path: {} doesn't exist",
                self.sketches_report_path.display()
            )));
        }
        Ok(path)
    }
}
