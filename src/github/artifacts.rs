use super::{Artifacts, GithubClient, GithubHandle, WorkflowRuns};
use crate::error::Result;
use log::debug;
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

/// Finds the size report artifact a pull request's head commit produced.
pub struct ArtifactResolver<'a> {
    client: &'a GithubClient,
    artifact_name: &'a str,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(client: &'a GithubClient, artifact_name: &'a str) -> Self {
        ArtifactResolver {
            client,
            artifact_name,
        }
    }

    /// Download URL of the artifact, or `None` when no completed run for `head_sha`
    /// has uploaded it yet.
    pub fn resolve(&self, author: &GithubHandle, head_ref: &str, head_sha: &str) -> Result<Option<String>> {
        // actor and branch only narrow the listing, the SHA is what identifies the run
        let path = format!("repos/{}/actions/runs", self.client.repository());
        let params = [
            ("actor", author.0.as_str()),
            ("branch", head_ref),
            ("event", "pull_request"),
            ("status", "completed"),
        ];
        self.client
            .find_in_pages::<WorkflowRuns, _, _>(&path, &params, |run| {
                if run.head_sha != head_sha {
                    return Ok(None);
                }
                debug!("Workflow run {} matches head commit {}", run.id, head_sha);
                self.resolve_for_run(run.id)
            })
    }

    pub fn resolve_for_run(&self, run_id: u64) -> Result<Option<String>> {
        let path = format!(
            "repos/{}/actions/runs/{}/artifacts",
            self.client.repository(),
            run_id
        );
        self.client
            .find_in_pages::<Artifacts, _, _>(&path, &[], |artifact| {
                Ok(if artifact.name == self.artifact_name {
                    Some(artifact.archive_download_url)
                } else {
                    None
                })
            })
    }
}

/// Downloads and unpacks an artifact into a fresh temporary directory.
///
/// The directory is removed when the returned [`TempDir`] is dropped, and on every
/// error path since the guard is dropped before the error propagates.
pub fn fetch_artifact(client: &GithubClient, download_url: &str, artifact_name: &str) -> Result<TempDir> {
    fetch_artifact_in(client, download_url, artifact_name, &std::env::temp_dir())
}

pub fn fetch_artifact_in(
    client: &GithubClient,
    download_url: &str,
    artifact_name: &str,
    base_dir: &Path,
) -> Result<TempDir> {
    let artifact_dir = tempfile::Builder::new()
        .prefix("sizereport-")
        .tempdir_in(base_dir)?;
    let archive_path = artifact_dir.path().join(format!("{}.zip", artifact_name));

    let size = client.download_to(download_url, &archive_path)?;
    debug!("Downloaded {} bytes to {}", size, archive_path.display());

    {
        let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
        archive.extract(artifact_dir.path())?;
    }
    fs::remove_file(&archive_path)?;

    Ok(artifact_dir)
}
