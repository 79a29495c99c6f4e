//! Comments memory usage change reports on the open pull requests of a repository.
use crate::error::{Error, Result};
use crate::github::{
    artifacts::{fetch_artifact, ArtifactResolver},
    comments::CommentPublisher,
    GithubClient, PullRequest,
};
use crate::report::{self, delta};
use log::{debug, info, warn};
use std::{fmt, io};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Only collaborators may comment on locked threads.
    Locked,
    AlreadyReported,
    NoArtifact,
    NoDeltaData,
    /// The reports were built from another commit than the current head.
    HeadMismatch,
    Inconsistent,
    Failed(String),
    Reported,
    DryRun,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Locked => write!(f, "locked, skipped"),
            RunOutcome::AlreadyReported => write!(f, "report already exists"),
            RunOutcome::NoArtifact => write!(f, "no sketches report artifact found"),
            RunOutcome::NoDeltaData => write!(f, "no size deltas data"),
            RunOutcome::HeadMismatch => write!(f, "report commit differs from head commit"),
            RunOutcome::Inconsistent => write!(f, "artifact mixes commits"),
            RunOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            RunOutcome::Reported => write!(f, "report commented"),
            RunOutcome::DryRun => write!(f, "report printed (dry run)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestOutcome {
    pub number: u64,
    pub outcome: RunOutcome,
}

pub struct DeltasRun<'a> {
    client: &'a GithubClient,
    artifact_name: &'a str,
    /// Where reports go instead of being commented, when set.
    dry_run_sink: Option<Box<dyn io::Write>>,
    outcomes: Vec<PullRequestOutcome>,
}

impl<'a> DeltasRun<'a> {
    pub fn new(client: &'a GithubClient, artifact_name: &'a str) -> Self {
        DeltasRun {
            client,
            artifact_name,
            dry_run_sink: None,
            outcomes: vec![],
        }
    }

    pub fn dry_run(mut self, sink: Box<dyn io::Write>) -> Self {
        self.dry_run_sink = Some(sink);
        self
    }

    /// Pull requests processed so far, also filled when the run stopped early.
    pub fn outcomes(&self) -> &[PullRequestOutcome] {
        &self.outcomes
    }

    /// Visits every open pull request. Failures tied to one pull request's artifact are
    /// recorded and skipped, anything else stops the run.
    pub fn run(&mut self) -> Result<()> {
        let path = format!("repos/{}/pulls", self.client.repository());
        debug!("Getting PRs for {}", self.client.repository());
        let mut page_number = 1;
        let mut page_count = 1;
        while page_number <= page_count {
            let page = self.client.request::<Vec<PullRequest>>(&path, &[], page_number)?;
            for pull_request in page.items {
                debug!("Processing pull request number: {}", pull_request.number);
                let outcome = match self.process(&pull_request) {
                    Ok(outcome) => outcome,
                    Err(err @ Error::InconsistentArtifact { .. }) => {
                        warn!("PR #{}: {}, skipping", pull_request.number, err);
                        RunOutcome::Inconsistent
                    }
                    Err(err) if err.is_pull_request_scoped() => {
                        warn!("PR #{}: {}", pull_request.number, err);
                        RunOutcome::Failed(err.to_string())
                    }
                    Err(err) => return Err(err),
                };
                self.outcomes.push(PullRequestOutcome {
                    number: pull_request.number,
                    outcome,
                });
            }
            page_number += 1;
            page_count = page.page_count;
        }
        Ok(())
    }

    fn process(&mut self, pull_request: &PullRequest) -> Result<RunOutcome> {
        if pull_request.locked {
            debug!("PR locked, skipping");
            return Ok(RunOutcome::Locked);
        }
        let head_sha = &pull_request.head.sha;
        let comments = CommentPublisher::new(self.client);
        if comments.report_exists(pull_request.number, head_sha)? {
            debug!("Report already exists");
            return Ok(RunOutcome::AlreadyReported);
        }

        let download_url = match ArtifactResolver::new(self.client, self.artifact_name).resolve(
            &pull_request.user.login,
            &pull_request.head.ref_,
            head_sha,
        )? {
            Some(url) => url,
            None => {
                debug!("No sketches report artifact found");
                return Ok(RunOutcome::NoArtifact);
            }
        };

        let artifact_dir = fetch_artifact(self.client, &download_url, self.artifact_name)?;
        let reports = report::parse(artifact_dir.path())?;
        match delta::commit_hash(&reports)? {
            None => return Ok(RunOutcome::NoDeltaData),
            Some(report_sha) if report_sha != head_sha.as_str() => {
                // duplicate detection keys on the API's head SHA, posting under another
                // hash would repeat the comment on every run
                warn!(
                    "Report commit hash {} doesn't match PR #{} head commit hash {}, skipping",
                    report_sha, pull_request.number, head_sha
                );
                return Ok(RunOutcome::HeadMismatch);
            }
            Some(_) => {}
        }

        let markdown = report::generate(&reports, self.client.repository(), pull_request.number)?;
        if let Some(sink) = self.dry_run_sink.as_mut() {
            writeln!(sink, "PR #{}\n{}\n", pull_request.number, markdown)?;
            return Ok(RunOutcome::DryRun);
        }
        comments.publish(pull_request.number, &markdown)?;
        info!("Commented memory usage report on PR #{}", pull_request.number);
        Ok(RunOutcome::Reported)
    }
}
