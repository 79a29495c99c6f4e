use super::{GithubClient, IssueComment};
use crate::error::Result;
use log::{debug, info};

/// Every report comment starts with this, followed by the head commit SHA.
pub const REPORT_KEY_BEGINNING: &str = "**Memory usage change @[";

pub struct CommentPublisher<'a> {
    client: &'a GithubClient,
}

impl<'a> CommentPublisher<'a> {
    pub fn new(client: &'a GithubClient) -> Self {
        CommentPublisher { client }
    }

    fn comments_path(&self, pr_number: u64) -> String {
        format!(
            "repos/{}/issues/{}/comments",
            self.client.repository(),
            pr_number
        )
    }

    /// Whether a report for `head_sha` was already posted on the pull request.
    pub fn report_exists(&self, pr_number: u64, head_sha: &str) -> Result<bool> {
        let key = format!("{}{}", REPORT_KEY_BEGINNING, head_sha);
        let found = self.client.find_in_pages::<Vec<IssueComment>, _, _>(
            &self.comments_path(pr_number),
            &[],
            |comment| {
                Ok(comment
                    .body
                    .filter(|body| body.starts_with(&key))
                    .map(|_| ()))
            },
        )?;
        if found.is_some() {
            debug!("PR #{} already has a report for {}", pr_number, head_sha);
        }
        Ok(found.is_some())
    }

    pub fn publish(&self, pr_number: u64, markdown: &str) -> Result<()> {
        let path = self.comments_path(pr_number);
        info!("Commenting on PR #{} using API endpoint {}", pr_number, path);
        self.client
            .post_json(&path, serde_json::json!({ "body": markdown }))?;
        Ok(())
    }
}
