use super::{RateLimitStatus, RepositoryName};
use crate::config::GithubSettings;
use crate::error::{Error, Result};
use crate::http::{Body, Request, Response, Transport};
use crate::retry::RetryPolicy;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use std::{fs::File, path::Path};
use url::Url;

pub const PAGE_SIZE: usize = 100;

/// A JSON payload holding one page worth of items.
pub trait Listing: DeserializeOwned {
    type Item;
    fn into_items(self) -> Vec<Self::Item>;
}

impl<T: DeserializeOwned> Listing for Vec<T> {
    type Item = T;
    fn into_items(self) -> Vec<T> {
        self
    }
}

#[derive(Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Pages known to exist so far, re-read from every response.
    pub page_count: usize,
}

pub struct GithubClient {
    api_url: String,
    repository: RepositoryName,
    token: String,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl GithubClient {
    pub fn new(settings: &GithubSettings, transport: Box<dyn Transport>) -> Self {
        GithubClient {
            api_url: settings.api_url.trim_end_matches('/').to_owned(),
            repository: settings.repository.clone(),
            token: settings.token.clone(),
            transport,
            retry: RetryPolicy::github(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// `path` is relative to the API root, e.g. `repos/octocat/Hello-World/pulls`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| Error::Configuration(format!("invalid API URL {}: {}", url, e)))
    }

    fn authorize(&self, request: Request) -> Request {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("User-Agent", self.repository.owner())
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// The rate limit endpoint does not count against the quota, everything else on
    /// the API host does.
    fn is_metered(&self, url: &Url) -> bool {
        let url = url.as_str();
        url.starts_with(&self.api_url) && !url.starts_with(&format!("{}/rate_limit", self.api_url))
    }

    fn with_retry_and_gate<T, F>(&self, request: &Request, mut operation: F) -> Result<T>
    where
        F: FnMut(&Request) -> Result<T>,
    {
        let metered = self.is_metered(&request.url);
        self.retry
            .run(|| {
                if metered {
                    self.check_rate_limit()?;
                }
                operation(request)
            })
            .map_err(|err| {
                if err.status() == Some(401) {
                    error!("HTTP Error 401 may be caused by providing an incorrect GitHub personal access token.");
                }
                err
            })
    }

    pub fn execute(&self, request: Request) -> Result<Response> {
        let request = self.authorize(request);
        self.with_retry_and_gate(&request, |request| {
            self.transport.send(request)?.error_for_status(&request.url)
        })
    }

    /// Returns [`Error::RateLimitExhausted`] when no API requests remain in the current
    /// window. The window resets an hour after it starts, so there is no point waiting.
    pub fn check_rate_limit(&self) -> Result<()> {
        let request = self.authorize(Request::get(self.endpoint("rate_limit")?));
        let status: RateLimitStatus = self
            .retry
            .run(|| self.transport.send(&request)?.error_for_status(&request.url))?
            .json("rate limit status")?;
        let core = status.resources.core;
        debug!("GitHub core API request allotment: {}", core.limit);
        debug!("Remaining API requests: {}", core.remaining);
        debug!("API request count reset time: {}", core.reset);
        if core.remaining == 0 {
            warn!("GitHub API request quota has been reached. Giving up for now.");
            return Err(Error::RateLimitExhausted);
        }
        Ok(())
    }

    pub fn request<L: Listing>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        page: usize,
    ) -> Result<Page<L::Item>> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter())
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PAGE_SIZE.to_string());

        let response = self.execute(Request::get(url))?;
        let value: serde_json::Value = response.json(path)?;
        let empty = match &value {
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::Object(fields) => fields.is_empty(),
            serde_json::Value::Null => true,
            _ => false,
        };
        let page_count = if empty {
            0
        } else {
            page_count(response.link.as_deref(), page)
        };
        let listing: L = serde_json::from_value(value).map_err(|e| Error::parse(path, e))?;
        Ok(Page {
            items: listing.into_items(),
            page_count,
        })
    }

    /// Visits the items of every page in order until `visit` returns a value.
    pub fn find_in_pages<L, R, F>(&self, path: &str, params: &[(&str, &str)], mut visit: F) -> Result<Option<R>>
    where
        L: Listing,
        F: FnMut(L::Item) -> Result<Option<R>>,
    {
        let mut page_number = 1;
        let mut page_count = 1;
        while page_number <= page_count {
            let page = self.request::<L>(path, params, page_number)?;
            for item in page.items {
                if let Some(found) = visit(item)? {
                    return Ok(Some(found));
                }
            }
            page_number += 1;
            page_count = page.page_count;
        }
        Ok(None)
    }

    pub fn post_json(&self, path: &str, body: serde_json::Value) -> Result<Response> {
        self.execute(Request::post(self.endpoint(path)?, Body::Json(body)))
    }

    /// Streams `url` into a file at `destination`, truncating it on every attempt.
    pub fn download_to(&self, url: &str, destination: &Path) -> Result<u64> {
        let url = Url::parse(url).map_err(|e| Error::Transport {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
        let request = self.authorize(Request::get(url));
        self.with_retry_and_gate(&request, |request| {
            let mut file = File::create(destination)?;
            self.transport.download(request, &mut file)
        })
    }
}

struct Link {
    rel: String,
    page: Option<usize>,
}

fn parse_links(header: &str) -> Vec<Link> {
    header
        .split(',')
        .filter_map(|part| {
            let start = part.find('<')?;
            let end = start + part[start..].find('>')?;
            let target = &part[start + 1..end];
            let rel = part[end + 1..]
                .split(';')
                .map(str::trim)
                .find_map(|param| param.strip_prefix("rel="))?
                .trim_matches('"')
                .to_owned();
            let page = Url::parse(target).ok().and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "page")
                    .and_then(|(_, value)| value.parse().ok())
            });
            Some(Link { rel, page })
        })
        .collect()
}

/// Number of pages known from a response's `Link` header.
///
/// The `last` link is authoritative. Without it a `next` link still means at least one
/// more page; with neither, the current page is the last.
pub fn page_count(link_header: Option<&str>, current_page: usize) -> usize {
    let links = link_header.map(parse_links).unwrap_or_default();
    if let Some(last) = links.iter().find(|l| l.rel == "last").and_then(|l| l.page) {
        return last;
    }
    if links.iter().any(|l| l.rel == "next") {
        return current_page + 1;
    }
    current_page.max(1)
}
