//! Scripted transport shared by the client tests.
use crate::config::GithubSettings;
use crate::error::{Error, Result};
use crate::github::{GithubClient, RepositoryName};
use crate::http::{Body, Method, Request, Response, Transport};
use crate::retry::RetryPolicy;
use std::{cell::RefCell, collections::VecDeque, io, rc::Rc, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: Method,
    /// Path and query, without scheme and host.
    pub target: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Body>,
}

struct Route {
    method: Method,
    target: String,
    replies: VecDeque<Result<Response>>,
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    requests: Vec<Recorded>,
}

/// Replies are consumed in order; the last reply of a route keeps being served.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<State>>,
}

pub fn target_of(request: &Request) -> String {
    match request.url.query() {
        Some(query) => format!("{}?{}", request.url.path(), query),
        None => request.url.path().to_owned(),
    }
}

pub fn ok_json(value: serde_json::Value) -> Result<Response> {
    Ok(Response {
        status: 200,
        link: None,
        body: serde_json::to_vec(&value).unwrap(),
    })
}

pub fn ok_json_with_link(value: serde_json::Value, link: &str) -> Result<Response> {
    Ok(Response {
        status: 200,
        link: Some(link.to_owned()),
        body: serde_json::to_vec(&value).unwrap(),
    })
}

pub fn status(code: u16) -> Result<Response> {
    Ok(Response {
        status: code,
        link: None,
        body: vec![],
    })
}

pub fn rate_limit(remaining: u64) -> Result<Response> {
    ok_json(serde_json::json!({
        "resources": {"core": {"limit": 5000, "remaining": remaining, "reset": 1_600_000_000}}
    }))
}

/// Client for `FooOwner/BarRepository` with retry delays zeroed.
pub fn github_client(transport: &FakeTransport) -> GithubClient {
    let settings = GithubSettings {
        repository: RepositoryName("FooOwner/BarRepository".to_owned()),
        artifact_name: "size-deltas-reports".to_owned(),
        token: "foo token".to_owned(),
        api_url: "https://api.github.com".to_owned(),
    };
    GithubClient::new(&settings, Box::new(transport.clone()))
        .with_retry(RetryPolicy::github().with_delay(Duration::from_millis(0)))
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport::default()
    }

    pub fn on(&self, method: Method, target: &str, reply: Result<Response>) -> &Self {
        let mut state = self.state.borrow_mut();
        if let Some(route) = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.target == target)
        {
            route.replies.push_back(reply);
        } else {
            state.routes.push(Route {
                method,
                target: target.to_owned(),
                replies: vec![reply].into(),
            });
        }
        self
    }

    pub fn get(&self, target: &str, reply: Result<Response>) -> &Self {
        self.on(Method::Get, target, reply)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.borrow().requests.clone()
    }

    /// Requests as `"METHOD target"` strings, rate limit checks excluded.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.target != "/rate_limit")
            .map(|r| format!("{} {}", method_name(r.method), r.target))
            .collect()
    }

    fn reply(&self, request: &Request) -> Result<Response> {
        let target = target_of(request);
        let mut state = self.state.borrow_mut();
        state.requests.push(Recorded {
            method: request.method,
            target: target.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });
        let route = state
            .routes
            .iter_mut()
            .find(|r| r.method == request.method && r.target == target);
        match route {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front().unwrap(),
            Some(route) => clone_reply(&route.replies[0]),
            None => Err(Error::Transport {
                url: request.url.to_string(),
                message: format!("no scripted reply for {:?} {}", request.method, target),
            }),
        }
    }
}

fn method_name(method: Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
    }
}

fn clone_reply(reply: &Result<Response>) -> Result<Response> {
    match reply {
        Ok(response) => Ok(response.clone()),
        Err(Error::Connection { kind, url }) => Err(Error::Connection {
            kind: *kind,
            url: url.clone(),
        }),
        Err(Error::Http { status, url, body }) => Err(Error::Http {
            status: *status,
            url: url.clone(),
            body: body.clone(),
        }),
        Err(other) => Err(Error::Transport {
            url: String::new(),
            message: other.to_string(),
        }),
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.reply(request)
    }

    fn download(&self, request: &Request, sink: &mut dyn io::Write) -> Result<u64> {
        let response = self.reply(request)?.error_for_status(&request.url)?;
        sink.write_all(&response.body)?;
        Ok(response.body.len() as u64)
    }
}
