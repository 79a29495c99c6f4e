//! The seam between the API clients and the network.
//!
//! Clients build [`Request`] values and hand them to a [`Transport`]. The production
//! transport is a blocking `reqwest` client; tests swap in a scripted one.
use crate::error::{ConnectionFailure, Error, Result};
use log::debug;
use serde::de::DeserializeOwned;
use std::{error::Error as StdError, io};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Body>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Request {
            method: Method::Get,
            url,
            headers: vec![],
            body: None,
        }
    }

    pub fn post(url: Url, body: Body) -> Self {
        Request {
            method: Method::Post,
            url,
            headers: vec![],
            body: Some(body),
        }
    }

    pub fn put(url: Url, body: Body) -> Self {
        Request {
            method: Method::Put,
            url,
            headers: vec![],
            body: Some(body),
        }
    }

    pub fn header<V: Into<String>>(mut self, name: &'static str, value: V) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub status: u16,
    /// Raw `Link` header, used for pagination.
    pub link: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non 2xx response into [`Error::Http`].
    pub fn error_for_status(self, url: &Url) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status,
                url: url.to_string(),
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::parse(context, e))
    }
}

pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response>;

    /// Streams a successful response body into `sink`, returning the number of bytes
    /// written.
    fn download(&self, request: &Request, sink: &mut dyn io::Write) -> Result<u64>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(HttpTransport { client })
    }

    fn build(&self, request: &Request) -> reqwest::blocking::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Post => self.client.post(request.url.clone()),
            Method::Put => self.client.put(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        match &request.body {
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Form(pairs)) => builder.form(pairs),
            None => builder,
        }
    }

    fn execute(&self, request: &Request) -> Result<reqwest::blocking::Response> {
        debug!("Opening URL: {}", request.url);
        self.build(request)
            .send()
            .map_err(|e| request_error(&request.url, e))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let response = self.execute(request)?;
        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .map_err(|e| request_error(&request.url, e))?
            .to_vec();
        Ok(Response { status, link, body })
    }

    fn download(&self, request: &Request, sink: &mut dyn io::Write) -> Result<u64> {
        let mut response = self.execute(request)?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: request.url.to_string(),
                body: response.text().unwrap_or_default(),
            });
        }
        response
            .copy_to(sink)
            .map_err(|e| request_error(&request.url, e))
    }
}

fn request_error(url: &Url, err: reqwest::Error) -> Error {
    match connection_failure(&err) {
        Some(kind) => Error::Connection {
            kind,
            url: url.to_string(),
        },
        None => Error::Transport {
            url: url.to_string(),
            message: err.to_string(),
        },
    }
}

fn connection_failure(err: &reqwest::Error) -> Option<ConnectionFailure> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionReset => return Some(ConnectionFailure::Reset),
                io::ErrorKind::ConnectionRefused => return Some(ConnectionFailure::Refused),
                io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => {
                    return Some(ConnectionFailure::RemoteDisconnected)
                }
                _ => {}
            }
        }
        if cause
            .to_string()
            .contains("connection closed before message completed")
        {
            return Some(ConnectionFailure::RemoteDisconnected);
        }
        source = cause.source();
    }
    if err.is_connect() {
        Some(ConnectionFailure::Refused)
    } else {
        None
    }
}
