//! Platform-neutral view of an inbound request
//!
//! Headers are kept as a multimap keyed by lowercase name. Each entry remembers
//! the name as the client spelled it so forwarded headers keep their casing.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use spin_sdk::http::{IncomingRequest, Method};
use url::form_urlencoded;

/// One header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Header name as it should be sent
    pub key: String,
    /// Header value
    pub value: String,
}

/// Header multimap keyed by lowercase name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, Vec<HeaderEntry>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, keeping earlier values for the same name
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(HeaderEntry {
                key: name.to_string(),
                value: value.to_string(),
            });
    }

    /// Replace every value for `name` with a single entry
    pub fn set(&mut self, name: &str, value: &str) {
        self.entries.insert(
            name.to_ascii_lowercase(),
            vec![HeaderEntry {
                key: name.to_string(),
                value: value.to_string(),
            }],
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<HeaderEntry>> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// All entries for `name`, in arrival order
    pub fn get_all(&self, name: &str) -> &[HeaderEntry] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// First value for `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(|entry| entry.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.values().flatten()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Inbound request as seen by the authorization pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRequest {
    /// Upper-case HTTP method
    pub method: String,
    pub path: String,
    pub headers: Headers,
    /// Raw query string without the leading `?`
    pub querystring: String,
}

impl EdgeRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            headers: Headers::new(),
            querystring: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_query(mut self, querystring: &str) -> Self {
        self.querystring = querystring.trim_start_matches('?').to_string();
        self
    }

    pub fn is_preflight(&self) -> bool {
        self.method == "OPTIONS"
    }

    /// Remove every `name` parameter from the query string and return the first value.
    ///
    /// Other parameters are left byte-for-byte untouched.
    pub fn take_query_param(&mut self, name: &str) -> Option<String> {
        let mut taken = None;
        let kept: Vec<&str> = self
            .querystring
            .split('&')
            .filter(|pair| {
                if pair.is_empty() {
                    return false;
                }
                match form_urlencoded::parse(pair.as_bytes()).next() {
                    Some((key, value)) if key == name => {
                        if taken.is_none() {
                            taken = Some(value.into_owned());
                        }
                        false
                    }
                    _ => true,
                }
            })
            .collect();

        if taken.is_some() {
            self.querystring = kept.join("&");
        }
        taken
    }

    /// Cookies from every `Cookie` header line, in order
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all("cookie")
            .iter()
            .flat_map(|entry| parse_cookie_line(&entry.value))
            .collect()
    }
}

/// Parse `name=value; name2=value2`
fn parse_cookie_line(line: &str) -> Vec<(String, String)> {
    line.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            let value = percent_decode_str(value)
                .decode_utf8()
                .map_or_else(|_| value.to_string(), |decoded| decoded.into_owned());
            (name.trim().to_string(), value)
        })
        .collect()
}

impl EdgeRequest {
    /// Build from raw request parts, keeping every header line in arrival order.
    ///
    /// Values that are not valid UTF-8 are dropped.
    pub fn from_parts<I>(method: &Method, path_with_query: &str, header_lines: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let (path, querystring) = path_with_query
            .split_once('?')
            .unwrap_or((path_with_query, ""));

        let mut headers = Headers::new();
        for (name, value) in header_lines {
            if let Ok(value) = String::from_utf8(value) {
                headers.append(&name, &value);
            }
        }

        Self {
            method: method_name(method),
            path: if path.is_empty() { "/" } else { path }.to_string(),
            headers,
            querystring: querystring.to_string(),
        }
    }
}

impl From<&IncomingRequest> for EdgeRequest {
    fn from(req: &IncomingRequest) -> Self {
        Self::from_parts(
            &req.method(),
            &req.path_with_query().unwrap_or_default(),
            req.headers().entries(),
        )
    }
}

fn method_name(method: &Method) -> String {
    match method {
        Method::Get => "GET".to_string(),
        Method::Head => "HEAD".to_string(),
        Method::Post => "POST".to_string(),
        Method::Put => "PUT".to_string(),
        Method::Delete => "DELETE".to_string(),
        Method::Connect => "CONNECT".to_string(),
        Method::Options => "OPTIONS".to_string(),
        Method::Trace => "TRACE".to_string(),
        Method::Patch => "PATCH".to_string(),
        Method::Other(other) => other.to_ascii_uppercase(),
    }
}
