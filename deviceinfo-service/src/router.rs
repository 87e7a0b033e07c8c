//! Path routing and response assembly.

use axum::http::StatusCode;
use deviceinfo_common::Document;
use serde::{Deserialize, Serialize};

/// MIME type of every document response.
pub const MIME_JSON: &str = "application/json";

/// Message attached to non-GET requests.
pub const UNSUPPORTED_REQUEST: &str = "Unsupported request for the [DeviceInfo] service.";

/// HTTP verbs understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Other,
}

impl From<&axum::http::Method> for Verb {
    fn from(method: &axum::http::Method) -> Self {
        use axum::http::Method;

        match *method {
            Method::GET => Verb::Get,
            Method::HEAD => Verb::Head,
            Method::POST => Verb::Post,
            Method::PUT => Verb::Put,
            Method::DELETE => Verb::Delete,
            Method::PATCH => Verb::Patch,
            Method::OPTIONS => Verb::Options,
            _ => Verb::Other,
        }
    }
}

/// A parsed inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub verb: Verb,
    /// Absolute path including the web prefix.
    pub path: String,
}

impl Request {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Verb::Get, path)
    }
}

/// The result of processing a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub message: String,
    pub content_type: Option<&'static str>,
    pub body: Option<Document>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            message: "OK".to_string(),
            content_type: None,
            body: None,
        }
    }
}

impl Response {
    /// A successful JSON response carrying `doc`.
    pub fn json(doc: Document) -> Self {
        Self {
            content_type: Some(MIME_JSON),
            body: Some(doc),
            ..Default::default()
        }
    }

    /// An error response without a body.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            content_type: None,
            body: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::error(StatusCode::BAD_REQUEST, UNSUPPORTED_REQUEST)
    }
}

/// Which document sections to populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub system: bool,
    pub addresses: bool,
    pub sockets: bool,
}

impl Sections {
    pub const NONE: Sections = Sections {
        system: false,
        addresses: false,
        sockets: false,
    };
    pub const ALL: Sections = Sections {
        system: true,
        addresses: true,
        sockets: true,
    };
    pub const SYSTEM: Sections = Sections {
        system: true,
        ..Sections::NONE
    };
    pub const ADDRESSES: Sections = Sections {
        addresses: true,
        ..Sections::NONE
    };
    pub const SOCKETS: Sections = Sections {
        sockets: true,
        ..Sections::NONE
    };
}

/// Route tags, matched case-sensitively against the first path segment.
///
/// `Adresses` is the historical spelling and stays routable.
pub const ROUTES: &[(&str, Sections)] = &[
    ("Addresses", Sections::ADDRESSES),
    ("Adresses", Sections::ADDRESSES),
    ("System", Sections::SYSTEM),
    ("Sockets", Sections::SOCKETS),
];

/// Outcome of matching a path against [`ROUTES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// No sub-path: every section.
    Root,
    /// A known tag.
    Tagged(Sections),
    /// A sub-path with no matching tag.
    Unknown(String),
}

impl Route {
    /// Sections to populate for this route.
    pub fn sections(&self) -> Sections {
        match self {
            Route::Root => Sections::ALL,
            Route::Tagged(sections) => *sections,
            Route::Unknown(_) => Sections::NONE,
        }
    }
}

/// What to answer for a sub-path that matches no route tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPathPolicy {
    /// 200 OK with an unpopulated document.
    #[default]
    Empty,
    /// 404 Not Found without a body.
    NotFound,
}

/// Resolve `path` after skipping the first `skip_url` bytes (the web prefix).
pub fn resolve(path: &str, skip_url: usize) -> Route {
    debug_assert!(
        skip_url <= path.len(),
        "request path '{}' shorter than web prefix",
        path
    );

    let remainder = path.get(skip_url..).unwrap_or_default();

    // The first segment is always empty: the remainder starts with '/'
    // whenever there is anything after the prefix.
    let mut segments = remainder.split('/').skip(1);

    match segments.next() {
        None | Some("") => Route::Root,
        Some(tag) => ROUTES
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, sections)| Route::Tagged(*sections))
            .unwrap_or_else(|| Route::Unknown(tag.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/Service/DeviceInfo";

    #[test]
    fn test_resolve_root() {
        assert_eq!(resolve(PREFIX, PREFIX.len()), Route::Root);
        assert_eq!(resolve("/Service/DeviceInfo/", PREFIX.len()), Route::Root);
        assert_eq!(resolve("", 0), Route::Root);
        assert_eq!(resolve("/", 0), Route::Root);
    }

    #[test]
    fn test_resolve_tags() {
        let skip = PREFIX.len();
        assert_eq!(
            resolve("/Service/DeviceInfo/System", skip),
            Route::Tagged(Sections::SYSTEM)
        );
        assert_eq!(
            resolve("/Service/DeviceInfo/Addresses", skip),
            Route::Tagged(Sections::ADDRESSES)
        );
        assert_eq!(
            resolve("/Service/DeviceInfo/Adresses", skip),
            Route::Tagged(Sections::ADDRESSES)
        );
        assert_eq!(resolve("/Sockets", 0), Route::Tagged(Sections::SOCKETS));
    }

    #[test]
    fn test_resolve_ignores_trailing_segments() {
        assert_eq!(
            resolve("/System/extra/parts", 0),
            Route::Tagged(Sections::SYSTEM)
        );
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(resolve("/system", 0), Route::Unknown("system".to_string()));
        assert_eq!(resolve("/Time", 0), Route::Unknown("Time".to_string()));
        assert_eq!(Route::Unknown("x".into()).sections(), Sections::NONE);
    }

    #[test]
    fn test_route_sections() {
        assert_eq!(Route::Root.sections(), Sections::ALL);
        assert_eq!(
            Route::Tagged(Sections::SOCKETS).sections(),
            Sections::SOCKETS
        );
    }

    #[test]
    fn test_verb_from_method() {
        assert_eq!(Verb::from(&axum::http::Method::GET), Verb::Get);
        assert_eq!(Verb::from(&axum::http::Method::POST), Verb::Post);
        assert_eq!(Verb::from(&axum::http::Method::TRACE), Verb::Other);
    }

    #[test]
    fn test_response_defaults() {
        let response = Response::default();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.message, "OK");
        assert!(response.body.is_none());

        let response = Response::bad_request();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message, UNSUPPORTED_REQUEST);
        assert!(response.content_type.is_none());
    }

    #[test]
    fn test_unknown_path_policy_parse() {
        let policy: UnknownPathPolicy = serde_json::from_str(r#""not_found""#).unwrap();
        assert_eq!(policy, UnknownPathPolicy::NotFound);
        assert_eq!(UnknownPathPolicy::default(), UnknownPathPolicy::Empty);
    }
}
