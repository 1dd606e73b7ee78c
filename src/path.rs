//! Remote URIs and POSIX path resolution.
//!
//! Paths are stored literally (unescaped) and normalized: they are always
//! absolute, contain no `.`/`..`/empty segments, and a trailing `/` marks
//! the directory form. Escaping happens only when the URI is rendered.

use std::fmt;
use url::Url;

use crate::error::{Error, SftpResult};

/// Trailing slash handling for [`RemoteUri::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingSlash {
    /// Always end with `/`
    ForceOn,
    /// Strip one trailing `/` (the root keeps its slash)
    ForceOff,
    /// Keep whatever the last joined part had
    #[default]
    Preserve,
}

/// Location of a remote object: scheme, host, credentials reference and path.
/// Equality is on the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteUri {
    scheme: String,
    host: String,
    port: Option<u16>,
    username: Option<String>,
    path: String,
}

fn push_segments<'a>(segments: &mut Vec<&'a str>, path: &'a str) {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                let _ = segments.pop();
            }
            segment => segments.push(segment),
        }
    }
}

impl RemoteUri {
    /// Creates an `sftp://` URI for `host` pointing at `path`
    pub fn new<H: Into<String>>(host: H, path: &str) -> Self {
        let uri = Self {
            scheme: "sftp".to_owned(),
            host: host.into(),
            port: None,
            username: None,
            path: "/".to_owned(),
        };
        uri.resolve(&[path], TrailingSlash::Preserve)
    }

    /// Parses `scheme://[user@]host[:port][/path]`. Percent escapes in the
    /// path and user name are decoded.
    pub fn parse(uri: &str) -> SftpResult<Self> {
        let url = Url::parse(uri).map_err(|e| Error::InvalidUri(format!("{uri}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUri(format!("{uri}: missing host")))?;

        let path = urlencoding::decode(url.path())
            .map_err(|e| Error::InvalidUri(format!("{uri}: {e}")))?;
        let username = match url.username() {
            "" => None,
            name => Some(
                urlencoding::decode(name)
                    .map_err(|e| Error::InvalidUri(format!("{uri}: {e}")))?
                    .into_owned(),
            ),
        };

        let base = Self {
            scheme: url.scheme().to_owned(),
            host: host.to_owned(),
            port: url.port(),
            username,
            path: "/".to_owned(),
        };

        Ok(base.resolve(&[&*path], TrailingSlash::Preserve))
    }

    #[must_use]
    pub fn with_username<U: Into<String>>(mut self, username: U) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The literal path, as needed when building commands
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path with URL-unsafe characters percent-escaped per segment
    pub fn escaped_path(&self) -> String {
        self.path
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `true` if the path ends with `/`
    pub fn is_dir_form(&self) -> bool {
        self.path.ends_with('/')
    }

    /// `true` if the path is `/`
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Joins `parts` onto this path left to right.
    ///
    /// An absolute part discards everything accumulated before it, `.` is a
    /// no-op and `..` drops the last segment (never above the root).
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, parts: &[S], slash: TrailingSlash) -> Self {
        let mut segments = Vec::new();
        push_segments(&mut segments, &self.path);
        let mut dir_form = self.is_dir_form();

        for part in parts.iter().map(AsRef::<str>::as_ref).filter(|p| !p.is_empty()) {
            if part.starts_with('/') {
                segments.clear();
            }
            push_segments(&mut segments, part);
            dir_form = part.ends_with('/') || matches!(part.rsplit('/').next(), Some("." | ".."));
        }

        let mut path = format!("/{}", segments.join("/"));
        let dir_form = match slash {
            TrailingSlash::ForceOn => true,
            TrailingSlash::ForceOff => false,
            TrailingSlash::Preserve => dir_form,
        };
        if dir_form && !path.ends_with('/') {
            path.push('/');
        }

        Self {
            path,
            ..self.clone()
        }
    }

    /// Shorthand for resolving a single part, keeping its trailing slash
    #[must_use]
    pub fn join(&self, part: &str) -> Self {
        self.resolve(&[part], TrailingSlash::Preserve)
    }

    /// Same URI in directory form
    #[must_use]
    pub fn as_dir(&self) -> Self {
        self.resolve::<&str>(&[], TrailingSlash::ForceOn)
    }

    /// Same URI without the trailing slash
    #[must_use]
    pub fn as_file(&self) -> Self {
        self.resolve::<&str>(&[], TrailingSlash::ForceOff)
    }

    /// Joins `path` onto this URI and splits the result into its parent
    /// directory and base name.
    ///
    /// A trailing slash on `path` does not empty the base name:
    /// `"/a/b/"` splits into `("/a/", "b")`. The root splits into `("/", "")`.
    pub fn split_dir(&self, path: &str) -> (Self, String) {
        let joined = self.resolve(&[path], TrailingSlash::ForceOff);
        if joined.is_root() {
            return (joined, String::new());
        }

        let idx = joined.path.rfind('/').unwrap_or(0);
        let base = joined.path[idx + 1..].to_owned();
        let parent = Self {
            path: joined.path[..=idx].to_owned(),
            ..joined
        };

        (parent, base)
    }

    /// Base name of `path` resolved against this URI
    pub fn base_name(&self, path: &str) -> String {
        self.split_dir(path).1
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(username) = &self.username {
            write!(f, "{}@", urlencoding::encode(username))?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.escaped_path())
    }
}
