use http::Method;
use url::Url;

/// A Jenkins API call before it is resolved to a URL.
///
/// Paths are joined onto the client's base URL unless [`Request::under`] points them at a
/// URL the server handed out, such as a job or build URL.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub base: Option<Url>,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl Request {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            base: None,
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    #[must_use]
    pub fn post(segments: &[&str]) -> Self {
        Self::new(Method::POST, segments)
    }

    #[must_use]
    pub fn under(mut self, base: &Url) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Limit the JSON response to `fields` (Jenkins' `tree` filter).
    #[must_use]
    pub fn tree(self, fields: &str) -> Self {
        self.param("tree", fields)
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn params<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        self
    }
}
