use crate::Error;
use url::Url;

/// Parse a base URL and make sure its path ends with `/` so relative joins keep the last segment.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw.trim()).map_err(|err| Error::InvalidConfig {
        message: format!("invalid URL `{raw}`").into_boxed_str(),
        source: Some(Box::new(err)),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_config(format!(
            "`{raw}` is not an http(s) URL"
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::invalid_config(format!(
            "`{raw}` must not include query or fragment"
        )));
    }

    let path = url.path();
    if path != "/" && !path.ends_with('/') {
        url.set_path(&format!("{path}/"));
    }
    Ok(url)
}

/// Scheme, host and port of `url`, with an empty path.
pub(crate) fn origin_url(url: &Url) -> Result<Url, Error> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(Error::invalid_config(format!("`{url}` has no origin")));
    }
    normalize_base_url(&origin.ascii_serialization())
}

pub(crate) fn endpoint_url<'a, I>(base_url: &Url, segments: I) -> Result<Url, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::invalid_config("base URL must be hierarchical"))?;
        path.pop_if_empty();
        for seg in segments {
            path.push(seg);
        }
    }
    Ok(url)
}

pub(crate) fn sanitize_url_for_error(url: &Url) -> Url {
    let mut safe = url.clone();
    safe.set_query(None);
    safe.set_fragment(None);
    let _ = safe.set_username("");
    let _ = safe.set_password(None);
    safe
}
