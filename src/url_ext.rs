use url::Url;

/// Returns `url` with `key=value` appended to its query string, joined with
/// `&` when a query is already present and `?` otherwise.
pub fn append_query(url: &Url, key: &str, value: &str) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut().append_pair(key, value);
    url
}
