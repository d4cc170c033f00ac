//! FRED (Federal Reserve Economic Data) series observations.

use reqwest::Url;
use serde_json::Value;

use crate::data::http::{Clock, HttpClient, Transport};
use crate::data::envelope;
use crate::error::FetchError;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

pub fn observations_url(series_id: &str, api_key: &str) -> Result<Url, FetchError> {
    Url::parse_with_params(
        BASE_URL,
        &[
            ("series_id", series_id),
            ("api_key", api_key),
            ("file_type", "json"),
        ],
    )
    .map_err(|e| FetchError::Url(e.to_string()))
}

/// Fetch all observations for `series_id`, wrapped in a source envelope.
pub fn fetch_series_observations<T: Transport, C: Clock>(
    client: &HttpClient<T, C>,
    api_key: &str,
    series_id: &str,
) -> Result<Value, FetchError> {
    let url = observations_url(series_id, api_key)?;
    let body = client.request_json(url.as_str(), &[])?;
    Ok(envelope("fred", series_id, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_series_and_key() {
        let url = observations_url("CPIAUCSL", "secret").unwrap();
        assert_eq!(url.host_str(), Some("api.stlouisfed.org"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("series_id".to_string(), "CPIAUCSL".to_string())));
        assert!(pairs.contains(&("api_key".to_string(), "secret".to_string())));
        assert!(pairs.contains(&("file_type".to_string(), "json".to_string())));
    }
}
