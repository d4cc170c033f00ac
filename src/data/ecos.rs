//! Bank of Korea ECOS statistic search.

use reqwest::Url;
use serde_json::Value;

use crate::data::envelope;
use crate::data::http::{Clock, HttpClient, Transport};
use crate::error::FetchError;

const BASE_URL: &str = "https://ecos.bok.or.kr/api/StatisticSearch";

/// Monthly window requested for every statistic.
const PERIOD: (&str, &str) = ("202001", "202312");

/// Key and stat code are single path segments, percent-encoded.
pub fn statistic_url(stat_code: &str, api_key: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(BASE_URL).map_err(|e| FetchError::Url(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| FetchError::Url(format!("{BASE_URL} cannot carry path segments")))?
        .extend([api_key, "json", "kr", "1", "100", stat_code, "M", PERIOD.0, PERIOD.1]);
    Ok(url)
}

pub fn fetch_statistic<T: Transport, C: Clock>(
    client: &HttpClient<T, C>,
    api_key: &str,
    stat_code: &str,
) -> Result<Value, FetchError> {
    let url = statistic_url(stat_code, api_key)?;
    let body = client.request_json(url.as_str(), &[])?;
    Ok(envelope("ecos", stat_code, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_layout() {
        assert_eq!(
            statistic_url("722Y001", "KEY").unwrap().as_str(),
            "https://ecos.bok.or.kr/api/StatisticSearch/KEY/json/kr/1/100/722Y001/M/202001/202312"
        );
    }

    #[test]
    fn slashes_in_inputs_stay_inside_their_segment() {
        let url = statistic_url("a/b", "k/../x").unwrap();
        let segments: Vec<&str> = url.path_segments().unwrap().collect();

        assert_eq!(segments.len(), 11);
        assert_eq!(segments[2], "k%2F..%2Fx");
        assert_eq!(segments[7], "a%2Fb");
    }
}
