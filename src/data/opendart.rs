//! OpenDART (Korean FSS disclosure system) company overview.

use reqwest::Url;
use serde_json::Value;

use crate::data::envelope;
use crate::data::http::{Clock, HttpClient, Transport};
use crate::error::FetchError;

const BASE_URL: &str = "https://opendart.fss.or.kr/api/company.json";

pub fn company_url(corp_code: &str, api_key: &str) -> Result<Url, FetchError> {
    Url::parse_with_params(BASE_URL, &[("crtfc_key", api_key), ("corp_code", corp_code)])
        .map_err(|e| FetchError::Url(e.to_string()))
}

pub fn fetch_company<T: Transport, C: Clock>(
    client: &HttpClient<T, C>,
    api_key: &str,
    corp_code: &str,
) -> Result<Value, FetchError> {
    let url = company_url(corp_code, api_key)?;
    let body = client.request_json(url.as_str(), &[])?;
    Ok(envelope("opendart", corp_code, body))
}
