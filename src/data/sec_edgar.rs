//! SEC EDGAR XBRL company facts.
//!
//! EDGAR rejects requests without a descriptive `User-Agent`, so one is
//! always sent.

use serde_json::Value;

use crate::data::envelope;
use crate::data::http::{Clock, HttpClient, Transport};
use crate::error::FetchError;

pub fn company_facts_url(cik: &str) -> String {
    format!("https://data.sec.gov/api/xbrl/companyfacts/CIK{cik}.json")
}

pub fn fetch_company_facts<T: Transport, C: Clock>(
    client: &HttpClient<T, C>,
    user_agent: &str,
    cik: &str,
) -> Result<Value, FetchError> {
    let body = client.request_json(&company_facts_url(cik), &[("User-Agent", user_agent)])?;
    Ok(envelope("sec_edgar", cik, body))
}
