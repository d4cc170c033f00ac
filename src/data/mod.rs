//! Upstream vendor adapters.
//!
//! Each adapter builds the vendor URL, fetches a JSON object through
//! `HttpClient`, and wraps it in a common envelope:
//!
//! ```json
//! {"source": "fred", "entity_id": "CPIAUCSL", "payload": { ... }}
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::Settings;
use crate::data::http::{Clock, HttpClient, Transport};
use crate::error::FetchError;

pub mod ecos;
pub mod fred;
pub mod http;
pub mod opendart;
pub mod sec_edgar;

/// Supported upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Fred,
    Ecos,
    Opendart,
    #[value(name = "sec_edgar")]
    SecEdgar,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Fred => "fred",
            SourceKind::Ecos => "ecos",
            SourceKind::Opendart => "opendart",
            SourceKind::SecEdgar => "sec_edgar",
        }
    }

    /// Entity fetched when the caller does not name one.
    pub fn default_entity(self, settings: &Settings) -> &str {
        match self {
            SourceKind::Fred => &settings.fred_series_id,
            SourceKind::Ecos => &settings.ecos_stat_code,
            SourceKind::Opendart => &settings.dart_corp_code,
            SourceKind::SecEdgar => &settings.sec_cik,
        }
    }
}

/// Fetch the payload for `entity` (or the configured default) from `kind`.
///
/// Returns the resolved entity id and the enveloped payload.
pub fn fetch_payload<T: Transport, C: Clock>(
    kind: SourceKind,
    entity: Option<&str>,
    client: &HttpClient<T, C>,
    settings: &Settings,
) -> Result<(String, Value), FetchError> {
    let entity_id = entity
        .unwrap_or_else(|| kind.default_entity(settings))
        .to_string();

    let payload = match kind {
        SourceKind::Fred => fred::fetch_series_observations(client, &settings.fred_api_key, &entity_id)?,
        SourceKind::Ecos => ecos::fetch_statistic(client, &settings.ecos_api_key, &entity_id)?,
        SourceKind::Opendart => opendart::fetch_company(client, &settings.dart_api_key, &entity_id)?,
        SourceKind::SecEdgar => {
            sec_edgar::fetch_company_facts(client, &settings.sec_user_agent, &entity_id)?
        }
    };

    Ok((entity_id, payload))
}

pub(crate) fn envelope(source: &str, entity_id: &str, body: Map<String, Value>) -> Value {
    json!({
        "source": source,
        "entity_id": entity_id,
        "payload": Value::Object(body),
    })
}
