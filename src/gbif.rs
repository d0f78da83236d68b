use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::GbifSettings;
use crate::domain::{LocalKey, Registry};
use crate::error::TaxaError;
use crate::rank::Rank;
use crate::record::{
    DatasetRecord, MatchResult, NameUsageRecord, ParsedNameRecord, SearchResultRecord,
    SuggestResultRecord, VernacularRecord,
};
use crate::source::{AncestorOrder, DataSource, FuzzyMatchRequest, SearchFilters};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default)]
    end_of_records: bool,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Clone)]
pub struct GbifHttpClient {
    client: Client,
    base_url: String,
    max_retries: usize,
    page_limit: usize,
}

impl GbifHttpClient {
    pub fn new(settings: &GbifSettings) -> Result<Self, TaxaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-taxa/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TaxaError::GbifHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| TaxaError::GbifHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            page_limit: settings.page_limit,
        })
    }

    pub fn usage_url(&self, key: LocalKey) -> String {
        format!("{}/species/{key}", self.base_url)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, TaxaError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying GBIF request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying GBIF request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(TaxaError::GbifHttp(err.to_string()));
                }
            }
        }
    }

    /// A 404 is absence, not an error.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, TaxaError> {
        let response = self.send_with_retries(|| self.client.get(url).query(query))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GBIF request failed".to_string());
            return Err(TaxaError::GbifStatus { status, message });
        }
        let value = response
            .json::<T>()
            .map_err(|err| TaxaError::Decode(err.to_string()))?;
        Ok(Some(value))
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, TaxaError> {
        Ok(self.get_json::<Vec<T>>(url, query)?.unwrap_or_default())
    }

    fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        cap: Option<usize>,
    ) -> Result<Vec<T>, TaxaError> {
        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let limit = match cap {
                Some(cap) => self.page_limit.min(cap.saturating_sub(items.len())),
                None => self.page_limit,
            };
            if limit == 0 {
                break;
            }
            let mut paged_query = query.to_vec();
            paged_query.push(("offset", offset.to_string()));
            paged_query.push(("limit", limit.to_string()));
            let Some(page) = self.get_json::<Page<T>>(url, &paged_query)? else {
                break;
            };
            let received = page.results.len();
            items.extend(page.results);
            offset += received;
            if page.end_of_records || received == 0 {
                break;
            }
        }
        Ok(items)
    }
}

impl DataSource for GbifHttpClient {
    fn registry(&self) -> Registry {
        Registry::Gbif
    }

    fn ancestor_order(&self) -> AncestorOrder {
        AncestorOrder::RootFirst
    }

    fn get_by_key(&self, key: LocalKey) -> Result<Option<NameUsageRecord>, TaxaError> {
        self.get_json(&self.usage_url(key), &[])
    }

    fn list_by_canonical_name(
        &self,
        name: &str,
        rank: Option<Rank>,
    ) -> Result<Vec<NameUsageRecord>, TaxaError> {
        let mut query = vec![("name", name.to_string())];
        if let Some(rank) = rank {
            query.push(("rank", rank.to_gbif().to_string()));
        }
        self.get_paged(&format!("{}/species", self.base_url), &query, None)
    }

    fn list_children(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.get_paged(&format!("{}/children", self.usage_url(key)), &[], None)
    }

    fn list_parents(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.get_list(&format!("{}/parents", self.usage_url(key)), &[])
    }

    fn list_synonyms(&self, accepted: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.get_paged(&format!("{}/synonyms", self.usage_url(accepted)), &[], None)
    }

    fn list_combinations(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.get_list(&format!("{}/combinations", self.usage_url(key)), &[])
    }

    fn list_related(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.get_list(&format!("{}/related", self.usage_url(key)), &[])
    }

    fn match_fuzzy(&self, request: &FuzzyMatchRequest<'_>) -> Result<MatchResult, TaxaError> {
        let mut query = vec![
            ("name", request.name.to_string()),
            ("strict", request.strict.to_string()),
            ("verbose", request.verbose.to_string()),
        ];
        if let Some(rank) = request.rank {
            query.push(("rank", rank.to_gbif().to_string()));
        }
        if let Some(classification) = request.classification {
            query.push(("kingdom", classification.to_string()));
        }
        Ok(self
            .get_json(&format!("{}/species/match", self.base_url), &query)?
            .unwrap_or_default())
    }

    fn full_text_search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResultRecord>, TaxaError> {
        let mut params = vec![("q", query.to_string())];
        if let Some(rank) = filters.rank {
            params.push(("rank", rank.to_gbif().to_string()));
        }
        if let Some(dataset) = filters.dataset_key {
            params.push(("datasetKey", dataset.to_string()));
        }
        if let Some(higher) = filters.higher_taxon_key {
            params.push(("highertaxonKey", higher.to_string()));
        }
        if let Some(status) = &filters.status {
            params.push(("status", status.clone()));
        }
        let cap = Some(filters.limit.unwrap_or(self.page_limit));
        self.get_paged(&format!("{}/species/search", self.base_url), &params, cap)
    }

    fn suggest(
        &self,
        query: &str,
        rank: Option<Rank>,
    ) -> Result<Vec<SuggestResultRecord>, TaxaError> {
        let mut params = vec![("q", query.to_string())];
        if let Some(rank) = rank {
            params.push(("rank", rank.to_gbif().to_string()));
        }
        self.get_list(&format!("{}/species/suggest", self.base_url), &params)
    }

    fn parse_name(&self, literal: &str) -> Result<Vec<ParsedNameRecord>, TaxaError> {
        self.get_list(
            &format!("{}/parser/name", self.base_url),
            &[("name", literal.to_string())],
        )
    }

    fn get_vernacular_names(&self, key: LocalKey) -> Result<Vec<VernacularRecord>, TaxaError> {
        self.get_paged(&format!("{}/vernacularNames", self.usage_url(key)), &[], None)
    }

    fn get_dataset(&self, key: Uuid) -> Result<Option<DatasetRecord>, TaxaError> {
        self.get_json(&format!("{}/dataset/{key}", self.base_url), &[])
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
    }

    #[test]
    fn usage_url_trims_trailing_slash() {
        let settings = GbifSettings {
            base_url: "https://api.gbif.org/v1/".to_string(),
            ..GbifSettings::default()
        };
        let client = GbifHttpClient::new(&settings).unwrap();
        assert_eq!(
            client.usage_url(LocalKey::new(2435099)),
            "https://api.gbif.org/v1/species/2435099"
        );
    }

    #[test]
    fn decode_page() {
        let raw = r#"{"offset":0,"limit":2,"endOfRecords":true,"results":[{"key":1,"canonicalName":"Puma"}]}"#;
        let page: Page<NameUsageRecord> = serde_json::from_str(raw).unwrap();
        assert!(page.end_of_records);
        assert_eq!(page.results[0].canonical_name.as_deref(), Some("Puma"));
    }
}
