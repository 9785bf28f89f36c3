//! Socrata Open Data (SODA) client used by both crash feeds.
//!
//! A day is requested with a `$where` expression on the feed's timestamp column and
//! read in pages of `$limit` rows until a short page comes back.

use std::future::Future;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::SocrataSettings;

use super::{read_body, FetchError, FetchOutcome, RawRecord, Source, SourceClient};

/// Timestamp column filtered by `$where` on both crash datasets.
const DATE_FIELD: &str = "crash_date";

pub struct SocrataClient {
    http: reqwest::Client,
    source: Source,
    settings: SocrataSettings,
}

impl SocrataClient {
    pub fn new(http: reqwest::Client, source: Source, settings: SocrataSettings) -> Self {
        SocrataClient {
            http,
            source,
            settings,
        }
    }

    fn page_size(&self) -> usize {
        self.settings.page_size.max(1)
    }

    fn max_pages(&self) -> usize {
        self.settings.max_pages.max(1)
    }

    fn page_params(&self, date: NaiveDate, offset: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("$limit", self.page_size().to_string()),
            ("$offset", offset.to_string()),
            ("$where", where_clause(DATE_FIELD, date)),
        ];
        if let Some(select) = &self.settings.select {
            params.push(("$select", select.clone()));
        }
        if let Some(order) = &self.settings.order {
            params.push(("$order", order.clone()));
        }

        params
    }

    async fn fetch_page(&self, params: &[(&'static str, String)]) -> Result<Vec<RawRecord>, FetchError> {
        let mut request = self.http.get(&self.settings.endpoint).query(params);
        if let Some(token) = &self.settings.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: self.settings.endpoint.clone(),
            source,
        })?;
        let body = read_body(response).await?;

        parse_page(&body)
    }

    async fn fetch_all(&self, date: NaiveDate) -> Result<Vec<RawRecord>, FetchError> {
        paginate(self.page_size(), self.max_pages(), move |offset| {
            let params = self.page_params(date, offset);
            async move { self.fetch_page(&params).await }
        })
        .await
    }
}

/// Requests pages at offsets `0, page_size, ...` until one comes back short.
///
/// A full page at `max_pages` means the day may be incomplete and is reported as
/// [`FetchError::Truncated`]. Any page error discards the rows read so far.
pub(crate) async fn paginate<F, Fut>(
    page_size: usize,
    max_pages: usize,
    mut fetch_page: F,
) -> Result<Vec<RawRecord>, FetchError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<RawRecord>, FetchError>>,
{
    let mut records = Vec::new();

    for page in 0..max_pages {
        let rows = fetch_page(page * page_size).await?;
        let full_page = rows.len() >= page_size;
        records.extend(rows);

        if !full_page {
            return Ok(records);
        }
    }

    Err(FetchError::Truncated { pages: max_pages })
}

#[async_trait]
impl SourceClient for SocrataClient {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_raw_for_date(&self, date: NaiveDate) -> FetchOutcome {
        match self.fetch_all(date).await {
            Ok(records) => {
                log::debug!("{}: {} raw records for {}", self.source, records.len(), date);
                FetchOutcome::Records(records)
            }
            Err(err) => {
                log::error!("{}: fetch for {} failed: {}", self.source, date, err);
                err.into()
            }
        }
    }
}

/// Filter expression selecting `[date 00:00:00, date 23:59:59)` in floating timestamp form.
pub fn where_clause(field: &str, date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d");
    format!("{field} >= '{day}T00:00:00' AND {field} < '{day}T23:59:59'")
}

/// Decodes one page. SODA answers a JSON array of row objects.
pub fn parse_page(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Payload(e.to_string()))?;

    match value {
        Value::Array(rows) => Ok(rows.into_iter().map(RawRecord).collect()),
        other => Err(FetchError::Payload(format!(
            "expected an array of rows, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings() -> SocrataSettings {
        SocrataSettings {
            endpoint: "https://data.cityofchicago.org/resource/85ca-t3if.json".to_string(),
            app_token: None,
            page_size: 1000,
            max_pages: 50,
            order: Some(":id".to_string()),
            select: None,
        }
    }

    fn rows(n: usize) -> Vec<RawRecord> {
        (0..n).map(|i| RawRecord(json!({ "crash_record_id": i }))).collect()
    }

    /// Serves the given page sizes in order and records the requested offsets.
    async fn paginate_pages(
        pages: Vec<Result<usize, FetchError>>,
        page_size: usize,
        max_pages: usize,
    ) -> (Result<Vec<RawRecord>, FetchError>, Vec<usize>) {
        let mut pages = pages.into_iter();
        let mut offsets = Vec::new();
        let result = paginate(page_size, max_pages, |offset| {
            offsets.push(offset);
            let page = pages.next().unwrap_or(Ok(0)).map(rows);
            async move { page }
        })
        .await;

        (result, offsets)
    }

    #[tokio::test]
    async fn should_return_empty_day_from_empty_first_page() {
        let (result, offsets) = paginate_pages(vec![Ok(0)], 3, 5).await;

        assert!(result.unwrap().is_empty());
        assert_eq!(offsets, vec![0]);
    }

    #[tokio::test]
    async fn should_stop_on_short_page() {
        let (result, offsets) = paginate_pages(vec![Ok(3), Ok(3), Ok(1), Ok(3)], 3, 5).await;

        assert_eq!(result.unwrap().len(), 7);
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn should_report_truncation_when_last_allowed_page_is_full() {
        let (result, offsets) = paginate_pages(vec![Ok(3), Ok(3)], 3, 2).await;

        assert!(matches!(result, Err(FetchError::Truncated { pages: 2 })));
        assert_eq!(offsets, vec![0, 3]);
    }

    #[tokio::test]
    async fn should_discard_rows_when_a_later_page_fails() {
        let failure = FetchError::Payload("bad page".to_string());
        let (result, offsets) = paginate_pages(vec![Ok(3), Err(failure), Ok(1)], 3, 5).await;

        match result {
            Err(FetchError::Payload(message)) => assert_eq!(message, "bad page"),
            other => panic!("unexpected result {:?}", other.map(|r| r.len())),
        }
        assert_eq!(offsets, vec![0, 3]);
    }

    #[test]
    fn should_build_where_clause() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();

        assert_eq!(
            where_clause("crash_date", date),
            "crash_date >= '2025-10-02T00:00:00' AND crash_date < '2025-10-02T23:59:59'"
        );
    }

    #[test]
    fn should_advance_offset_per_page() {
        let client = SocrataClient::new(reqwest::Client::new(), Source::ChicagoCrashes, settings());
        let date = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let params = client.page_params(date, 2000);

        assert!(params.contains(&("$limit", "1000".to_string())));
        assert!(params.contains(&("$offset", "2000".to_string())));
        assert!(params.contains(&("$order", ":id".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "$select"));
    }

    #[test]
    fn should_include_select_when_configured() {
        let mut settings = settings();
        settings.select = Some("crash_date,injuries_total".to_string());
        let client = SocrataClient::new(reqwest::Client::new(), Source::ChicagoCrashes, settings);
        let params = client.page_params(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 0);

        assert!(params.contains(&("$select", "crash_date,injuries_total".to_string())));
    }

    #[test]
    fn should_never_use_zero_page_size() {
        let mut settings = settings();
        settings.page_size = 0;
        settings.max_pages = 0;
        let client = SocrataClient::new(reqwest::Client::new(), Source::NycCrashes, settings);

        assert_eq!(client.page_size(), 1);
        assert_eq!(client.max_pages(), 1);
    }

    #[test]
    fn should_parse_rows() {
        let rows = parse_page(r#"[{"crash_date": "2025-10-02T14:30:00.000"}, {}]"#).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].get("crash_date").is_some());
    }

    #[test]
    fn should_accept_empty_page() {
        assert!(parse_page("[]").unwrap().is_empty());
    }

    #[test]
    fn should_reject_non_array_payload() {
        let err = parse_page(r#"{"error": true, "message": "Invalid app token"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));

        let err = parse_page("<html>").unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));
    }
}
