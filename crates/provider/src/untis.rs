//! HTTP client for the WebUntis substitution monitor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use vplan_core::substitution::SubstitutionRow;
use vplan_core::types::DateNumber;

use crate::{ProviderConfig, ProviderError, SubstitutionSource};

/// Monitor layout whose columns match the eight-cell row format.
const FORMAT_NAME: &str = "Web-Schüler-heute";

/// Client for one school's substitution monitor.
#[derive(Clone)]
pub struct UntisClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl UntisClient {
    /// Create a client whose every request is bounded by `timeout`.
    ///
    /// Redirects are not followed; a redirect is reported as a status error.
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Request body for one date.
    pub fn request_payload(&self, date: DateNumber) -> Value {
        serde_json::json!({
            "formatName": FORMAT_NAME,
            "schoolName": self.config.school,
            "date": date,
            "dateOffset": 0,
            "activityTypeIds": [],
            "departmentElementType": -1,
            "departmentIds": [],
            "enableSubstitutionFrom": false,
            "groupBy": 1,
            "hideAbsent": false,
            "hideCancelCausedByEvent": false,
            "hideCancelWithSubstitution": true,
            "mergeBlocks": true,
            "showAbsentElements": [],
            "showAbsentTeacher": true,
            "showAffectedElements": [1],
            "showBreakSupervisions": false,
            "showCancel": true,
            "showClass": true,
            "showEvent": true,
            "showExamSupervision": false,
            "showHour": true,
            "showInfo": true,
            "showMessages": true,
            "showOnlyCancel": false,
            "showOnlyFutureSub": true,
            "showRoom": true,
            "showStudentgroup": false,
            "showSubject": true,
            "showSubstText": true,
            "showSubstTypeColor": false,
            "showSubstitutionFrom": 0,
            "showTeacher": true,
            "showTeacherOnEvent": false,
            "showTime": true,
            "showUnheraldedExams": false,
            "showUnitTime": false,
            "strikethrough": true,
            "strikethroughAbsentTeacher": true,
        })
    }

    // ---- private helpers ----

    async fn ensure_json(response: reqwest::Response) -> Result<Value, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().contains("application/json") {
            return Err(ProviderError::NotJson { content_type });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Extract `payload.rows`; a missing or non-array field means "no rows".
pub fn parse_rows(body: Value) -> Result<Vec<SubstitutionRow>, ProviderError> {
    match body.get("payload").and_then(|p| p.get("rows")) {
        Some(rows @ Value::Array(_)) => Ok(serde_json::from_value(rows.clone())?),
        _ => Ok(Vec::new()),
    }
}

#[async_trait]
impl SubstitutionSource for UntisClient {
    async fn fetch_rows(&self, date: DateNumber) -> Result<Vec<SubstitutionRow>, ProviderError> {
        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("school", self.config.school.as_str())])
            .header(ACCEPT, "application/json")
            .json(&self.request_payload(date))
            .send()
            .await?;

        let body = Self::ensure_json(response).await?;
        let rows = parse_rows(body)?;
        tracing::debug!(date, rows = rows.len(), "Fetched substitution rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_school_and_date() {
        let config = ProviderConfig::new(Some("demo-school"), None).unwrap();
        let client = UntisClient::new(config, Duration::from_secs(1)).unwrap();
        let payload = client.request_payload(20250113);
        assert_eq!(payload["schoolName"], "demo-school");
        assert_eq!(payload["date"], 20250113);
        assert_eq!(payload["formatName"], FORMAT_NAME);
    }

    #[test]
    fn parses_rows_from_payload() {
        let body = serde_json::json!({
            "payload": {
                "date": 20250113,
                "rows": [
                    { "data": ["1", "07:45", "10A", "MAT", "A101", "ABC", "Entfall", ""], "group": "10A", "cellClasses": {} }
                ]
            }
        });
        let rows = parse_rows(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data[3], "MAT");
    }

    #[test]
    fn missing_rows_are_empty() {
        assert!(parse_rows(serde_json::json!({})).unwrap().is_empty());
        assert!(parse_rows(serde_json::json!({ "payload": { "rows": null } }))
            .unwrap()
            .is_empty());
    }
}
