//! REST client for the billing backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{BillingStore, StoreError};
use crate::core::{
    BillingDetail, BillingError, BillingRecord, BillingStatus, SummarySource, SummaryStatus,
    Waybill, WaybillStatus, WaybillSummary,
};
use crate::draft::DraftRecord;
use crate::settings::ApiSettings;

/// [`BillingStore`] over the back office REST API.
///
/// The bearer token goes on mutating requests; reads carry it only when
/// `auth_on_reads` is set.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
    settings: ApiSettings,
}

#[derive(Serialize)]
struct StatusBody<T: Serialize> {
    status: T,
}

impl HttpStore {
    pub fn new(settings: ApiSettings) -> Result<Self, BillingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| BillingError::Config(format!("failed to build HTTP client: {e}")))?;
        let base = Url::parse(&settings.base_url)
            .map_err(|e| BillingError::Config(format!("invalid api.base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BillingError::Config(format!(
                "invalid api.base_url: {} cannot carry a path",
                settings.base_url
            )));
        }
        Ok(Self {
            client,
            base,
            settings,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, path: &[&str]) -> RequestBuilder {
        let authorize = method != Method::GET || self.settings.auth_on_reads;
        let builder = self.client.request(method, self.url(path));
        match (&self.settings.token, authorize) {
            (Some(token), true) => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        debug!(url = %response.url(), status = %response.status(), "billing api response");
        Ok(response)
    }

    async fn expect_success(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, StoreError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        let response = Self::expect_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// GET a single entity; 404 means absent.
    async fn get_optional<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Option<T>, StoreError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response).await?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        body: &B,
    ) -> Result<Response, StoreError> {
        let response = self.send(self.request(method, path).json(body)).await?;
        Self::expect_success(response).await
    }

    async fn delete(&self, path: &[&str]) -> Result<(), StoreError> {
        let response = self.send(self.request(Method::DELETE, path)).await?;
        Self::expect_success(response).await.map(|_| ())
    }

    /// The store `_id` of a billing, resolved by billing ID when missing.
    async fn billing_object_id(&self, record: &BillingRecord) -> Result<String, StoreError> {
        if let Some(id) = &record.id {
            return Ok(id.clone());
        }
        self.get_billing(&record.billing_id)
            .await?
            .and_then(|b| b.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "billing",
                key: record.billing_id.clone(),
            })
    }
}

fn summary_path(source: SummarySource) -> &'static str {
    match source {
        SummarySource::EntityAbbreviation => "entity-abbreviation-summary",
        SummarySource::WaybillSummary => "waybillSummary",
    }
}

#[async_trait]
impl BillingStore for HttpStore {
    async fn list_billings(&self) -> Result<Vec<BillingRecord>, StoreError> {
        self.get_json(&["billing"]).await
    }

    async fn get_billing(&self, billing_id: &str) -> Result<Option<BillingRecord>, StoreError> {
        self.get_optional(&["billing", "billingID", billing_id])
            .await
    }

    async fn create_billing(&self, record: &BillingRecord) -> Result<BillingRecord, StoreError> {
        self.send_json(Method::POST, &["billing"], record)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update_billing(&self, record: &BillingRecord) -> Result<(), StoreError> {
        let id = self.billing_object_id(record).await?;
        self.send_json(Method::PUT, &["billing", id.as_str()], record)
            .await
            .map(|_| ())
    }

    async fn delete_billing(&self, billing_id: &str) -> Result<(), StoreError> {
        let record = self
            .get_billing(billing_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "billing",
                key: billing_id.to_string(),
            })?;
        let id = self.billing_object_id(&record).await?;
        self.delete(&["billing", id.as_str()]).await
    }

    async fn list_details(&self) -> Result<Vec<BillingDetail>, StoreError> {
        self.get_json(&["billingDetail"]).await
    }

    async fn details_for(&self, billing_id: &str) -> Result<Vec<BillingDetail>, StoreError> {
        match self
            .get_optional(&["billingDetail", "billingID", billing_id])
            .await?
        {
            Some(details) => Ok(details),
            None => Ok(Vec::new()),
        }
    }

    async fn create_detail(&self, detail: &BillingDetail) -> Result<BillingDetail, StoreError> {
        self.send_json(Method::POST, &["billingDetail"], detail)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update_detail_status(
        &self,
        detail_id: &str,
        status: BillingStatus,
    ) -> Result<(), StoreError> {
        self.send_json(
            Method::PUT,
            &["billingDetail", detail_id],
            &StatusBody { status },
        )
        .await
        .map(|_| ())
    }

    async fn delete_detail(&self, detail_id: &str) -> Result<(), StoreError> {
        self.delete(&["billingDetail", detail_id]).await
    }

    async fn list_waybills(&self) -> Result<Vec<Waybill>, StoreError> {
        self.get_json(&["waybills"]).await
    }

    async fn update_waybill_status(
        &self,
        waybill_number: &str,
        status: WaybillStatus,
    ) -> Result<(), StoreError> {
        self.send_json(
            Method::PUT,
            &["waybills", waybill_number],
            &StatusBody { status },
        )
        .await
        .map(|_| ())
    }

    async fn list_summaries(
        &self,
        source: SummarySource,
    ) -> Result<Vec<WaybillSummary>, StoreError> {
        self.get_json(&[summary_path(source)]).await
    }

    async fn update_summary_status(
        &self,
        waybill_number: &str,
        status: SummaryStatus,
    ) -> Result<(), StoreError> {
        self.send_json(
            Method::PUT,
            &["waybillSummary", "updateStatus", waybill_number],
            &StatusBody { status },
        )
        .await
        .map(|_| ())
    }

    async fn list_drafts(&self) -> Result<Vec<DraftRecord>, StoreError> {
        self.get_json(&["draft-billings"]).await
    }

    async fn get_draft(&self, id: &str) -> Result<Option<DraftRecord>, StoreError> {
        self.get_optional(&["draft-billings", id]).await
    }

    async fn create_draft(&self, draft: &DraftRecord) -> Result<DraftRecord, StoreError> {
        self.send_json(Method::POST, &["draft-billings"], draft)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError> {
        self.delete(&["draft-billings", id]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(token: Option<&str>, auth_on_reads: bool) -> HttpStore {
        HttpStore::new(ApiSettings {
            base_url: "http://localhost:5000/api/".into(),
            token: token.map(str::to_string),
            timeout_secs: 5,
            auth_on_reads,
        })
        .unwrap()
    }

    fn auth_header(builder: RequestBuilder) -> Option<String> {
        let request = builder.build().unwrap();
        request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn trailing_slash_trimmed() {
        let s = store(None, false);
        assert_eq!(s.url(&["billing"]).as_str(), "http://localhost:5000/api/billing");
    }

    #[test]
    fn bare_host_base() {
        let s = HttpStore::new(ApiSettings {
            base_url: "http://localhost:5000".into(),
            token: None,
            timeout_secs: 5,
            auth_on_reads: false,
        })
        .unwrap();
        assert_eq!(s.url(&["waybills"]).as_str(), "http://localhost:5000/waybills");
    }

    #[test]
    fn path_segments_percent_encoded() {
        let s = store(None, false);
        assert_eq!(
            s.url(&["waybillSummary", "updateStatus", "100-6/A #2"]).as_str(),
            "http://localhost:5000/api/waybillSummary/updateStatus/100-6%2FA%20%232"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpStore::new(ApiSettings {
            base_url: "not a url".into(),
            token: None,
            timeout_secs: 5,
            auth_on_reads: false,
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::Config(_)), "{err}");
    }

    #[test]
    fn token_only_on_mutations_by_default() {
        let s = store(Some("t0k"), false);
        assert_eq!(auth_header(s.request(Method::GET, &["billing"])), None);
        assert_eq!(
            auth_header(s.request(Method::PUT, &["billing", "1"])).as_deref(),
            Some("Bearer t0k")
        );
    }

    #[test]
    fn token_on_reads_when_enabled() {
        let s = store(Some("t0k"), true);
        assert_eq!(
            auth_header(s.request(Method::GET, &["billing"])).as_deref(),
            Some("Bearer t0k")
        );
    }

    #[test]
    fn summary_paths() {
        assert_eq!(summary_path(SummarySource::EntityAbbreviation), "entity-abbreviation-summary");
        assert_eq!(summary_path(SummarySource::WaybillSummary), "waybillSummary");
    }

    #[test]
    fn status_body_uses_backend_spelling() {
        let body = serde_json::to_string(&StatusBody {
            status: SummaryStatus::NotBilled,
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"NOT BILLED"}"#);
    }
}
