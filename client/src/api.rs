//! HTTP access to the analysis service.

use crate::error::ClientError;
use async_trait::async_trait;
use common::model::analysis::AnalysisSnapshot;
use common::model::history::HistoryPage;
use common::model::rule_set::RuleSet;
use common::requests::{
    AnalyzeDocumentRequest, AnalyzeDocumentResponse, ExportFormat, HistoryQuery, MessageResponse,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Header carrying the caller's user id; see the backend's `caller` module.
const USER_HEADER: &str = "X-User-Id";

/// The job operations the poll loop and CLI depend on.
///
/// Implemented over HTTP by `HttpJobApi`; tests substitute scripted fakes.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(
        &self,
        request: &AnalyzeDocumentRequest,
    ) -> Result<AnalyzeDocumentResponse, ClientError>;

    async fn status(&self, session_id: &str) -> Result<AnalysisSnapshot, ClientError>;

    async fn stop(&self, session_id: &str) -> Result<MessageResponse, ClientError>;

    async fn export(&self, session_id: &str, format: ExportFormat)
        -> Result<Vec<u8>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpJobApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpJobApi {
    pub fn new(base_url: &str, token: Option<String>, user: Option<String>) -> Self {
        HttpJobApi {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            user,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match &self.user {
            Some(user) => builder.header(USER_HEADER, user),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.clone());
        Err(match status {
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::InvalidState(message),
            _ => ClientError::Unexpected {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(builder).await?.json().await?)
    }

    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage, ClientError> {
        let builder = self
            .http
            .get(self.url("/api/compliance/history"))
            .query(&[("limit", query.limit), ("offset", query.offset)]);
        self.json(builder).await
    }

    pub async fn rule_sets(&self) -> Result<Vec<RuleSet>, ClientError> {
        self.json(self.http.get(self.url("/api/rule-sets"))).await
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn submit(
        &self,
        request: &AnalyzeDocumentRequest,
    ) -> Result<AnalyzeDocumentResponse, ClientError> {
        let builder = self
            .http
            .post(self.url("/api/compliance/analyze"))
            .json(request);
        self.json(builder).await
    }

    async fn status(&self, session_id: &str) -> Result<AnalysisSnapshot, ClientError> {
        let builder = self
            .http
            .get(self.url(&format!("/api/compliance/results/{}", session_id)));
        self.json(builder).await
    }

    async fn stop(&self, session_id: &str) -> Result<MessageResponse, ClientError> {
        let builder = self
            .http
            .post(self.url(&format!("/api/compliance/analysis/{}/stop", session_id)));
        self.json(builder).await
    }

    async fn export(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ClientError> {
        let builder = self.http.get(self.url(&format!(
            "/api/compliance/results/{}/export/{}",
            session_id, format
        )));
        let bytes = self.send(builder).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
