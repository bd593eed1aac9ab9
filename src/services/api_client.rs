use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;
use crate::models::{
    ConnectionSettings, DatabaseSize, GenerateSqlResponse, MessageHistogram, OrphanOrigin,
    StepResponse, FINAL_STEP,
};

pub const HISTOGRAM_WINDOWS: [u32; 3] = [24, 48, 168];

#[async_trait]
pub trait AcquisitionClient: Send + Sync {
    async fn fetch_step(&self, step: u8, session_id: Option<&str>) -> Result<StepResponse, ClientError>;

    async fn fetch_database_size(&self) -> Result<DatabaseSize, ClientError>;

    async fn generate_delete_sql(
        &self,
        entity_id: &str,
        origin: OrphanOrigin,
        in_states_meta: bool,
        in_statistics_meta: bool,
    ) -> Result<GenerateSqlResponse, ClientError>;

    async fn fetch_message_histogram(
        &self,
        entity_id: &str,
        hours: u32,
    ) -> Result<MessageHistogram, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct HttpAcquisitionClient {
    client: Client,
    base_url: String,
    endpoint: String,
    access_token: String,
}

impl HttpAcquisitionClient {
    pub fn new(settings: &ConnectionSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()?;

        log::info!(
            "[ApiClient] Creating acquisition client for {}/api/{}",
            settings.base_url,
            settings.endpoint
        );

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            endpoint: settings.endpoint.trim_matches('/').to_string(),
            access_token: settings.access_token.clone(),
        })
    }

    pub fn build_url(&self) -> String {
        format!("{}/api/{}", self.base_url, self.endpoint)
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut query: Vec<(&str, String)> = vec![("action", action.to_string())];
        query.extend(params.iter().cloned());

        let mut request = self.client.get(self.build_url()).query(&query);
        if !self.access_token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.access_token));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            log::debug!("[ApiClient] {} returned {}: {}", action, status, message);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AcquisitionClient for HttpAcquisitionClient {
    async fn fetch_step(&self, step: u8, session_id: Option<&str>) -> Result<StepResponse, ClientError> {
        if step > FINAL_STEP {
            return Err(ClientError::InvalidArgument(format!(
                "invalid step: {}. Must be between 0-{}.",
                step, FINAL_STEP
            )));
        }

        let mut params = vec![("step", step.to_string())];
        if let Some(id) = session_id {
            params.push(("session_id", id.to_string()));
        }
        self.get_action("entity_storage_overview_step", &params).await
    }

    async fn fetch_database_size(&self) -> Result<DatabaseSize, ClientError> {
        self.get_action("database_size", &[]).await
    }

    async fn generate_delete_sql(
        &self,
        entity_id: &str,
        origin: OrphanOrigin,
        in_states_meta: bool,
        in_statistics_meta: bool,
    ) -> Result<GenerateSqlResponse, ClientError> {
        let params = [
            ("entity_id", entity_id.to_string()),
            ("in_states_meta", in_states_meta.to_string()),
            ("in_statistics_meta", in_statistics_meta.to_string()),
            ("origin", origin.as_str().to_string()),
        ];
        self.get_action("generate_delete_sql", &params).await
    }

    async fn fetch_message_histogram(
        &self,
        entity_id: &str,
        hours: u32,
    ) -> Result<MessageHistogram, ClientError> {
        if !HISTOGRAM_WINDOWS.contains(&hours) {
            return Err(ClientError::InvalidArgument(format!(
                "invalid hours parameter: {}. Must be 24, 48, or 168.",
                hours
            )));
        }
        let params = [
            ("entity_id", entity_id.to_string()),
            ("hours", hours.to_string()),
        ];
        self.get_action("entity_message_histogram", &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpAcquisitionClient {
        let settings = ConnectionSettings {
            base_url: "http://ha.test:8123/".to_string(),
            ..ConnectionSettings::default()
        };
        HttpAcquisitionClient::new(&settings).unwrap()
    }

    #[test]
    fn test_build_url_strips_trailing_slash() {
        assert_eq!(client().build_url(), "http://ha.test:8123/api/statistics_orphan_finder");
    }

    #[tokio::test]
    async fn test_out_of_range_arguments_rejected_locally() {
        let client = client();
        let err = client.fetch_step(9, Some("abc")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));

        let err = client.fetch_message_histogram("sensor.a", 12).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }
}
