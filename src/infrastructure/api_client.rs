use crate::application::use_cases::gateway::{Envelope, PostRequest};
use crate::application::use_cases::phone_country::PhoneCountry;
use crate::domain::catalog::{Company, WorkerRecord};
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::SheetRow;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

const GATEWAY_PATH: &str = "api/gateway";

/// Typed client for a remote intake gateway. Every call sends the agent's
/// e-mail in the identity header and unwraps the `{status, data}` envelope.
pub struct IntakeApiClient {
    client: reqwest::Client,
    gateway: Url,
    identity_header: String,
    email: String,
}

impl IntakeApiClient {
    pub fn new(base_url: &str, identity_header: &str, email: &str) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| AppError::ValidationError(format!("Invalid API URL '{}': {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let gateway = base
            .join(GATEWAY_PATH)
            .map_err(|e| AppError::ValidationError(format!("Invalid API URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            gateway,
            identity_header: identity_header.to_string(),
            email: email.to_string(),
        })
    }

    pub fn gateway_url(&self, entity: &str, action: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.gateway.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("entity", entity);
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        entity: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.gateway_url(entity, action, params))
            .header(self.identity_header.as_str(), &self.email)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Gateway request failed: {}", e)))?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        entity: &str,
        action: &str,
        data: Value,
        id: Option<&str>,
    ) -> Result<T> {
        let body = PostRequest {
            entity: entity.to_string(),
            action: action.to_string(),
            data,
            id: id.map(str::to_string),
        };
        let response = self
            .client
            .post(self.gateway.clone())
            .header(self.identity_header.as_str(), &self.email)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Gateway request failed: {}", e)))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let envelope: Envelope = response.json().await.map_err(|e| {
            AppError::ParseError(format!("Unexpected gateway response ({}): {}", status, e))
        })?;

        match envelope {
            Envelope::Success { data } => serde_json::from_value(data)
                .map_err(|e| AppError::ParseError(format!("Unexpected gateway data: {}", e))),
            Envelope::Error { message, .. } => Err(error_for(status, message)),
        }
    }

    pub async fn active_services(&self) -> Result<Vec<SheetRow>> {
        self.get("SERVICIOS", "listActive", &[]).await
    }

    pub async fn companies(&self) -> Result<Vec<Company>> {
        self.get("EMPRESAS", "list", &[]).await
    }

    pub async fn register_company(&self, data: Value) -> Result<Company> {
        self.post("EMPRESAS", "create", data, None).await
    }

    pub async fn find_user_by_key(&self, key: &str) -> Result<Option<WorkerRecord>> {
        self.get("USUARIOS", "findByKey", &[("key", key)]).await
    }

    pub async fn country_from_phone(&self, phone: &str) -> Result<PhoneCountry> {
        self.get("PAIS_TELEFONO", "resolve", &[("phone", phone)]).await
    }
}

fn error_for(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::BAD_REQUEST => AppError::ValidationError(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Internal(message),
    }
}
