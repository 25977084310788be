use crate::core::extracted::records_from_values;
use crate::domain::model::{
    Contract, ContractSource, ExtractedScheduleRecord, GenerateInvoiceRequest, Invoice, Schedule,
    Session,
};
use crate::domain::ports::{BackendApi, ConfigProvider};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// 401 回應中代表需要重新登入的錯誤碼
const SESSION_ERROR_CODES: &[&str] = &[
    "token_expired",
    "token_invalid",
    "invalid_token",
    "session_expired",
    "not_authenticated",
];

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: String,
    user: Option<LoginUser>,
}

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_id: Option<&'a str>,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|e| AppError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    pub fn with_session(mut self, session: Option<&Session>) -> Self {
        self.token = session.map(|s| s.access_token.clone());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(AppError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        tracing::debug!("📡 {} -> {}", response.url(), response.status());
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn fetch_contracts(
        &self,
        request: RequestBuilder,
        default_source: ContractSource,
    ) -> Result<Vec<Contract>> {
        let body: Value = self.send_json(request).await?;
        let values: Vec<Value> = unwrap_list(body, "contracts")?;
        Ok(contracts_from_values(values, default_source))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Could not read error body for status {}: {}", status, e);
            String::new()
        }
    };
    if status == StatusCode::UNAUTHORIZED {
        if let Some(code) = session_error_code(&body) {
            tracing::warn!("🔒 Session rejected by backend ({})", code);
            return Err(AppError::SessionExpired { code });
        }
    }

    tracing::debug!("API request failed with status {}: {}", status, body);
    Err(AppError::HttpError {
        status: status.as_u16(),
        body,
    })
}

/// 從 401 回應內容找出工作階段錯誤碼
fn session_error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.get("error_code"),
        value.get("code"),
        value.get("detail").and_then(|d| d.get("code")),
        value.get("detail"),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_ascii_lowercase)
        .find(|code| SESSION_ERROR_CODES.contains(&code.as_str()));
    found
}

/// 後端有時回傳陣列，有時包在物件裡（`{"contracts": [...]}`、`{"data": [...]}`）
fn unwrap_list<T: DeserializeOwned>(body: Value, key: &str) -> Result<Vec<T>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let found = [key, "data", "items", "results"]
                .iter()
                .find_map(|k| match map.remove(*k) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                });
            found.ok_or_else(|| AppError::ValidationError {
                message: format!("response has no '{}' list", key),
            })?
        }
        other => {
            return Err(AppError::ValidationError {
                message: format!("expected a list of {}, got {}", key, other),
            })
        }
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(AppError::from))
        .collect()
}

/// 取出單筆資源，允許外層包一個 `key`
fn unwrap_item(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.get(key).is_some_and(Value::is_object) => {
            map.remove(key).unwrap_or_default()
        }
        other => other,
    }
}

/// 沒有 `source` 的合約補上預設來源再解析
fn contract_from_value(mut value: Value, default_source: ContractSource) -> Result<Contract> {
    if let Value::Object(map) = &mut value {
        map.entry("source")
            .or_insert_with(|| Value::String(default_source.as_str().to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// 逐筆解析合約；格式錯誤的記 warning 後略過
fn contracts_from_values(values: Vec<Value>, default_source: ContractSource) -> Vec<Contract> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match contract_from_value(value, default_source) {
            Ok(contract) => Some(contract),
            Err(e) => {
                tracing::warn!("⚠️ Skipping contract #{}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .client
            .post(self.endpoint("auth/login"))
            .json(&LoginRequest { email, password });
        let response: LoginResponse = self.send_json(request).await?;

        Ok(Session {
            access_token: response.access_token,
            email: response
                .user
                .and_then(|u| u.email)
                .unwrap_or_else(|| email.to_string()),
            issued_at: chrono::Utc::now(),
        })
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let request = self.authorized(self.client.get(self.endpoint("contracts")))?;
        self.fetch_contracts(request, ContractSource::Manual).await
    }

    async fn upload_contract(&self, path: &Path) -> Result<Contract> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("contract")
            .to_string();
        tracing::debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))?;
        let form = Form::new().part("file", part);

        let request = self.authorized(
            self.client
                .post(self.endpoint("contracts/upload"))
                .multipart(form),
        )?;
        let body: Value = self.send_json(request).await?;
        contract_from_value(unwrap_item(body, "contract"), ContractSource::Manual)
    }

    async fn sync_mcp_contracts(&self, folder_id: Option<&str>) -> Result<Vec<Contract>> {
        let request = self.authorized(
            self.client
                .post(self.endpoint("mcp/sync"))
                .json(&SyncRequest { folder_id }),
        )?;
        self.fetch_contracts(request, ContractSource::Mcp).await
    }

    async fn list_invoices(&self, contract_id: Option<&str>) -> Result<Vec<Invoice>> {
        let mut request = self.client.get(self.endpoint("invoices"));
        if let Some(id) = contract_id {
            request = request.query(&[("contract_id", id)]);
        }
        let body: Value = self.send_json(self.authorized(request)?).await?;
        unwrap_list(body, "invoices")
    }

    async fn generate_invoice(&self, request: &GenerateInvoiceRequest) -> Result<Invoice> {
        let http = self.authorized(
            self.client
                .post(self.endpoint("invoices/generate"))
                .json(request),
        )?;
        let body: Value = self.send_json(http).await?;
        Ok(serde_json::from_value(unwrap_item(body, "invoice"))?)
    }

    async fn download_invoice_pdf(&self, invoice_id: &str) -> Result<Vec<u8>> {
        let request = self.authorized(
            self.client
                .get(self.endpoint(&format!("invoices/{}/pdf", invoice_id)))
                .header(reqwest::header::ACCEPT, "application/pdf"),
        )?;
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let request = self.authorized(self.client.get(self.endpoint("schedules")))?;
        let body: Value = self.send_json(request).await?;
        unwrap_list(body, "schedules")
    }

    async fn extract_schedules(
        &self,
        contract_id: Option<&str>,
    ) -> Result<Vec<ExtractedScheduleRecord>> {
        let request = self.authorized(
            self.client
                .post(self.endpoint("schedules/extract"))
                .json(&ExtractRequest { contract_id }),
        )?;
        let body: Value = self.send_json(request).await?;
        Ok(records_from_values(unwrap_list(body, "schedules")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_error_code_variants() {
        assert_eq!(
            session_error_code(r#"{"error_code": "TOKEN_EXPIRED"}"#),
            Some("token_expired".to_string())
        );
        assert_eq!(
            session_error_code(r#"{"detail": {"code": "invalid_token"}}"#),
            Some("invalid_token".to_string())
        );
        assert_eq!(session_error_code(r#"{"code": "bad_password"}"#), None);
        assert_eq!(session_error_code("Unauthorized"), None);
    }

    #[test]
    fn test_unwrap_list_shapes() {
        let bare: Vec<u32> = unwrap_list(json!([1, 2]), "ids").unwrap();
        assert_eq!(bare, vec![1, 2]);

        let wrapped: Vec<u32> = unwrap_list(json!({"ids": [3], "total": 1}), "ids").unwrap();
        assert_eq!(wrapped, vec![3]);

        let data: Vec<u32> = unwrap_list(json!({"data": [4]}), "ids").unwrap();
        assert_eq!(data, vec![4]);

        assert!(unwrap_list::<u32>(json!({"total": 0}), "ids").is_err());
    }

    #[test]
    fn test_contract_without_source_gets_default() {
        let contract = contract_from_value(
            json!({"id": "c-3", "name": "Office", "drive_file_id": "x"}),
            ContractSource::Mcp,
        )
        .unwrap();
        assert_eq!(contract.source(), ContractSource::Mcp);
    }

    #[test]
    fn test_bad_contract_entries_are_skipped() {
        let contracts = contracts_from_values(
            vec![
                json!({"id": "c-1", "name": "ok"}),
                json!({"id": "c-2"}),
                json!({"id": "c-3", "name": "also ok", "source": "mcp", "drive_file_id": "d"}),
            ],
            ContractSource::Manual,
        );
        let ids: Vec<&str> = contracts.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["c-1", "c-3"]);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint("/contracts"), "http://localhost:8000/api/contracts");
        assert!(ApiClient::new("not-a-url", Duration::from_secs(5)).is_err());
    }
}
