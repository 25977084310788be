use crate::domain::model::{
    Contract, ExtractedScheduleRecord, GenerateInvoiceRequest, Invoice, Schedule, Session,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// 本地持久化（取代瀏覽器的 localStorage）
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn data_dir(&self) -> &str;
    fn download_dir(&self) -> &str;
}

/// 後端 REST API
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session>;
    async fn list_contracts(&self) -> Result<Vec<Contract>>;
    async fn upload_contract(&self, path: &Path) -> Result<Contract>;
    async fn sync_mcp_contracts(&self, folder_id: Option<&str>) -> Result<Vec<Contract>>;
    async fn list_invoices(&self, contract_id: Option<&str>) -> Result<Vec<Invoice>>;
    async fn generate_invoice(&self, request: &GenerateInvoiceRequest) -> Result<Invoice>;
    async fn download_invoice_pdf(&self, invoice_id: &str) -> Result<Vec<u8>>;
    async fn list_schedules(&self) -> Result<Vec<Schedule>>;
    async fn extract_schedules(
        &self,
        contract_id: Option<&str>,
    ) -> Result<Vec<ExtractedScheduleRecord>>;
}
