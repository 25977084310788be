//! 客戶端狀態：合約與發票兩個 store，以及需要跨執行保存的部分。

use crate::domain::model::{Contract, ContractSource, GenerateInvoiceRequest, Invoice};
use crate::domain::ports::{BackendApi, Storage};
use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const STATE_FILE: &str = "state.json";

/// 記錄最後一次錯誤，供畫面顯示
fn settle<T>(last_error: &mut Option<String>, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => *last_error = None,
        Err(e) => *last_error = Some(e.user_friendly_message()),
    }
    result
}

#[derive(Debug, Clone, Default)]
pub struct ContractStore {
    pub contracts: Vec<Contract>,
    pub selected_id: Option<String>,
    /// 請求進行中為 true，不論成功或失敗結束後都會清除
    pub loading: bool,
    pub last_error: Option<String>,
}

impl ContractStore {
    pub async fn fetch<A: BackendApi + ?Sized>(&mut self, api: &A) -> Result<&[Contract]> {
        self.loading = true;
        let result = api.list_contracts().await;
        self.loading = false;
        let contracts = settle(&mut self.last_error, result)?;
        tracing::info!("📄 Loaded {} contracts", contracts.len());
        self.contracts = contracts;

        if self.selected_id.is_some() && self.selected().is_none() {
            tracing::debug!("Selected contract no longer exists, clearing selection");
            self.selected_id = None;
        }
        Ok(&self.contracts)
    }

    pub async fn upload<A: BackendApi + ?Sized>(&mut self, api: &A, path: &Path) -> Result<Contract> {
        self.loading = true;
        let result = api.upload_contract(path).await;
        self.loading = false;
        let contract = settle(&mut self.last_error, result)?;
        tracing::info!("📤 Uploaded contract {} ({})", contract.name(), contract.id());
        self.upsert(contract.clone());
        self.selected_id = Some(contract.id().to_string());
        Ok(contract)
    }

    /// 從雲端硬碟同步；同 id 的合約以同步結果取代。回傳同步筆數。
    pub async fn sync_mcp<A: BackendApi + ?Sized>(
        &mut self,
        api: &A,
        folder_id: Option<&str>,
    ) -> Result<usize> {
        self.loading = true;
        let result = api.sync_mcp_contracts(folder_id).await;
        self.loading = false;
        let synced = settle(&mut self.last_error, result)?;
        let count = synced.len();
        for contract in synced {
            self.upsert(contract);
        }
        tracing::info!("🔄 Synced {} contracts from drive", count);
        Ok(count)
    }

    pub fn select(&mut self, id: &str) -> Result<&Contract> {
        let contract = self
            .contracts
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| AppError::ValidationError {
                message: format!("unknown contract id: {}", id),
            })?;
        self.selected_id = Some(id.to_string());
        Ok(contract)
    }

    pub fn selected(&self) -> Option<&Contract> {
        let id = self.selected_id.as_deref()?;
        self.contracts.iter().find(|c| c.id() == id)
    }

    pub fn by_source(&self, source: ContractSource) -> impl Iterator<Item = &Contract> {
        self.contracts.iter().filter(move |c| c.source() == source)
    }

    fn upsert(&mut self, contract: Contract) {
        match self.contracts.iter_mut().find(|c| c.id() == contract.id()) {
            Some(existing) => *existing = contract,
            None => self.contracts.push(contract),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceStore {
    pub invoices: Vec<Invoice>,
    pub selected_id: Option<String>,
    pub last_template: Option<String>,
    pub last_error: Option<String>,
}

impl InvoiceStore {
    pub async fn fetch<A: BackendApi + ?Sized>(
        &mut self,
        api: &A,
        contract_id: Option<&str>,
    ) -> Result<&[Invoice]> {
        let result = api.list_invoices(contract_id).await;
        self.invoices = settle(&mut self.last_error, result)?;
        tracing::info!("🧾 Loaded {} invoices", self.invoices.len());
        Ok(&self.invoices)
    }

    pub async fn generate<A: BackendApi + ?Sized>(
        &mut self,
        api: &A,
        request: &GenerateInvoiceRequest,
    ) -> Result<Invoice> {
        let result = api.generate_invoice(request).await;
        let invoice = settle(&mut self.last_error, result)?;
        tracing::info!(
            "🧾 Generated invoice {} for contract {}",
            invoice.id,
            invoice.contract_id
        );

        if request.template.is_some() {
            self.last_template = request.template.clone();
        }
        match self.invoices.iter_mut().find(|i| i.id == invoice.id) {
            Some(existing) => *existing = invoice.clone(),
            None => self.invoices.push(invoice.clone()),
        }
        self.selected_id = Some(invoice.id.clone());
        Ok(invoice)
    }

    /// 下載 PDF 並寫入 storage，回傳寫入的相對路徑
    pub async fn download_pdf<A: BackendApi + ?Sized, S: Storage>(
        &mut self,
        api: &A,
        storage: &S,
        invoice_id: &str,
    ) -> Result<String> {
        let result = api.download_invoice_pdf(invoice_id).await;
        let bytes = settle(&mut self.last_error, result)?;

        let file_name = self
            .invoices
            .iter()
            .find(|i| i.id == invoice_id)
            .map(Invoice::pdf_file_name)
            .unwrap_or_else(|| format!("invoice-{}.pdf", invoice_id));

        storage.write_file(&file_name, &bytes).await?;
        tracing::info!("💾 Saved {} ({} bytes)", file_name, bytes.len());
        Ok(file_name)
    }

    pub fn select(&mut self, id: &str) -> Result<&Invoice> {
        let invoice = self
            .invoices
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::ValidationError {
                message: format!("unknown invoice id: {}", id),
            })?;
        self.selected_id = Some(id.to_string());
        Ok(invoice)
    }
}

/// 兩個 store 中需要保存的欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub selected_contract_id: Option<String>,
    pub contracts: Vec<Contract>,
    pub selected_invoice_id: Option<String>,
    pub last_template: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub contracts: ContractStore,
    pub invoices: InvoiceStore,
}

impl AppState {
    pub fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            contracts: ContractStore {
                contracts: persisted.contracts,
                selected_id: persisted.selected_contract_id,
                loading: false,
                last_error: None,
            },
            invoices: InvoiceStore {
                selected_id: persisted.selected_invoice_id,
                last_template: persisted.last_template,
                ..InvoiceStore::default()
            },
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            selected_contract_id: self.contracts.selected_id.clone(),
            contracts: self.contracts.contracts.clone(),
            selected_invoice_id: self.invoices.selected_id.clone(),
            last_template: self.invoices.last_template.clone(),
        }
    }

    /// 啟動時載入；沒有檔案或內容損毀時使用預設狀態
    pub async fn restore<S: Storage>(storage: &S) -> Result<Self> {
        let bytes = match storage.read_file(STATE_FILE).await {
            Ok(bytes) => bytes,
            Err(AppError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No saved state, starting fresh");
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(persisted) => Ok(Self::from_persisted(persisted)),
            Err(e) => {
                tracing::warn!("⚠️ Saved state is unreadable, starting fresh: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// 結束前寫回
    pub async fn persist<S: Storage>(&self, storage: &S) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.to_persisted())?;
        storage.write_file(STATE_FILE, &data).await
    }
}
