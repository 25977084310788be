use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 合約來源：手動上傳或由 MCP (雲端硬碟) 同步
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSource {
    Manual,
    Mcp,
}

impl ContractSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractSource::Manual => "manual",
            ContractSource::Mcp => "mcp",
        }
    }
}

impl fmt::Display for ContractSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(ContractSource::Manual),
            "mcp" | "drive" => Ok(ContractSource::Mcp),
            other => Err(format!("unknown contract source: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualContract {
    pub id: String,
    pub name: String,
    pub tenant: Option<String>,
    pub property: Option<String>,
    pub rent_amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub file_url: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveContract {
    pub id: String,
    pub name: String,
    pub tenant: Option<String>,
    pub property: Option<String>,
    pub rent_amount: Option<f64>,
    pub currency: Option<String>,
    pub drive_file_id: String,
    pub web_view_link: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// 兩種來源的合約形狀不同，以 `source` 欄位區分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Contract {
    Manual(ManualContract),
    Mcp(DriveContract),
}

impl Contract {
    pub fn id(&self) -> &str {
        match self {
            Contract::Manual(c) => &c.id,
            Contract::Mcp(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Contract::Manual(c) => &c.name,
            Contract::Mcp(c) => &c.name,
        }
    }

    pub fn tenant(&self) -> Option<&str> {
        match self {
            Contract::Manual(c) => c.tenant.as_deref(),
            Contract::Mcp(c) => c.tenant.as_deref(),
        }
    }

    pub fn rent_amount(&self) -> Option<f64> {
        match self {
            Contract::Manual(c) => c.rent_amount,
            Contract::Mcp(c) => c.rent_amount,
        }
    }

    pub fn source(&self) -> ContractSource {
        match self {
            Contract::Manual(_) => ContractSource::Manual,
            Contract::Mcp(_) => ContractSource::Mcp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Overdue,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub contract_id: String,
    pub invoice_number: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub pdf_url: Option<String>,
}

impl Invoice {
    /// 下載 PDF 時使用的檔名
    pub fn pdf_file_name(&self) -> String {
        let stem = self.invoice_number.as_deref().unwrap_or(&self.id);
        let safe: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("invoice-{}.pdf", safe)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateInvoiceRequest {
    pub contract_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl GenerateInvoiceRequest {
    pub fn for_contract(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            template: None,
            issue_date: None,
            due_date: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    /// 每期間隔月數
    pub fn months(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Annually => 12,
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "annually" | "annual" | "yearly" => Ok(Frequency::Annually),
            other => Err(format!("unsupported frequency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSource {
    #[default]
    Configured,
    Extracted,
}

/// 週期性開票排程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub contract_id: String,
    #[serde(default)]
    pub agreement_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub frequency: Frequency,
    #[serde(default)]
    pub reminder_days_before_due: Vec<u32>,
    #[serde(default)]
    pub source: ScheduleSource,
}

impl Schedule {
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.contract_id)
    }
}

/// AI 擷取出的排程，欄位都可能缺漏或格式錯誤
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedScheduleRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "contractId")]
    pub contract_id: Option<String>,
    #[serde(default, alias = "agreementId", alias = "invoice_id")]
    pub agreement_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default, alias = "reminderDaysBeforeDue", alias = "reminder_days_before_due")]
    pub reminder_days: Option<Vec<i64>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InvoiceGeneration,
    DueDate,
    Reminder,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InvoiceGeneration => "invoice_generation",
            EventKind::DueDate => "due_date",
            EventKind::Reminder => "reminder",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub kind: EventKind,
    /// 該事件所屬那一期的到期日
    pub due_date: NaiveDate,
    pub reminder_days: Option<u32>,
    pub schedule_id: String,
    pub contract_id: String,
    pub source: ScheduleSource,
}

impl CalendarEvent {
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub email: String,
    pub issued_at: DateTime<Utc>,
}
