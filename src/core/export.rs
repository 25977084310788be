use crate::domain::model::CalendarEvent;
use crate::utils::error::{AppError, Result};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(AppError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Valid formats: table, json, csv".to_string(),
            }),
        }
    }
}

#[derive(Serialize)]
struct EventRow<'a> {
    date: String,
    kind: &'a str,
    title: &'a str,
    due_date: String,
    contract_id: &'a str,
    schedule_id: &'a str,
    id: &'a str,
}

impl<'a> From<&'a CalendarEvent> for EventRow<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        Self {
            date: event.date().to_string(),
            kind: event.kind.as_str(),
            title: &event.title,
            due_date: event.due_date.to_string(),
            contract_id: &event.contract_id,
            schedule_id: &event.schedule_id,
            id: &event.id,
        }
    }
}

/// 依日期排序，同一天保持原本順序
pub fn sorted_by_date(events: &[CalendarEvent]) -> Vec<&CalendarEvent> {
    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);
    sorted
}

pub fn render(events: &[CalendarEvent], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(events)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(events)?),
        OutputFormat::Csv => render_csv(events),
    }
}

pub fn render_table(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return "No upcoming events".to_string();
    }

    let mut lines = vec![format!("{:<10}  {:<18}  {}", "DATE", "KIND", "TITLE")];
    for event in sorted_by_date(events) {
        lines.push(format!(
            "{:<10}  {:<18}  {}",
            event.date(),
            event.kind.as_str(),
            event.title
        ));
    }
    lines.join("\n")
}

pub fn render_csv(events: &[CalendarEvent]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for event in sorted_by_date(events) {
        writer.serialize(EventRow::from(event))?;
    }
    let bytes = writer.into_inner().map_err(|e| AppError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AppError::ValidationError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}
