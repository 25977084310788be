use crate::domain::model::{ExtractedScheduleRecord, Frequency, Schedule, ScheduleSource};
use crate::utils::error::{AppError, Result};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// 解析擷取結果中的日期：接受 `YYYY-MM-DD` 或 RFC 3339 時間戳
pub fn parse_schedule_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

impl ExtractedScheduleRecord {
    /// 轉成可展開的排程；`index` 用於沒有 id 的記錄
    pub fn to_schedule(&self, index: usize) -> Result<Schedule> {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| format!("extracted-{}", index + 1));
        let invalid = |reason: String| AppError::InvalidScheduleError {
            record: id.clone(),
            reason,
        };

        let contract_id = self
            .contract_id
            .clone()
            .or_else(|| self.agreement_id.clone())
            .ok_or_else(|| invalid("missing contract reference".to_string()))?;

        let raw_start = self
            .start_date
            .as_deref()
            .ok_or_else(|| invalid("missing start date".to_string()))?;
        let start_date = parse_schedule_date(raw_start)
            .ok_or_else(|| invalid(format!("malformed start date '{}'", raw_start)))?;

        let end_date = match self.end_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_schedule_date(raw)
                    .ok_or_else(|| invalid(format!("malformed end date '{}'", raw)))?,
            ),
        };
        if let Some(end) = end_date {
            if end < start_date {
                return Err(invalid(format!(
                    "end date {} precedes start date {}",
                    end, start_date
                )));
            }
        }

        let frequency = self
            .frequency
            .as_deref()
            .ok_or_else(|| invalid("missing frequency".to_string()))?
            .parse::<Frequency>()
            .map_err(invalid)?;

        let reminder_days_before_due = self
            .reminder_days
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|&days| {
                u32::try_from(days).map_err(|_| invalid(format!("invalid reminder offset {}", days)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Schedule {
            id: id.clone(),
            contract_id,
            agreement_id: self.agreement_id.clone(),
            title: self.title.clone(),
            start_date,
            end_date,
            frequency,
            reminder_days_before_due,
            source: ScheduleSource::Extracted,
        })
    }
}

/// 逐筆解析原始 JSON；型別不符的記錄記 warning 後略過
pub fn records_from_values(values: Vec<Value>) -> Vec<ExtractedScheduleRecord> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("⚠️ Skipping extracted record #{}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

/// 先放既有排程，再接上可轉換的擷取排程；壞掉的記錄記 warning 後略過
pub fn merge_schedules(primary: Vec<Schedule>, extracted: &[ExtractedScheduleRecord]) -> Vec<Schedule> {
    let mut merged = primary;
    let mut skipped = 0;

    for (index, record) in extracted.iter().enumerate() {
        match record.to_schedule(index) {
            Ok(schedule) => merged.push(schedule),
            Err(e) => {
                skipped += 1;
                tracing::warn!("⚠️ Skipping extracted schedule: {}", e);
            }
        }
    }

    if skipped > 0 {
        tracing::info!(
            "Merged {} extracted schedules ({} skipped)",
            extracted.len() - skipped,
            skipped
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ExtractedScheduleRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_schedule_date_formats() {
        assert_eq!(
            parse_schedule_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_schedule_date("2024-03-01T10:00:00+02:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_schedule_date("03/01/2024"), None);
        assert_eq!(parse_schedule_date("2024-02-30"), None);
    }

    #[test]
    fn test_camel_case_record_converts() {
        let schedule = record(json!({
            "id": "ex-7",
            "contractId": "c-9",
            "startDate": "2025-01-15",
            "frequency": "Quarterly",
            "reminderDaysBeforeDue": [10, 2]
        }))
        .to_schedule(0)
        .unwrap();

        assert_eq!(schedule.contract_id, "c-9");
        assert_eq!(schedule.frequency, Frequency::Quarterly);
        assert_eq!(schedule.reminder_days_before_due, vec![10, 2]);
        assert_eq!(schedule.source, ScheduleSource::Extracted);
        assert!(schedule.end_date.is_none());
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let negative = record(json!({
            "contract_id": "c-1",
            "start_date": "2025-01-01",
            "frequency": "monthly",
            "reminder_days": [-3]
        }));
        assert!(negative.to_schedule(0).is_err());

        let reversed = record(json!({
            "contract_id": "c-1",
            "start_date": "2025-06-01",
            "end_date": "2025-01-01",
            "frequency": "monthly"
        }));
        assert!(reversed.to_schedule(0).is_err());

        let no_contract = record(json!({
            "start_date": "2025-06-01",
            "frequency": "monthly"
        }));
        let err = no_contract.to_schedule(4).unwrap_err();
        assert!(err.to_string().contains("extracted-5"));
    }

    #[test]
    fn test_records_from_values_skips_mistyped() {
        let records = records_from_values(vec![
            json!({"id": "a", "reminder_days": "weekly"}),
            json!({"id": "b", "start_date": "2025-01-01"}),
            json!("not an object"),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("b"));
    }

    #[test]
    fn test_merge_keeps_primary_order_and_skips_bad() {
        let primary = vec![record(json!({
            "id": "p-1",
            "contract_id": "c-1",
            "start_date": "2025-01-01",
            "frequency": "monthly"
        }))
        .to_schedule(0)
        .unwrap()];

        let extracted = vec![
            record(json!({"id": "bad", "contract_id": "c-2", "start_date": "soon", "frequency": "monthly"})),
            record(json!({"id": "good", "contract_id": "c-3", "start_date": "2025-02-01", "frequency": "annually"})),
        ];

        let merged = merge_schedules(primary, &extracted);
        let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "good"]);
    }
}
