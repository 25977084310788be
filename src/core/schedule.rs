//! 週期排程展開：把 [`Schedule`] 轉成行事曆事件（開票日、到期日、提醒）。
//!
//! 只輸出不早於「今天」的事件，並以最大期數限制輸出量。

use crate::domain::model::{CalendarEvent, EventKind, Frequency, Schedule, ScheduleSource};
use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// 每個排程最多展開的期數
pub const DEFAULT_MAX_OCCURRENCES: usize = 24;
/// 開票事件比到期日提前的天數
pub const DEFAULT_INVOICE_LEAD_DAYS: u32 = 5;
/// 沒有結束日時，從今天往後展開的天數
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderSettings {
    pub max_occurrences: usize,
    pub invoice_lead_days: u32,
    pub default_horizon_days: u32,
}

impl Default for ExpanderSettings {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            invoice_lead_days: DEFAULT_INVOICE_LEAD_DAYS,
            default_horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

/// 第 `n` 期的到期日。一律由起始日推算，月底日期不會逐期漂移。
pub fn occurrence_date(start: NaiveDate, frequency: Frequency, n: u32) -> Option<NaiveDate> {
    let months = frequency.months().checked_mul(n)?;
    start.checked_add_months(Months::new(months))
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleExpander {
    settings: ExpanderSettings,
}

impl ScheduleExpander {
    pub fn new(settings: ExpanderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExpanderSettings {
        &self.settings
    }

    /// 以目前時間展開
    pub fn expand_now(&self, schedules: &[Schedule]) -> Vec<CalendarEvent> {
        self.expand(schedules, Utc::now())
    }

    /// 依輸入順序展開所有排程；相同 `now` 下結果固定
    pub fn expand(&self, schedules: &[Schedule], now: DateTime<Utc>) -> Vec<CalendarEvent> {
        let today = now.date_naive();
        let mut events = Vec::new();

        for schedule in schedules {
            let before = events.len();
            self.expand_schedule(schedule, today, &mut events);
            tracing::debug!(
                "📅 Schedule {} produced {} events",
                schedule.id,
                events.len() - before
            );
        }

        events
    }

    fn expand_schedule(&self, schedule: &Schedule, today: NaiveDate, out: &mut Vec<CalendarEvent>) {
        let end = schedule.end_date.unwrap_or_else(|| {
            today
                .checked_add_days(Days::new(self.settings.default_horizon_days as u64))
                .unwrap_or(NaiveDate::MAX)
        });

        for n in 0..self.settings.max_occurrences {
            let Some(due) = u32::try_from(n)
                .ok()
                .and_then(|n| occurrence_date(schedule.start_date, schedule.frequency, n))
            else {
                tracing::warn!("Schedule {} ran past the supported date range", schedule.id);
                break;
            };
            if due > end {
                break;
            }

            let lead = Days::new(self.settings.invoice_lead_days as u64);
            if let Some(date) = due.checked_sub_days(lead) {
                let event = build_event(schedule, EventKind::InvoiceGeneration, date, due, None);
                push_if_current(out, today, event);
            }

            let event = build_event(schedule, EventKind::DueDate, due, due, None);
            push_if_current(out, today, event);

            for &days in &schedule.reminder_days_before_due {
                if let Some(date) = due.checked_sub_days(Days::new(days as u64)) {
                    push_if_current(
                        out,
                        today,
                        build_event(schedule, EventKind::Reminder, date, due, Some(days)),
                    );
                }
            }
        }
    }
}

fn push_if_current(out: &mut Vec<CalendarEvent>, today: NaiveDate, event: CalendarEvent) {
    if event.date() >= today {
        out.push(event);
    }
}

fn build_event(
    schedule: &Schedule,
    kind: EventKind,
    date: NaiveDate,
    due: NaiveDate,
    reminder_days: Option<u32>,
) -> CalendarEvent {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1);
    let label = schedule.label();

    let (id, title) = match (kind, reminder_days) {
        (EventKind::Reminder, Some(days)) => (
            format!("{}-reminder-{}-{}", schedule.id, days, due),
            format!("Reminder ({} days): {}", days, label),
        ),
        (EventKind::InvoiceGeneration, _) => (
            format!("{}-generate-{}", schedule.id, due),
            format!("Generate invoice: {}", label),
        ),
        _ => (
            format!("{}-due-{}", schedule.id, due),
            format!("Invoice due: {}", label),
        ),
    };

    let title = match schedule.source {
        ScheduleSource::Extracted => format!("{} (extracted)", title),
        ScheduleSource::Configured => title,
    };

    CalendarEvent {
        id,
        title,
        start,
        end,
        all_day: true,
        kind,
        due_date: due,
        reminder_days,
        schedule_id: schedule.id.clone(),
        contract_id: schedule.contract_id.clone(),
        source: schedule.source,
    }
}
