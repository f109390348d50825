use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Opening hours for one weekday, in the schedule's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub enabled: bool,
    pub closed_all_day: bool,
    #[serde(default)]
    pub open_all_day: bool,
    pub open_hour: u32,
    pub open_minutes: u32,
    pub close_hour: u32,
    pub close_minutes: u32,
}

impl WorkingHours {
    pub fn open(day_of_week: u8, open: (u32, u32), close: (u32, u32)) -> Self {
        Self {
            day_of_week,
            enabled: true,
            closed_all_day: false,
            open_all_day: false,
            open_hour: open.0,
            open_minutes: open.1,
            close_hour: close.0,
            close_minutes: close.1,
        }
    }

    pub fn closed(day_of_week: u8) -> Self {
        Self {
            closed_all_day: true,
            ..Self::open(day_of_week, (0, 0), (0, 0))
        }
    }

    /// Open interval as minutes of the local day, `None` when closed.
    pub fn open_interval(&self) -> Option<(u32, u32)> {
        if !self.enabled || self.closed_all_day {
            return None;
        }
        if self.open_all_day {
            return Some((0, MINUTES_PER_DAY));
        }

        let open = minute_of_day(self.open_hour, self.open_minutes);
        let close = minute_of_day(self.close_hour, self.close_minutes);
        (close > open).then_some((open, close))
    }
}

/// Clamped to the end of the day; out-of-range input never overflows.
fn minute_of_day(hour: u32, minutes: u32) -> u32 {
    hour.saturating_mul(60)
        .saturating_add(minutes)
        .min(MINUTES_PER_DAY)
}

/// Weekly schedule of an inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHoursSchedule {
    pub business_hours_enabled: bool,
    pub timezone: Tz,
    pub days: Vec<WorkingHours>,
}

impl WorkingHoursSchedule {
    /// Monday to Friday 09:00-17:00, weekends closed.
    pub fn standard(timezone: Tz) -> Self {
        let days = (0..7u8)
            .map(|day| match day {
                0 | 6 => WorkingHours::closed(day),
                _ => WorkingHours::open(day, (9, 0), (17, 0)),
            })
            .collect();

        Self {
            business_hours_enabled: false,
            timezone,
            days,
        }
    }

    pub fn enabled(mut self) -> Self {
        self.business_hours_enabled = true;
        self
    }

    pub fn with_day(mut self, hours: WorkingHours) -> Self {
        self.days.retain(|d| d.day_of_week != hours.day_of_week);
        self.days.push(hours);
        self
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&WorkingHours> {
        let day = weekday.num_days_from_sunday() as u8;
        self.days.iter().find(|d| d.day_of_week == day)
    }
}

impl Default for WorkingHoursSchedule {
    fn default() -> Self {
        Self::standard(Tz::UTC)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbox {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub greeting_enabled: bool,
    pub greeting_message: Option<String>,
    pub enable_email_collect: bool,
    pub out_of_office_message: Option<String>,
    /// An agent bot is connected and currently handling new conversations.
    pub active_bot: bool,
    pub working_hours: WorkingHoursSchedule,
}

impl Inbox {
    pub fn new(id: &str, account_id: &str, timezone: Tz) -> Self {
        Self {
            id: id.to_string(),
            account_id: account_id.to_string(),
            name: id.to_string(),
            greeting_enabled: false,
            greeting_message: None,
            enable_email_collect: false,
            out_of_office_message: None,
            active_bot: false,
            working_hours: WorkingHoursSchedule::standard(timezone),
        }
    }

    pub fn working_hours_enabled(&self) -> bool {
        self.working_hours.business_hours_enabled
    }

    pub fn has_greeting(&self) -> bool {
        self.greeting_enabled
            && self
                .greeting_message
                .as_deref()
                .is_some_and(|m| !m.trim().is_empty())
    }

    /// Business hours are on and `at` falls outside them.
    pub fn is_out_of_office(&self, at: DateTime<Utc>) -> bool {
        self.working_hours_enabled()
            && !crate::domain::services::business_hours::is_open_at(at, &self.working_hours)
    }
}
