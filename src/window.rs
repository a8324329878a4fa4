use crate::error::{Result, UpliftError};
use crate::model::{AnalysisWindow, WindowPair};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::{Tz, TZ_VARIANTS};

const MAX_SUGGESTIONS: usize = 5;

/// Windows plus the zone their calendar dates are expressed in.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedWindows {
    pub windows: WindowPair,
    pub timezone: Tz,
}

pub fn parse_adoption_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        UpliftError::InvalidDate(format!("'{input}' is not a YYYY-MM-DD date (e.g. 2025-06-21)"))
    })
}

pub fn compute(
    adoption: NaiveDate,
    days_before: i64,
    days_after: i64,
    timezone: &str,
) -> Result<ResolvedWindows> {
    compute_at(adoption, days_before, days_after, timezone, Utc::now())
}

/// Same as [`compute`] with an explicit clock for the future-date check.
pub fn compute_at(
    adoption: NaiveDate,
    days_before: i64,
    days_after: i64,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<ResolvedWindows> {
    let before_len = window_length("before", days_before)?;
    let after_len = window_length("after", days_after)?;
    let tz = resolve_timezone(timezone)?;

    let today = now.with_timezone(&tz).date_naive();
    if adoption > today {
        return Err(UpliftError::FutureDate {
            date: adoption.to_string(),
            today: today.to_string(),
            timezone: tz.name().to_string(),
        });
    }

    // Calendar arithmetic on local dates: day boundaries are the zone's, not UTC's.
    let before = AnalysisWindow {
        start: shift_back(adoption, before_len)?,
        end: shift_back(adoption, 1)?,
        day_count: before_len,
    };
    let after = AnalysisWindow {
        start: adoption,
        end: adoption
            .checked_add_days(Days::new(u64::from(after_len) - 1))
            .ok_or_else(|| UpliftError::InvalidDate(format!("{adoption} + {after_len} days overflows")))?,
        day_count: after_len,
    };

    Ok(ResolvedWindows {
        windows: WindowPair { before, after },
        timezone: tz,
    })
}

fn window_length(which: &'static str, days: i64) -> Result<u32> {
    match u32::try_from(days) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(UpliftError::InvalidWindowLength { which, days }),
    }
}

fn shift_back(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| UpliftError::InvalidDate(format!("{date} - {days} days underflows")))
}

pub fn resolve_timezone(input: &str) -> Result<Tz> {
    input.trim().parse::<Tz>().map_err(|_| UpliftError::InvalidTimezone {
        input: input.to_string(),
        suggestions: suggest_timezones(input),
    })
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Known identifiers that look like `input`: same name modulo case/spacing first,
/// then names whose city segment overlaps the input's.
pub fn suggest_timezones(input: &str) -> Vec<String> {
    let needle = normalize(input);
    let needle_city = needle.rsplit('/').next().unwrap_or(&needle).to_string();
    if needle_city.len() < 3 {
        return Vec::new();
    }

    let mut exact = Vec::new();
    let mut near = Vec::new();
    for tz in TZ_VARIANTS.iter() {
        let name = tz.name();
        let lowered = name.to_lowercase();
        if lowered == needle {
            exact.push(name);
            continue;
        }
        let city = lowered.rsplit('/').next().unwrap_or(&lowered);
        if city.contains(&needle_city) || (city.len() >= 3 && needle_city.contains(city)) {
            near.push(name);
        }
    }

    exact
        .into_iter()
        .chain(near)
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}

/// First instant of `date` in `tz`. Zones that skip midnight start the day at the
/// first local hour that exists.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Inclusive first and last second of a window, as instants in `tz`.
pub fn window_bounds(window: &AnalysisWindow, tz: &Tz) -> (DateTime<Tz>, DateTime<Tz>) {
    let start = start_of_day(window.start, tz);
    let end = match window.end.succ_opt() {
        Some(next) => start_of_day(next, tz) - Duration::seconds(1),
        None => start_of_day(window.end, tz) + Duration::seconds(86_399),
    };
    (start, end)
}
