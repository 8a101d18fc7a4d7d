// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule evaluation.
//!
//! Parses schedule expressions and computes which fire times fell in the
//! window `(last_known, now]` plus the next fire time after `now`. Everything
//! here is a pure function of its inputs; the caller supplies `now`.
//!
//! Accepted expressions:
//! - standard 5-field cron (`*/5 * * * *`), fired at second 0. When both
//!   day-of-month and day-of-week are restricted, either one matching fires.
//! - 6 or 7 field cron with a leading seconds field (and optional year)
//! - `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`, `@midnight`, `@hourly`
//! - `@every <duration>` (`@every 90s`, `@every 1h30m`)
//!
//! All times are UTC.

use crate::duration::parse_duration;
use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid schedule {expr:?}: {reason}")]
    Parse { expr: String, reason: String },
    #[error("invalid schedule {expr:?}: interval must be at least one second")]
    IntervalTooShort { expr: String },
}

/// A parsed, periodic schedule
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Fires whenever any of the rules fires
    Cron(Vec<cron::Schedule>),
    /// Fixed interval after the reference time
    Every(Duration),
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let trimmed = expr.trim();
        let parse_err = |reason: String| ScheduleError::Parse {
            expr: expr.to_string(),
            reason,
        };

        if let Some(interval) = trimmed.strip_prefix("@every") {
            let interval = interval.trim();
            if interval.is_empty() {
                return Err(parse_err("@every requires a duration".to_string()));
            }
            let interval = parse_duration(interval).map_err(|e| parse_err(e.to_string()))?;
            if interval < std::time::Duration::from_secs(1) {
                return Err(ScheduleError::IntervalTooShort {
                    expr: expr.to_string(),
                });
            }
            let interval = Duration::from_std(interval).map_err(|e| parse_err(e.to_string()))?;
            return Ok(Schedule::Every(interval));
        }

        let rules = normalize_cron(trimmed)
            .map_err(parse_err)?
            .iter()
            .map(|rule| cron::Schedule::from_str(rule).map_err(|e| parse_err(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let schedule = Schedule::Cron(rules);
        // A rule that never fires is not periodic
        if schedule.next_after(DateTime::<Utc>::UNIX_EPOCH).is_none() {
            return Err(parse_err("expression never fires".to_string()));
        }
        Ok(schedule)
    }

    /// First fire time strictly after `t`.
    pub fn next_after(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Cron(rules) => rules.iter().filter_map(|r| r.after(&t).next()).min(),
            Schedule::Every(interval) => t.checked_add_signed(*interval),
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schedule::parse(s)
    }
}

/// Translate accepted syntax into the seconds-first rules the cron parser reads.
fn normalize_cron(expr: &str) -> Result<Vec<String>, String> {
    if let Some(descriptor) = expr.strip_prefix('@') {
        let expanded = match descriptor.to_ascii_lowercase().as_str() {
            "yearly" | "annually" => "0 0 0 1 1 *",
            "monthly" => "0 0 0 1 * *",
            "weekly" => "0 0 0 * * Sun",
            "daily" | "midnight" => "0 0 0 * * *",
            "hourly" => "0 0 * * * *",
            _ => return Err(format!("unknown descriptor @{descriptor}")),
        };
        return Ok(vec![expanded.to_string()]);
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => {
            let (minute, hour, dom, month) = (fields[0], fields[1], fields[2], fields[3]);
            let dow = standard_day_of_week(fields[4])?;
            if is_restricted(dom) && is_restricted(fields[4]) {
                // Standard cron fires when either day field matches
                Ok(vec![
                    format!("0 {minute} {hour} {dom} {month} *"),
                    format!("0 {minute} {hour} * {month} {dow}"),
                ])
            } else {
                Ok(vec![format!("0 {minute} {hour} {dom} {month} {dow}")])
            }
        }
        6 | 7 => Ok(vec![fields.join(" ")]),
        0 => Err("empty expression".to_string()),
        n => Err(format!("expected 5, 6 or 7 fields, got {n}")),
    }
}

fn is_restricted(field: &str) -> bool {
    !field.starts_with(['*', '?'])
}

/// Rewrite a standard cron day-of-week field (0-7, Sunday is 0 or 7) into
/// the parser's numbering (1-7, Sunday is 1). Numbers and three-letter day
/// names are expanded to explicit lists; anything else passes through for
/// the parser to judge.
fn standard_day_of_week(field: &str) -> Result<String, String> {
    let mut out: Vec<String> = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step in {item:?}"))?;
                if step == 0 {
                    return Err(format!("zero day-of-week step in {item:?}"));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let bounds = match range {
            "*" if step.is_none() => {
                out.push("*".to_string());
                continue;
            }
            "*" => Some((0, 6)),
            _ => match range.split_once('-') {
                Some((lo, hi)) => match (dow_number(lo)?, dow_number(hi)?) {
                    (Some(lo), Some(hi)) => Some((lo, hi)),
                    (None, None) => None,
                    _ => return Err(format!("unrecognized day in range {item:?}")),
                },
                None => dow_number(range)?.map(|lo| (lo, if step.is_some() { 6 } else { lo })),
            },
        };

        match bounds {
            Some((lo, hi)) => {
                if lo > hi {
                    return Err(format!("day-of-week range {item:?} is reversed"));
                }
                let step = step.unwrap_or(1) as usize;
                out.extend((lo..=hi).step_by(step).map(|d| shift_day(d).to_string()));
            }
            None => out.push(item.to_string()),
        }
    }

    out.dedup();
    Ok(out.join(","))
}

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

fn dow_number(s: &str) -> Result<Option<u32>, String> {
    if let Some(day) = DAY_NAMES.iter().position(|d| s.eq_ignore_ascii_case(d)) {
        return Ok(Some(day as u32));
    }
    if !s.chars().all(|c| c.is_ascii_digit()) || s.is_empty() {
        return Ok(None);
    }
    match s.parse::<u32>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        _ => Err(format!("day-of-week {s} out of range 0-7")),
    }
}

fn shift_day(day: u32) -> u32 {
    match day {
        0 | 7 => 1,
        d => d + 1,
    }
}

/// Result of evaluating a schedule over a time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireTimes {
    /// Fire times in `(last_known, now]`, ascending. Holds at most `cap`
    /// entries; later ones are dropped when `too_many_missed` is set.
    pub missed: Vec<DateTime<Utc>>,
    /// Enumeration stopped at the cap
    pub too_many_missed: bool,
    /// Most recent fire time in `(last_known, now]`, even past the cap
    pub latest_missed: Option<DateTime<Utc>>,
    /// First fire time after `now` (or after `last_known` if that is later)
    pub next: Option<DateTime<Utc>>,
}

impl FireTimes {
    /// The missed fire time a run may still be created for.
    ///
    /// Only the most recent one is creatable; older ones are superseded. It
    /// is actionable unless it lies further than `deadline` behind `now`.
    pub fn actionable(&self, now: DateTime<Utc>, deadline: Option<Duration>) -> Option<DateTime<Utc>> {
        let latest = self.latest_missed?;
        let cutoff = deadline.and_then(|d| now.checked_sub_signed(d));
        match cutoff {
            Some(cutoff) if latest < cutoff => None,
            _ => Some(latest),
        }
    }
}

/// Compute missed and next fire times.
///
/// Enumerates at most `cap` fire times. Past the cap, the most recent fire
/// time is located by bisection rather than by walking the whole window.
pub fn next_fire_times(
    schedule: &Schedule,
    last_known: DateTime<Utc>,
    now: DateTime<Utc>,
    cap: usize,
) -> FireTimes {
    let mut missed = Vec::new();
    let mut too_many_missed = false;
    let mut cursor = last_known;

    while let Some(fire) = schedule.next_after(cursor).filter(|f| *f <= now) {
        if missed.len() >= cap {
            too_many_missed = true;
            break;
        }
        missed.push(fire);
        cursor = fire;
    }

    let latest_missed = match (too_many_missed, schedule) {
        (false, _) => missed.last().copied(),
        (true, Schedule::Every(interval)) => latest_on_interval(last_known, *interval, now),
        (true, Schedule::Cron(_)) => {
            latest_at_or_before(schedule, cursor, now).or(missed.last().copied())
        }
    };

    // Interval schedules stay on the grid anchored at last_known
    let next = schedule
        .next_after(latest_missed.unwrap_or(last_known))
        .filter(|n| *n > now)
        .or_else(|| schedule.next_after(now));

    FireTimes {
        missed,
        too_many_missed,
        latest_missed,
        next,
    }
}

/// Last point of the grid `last_known + k * interval` (k >= 1) at or before `now`.
fn latest_on_interval(
    last_known: DateTime<Utc>,
    interval: Duration,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let step = interval.num_milliseconds();
    if step <= 0 || now <= last_known {
        return None;
    }
    let steps = (now - last_known).num_milliseconds() / step;
    if steps == 0 {
        return None;
    }
    last_known.checked_add_signed(Duration::milliseconds(steps * step))
}

/// Latest fire time in `(floor, now]`.
///
/// `next_after` is monotone, so bisecting on whole seconds finds the last
/// second `s` with `next_after(s) <= now`; the fire after it is the answer.
/// Cron rules fire on whole seconds, so `next_after(now)` is always past `now`.
fn latest_at_or_before(
    schedule: &Schedule,
    floor: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let due_after = |secs: i64| {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .and_then(|t| schedule.next_after(t))
            .filter(|fire| *fire <= now)
    };

    let mut lo = floor.timestamp();
    let mut hi = now.timestamp();
    let mut found = due_after(lo)?;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        match due_after(mid) {
            Some(fire) => {
                lo = mid;
                found = fire;
            }
            None => hi = mid,
        }
    }
    Some(found)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
