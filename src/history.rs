//! Day-bucketed prayer history for a user and everyone they follow.
//!
//! Pages are counted in calendar days, not in log rows: a day appears once
//! if the user or any friend logged anything on it.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;

use crate::data_access::{self, DateRange};
use crate::error::ApiError;
use crate::models::{FriendLogs, LogEntry, Prayer, PrayerLog};
use crate::utils::{parse_day, total_pages};

pub const DEFAULT_LIMIT: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub user_id: String,
    pub page: u32,
    pub limit: u32,
    pub range: Option<DateRange>,
}

impl HistoryQuery {
    /// Validates raw query parameters. Runs before any database access.
    pub fn parse(
        user_id: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, ApiError> {
        let user_id = match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(ApiError::bad_request("Missing userId")),
        };
        let page = parse_positive(page, 1, "page")?;
        let limit = parse_positive(limit, DEFAULT_LIMIT, "limit")?;

        let start = parse_optional_day(start_date, "startDate")?;
        let end = parse_optional_day(end_date, "endDate")?;
        let range = match (start, end) {
            (Some(start), Some(end)) if start > end => {
                return Err(ApiError::bad_request("Invalid date range"));
            }
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        };

        Ok(HistoryQuery {
            user_id,
            page,
            limit,
            range,
        })
    }
}

fn parse_positive(raw: Option<&str>, default: u32, field: &str) -> Result<u32, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ApiError::bad_request(format!("{field} must be a positive integer"))),
    }
}

fn parse_optional_day(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_day(s)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid {field}"))),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserDay {
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub user: UserDay,
    pub friends: Vec<FriendLogs>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total_pages(total, limit as u64);
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: (page as u64) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub data: Vec<DayBucket>,
    pub prayers: Vec<Prayer>,
    pub pagination: Pagination,
}

/// A friend together with every log they have in the queried range.
#[derive(Debug, Clone)]
pub struct FriendHistory {
    pub friend_id: String,
    pub friend_name: String,
    pub logs: Vec<PrayerLog>,
}

/// Groups already-fetched logs into one page of day buckets.
pub fn group_by_day(
    user_logs: &[PrayerLog],
    friends: &[FriendHistory],
    page: u32,
    limit: u32,
) -> (Vec<DayBucket>, u64) {
    let all_dates: BTreeSet<NaiveDate> = user_logs
        .iter()
        .chain(friends.iter().flat_map(|f| f.logs.iter()))
        .map(|log| log.date)
        .collect();
    let total = all_dates.len() as u64;

    let skip = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
    let buckets = all_dates
        .into_iter()
        .rev()
        .skip(skip)
        .take(limit as usize)
        .map(|date| DayBucket {
            date,
            user: UserDay {
                logs: entries_on(user_logs, date),
            },
            friends: friends
                .iter()
                .map(|f| FriendLogs {
                    friend_id: f.friend_id.clone(),
                    friend_name: f.friend_name.clone(),
                    logs: entries_on(&f.logs, date),
                })
                .collect(),
        })
        .collect();

    (buckets, total)
}

fn entries_on(logs: &[PrayerLog], date: NaiveDate) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = logs
        .iter()
        .filter(|log| log.date == date)
        .map(LogEntry::from)
        .collect();
    entries.sort_by_key(|e| e.prayer_id);
    entries
}

pub async fn load_history(db: &Pool<Sqlite>, query: &HistoryQuery) -> Result<HistoryPage, sqlx::Error> {
    let user_logs = data_access::get_logs_in_range(db, &query.user_id, query.range).await?;

    let mut friends = Vec::new();
    for friend in data_access::get_friend_users(db, &query.user_id).await? {
        let logs = data_access::get_logs_in_range(db, &friend.id, query.range).await?;
        friends.push(FriendHistory {
            friend_name: friend.display_name().to_string(),
            friend_id: friend.id,
            logs,
        });
    }

    let prayers = data_access::get_prayers(db).await?;
    let (data, total) = group_by_day(&user_logs, &friends, query.page, query.limit);

    Ok(HistoryPage {
        data,
        prayers,
        pagination: Pagination::new(query.page, query.limit, total),
    })
}
