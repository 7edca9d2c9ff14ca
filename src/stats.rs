use serde::Serialize;
use std::collections::HashMap;

use crate::history::DayBucket;
use crate::models::{LogEntry, Prayer, PrayerStatus};

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCount {
    pub count: u32,
    pub percentage: u32,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_prayers: u32,
    pub on_time: StatusCount,
    pub late: StatusCount,
    pub jamaah: StatusCount,
    pub unset: StatusCount,
    pub overall_completion: u32,
    pub daily_average: u32,
    pub total_days: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub points: u32,
    pub is_current_user: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub statistics: Statistics,
    pub leaderboard: Vec<LeaderboardEntry>,
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Status breakdown of the user's own logs over the given days. Every
/// prayer on every day is one slot; slots without a log count as unset.
pub fn compute_statistics(days: &[DayBucket], prayers: &[Prayer]) -> Statistics {
    if days.is_empty() || prayers.is_empty() {
        return Statistics::default();
    }

    let (mut on_time, mut late, mut jamaah, mut unset) = (0u32, 0u32, 0u32, 0u32);
    let mut daily_completion_sum = 0u32;

    for day in days {
        daily_completion_sum += percent(day.user.logs.len() as u32, prayers.len() as u32);
        for prayer in prayers {
            match day.user.logs.iter().find(|l| l.prayer_id == prayer.id) {
                Some(LogEntry { status: PrayerStatus::OnTime, .. }) => on_time += 1,
                Some(LogEntry { status: PrayerStatus::Late, .. }) => late += 1,
                Some(LogEntry { status: PrayerStatus::Jamaah, .. }) => jamaah += 1,
                None => unset += 1,
            }
        }
    }

    let total = (days.len() * prayers.len()) as u32;
    let total_days = days.len() as u32;
    Statistics {
        total_prayers: total,
        on_time: StatusCount { count: on_time, percentage: percent(on_time, total) },
        late: StatusCount { count: late, percentage: percent(late, total) },
        jamaah: StatusCount { count: jamaah, percentage: percent(jamaah, total) },
        unset: StatusCount { count: unset, percentage: percent(unset, total) },
        overall_completion: percent(on_time + late + jamaah, total),
        daily_average: (daily_completion_sum as f64 / total_days as f64).round() as u32,
        total_days,
    }
}

fn points(logs: &[LogEntry]) -> u32 {
    logs.iter().map(|l| l.status.points()).sum()
}

/// The user ("You") and each friend ranked by points, highest first.
pub fn compute_leaderboard(days: &[DayBucket]) -> Vec<LeaderboardEntry> {
    if days.is_empty() {
        return Vec::new();
    }

    let user_points: u32 = days.iter().map(|d| points(&d.user.logs)).sum();

    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (&str, u32)> = HashMap::new();
    for friend in days.iter().flat_map(|d| d.friends.iter()) {
        let entry = totals.entry(friend.friend_id.as_str()).or_insert_with(|| {
            order.push(friend.friend_id.as_str());
            (friend.friend_name.as_str(), 0)
        });
        entry.1 += points(&friend.logs);
    }

    let mut board = vec![LeaderboardEntry {
        name: "You".to_string(),
        points: user_points,
        is_current_user: true,
    }];
    board.extend(order.into_iter().map(|id| {
        let (name, points) = totals[id];
        LeaderboardEntry {
            name: name.to_string(),
            points,
            is_current_user: false,
        }
    }));
    // stable: ties keep the user first, then friend order
    board.sort_by(|a, b| b.points.cmp(&a.points));
    board
}

pub fn build_report(days: &[DayBucket], prayers: &[Prayer]) -> StatsReport {
    StatsReport {
        statistics: compute_statistics(days, prayers),
        leaderboard: compute_leaderboard(days),
    }
}
