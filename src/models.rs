use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown to friends; users who never set one are shown by email.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Prayer {
    pub id: i64,
    pub name: String,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrayerStatus {
    OnTime,
    Late,
    Jamaah,
}

impl PrayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerStatus::OnTime => "ON_TIME",
            PrayerStatus::Late => "LATE",
            PrayerStatus::Jamaah => "JAMAAH",
        }
    }

    /// Leaderboard weight: congregation beats on time beats late.
    pub fn points(&self) -> u32 {
        match self {
            PrayerStatus::Jamaah => 3,
            PrayerStatus::OnTime => 2,
            PrayerStatus::Late => 1,
        }
    }
}

impl fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrayerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON_TIME" => Ok(PrayerStatus::OnTime),
            "LATE" => Ok(PrayerStatus::Late),
            "JAMAAH" => Ok(PrayerStatus::Jamaah),
            other => Err(format!("Invalid status: {other}")),
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrayerLog {
    pub id: i64,
    pub user_id: String,
    pub prayer_id: i64,
    pub date: NaiveDate,
    pub status: PrayerStatus,
}

/// A log stripped to what the history and friends views render.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub prayer_id: i64,
    pub status: PrayerStatus,
}

impl From<&PrayerLog> for LogEntry {
    fn from(log: &PrayerLog) -> Self {
        LogEntry {
            prayer_id: log.prayer_id,
            status: log.status,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Friend {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

impl From<User> for Friend {
    fn from(user: User) -> Self {
        Friend {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendLogs {
    pub friend_id: String,
    pub friend_name: String,
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
