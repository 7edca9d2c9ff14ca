use chrono::{NaiveDate, Utc};
use log::debug;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::{Friend, Prayer, PrayerLog, PrayerStatus, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, image, created_at, updated_at";
const LOG_COLUMNS: &str = "id, user_id, prayer_id, date, status";

/// Inclusive calendar bounds applied to log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub async fn create_user(
    db: &Pool<Sqlite>,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, image, created_at, updated_at) VALUES (?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;
    get_user(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_user(db: &Pool<Sqlite>, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn get_user_by_email(
    db: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email.trim().to_lowercase())
        .fetch_optional(db)
        .await
}

pub async fn update_user_name(
    db: &Pool<Sqlite>,
    user_id: &str,
    name: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;
    get_user(db, user_id).await
}

pub async fn update_user_image(
    db: &Pool<Sqlite>,
    user_id: &str,
    image: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("UPDATE users SET image = ?, updated_at = ? WHERE id = ?")
        .bind(image)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;
    get_user(db, user_id).await
}

pub async fn get_prayers(db: &Pool<Sqlite>) -> Result<Vec<Prayer>, sqlx::Error> {
    sqlx::query_as::<_, Prayer>("SELECT id, name FROM prayers ORDER BY id ASC")
        .fetch_all(db)
        .await
}

pub async fn prayer_exists(db: &Pool<Sqlite>, prayer_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM prayers WHERE id = ?")
        .bind(prayer_id)
        .fetch_optional(db)
        .await?;
    Ok(row.is_some())
}

/// Writes the status for one (user, prayer, day), replacing any earlier one.
pub async fn upsert_prayer_log(
    db: &Pool<Sqlite>,
    user_id: &str,
    prayer_id: i64,
    date: NaiveDate,
    status: PrayerStatus,
) -> Result<PrayerLog, sqlx::Error> {
    debug!("Upserting {status} for user {user_id}, prayer {prayer_id} on {date}");
    sqlx::query_as::<_, PrayerLog>(&format!(
        "INSERT INTO prayer_logs (user_id, prayer_id, date, status) VALUES (?, ?, ?, ?) \
         ON CONFLICT (user_id, prayer_id, date) DO UPDATE SET status = excluded.status \
         RETURNING {LOG_COLUMNS}"
    ))
    .bind(user_id)
    .bind(prayer_id)
    .bind(date)
    .bind(status)
    .fetch_one(db)
    .await
}

pub async fn get_logs_for_day(
    db: &Pool<Sqlite>,
    user_id: &str,
    date: NaiveDate,
) -> Result<Vec<PrayerLog>, sqlx::Error> {
    sqlx::query_as::<_, PrayerLog>(&format!(
        "SELECT {LOG_COLUMNS} FROM prayer_logs WHERE user_id = ? AND date = ? ORDER BY prayer_id ASC"
    ))
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await
}

/// All logs of one user, newest day first, optionally bounded.
pub async fn get_logs_in_range(
    db: &Pool<Sqlite>,
    user_id: &str,
    range: Option<DateRange>,
) -> Result<Vec<PrayerLog>, sqlx::Error> {
    match range {
        Some(DateRange { start, end }) => {
            sqlx::query_as::<_, PrayerLog>(&format!(
                "SELECT {LOG_COLUMNS} FROM prayer_logs WHERE user_id = ? AND date >= ? AND date <= ? \
                 ORDER BY date DESC, prayer_id ASC"
            ))
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, PrayerLog>(&format!(
                "SELECT {LOG_COLUMNS} FROM prayer_logs WHERE user_id = ? ORDER BY date DESC, prayer_id ASC"
            ))
            .bind(user_id)
            .fetch_all(db)
            .await
        }
    }
}

#[cfg(test)]
pub async fn count_logs(db: &Pool<Sqlite>, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM prayer_logs WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await
}

/// Users the given user has added, in insertion order.
pub async fn get_friend_users(db: &Pool<Sqlite>, user_id: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.password_hash, u.image, u.created_at, u.updated_at \
         FROM friendships f JOIN users u ON u.id = f.friend_id \
         WHERE f.user_id = ? ORDER BY f.rowid ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn get_friends(db: &Pool<Sqlite>, user_id: &str) -> Result<Vec<Friend>, sqlx::Error> {
    Ok(get_friend_users(db, user_id)
        .await?
        .into_iter()
        .map(Friend::from)
        .collect())
}

pub async fn friendship_exists(
    db: &Pool<Sqlite>,
    user_id: &str,
    friend_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT friend_id FROM friendships WHERE user_id = ? AND friend_id = ?")
            .bind(user_id)
            .bind(friend_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

/// Returns false when the pair was already present.
pub async fn add_friendship(
    db: &Pool<Sqlite>,
    user_id: &str,
    friend_id: &str,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(friend_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn remove_friendship(
    db: &Pool<Sqlite>,
    user_id: &str,
    friend_id: &str,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM friendships WHERE user_id = ? AND friend_id = ?")
        .bind(user_id)
        .bind(friend_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
