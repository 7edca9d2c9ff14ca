use log::{info, warn};
use rocket::{delete, get, post, serde::json::Json, FromForm, State};
use serde::Deserialize;

use crate::{
    data_access,
    error::{ApiError, ApiResult},
    models::{Friend, FriendLogs, LogEntry},
    utils::parse_day,
    AppState,
};

#[derive(FromForm)]
pub struct UserQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
}

#[derive(FromForm)]
pub struct RemoveFriendQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    #[field(name = "friendId")]
    pub friend_id: Option<String>,
}

#[derive(FromForm)]
pub struct DayQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFriendInput {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[get("/?<query..>")]
pub async fn list_friends(state: &State<AppState>, query: UserQuery) -> ApiResult<Vec<Friend>> {
    let Some(user_id) = non_empty(&query.user_id) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(data_access::get_friends(&state.db, user_id).await?))
}

#[post("/", data = "<input>")]
pub async fn add_friend(state: &State<AppState>, input: Json<AddFriendInput>) -> ApiResult<Vec<Friend>> {
    let (Some(user_id), Some(email)) = (non_empty(&input.user_id), non_empty(&input.email)) else {
        return Err(ApiError::bad_request("Missing fields"));
    };
    if data_access::get_user(&state.db, user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let friend = data_access::get_user_by_email(&state.db, email)
        .await?
        .ok_or_else(|| {
            warn!("Friend lookup by email found no user (requested by {user_id})");
            ApiError::not_found("User not found")
        })?;
    if friend.id == user_id {
        return Err(ApiError::bad_request("Cannot add yourself"));
    }
    if data_access::friendship_exists(&state.db, user_id, &friend.id).await? {
        return Err(ApiError::conflict("This user is already in your friends list"));
    }

    // A concurrent add may win the race between the check and the insert.
    if !data_access::add_friendship(&state.db, user_id, &friend.id).await? {
        return Err(ApiError::conflict("This user is already in your friends list"));
    }
    info!("User {} added friend {}", user_id, friend.id);

    Ok(Json(data_access::get_friends(&state.db, user_id).await?))
}

#[delete("/?<query..>")]
pub async fn remove_friend(state: &State<AppState>, query: RemoveFriendQuery) -> ApiResult<Vec<Friend>> {
    let (Some(user_id), Some(friend_id)) = (non_empty(&query.user_id), non_empty(&query.friend_id)) else {
        return Err(ApiError::bad_request("Missing fields"));
    };

    let removed = data_access::remove_friendship(&state.db, user_id, friend_id).await?;
    if removed > 0 {
        info!("User {} removed friend {}", user_id, friend_id);
    }

    Ok(Json(data_access::get_friends(&state.db, user_id).await?))
}

/// Each friend's logs for one day. Friends with nothing logged get an
/// empty list rather than being dropped.
#[get("/logs?<query..>")]
pub async fn friends_logs(state: &State<AppState>, query: DayQuery) -> ApiResult<Vec<FriendLogs>> {
    let (Some(user_id), Some(raw_date)) = (non_empty(&query.user_id), non_empty(&query.date)) else {
        return Ok(Json(Vec::new()));
    };
    let date = parse_day(raw_date).ok_or_else(|| ApiError::bad_request("Invalid date"))?;

    let mut result = Vec::new();
    for friend in data_access::get_friend_users(&state.db, user_id).await? {
        let logs = data_access::get_logs_for_day(&state.db, &friend.id, date).await?;
        result.push(FriendLogs {
            friend_name: friend.display_name().to_string(),
            friend_id: friend.id,
            logs: logs.iter().map(LogEntry::from).collect(),
        });
    }
    Ok(Json(result))
}
