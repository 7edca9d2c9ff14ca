use log::info;
use rocket::{get, put, serde::json::Json, State};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    data_access,
    error::{ApiError, ApiResult},
    models::Profile,
    AppState,
};

const MAX_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
}

pub fn normalize_name(raw: Option<&str>) -> Result<String, ApiError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request("Name must be less than 100 characters"));
    }
    Ok(name.to_string())
}

#[get("/")]
pub async fn get_profile(state: &State<AppState>, user: AuthUser) -> ApiResult<Profile> {
    let found = data_access::get_user(&state.db, &user.0)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(found.into()))
}

#[put("/", data = "<input>")]
pub async fn update_profile(
    state: &State<AppState>,
    user: AuthUser,
    input: Json<UpdateProfileInput>,
) -> ApiResult<Profile> {
    let name = normalize_name(input.name.as_deref())?;
    let updated = data_access::update_user_name(&state.db, &user.0, &name)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!("User {} renamed themselves", user.0);
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_token;
    use crate::data_access::tests::seed_user;
    use crate::test_support::{client, TEST_SECRET};
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{json, Value};

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(normalize_name(Some("  Ibrahim ")).unwrap(), "Ibrahim");
        assert!(normalize_name(Some("   ")).is_err());
        assert!(normalize_name(None).is_err());
        assert!(normalize_name(Some(&"x".repeat(100))).is_ok());
        assert!(normalize_name(Some(&"x".repeat(101))).is_err());
    }

    #[rocket::async_test]
    async fn profile_requires_a_token() {
        let (client, _db, _dir) = client().await;
        let res = client.get("/api/profile").dispatch().await;
        assert_eq!(res.status(), Status::Unauthorized);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized");

        let res = client
            .get("/api/profile")
            .header(Header::new("Authorization", "Bearer not-a-jwt"))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn read_and_rename_profile() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "nur@example.com", None).await;
        let bearer = format!("Bearer {}", generate_token(&me.id, TEST_SECRET).unwrap());

        let res = client
            .get("/api/profile")
            .header(Header::new("Authorization", bearer.clone()))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["email"], "nur@example.com");
        assert_eq!(body["name"], Value::Null);
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("createdAt").is_some());

        let res = client
            .put("/api/profile")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", bearer.clone()))
            .body(json!({ "name": "  Nur  " }).to_string())
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["name"], "Nur");

        let res = client
            .put("/api/profile")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", bearer))
            .body(json!({ "name": "" }).to_string())
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::BadRequest);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["error"], "Name is required");
    }

    #[rocket::async_test]
    async fn deleting_the_image_clears_it() {
        let (client, db, dir) = client().await;
        let me = seed_user(&db, "img@example.com", None).await;
        let config = crate::config::Config::for_tests(dir.path().to_path_buf());
        let upload = crate::files::AvatarUpload {
            file_name: Some("me.jpg".into()),
            content_type: Some("image/jpeg".into()),
            bytes: vec![1, 2, 3],
        };
        let url = crate::files::store_avatar(&config, &me.id, &upload).await.unwrap();
        data_access::update_user_image(&db, &me.id, Some(url.as_str())).await.unwrap();

        let served = url.trim_start_matches("http://localhost:8000");
        let res = client.get(served.to_string()).dispatch().await;
        assert_eq!(res.status(), Status::Ok);
        assert_eq!(res.content_type(), Some(ContentType::JPEG));
        assert_eq!(res.into_bytes().await.unwrap(), vec![1, 2, 3]);

        let bearer = format!("Bearer {}", generate_token(&me.id, TEST_SECRET).unwrap());
        let res = client
            .delete("/api/profile/image")
            .header(Header::new("Authorization", bearer))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["image"], Value::Null);

        let res = client.get(served.to_string()).dispatch().await;
        assert_eq!(res.status(), Status::NotFound);
    }
}
