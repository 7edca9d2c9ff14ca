use content_disposition::parse_content_disposition;
use log::{debug, error, info, warn};
use rocket::tokio::fs::File;
use rocket::{
    delete, get,
    http::Header,
    post,
    request::Request,
    response::{self, Responder, Response},
    serde::json::Json,
    State,
};
use rocket_multipart::MultipartReader;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::data_access;
use crate::error::{ApiError, ApiResult};
use crate::models::Profile;
use crate::AppState;

pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024; // 5 MiB
const IMAGE_ROUTE: &str = "/api/profile/image";

#[derive(Debug, Default)]
pub struct AvatarUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

/// Checks type and size, returning the extension the file is stored under.
pub fn validate_upload(upload: &AvatarUpload) -> Result<String, ApiError> {
    let content_type = upload.content_type.as_deref().unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("Invalid file type"));
    }
    if upload.bytes.is_empty() {
        return Err(ApiError::bad_request("No image file provided"));
    }
    if upload.bytes.len() as u64 > MAX_IMAGE_SIZE {
        return Err(ApiError::bad_request("File too large"));
    }

    let from_name = upload
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    let from_mime = || {
        mime_guess::get_mime_extensions_str(content_type)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
    };
    Ok(from_name
        .or_else(from_mime)
        .unwrap_or_else(|| "jpg".to_string()))
}

fn public_url(config: &Config, user_id: &str, file_name: &str) -> String {
    format!("{}{}/{}/{}", config.public_base_url, IMAGE_ROUTE, user_id, file_name)
}

/// Resolves a stored avatar, refusing names that could leave the user's
/// directory.
pub fn avatar_path(config: &Config, user_id: &str, file_name: &str) -> Option<PathBuf> {
    let safe = |s: &str| {
        !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
    };
    if !safe(user_id) || !safe(file_name) {
        return None;
    }
    Some(config.avatars_dir().join(user_id).join(file_name))
}

pub async fn store_avatar(
    config: &Config,
    user_id: &str,
    upload: &AvatarUpload,
) -> Result<String, ApiError> {
    let ext = validate_upload(upload)?;
    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = avatar_path(config, user_id, &file_name)
        .ok_or_else(|| ApiError::Internal(format!("unusable avatar path for {user_id}")))?;

    if let Some(dir) = path.parent() {
        debug!("Ensuring avatar directory exists: {:?}", dir);
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&path, &upload.bytes).await?;
    info!("Stored avatar for {} at {:?} ({} bytes)", user_id, path, upload.bytes.len());

    Ok(public_url(config, user_id, &file_name))
}

/// Deletes the file behind an avatar URL when this server stored it.
/// Foreign URLs and files already gone are left alone.
pub async fn remove_avatar(config: &Config, user_id: &str, image_url: &str) -> Result<(), ApiError> {
    let prefix = public_url(config, user_id, "");
    let Some(file_name) = image_url.strip_prefix(&prefix) else {
        debug!("Avatar {} is not stored locally, skipping removal", image_url);
        return Ok(());
    };
    let Some(path) = avatar_path(config, user_id, file_name) else {
        return Ok(());
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            info!("Removed avatar file {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_image_field(reader: &mut MultipartReader<'_>) -> Result<Option<AvatarUpload>, ApiError> {
    loop {
        let mut field = match reader.next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return Err(ApiError::bad_request("Malformed multipart body"));
            }
        };
        let Some(disposition_str) = field.headers().get_one("Content-Disposition") else {
            continue;
        };
        let parsed = parse_content_disposition(disposition_str);
        if parsed.name().as_deref() != Some("image") {
            debug!("Skipping multipart field {:?}", parsed.name());
            continue;
        }

        let mut upload = AvatarUpload {
            file_name: parsed.filename().map(|(name, _)| name),
            content_type: field.headers().get_one("Content-Type").map(str::to_string),
            bytes: Vec::new(),
        };
        // one byte past the limit is enough to reject it
        (&mut field)
            .take(MAX_IMAGE_SIZE + 1)
            .read_to_end(&mut upload.bytes)
            .await?;
        return Ok(Some(upload));
    }
    Ok(None)
}

#[post("/image", data = "<reader>")]
pub async fn upload_image(
    state: &State<AppState>,
    user: AuthUser,
    mut reader: MultipartReader<'_>,
) -> ApiResult<ImageResponse> {
    info!("Received avatar upload from {}", user.0);
    let upload = read_image_field(&mut reader)
        .await?
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;
    if let Err(e) = validate_upload(&upload) {
        warn!("Rejected avatar from {}: {}", user.0, e);
        return Err(e);
    }

    let current = data_access::get_user(&state.db, &user.0)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let image_url = store_avatar(&state.config, &user.0, &upload).await?;
    if let Err(e) = data_access::update_user_image(&state.db, &user.0, Some(image_url.as_str())).await {
        discard_avatar(&state.config, &user.0, &image_url).await;
        return Err(e.into());
    }
    if let Some(old) = current.image.as_deref() {
        discard_avatar(&state.config, &user.0, old).await;
    }
    Ok(Json(ImageResponse { image_url }))
}

/// Removal after the row no longer points at the file; failures only leave
/// an orphan behind.
async fn discard_avatar(config: &Config, user_id: &str, image_url: &str) {
    if let Err(e) = remove_avatar(config, user_id, image_url).await {
        warn!("Could not remove avatar {} for {}: {}", image_url, user_id, e);
    }
}

#[delete("/image")]
pub async fn delete_image(state: &State<AppState>, user: AuthUser) -> ApiResult<Profile> {
    let current = data_access::get_user(&state.db, &user.0)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let updated = data_access::update_user_image(&state.db, &user.0, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if let Some(old) = current.image.as_deref() {
        discard_avatar(&state.config, &user.0, old).await;
    }
    info!("Cleared avatar for {}", user.0);
    Ok(Json(updated.into()))
}

pub struct AvatarFile {
    file: File,
    filename: String,
}

impl<'r> Responder<'r, 'static> for AvatarFile {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        let content_type = mime_guess::from_path(&self.filename)
            .first_or(mime::APPLICATION_OCTET_STREAM)
            .to_string();

        Response::build()
            .header(Header::new("Content-Type", content_type))
            .header(Header::new(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", self.filename),
            ))
            .streamed_body(self.file)
            .ok()
    }
}

#[get("/image/<user_id>/<file_name>")]
pub async fn serve_image(
    state: &State<AppState>,
    user_id: String,
    file_name: String,
) -> Result<AvatarFile, ApiError> {
    let path = avatar_path(&state.config, &user_id, &file_name)
        .ok_or_else(|| ApiError::not_found("Image not found"))?;
    let file = File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found("Image not found")
        } else {
            error!("Failed to open avatar {:?}: {}", path, e);
            e.into()
        }
    })?;
    Ok(AvatarFile {
        file,
        filename: file_name,
    })
}
