use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// How long presigned meal photo links stay valid.
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Validates type and size, writes the object and returns its key, which is
/// the reference stored on the meal.
pub async fn upload_meal_image(
    st: &AppState,
    member_id: Uuid,
    img: UploadItem,
) -> Result<String, AppError> {
    let ext = ext_from_mime(&img.content_type).ok_or_else(|| {
        AppError::validation(format!(
            "unsupported image type {}; use JPEG, PNG or GIF",
            img.content_type
        ))
    })?;
    let limit = st.config.max_image_bytes;
    if img.body.len() > limit {
        return Err(AppError::TooLarge { limit });
    }

    let key = format!("meals/{}/{}.{}", member_id, Uuid::new_v4(), ext);
    let size = img.body.len();
    st.storage
        .put_object(&key, img.body, &img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
        .map_err(AppError::FileStorage)?;
    info!(%member_id, %key, size, "meal image stored");
    Ok(key)
}

/// Best effort: the meal row is already gone, a dangling object is only logged.
pub async fn remove_meal_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete meal image");
    }
}

pub async fn presign(st: &AppState, key: &str) -> Option<String> {
    match st.storage.presign_get(key, PRESIGN_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "presign failed");
            None
        }
    }
}
