use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// An uploaded image file as received from the pet form.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Stores a pet image and returns its storage key.
pub async fn upload_pet_image(st: &AppState, owner_id: i64, img: UploadItem) -> anyhow::Result<String> {
    let ext = ext_from_mime(&img.content_type).unwrap_or("bin");
    let key = format!("pets/{}/{}.{}", owner_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, img.body, &img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

pub async fn presign_image(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, st.config.image_url_ttl_secs)
        .await
        .with_context(|| format!("presign url for key {}", key))
}

/// Removes an image that is no longer referenced. Failures are logged, not returned.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete pet image");
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_presign_and_discard() {
        let (state, storage) = AppState::fake_with_storage().await;
        let key = upload_pet_image(
            &state,
            9,
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap();
        assert!(key.starts_with("pets/9/"));
        assert!(key.ends_with(".png"));
        assert!(storage.contains(&key));

        let url = presign_image(&state, &key).await.unwrap();
        assert!(url.contains(&key));

        discard_image(&state, &key).await;
        assert!(!storage.contains(&key));
    }
}
