use std::path::Path;

use serde_json::Value;
use tracing::error;

use crate::client::{ApiRequest, AuthClient, Outcome};
use crate::error::{ApiError, ApiResult};
use crate::transport::FormPart;

/// Image attached to a camera listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn from_path(path: &Path) -> ApiResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::invalid("image".to_string(), format!("{}: {}", path.display(), e)))?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "image".to_string());
        Ok(Self { mime: guess_mime(&file_name).map(str::to_string), file_name, bytes })
    }
}

fn guess_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraForm {
    pub brand: String,
    pub model: String,
    pub rental_price: String,
    pub image: Option<ImageUpload>,
}

impl CameraForm {
    fn into_parts(self) -> Vec<(String, FormPart)> {
        let mut parts = vec![
            ("brand".to_string(), FormPart::Text(self.brand)),
            ("model".to_string(), FormPart::Text(self.model)),
            ("rental_price".to_string(), FormPart::Text(self.rental_price)),
        ];
        if let Some(img) = self.image {
            parts.push(("image".to_string(), FormPart::File { file_name: img.file_name, mime: img.mime, bytes: img.bytes }));
        }
        parts
    }
}

pub async fn list(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client.send(ApiRequest::get("cameras")).await.inspect_err(|e| error!(target: "prolens::api", "error fetching cameras: {}", e))
}

pub async fn add(client: &AuthClient, form: CameraForm) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::post("cameras").form(form.into_parts()))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error adding camera: {}", e))
}

/// Updates go through `POST cameras/{id}/update` so the multipart body survives.
pub async fn update(client: &AuthClient, id: u64, form: CameraForm) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::post(format!("cameras/{}/update", id)).form(form.into_parts()))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error updating camera {}: {}", id, e))
}

pub async fn delete(client: &AuthClient, id: u64) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::delete(format!("cameras/{}", id)))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error deleting camera {}: {}", id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use crate::transport::{Body, Method};
    use serde_json::json;

    fn form(image: Option<ImageUpload>) -> CameraForm {
        CameraForm { brand: "Canon".into(), model: "R6".into(), rental_price: "1500".into(), image }
    }

    #[tokio::test]
    async fn update_posts_multipart_to_update_route() {
        let h = harness();
        h.transport.reply(200, json!({"id": 4}));
        let img = ImageUpload { file_name: "r6.png".into(), mime: Some("image/png".into()), bytes: vec![1, 2, 3] };
        update(&h.client, 4, form(Some(img))).await.unwrap();

        let req = &h.transport.seen()[0];
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url.path(), "/api/cameras/4/update");
        let Body::Form(parts) = &req.body else { panic!("expected multipart body") };
        let names: Vec<&str> = parts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["brand", "model", "rental_price", "image"]);
    }

    #[tokio::test]
    async fn image_is_optional() {
        let h = harness();
        h.transport.reply(201, json!({"id": 9}));
        assert_eq!(add(&h.client, form(None)).await.unwrap(), Outcome::Data(json!({"id": 9})));
        let Body::Form(parts) = &h.transport.seen()[0].body else { panic!("expected multipart body") };
        assert_eq!(parts.len(), 3);
    }

    #[tokio::test]
    async fn image_from_disk_gets_a_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.JPG");
        std::fs::write(&path, b"jpeg").unwrap();
        let img = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(img.file_name, "shot.JPG");
        assert_eq!(img.mime.as_deref(), Some("image/jpeg"));
        assert_eq!(img.bytes, b"jpeg");
        assert!(ImageUpload::from_path(&dir.path().join("missing.png")).await.is_err());
    }

    #[tokio::test]
    async fn delete_uses_camera_path() {
        let h = harness();
        h.transport.reply_text(204, "");
        assert_eq!(delete(&h.client, 12).await.unwrap(), Outcome::Data(Value::Null));
        assert_eq!(h.transport.seen()[0].method, Method::Delete);
        assert_eq!(h.transport.seen()[0].url.path(), "/api/cameras/12");
    }
}
