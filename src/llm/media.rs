use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

use crate::error::TryOnError;

const IMAGE_PREFIX: &str = "image/";

/// One in-memory image ready to be sent to the generative service.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Vec<u8>,
    content_type: String,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Result<Self, TryOnError> {
        let content_type = normalize_image_mime(&content_type.into());
        if !content_type.starts_with(IMAGE_PREFIX) {
            return Err(TryOnError::InvalidImageInput(format!(
                "unsupported content type '{content_type}'"
            )));
        }
        if data.is_empty() {
            return Err(TryOnError::InvalidImageInput("empty payload".to_string()));
        }
        Ok(Self { data, content_type })
    }

    /// Builds an image from uploaded bytes. The sniffed type wins over the declared one.
    pub fn from_bytes(data: Vec<u8>, declared_type: Option<&str>) -> Result<Self, TryOnError> {
        if data.is_empty() {
            return Err(TryOnError::InvalidImageInput("empty file".to_string()));
        }

        let sniffed = detect_mime_type(&data);
        let content_type = match (sniffed, declared_type) {
            (Some(sniffed), _) => sniffed,
            (None, Some(declared)) => declared.to_string(),
            (None, None) => {
                return Err(TryOnError::InvalidImageInput(
                    "could not determine the file type".to_string(),
                ));
            }
        };

        let content_type = normalize_image_mime(&content_type);
        if !is_supported_image_mime(&content_type) {
            return Err(TryOnError::InvalidImageInput(format!(
                "{content_type} is not a supported image type"
            )));
        }

        if decodable_by_image_crate(&content_type) {
            match image_dimensions(&data) {
                Some((width, height)) => {
                    debug!(content_type = %content_type, width, height, "Accepted image upload");
                }
                None => {
                    return Err(TryOnError::InvalidImageInput(format!(
                        "file is not a readable {content_type} image"
                    )));
                }
            }
        }

        Self::new(data, content_type)
    }

    /// Decodes a base64 inline-data payload as it appears on the wire.
    pub fn from_base64(data: &str, content_type: &str) -> Result<Self, TryOnError> {
        let bytes = general_purpose::STANDARD.decode(data.trim()).map_err(|err| {
            TryOnError::InvalidImageInput(format!("invalid base64 payload: {err}"))
        })?;
        Self::new(bytes, content_type)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.to_base64())
    }

    pub fn file_extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "png",
        }
    }

    /// Writes the image to `dir/<stem>.<ext>`, creating the directory if needed.
    pub async fn save_to(&self, dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{stem}.{}", self.file_extension()));
        tokio::fs::write(&path, self.data()).await?;
        Ok(path)
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

pub fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "txt" | "md" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Image types the generative service accepts as inline data.
pub fn is_supported_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

fn decodable_by_image_crate(content_type: &str) -> bool {
    matches!(content_type, "image/png" | "image/jpeg" | "image/webp")
}

fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok(dimensions) => Some(dimensions),
        Err(err) => {
            warn!("Failed to read image header: {err}");
            None
        }
    }
}

/// Reads an image file from disk, the way the upload widget would hand it over.
pub async fn load_image_file(path: &Path) -> Result<EncodedImage, TryOnError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        TryOnError::InvalidImageInput(format!("cannot read {}: {err}", path.display()))
    })?;
    EncodedImage::from_bytes(bytes, mime_for_extension(path))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(2, 3, image::Rgb([200, 10, 10]));
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn rejects_non_image_content_type() {
        let err = EncodedImage::new(b"hi".to_vec(), "text/plain").unwrap_err();
        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
    }

    #[test]
    fn rejects_empty_payload() {
        let err = EncodedImage::new(Vec::new(), "image/png").unwrap_err();
        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
    }

    #[test]
    fn normalizes_jpg_alias() {
        let image = EncodedImage::new(vec![1, 2, 3], "IMAGE/JPG").unwrap();
        assert_eq!(image.content_type(), "image/jpeg");
        assert_eq!(image.file_extension(), "jpg");
    }

    #[test]
    fn sniffed_type_overrides_declared_type() {
        let image = EncodedImage::from_bytes(tiny_png(), Some("image/jpeg"));
        assert_eq!(image.unwrap().content_type(), "image/png");
    }

    #[test]
    fn plain_text_upload_is_rejected() {
        let err = EncodedImage::from_bytes(b"just some notes".to_vec(), Some("text/plain"))
            .unwrap_err();
        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
    }

    #[test]
    fn gif_upload_is_rejected_at_ingestion() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
        let err = EncodedImage::from_bytes(gif, Some("image/gif")).unwrap_err();
        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
        assert!(err.to_string().contains("image/gif"));
    }

    #[test]
    fn unsupported_extensions_have_no_declared_type() {
        assert_eq!(mime_for_extension(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_extension(Path::new("a.gif")), None);
        assert_eq!(mime_for_extension(Path::new("a.bmp")), None);
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut bytes = tiny_png();
        bytes.truncate(16);
        assert!(EncodedImage::from_bytes(bytes, None).is_err());
    }

    #[test]
    fn base64_payload_decodes_to_raw_bytes() {
        let image = EncodedImage::from_base64("QUJD", "image/png").unwrap();
        assert_eq!(image.data(), b"ABC");
        assert_eq!(image.to_data_url(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(EncodedImage::from_base64("***", "image/png").is_err());
    }

    #[tokio::test]
    async fn saves_with_extension_for_content_type() {
        let name = format!("tryon-media-test-{}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        let image = EncodedImage::new(b"ABC".to_vec(), "image/webp").unwrap();
        let path = image.save_to(&dir, "result").await.unwrap();
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("webp"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"ABC");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn loading_a_missing_file_is_invalid_input() {
        let err = load_image_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
    }
}
