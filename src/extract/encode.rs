//! Chart image validation and transport encoding.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::ImageFormat;
use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// File extensions accepted as chart screenshots.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A chart image ready to be embedded in a service request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Returns true if the path has a JPEG or PNG extension (case-insensitive).
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Reads and base64-encodes a chart image.
///
/// The extension must be .jpg/.jpeg/.png and the file contents must sniff as
/// JPEG or PNG. The media type follows the contents, not the extension.
pub fn encode_image(path: &Path) -> Result<EncodedImage> {
    if !path.exists() {
        return Err(PipelineError::missing_input(path));
    }
    if !path.is_file() {
        return Err(PipelineError::MissingInput(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    if !has_supported_extension(path) {
        return Err(PipelineError::unsupported_format(format!(
            "Unsupported file extension: {}",
            path.display()
        )));
    }

    let bytes = fs::read(path).map_err(|e| {
        PipelineError::MissingInput(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let media_type = match image::guess_format(&bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(other) => {
            return Err(PipelineError::unsupported_format(format!(
                "{} contains {:?} data",
                path.display(),
                other
            )));
        }
        Err(_) => {
            return Err(PipelineError::unsupported_format(format!(
                "{} is not a recognizable image",
                path.display()
            )));
        }
    };

    Ok(EncodedImage {
        media_type,
        base64: BASE64.encode(&bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_supported_extensions() {
        assert!(has_supported_extension(Path::new("BIOCON.png")));
        assert!(has_supported_extension(Path::new("BIOCON.JPG")));
        assert!(has_supported_extension(Path::new("dir/BPCL.jpeg")));
        assert!(!has_supported_extension(Path::new("error_log.txt")));
        assert!(!has_supported_extension(Path::new("ATGL")));
    }

    #[test]
    fn test_encode_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAA.png");
        RgbImage::from_pixel(4, 4, Rgb([255, 220, 0])).save(&path).unwrap();

        let encoded = encode_image(&path).unwrap();
        assert_eq!(encoded.media_type, "image/png");
        assert!(encoded.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_encode_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAA.jpg");
        RgbImage::from_pixel(8, 8, Rgb([10, 10, 10])).save(&path).unwrap();

        let encoded = encode_image(&path).unwrap();
        assert_eq!(encoded.media_type, "image/jpeg");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = encode_image(&dir.path().join("GONE.png")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAA.gif");
        std::fs::write(&path, b"GIF89a").unwrap();
        let err = encode_image(&path).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_text_file_with_image_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAA.png");
        std::fs::write(&path, "definitely not a png").unwrap();
        let err = encode_image(&path).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }
}
