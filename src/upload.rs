use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;

use crate::form::InlineImage;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    #[error("{path} is {size} bytes, limit is {limit}")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },
    #[error("{path} is not an image ({mime})")]
    NotImage { path: PathBuf, mime: String },
}

/// Reads an image file and encodes it as a self-contained data URL.
pub fn read_inline_image(path: &Path, max_bytes: u64) -> Result<InlineImage, UploadError> {
    let io_err = |source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_bytes,
        });
    }
    let bytes = fs::read(path).map_err(io_err)?;
    if bytes.is_empty() {
        return Err(UploadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mime = detect_mime(&bytes);
    if !mime.starts_with("image/") {
        return Err(UploadError::NotImage {
            path: path.to_path_buf(),
            mime,
        });
    }

    let data_url = format!(
        "data:{mime};base64,{}",
        general_purpose::STANDARD.encode(&bytes)
    );
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(InlineImage {
        source,
        mime,
        size_bytes: bytes.len(),
        data_url,
    })
}

/// Expands a leading `~/` the way a shell would.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

fn detect_mime(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg".into(),
        Ok(ImageFormat::Png) => "image/png".into(),
        Ok(ImageFormat::Gif) => "image/gif".into(),
        Ok(ImageFormat::WebP) => "image/webp".into(),
        _ => {
            let mut buffer = [0u8; 512];
            let mut cursor = Cursor::new(bytes);
            let read = cursor.read(&mut buffer).unwrap_or(0);
            tree_magic_mini::from_u8(&buffer[..read]).to_string()
        }
    }
}
