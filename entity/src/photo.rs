use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhotoError {
    #[error("expected a data URL")]
    NotDataUrl,
    #[error("only base64 data URLs are accepted")]
    NotBase64,
    #[error("unsupported media type {0}; expected image/*")]
    UnsupportedMime(String),
    #[error("image payload is not valid base64")]
    InvalidBase64,
    #[error("image payload is empty")]
    Empty,
}

/// A captured or uploaded image, kept as an `image/*` data URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoPayload {
    mime: String,
    base64: String,
}

impl PhotoPayload {
    pub fn from_data_url(url: &str) -> Result<Self, PhotoError> {
        let rest = url.trim().strip_prefix("data:").ok_or(PhotoError::NotDataUrl)?;
        let (header, data) = rest.split_once(',').ok_or(PhotoError::NotDataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(PhotoError::NotBase64)?;
        check_mime(mime)?;
        if data.is_empty() {
            return Err(PhotoError::Empty);
        }
        STANDARD
            .decode(data)
            .map_err(|_| PhotoError::InvalidBase64)?;
        Ok(Self {
            mime: mime.to_ascii_lowercase(),
            base64: data.to_string(),
        })
    }

    /// Wrap raw file bytes read from an upload.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self, PhotoError> {
        let mime = mime.split(';').next().unwrap_or_default().trim();
        check_mime(mime)?;
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        Ok(Self {
            mime: mime.to_ascii_lowercase(),
            base64: STANDARD.encode(bytes),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

impl Serialize for PhotoPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

fn check_mime(mime: &str) -> Result<(), PhotoError> {
    let lower = mime.to_ascii_lowercase();
    match lower.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(PhotoError::UnsupportedMime(mime.to_string())),
    }
}

/// Per-employee photo overrides keyed by table position.
///
/// Entries are replaced on a newer capture but never removed.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct PhotoOverrides {
    photos: BTreeMap<usize, PhotoPayload>,
}

impl PhotoOverrides {
    pub fn set(&mut self, id: usize, photo: PhotoPayload) {
        self.photos.insert(id, photo);
    }

    pub fn get(&self, id: usize) -> Option<&PhotoPayload> {
        self.photos.get(&id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.photos.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.photos.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn accepts_image_data_urls() {
        let photo = PhotoPayload::from_data_url(PIXEL).unwrap();
        assert_eq!(photo.mime(), "image/png");
        assert_eq!(photo.to_data_url(), PIXEL);
    }

    #[test]
    fn rejects_non_images_and_bad_payloads() {
        assert_eq!(
            PhotoPayload::from_data_url("https://example.com/a.png"),
            Err(PhotoError::NotDataUrl)
        );
        assert_eq!(
            PhotoPayload::from_data_url("data:text/plain;base64,aGk="),
            Err(PhotoError::UnsupportedMime("text/plain".into()))
        );
        assert_eq!(
            PhotoPayload::from_data_url("data:image/png,rawtext"),
            Err(PhotoError::NotBase64)
        );
        assert_eq!(
            PhotoPayload::from_data_url("data:image/png;base64,@@@"),
            Err(PhotoError::InvalidBase64)
        );
        assert_eq!(
            PhotoPayload::from_data_url("data:image/png;base64,"),
            Err(PhotoError::Empty)
        );
    }

    #[test]
    fn bytes_become_data_url() {
        let photo = PhotoPayload::from_bytes("image/jpeg; charset=binary", b"hi").unwrap();
        assert_eq!(photo.to_data_url(), "data:image/jpeg;base64,aGk=");
        assert!(PhotoPayload::from_bytes("application/pdf", b"hi").is_err());
    }

    #[test]
    fn overrides_replace_but_keep_ids() {
        let mut photos = PhotoOverrides::default();
        let first = PhotoPayload::from_data_url(PIXEL).unwrap();
        let second = PhotoPayload::from_bytes("image/gif", b"gif").unwrap();
        photos.set(3, first);
        photos.set(3, second.clone());
        photos.set(1, second.clone());
        assert_eq!(photos.get(3), Some(&second));
        assert_eq!(photos.ids().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!photos.contains(0));
    }
}
