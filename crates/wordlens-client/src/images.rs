use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, ImageReader, load_from_memory_with_format};
use serde_json::Value;
use wordlens_core::{Error, Result};

/// Images keyed by the word they illustrate.
pub type BulkImages = BTreeMap<String, ImageResult>;

/// How a batch reacts to an entry that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Log and drop the entry; the rest of the batch survives.
    SkipInvalid,
    /// Abort the whole call with the first decode error.
    FailFast,
}

/// A decoded, displayable image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageResult {
    /// Word or label the image belongs to.
    pub label: String,
    /// Encoded image bytes as sent by the service.
    pub bytes: Vec<u8>,
    /// Detected container format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageResult {
    /// Decodes a base64 payload, accepting an optional `data:` URI prefix.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the text is not base64 or the bytes are not
    /// a recognizable image.
    pub fn from_base64(label: impl Into<String>, encoded: &str) -> Result<Self> {
        let payload = encoded
            .split_once(";base64,")
            .map_or(encoded, |(_, data)| data);
        let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|err| Error::Decode(format!("Invalid base64 image: {err}")))?;
        Self::from_bytes(label, bytes)
    }

    /// Validates raw image bytes: format, dimensions and a full pixel decode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the format is unknown, the header is invalid
    /// or the pixel data is corrupt or truncated.
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|err| Error::Decode(format!("Unreadable image: {err}")))?;
        let format = reader
            .format()
            .ok_or_else(|| Error::Decode("Unrecognized image format".to_owned()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|err| Error::Decode(format!("Invalid image header: {err}")))?;
        load_from_memory_with_format(&bytes, format)
            .map_err(|err| Error::Decode(format!("Failed to decode image pixels: {err}")))?;

        Ok(Self {
            label: label.into(),
            bytes,
            format,
            width,
            height,
        })
    }

    /// Preferred file extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }

    /// Decodes the pixels.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the pixel data cannot be decoded.
    pub fn to_bitmap(&self) -> Result<DynamicImage> {
        load_from_memory_with_format(&self.bytes, self.format)
            .map_err(|err| Error::Decode(format!("Failed to decode image pixels: {err}")))
    }

    /// Writes the image to `path`.
    ///
    /// The original bytes are written when the path's extension matches the
    /// detected format; otherwise the pixels are re-encoded for the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or re-encoded.
    pub fn save(&self, path: &Path) -> Result<()> {
        let target = path.extension().and_then(ImageFormat::from_extension);
        if target.is_none() || target == Some(self.format) {
            fs::write(path, &self.bytes)?;
            return Ok(());
        }
        self.to_bitmap()?
            .save(path)
            .map_err(|err| Error::Decode(format!("Failed to encode {}: {err}", path.display())))
    }
}

impl fmt::Debug for ImageResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ImageResult")
            .field("label", &self.label)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Decodes a word-to-base64 mapping returned by the bulk endpoint.
///
/// Entries for words outside `requested` are always dropped. `null` values,
/// non-string values and undecodable payloads are handled according to
/// `policy`.
///
/// # Errors
///
/// Only with `DecodePolicy::FailFast`, on the first entry that fails to decode.
pub fn decode_batch(
    requested: &[String],
    entries: HashMap<String, Value>,
    policy: DecodePolicy,
) -> Result<BulkImages> {
    let mut images = BulkImages::new();

    for (word, encoded) in entries {
        if !requested.contains(&word) {
            tracing::warn!(%word, "dropping image for a word that was not requested");
            continue;
        }

        let decoded = match encoded {
            Value::String(payload) => ImageResult::from_base64(word.clone(), &payload),
            Value::Null => Err(Error::Decode(format!("No image data for '{word}'"))),
            other => Err(Error::Decode(format!(
                "Expected base64 text for '{word}', got {other}"
            ))),
        };

        match (decoded, policy) {
            (Ok(image), _) => {
                images.insert(word, image);
            }
            (Err(error), DecodePolicy::SkipInvalid) => {
                tracing::warn!(%word, %error, "skipping undecodable image");
            }
            (Err(error), DecodePolicy::FailFast) => return Err(error),
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::sample_png_base64;
    use image::{Rgb, RgbImage};
    use serde_json::json;
    use tempfile::TempDir;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|word| (*word).to_owned()).collect()
    }

    #[test]
    fn decodes_png_dimensions() {
        let encoded = sample_png_base64(3, 2).expect("encode png");
        let image = ImageResult::from_base64("cat", &encoded).expect("decode");

        assert_eq!(image.label, "cat");
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.extension(), "png");
        assert_eq!(image.to_bitmap().expect("pixels").width(), 3);
    }

    #[test]
    fn accepts_data_uri_and_line_breaks() {
        let encoded = sample_png_base64(1, 1).expect("encode png");
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("data:image/png;base64,{head}\n{tail}");

        let image = ImageResult::from_base64("dog", &wrapped).expect("decode");
        assert_eq!(image.format, ImageFormat::Png);
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            ImageResult::from_base64("cat", "not base64!!"),
            Err(Error::Decode(_))
        ));
        // Valid base64, but not an image.
        assert!(matches!(
            ImageResult::from_base64("cat", "aGVsbG8gd29ybGQ="),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn truncated_pixel_data_is_rejected() {
        let pixels = RgbImage::from_fn(64, 64, |col, row| {
            let shade = |value: u32| u8::try_from((value * 37) % 251).unwrap_or(0);
            Rgb([shade(col * row + 1), shade(col + 3 * row), shade(row * 7 + col * 11)])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(pixels)
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("encode png");
        let mut bytes = buffer.into_inner();
        ImageResult::from_bytes("cat", bytes.clone()).expect("complete image decodes");

        bytes.truncate(bytes.len() / 2);
        let header_only = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .expect("guess format");
        assert_eq!(header_only.into_dimensions().expect("header intact"), (64, 64));
        assert!(matches!(
            ImageResult::from_bytes("cat", bytes),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn skip_invalid_keeps_valid_subset() {
        let good = sample_png_base64(1, 1).expect("encode png");
        let entries = HashMap::from([
            ("cat".to_owned(), json!(good)),
            ("dog".to_owned(), json!("%%%")),
            ("bird".to_owned(), Value::Null),
            ("owl".to_owned(), json!(false)),
            ("ant".to_owned(), json!({"nested": good})),
            ("fish".to_owned(), json!(good)),
        ]);

        let images = decode_batch(
            &words(&["cat", "dog", "bird", "owl", "ant", "fish"]),
            entries,
            DecodePolicy::SkipInvalid,
        )
        .expect("skip mode never fails");

        assert_eq!(images.keys().collect::<Vec<_>>(), ["cat", "fish"]);
    }

    #[test]
    fn fail_fast_aborts_batch() {
        let entries = HashMap::from([("dog".to_owned(), json!("%%%"))]);
        let outcome = decode_batch(&words(&["dog"]), entries, DecodePolicy::FailFast);
        assert!(matches!(outcome, Err(Error::Decode(_))));

        let entries = HashMap::from([("dog".to_owned(), json!(42))]);
        let outcome = decode_batch(&words(&["dog"]), entries, DecodePolicy::FailFast);
        assert!(matches!(outcome, Err(Error::Decode(_))));
    }

    #[test]
    fn unrequested_words_are_dropped() {
        let good = sample_png_base64(1, 1).expect("encode png");
        let entries = HashMap::from([
            ("cat".to_owned(), json!(good)),
            ("stowaway".to_owned(), json!(good)),
        ]);

        let images =
            decode_batch(&words(&["cat"]), entries, DecodePolicy::FailFast).expect("decode");
        assert!(images.contains_key("cat"));
        assert!(!images.contains_key("stowaway"));
    }

    #[test]
    fn save_keeps_bytes_for_matching_extension() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let image = ImageResult::from_base64("cat", &sample_png_base64(2, 2).expect("encode png"))
            .expect("decode");

        let png_path = temp.path().join("cat.png");
        image.save(&png_path).expect("save png");
        assert_eq!(fs::read(&png_path).expect("read back"), image.bytes);

        let jpeg_path = temp.path().join("cat.jpg");
        image.save(&jpeg_path).expect("save jpeg");
        let jpeg = fs::read(&jpeg_path).expect("read back");
        assert_eq!(jpeg.get(..2), Some([0xFF, 0xD8].as_slice()));
    }
}
