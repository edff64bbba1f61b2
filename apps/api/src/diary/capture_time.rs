//! Recovers the original-capture timestamp embedded in a photo.

use std::io::Cursor;

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};

/// EXIF date-time text layout, e.g. `2024:05:01 12:34:56`.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Outcome of looking for a capture time. Every failure mode is a variant;
/// extraction never errors or panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTime {
    Found(String),
    /// The container has no EXIF block at all.
    NotPresent,
    /// An EXIF block exists but has no DateTimeOriginal.
    MetadataNoTimestamp,
    Failed(String),
}

impl CaptureTime {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureTime::Found(_) => "found",
            CaptureTime::NotPresent => "not_present",
            CaptureTime::MetadataNoTimestamp => "no_timestamp",
            CaptureTime::Failed(_) => "failed",
        }
    }

    /// EXIF datetimes carry no zone; the result is local wall-clock time.
    pub fn as_local_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CaptureTime::Found(s) => NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok(),
            _ => None,
        }
    }
}

pub fn extract_capture_time(image_bytes: &[u8]) -> CaptureTime {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(image_bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return CaptureTime::NotPresent,
        Err(e) => return CaptureTime::Failed(e.to_string()),
    };

    let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) else {
        return CaptureTime::MetadataNoTimestamp;
    };

    let raw = match &field.value {
        Value::Ascii(parts) => match parts.first() {
            Some(bytes) => bytes,
            None => return CaptureTime::MetadataNoTimestamp,
        },
        other => {
            return CaptureTime::Failed(format!(
                "DateTimeOriginal has unexpected type {other:?}"
            ))
        }
    };

    match std::str::from_utf8(raw) {
        Ok(text) => {
            let text = text.trim_end_matches(['\0', ' ']).trim();
            if text.is_empty() {
                CaptureTime::MetadataNoTimestamp
            } else {
                CaptureTime::Found(text.to_string())
            }
        }
        Err(e) => CaptureTime::Failed(format!("DateTimeOriginal is not valid text: {e}")),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
    pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const TAG_EXIF_VERSION: u16 = 0x9000;
    pub const TYPE_ASCII: u16 = 2;
    pub const TYPE_UNDEFINED: u16 = 7;
    const TYPE_LONG: u16 = 4;

    /// Little-endian TIFF: IFD0 holds only the Exif IFD pointer, the Exif IFD
    /// holds the single given entry.
    pub fn tiff_with_exif_entry(tag: u16, typ: u16, count: u32, data: &[u8]) -> Vec<u8> {
        const IFD0: u32 = 8;
        const EXIF_IFD: u32 = IFD0 + 18;
        const DATA: u32 = EXIF_IFD + 18;

        let mut t = Vec::new();
        t.extend_from_slice(b"II");
        t.extend_from_slice(&42u16.to_le_bytes());
        t.extend_from_slice(&IFD0.to_le_bytes());

        t.extend_from_slice(&1u16.to_le_bytes());
        t.extend_from_slice(&TAG_EXIF_IFD_POINTER.to_le_bytes());
        t.extend_from_slice(&TYPE_LONG.to_le_bytes());
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(&EXIF_IFD.to_le_bytes());
        t.extend_from_slice(&0u32.to_le_bytes());

        t.extend_from_slice(&1u16.to_le_bytes());
        t.extend_from_slice(&tag.to_le_bytes());
        t.extend_from_slice(&typ.to_le_bytes());
        t.extend_from_slice(&count.to_le_bytes());
        if data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..data.len()].copy_from_slice(data);
            t.extend_from_slice(&inline);
        } else {
            t.extend_from_slice(&DATA.to_le_bytes());
        }
        t.extend_from_slice(&0u32.to_le_bytes());

        if data.len() > 4 {
            t.extend_from_slice(data);
        }
        t
    }

    /// JPEG with an APP1 Exif segment wrapping `tiff`.
    pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff);
        let len = (payload.len() + 2) as u16;

        let mut j = vec![0xFF, 0xD8, 0xFF, 0xE1];
        j.extend_from_slice(&len.to_be_bytes());
        j.extend_from_slice(&payload);
        j.extend_from_slice(&[0xFF, 0xD9]);
        j
    }

    pub fn jpeg_with_capture_time(stamp: &str) -> Vec<u8> {
        let mut data = stamp.as_bytes().to_vec();
        data.push(0);
        jpeg_with_exif(&tiff_with_exif_entry(
            TAG_DATE_TIME_ORIGINAL,
            TYPE_ASCII,
            data.len() as u32,
            &data,
        ))
    }

    /// JFIF-only JPEG: a valid image with no EXIF block.
    pub fn jpeg_without_exif() -> Vec<u8> {
        let mut j = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        j.extend_from_slice(b"JFIF\0");
        j.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        j.extend_from_slice(&[0xFF, 0xD9]);
        j
    }
}
