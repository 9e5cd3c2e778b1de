//! RAW format detection.
//!
//! Detects RAW containers from magic bytes and file extensions. Magic
//! bytes win; the extension whitelist lets non-TIFF vendor files reach the
//! synthetic fallback instead of failing outright.

use std::path::Path;

/// Byte order declared by a TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II", Intel
    LittleEndian,
    /// "MM", Motorola
    BigEndian,
}

impl ByteOrder {
    /// Reads the byte-order marker from the first two bytes.
    pub fn from_header(bytes: &[u8]) -> Option<Self> {
        match bytes.get(0..2)? {
            b"II" => Some(Self::LittleEndian),
            b"MM" => Some(Self::BigEndian),
            _ => None,
        }
    }

    /// Decodes a u16.
    #[inline]
    pub fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            Self::LittleEndian => u16::from_le_bytes(b),
            Self::BigEndian => u16::from_be_bytes(b),
        }
    }

    /// Decodes a u32.
    #[inline]
    pub fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            Self::LittleEndian => u32::from_le_bytes(b),
            Self::BigEndian => u32::from_be_bytes(b),
        }
    }
}

/// Whitelisted RAW file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    /// Sony
    Arw,
    /// Canon (TIFF-based)
    Cr2,
    /// Canon (ISO-BMFF)
    Cr3,
    /// Nikon
    Nef,
    /// Fujifilm
    Raf,
    /// Olympus / OM System
    Orf,
    /// Panasonic
    Rw2,
    /// Pentax
    Pef,
    /// Samsung
    Srw,
    /// Adobe Digital Negative
    Dng,
    /// Generic
    Raw,
}

impl RawFormat {
    /// Every whitelisted extension, lowercase.
    pub const EXTENSIONS: [&'static str; 11] = [
        "arw", "cr2", "cr3", "nef", "raf", "orf", "rw2", "pef", "srw", "dng", "raw",
    ];

    /// Detects format from file extension only (case-insensitive).
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "arw" => Some(Self::Arw),
            "cr2" => Some(Self::Cr2),
            "cr3" => Some(Self::Cr3),
            "nef" => Some(Self::Nef),
            "raf" => Some(Self::Raf),
            "orf" => Some(Self::Orf),
            "rw2" => Some(Self::Rw2),
            "pef" => Some(Self::Pef),
            "srw" => Some(Self::Srw),
            "dng" => Some(Self::Dng),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Lowercase extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Arw => "arw",
            Self::Cr2 => "cr2",
            Self::Cr3 => "cr3",
            Self::Nef => "nef",
            Self::Raf => "raf",
            Self::Orf => "orf",
            Self::Rw2 => "rw2",
            Self::Pef => "pef",
            Self::Srw => "srw",
            Self::Dng => "dng",
            Self::Raw => "raw",
        }
    }
}

/// How a buffer was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// TIFF-family header present
    Tiff(ByteOrder),
    /// No TIFF header, but a whitelisted extension
    Extension(RawFormat),
    /// Neither
    Unknown,
}

impl Detection {
    /// Classifies `bytes`, using `path` for the extension fallback.
    pub fn detect(bytes: &[u8], path: Option<&Path>) -> Self {
        if let Some(order) = ByteOrder::from_header(bytes) {
            return Self::Tiff(order);
        }
        match path.and_then(RawFormat::from_extension) {
            Some(fmt) => Self::Extension(fmt),
            None => Self::Unknown,
        }
    }
}

/// `true` if the path carries a whitelisted RAW extension.
pub fn is_raw_path<P: AsRef<Path>>(path: P) -> bool {
    RawFormat::from_extension(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order() {
        assert_eq!(ByteOrder::from_header(b"II*\0"), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_header(b"MM\0*"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_header(b"FUJIFILM"), None);
        assert_eq!(ByteOrder::from_header(b"I"), None);
    }

    #[test]
    fn test_endian_decode() {
        assert_eq!(ByteOrder::LittleEndian.u16([0x2A, 0x00]), 42);
        assert_eq!(ByteOrder::BigEndian.u16([0x00, 0x2A]), 42);
        assert_eq!(ByteOrder::BigEndian.u32([0, 0, 1, 0]), 256);
    }

    #[test]
    fn test_extensions() {
        for ext in RawFormat::EXTENSIONS {
            let fmt = RawFormat::from_extension(format!("IMG_0001.{}", ext.to_uppercase()));
            assert_eq!(fmt.map(|f| f.extension()), Some(ext));
        }
        assert!(!is_raw_path("photo.jpg"));
        assert!(!is_raw_path("noext"));
    }

    #[test]
    fn test_detection_priority() {
        let p = Path::new("a.raf");
        assert_eq!(
            Detection::detect(b"II*\0", Some(p)),
            Detection::Tiff(ByteOrder::LittleEndian)
        );
        assert_eq!(Detection::detect(b"FUJI", Some(p)), Detection::Extension(RawFormat::Raf));
        assert_eq!(Detection::detect(b"FUJI", Some(Path::new("a.png"))), Detection::Unknown);
        assert_eq!(Detection::detect(b"FUJI", None), Detection::Unknown);
    }
}
