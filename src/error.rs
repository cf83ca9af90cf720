//! Crate-level error types.

use std::fmt;

/// Reason a mipmap chain could not be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipmapError {
    /// Width and height differ.
    NotSquare,
    /// A dimension is not a power of two.
    NotPowerOfTwo,
    /// The base level is already below the minimum mipmap size.
    TooSmall,
}

impl fmt::Display for MipmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare => write!(f, "texture is not square"),
            Self::NotPowerOfTwo => {
                write!(f, "texture dimensions are not powers of two")
            }
            Self::TooSmall => {
                write!(f, "texture is below the minimum mipmap size")
            }
        }
    }
}

/// Errors produced by the softras crate.
#[derive(Debug)]
pub enum SoftrasError {
    /// Generic I/O failure.
    Io(std::io::Error),
    /// A serialized texture stream is malformed (bad magic, channel or
    /// byte-count mismatch, truncated data).
    TextureDecode(String),
    /// Mipmap generation precondition failure.
    Mipmap(MipmapError),
    /// Radiance HDR file parse failure.
    HdrParse(String),
    /// LDR image decode/encode failure.
    Image(String),
    /// Mesh construction failure (index count, out-of-range index).
    InvalidMesh(String),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for SoftrasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TextureDecode(msg) => {
                write!(f, "texture decode error: {msg}")
            }
            Self::Mipmap(e) => write!(f, "mipmap generation failed: {e}"),
            Self::HdrParse(msg) => write!(f, "HDR parse error: {msg}"),
            Self::Image(msg) => write!(f, "image error: {msg}"),
            Self::InvalidMesh(msg) => write!(f, "invalid mesh: {msg}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for SoftrasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SoftrasError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MipmapError> for SoftrasError {
    fn from(e: MipmapError) -> Self {
        Self::Mipmap(e)
    }
}
