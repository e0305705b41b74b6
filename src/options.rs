//! Encoder option normalization
//!
//! Turns the raw form values a client sends into a bounded [`EncodeOptions`]
//! and renders them as `cwebp` arguments. Normalization never fails: anything
//! out of range falls back to the encoder defaults.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use utoipa::ToSchema;

/// Quality used when the client sends none or an invalid one
pub const DEFAULT_QUALITY: u8 = 80;

/// Upper bound (exclusive) of the compression effort (`-m`) setting
const EFFORT_LIMIT: i64 = 4;

/// Raw option values from the upload form
///
/// Every field is the untouched string the client sent, or `None` when the
/// field was absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawEncodeOptions {
    /// `quality` form field
    pub quality: Option<String>,
    /// `lossless` form field
    pub lossless: Option<String>,
    /// `effort` form field
    pub effort: Option<String>,
    /// `maxWidth` form field
    pub max_width: Option<String>,
    /// `maxHeight` form field
    pub max_height: Option<String>,
}

/// Resize directive passed to the encoder
///
/// A zero axis means "scale to preserve the aspect ratio".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Resize {
    /// Target width in pixels, 0 = auto
    pub width: u32,
    /// Target height in pixels, 0 = auto
    pub height: u32,
}

/// Validated encoder settings shared by every job of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EncodeOptions {
    /// Lossy quality factor in 0..=100 (ignored when `lossless` is set)
    pub quality: u8,
    /// Encode losslessly
    pub lossless: bool,
    /// Compression effort in 0..=3, `None` = encoder default
    pub effort: Option<u8>,
    /// Optional resize directive
    pub resize: Option<Resize>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            lossless: false,
            effort: None,
            resize: None,
        }
    }
}

impl EncodeOptions {
    /// Normalize raw form values
    pub fn normalize(raw: &RawEncodeOptions) -> Self {
        let quality = raw
            .quality
            .as_deref()
            .and_then(parse_int)
            .filter(|q| (0..=100).contains(q))
            .and_then(|q| u8::try_from(q).ok())
            .unwrap_or(DEFAULT_QUALITY);

        let lossless = raw.lossless.as_deref() == Some("true");

        let effort = raw
            .effort
            .as_deref()
            .and_then(parse_int)
            .filter(|e| (0..EFFORT_LIMIT).contains(e))
            .and_then(|e| u8::try_from(e).ok());

        let width = positive_dimension(raw.max_width.as_deref());
        let height = positive_dimension(raw.max_height.as_deref());
        let resize = match (width, height) {
            (None, None) => None,
            (width, height) => Some(Resize {
                width: width.unwrap_or(0),
                height: height.unwrap_or(0),
            }),
        };

        Self {
            quality,
            lossless,
            effort,
            resize,
        }
    }

    /// Encoder flags, without the input/output paths
    ///
    /// `-q` is omitted in lossless mode, where it would be meaningless.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.lossless {
            args.push("-lossless".to_string());
        } else {
            args.push("-q".to_string());
            args.push(self.quality.to_string());
        }

        if let Some(effort) = self.effort {
            args.push("-m".to_string());
            args.push(effort.to_string());
        }

        if let Some(resize) = self.resize {
            args.push("-resize".to_string());
            args.push(resize.width.to_string());
            args.push(resize.height.to_string());
        }

        args
    }

    /// Full `cwebp` command line: flags, input, `-o`, output
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.to_args().into_iter().map(OsString::from).collect();
        args.push(input.as_os_str().to_owned());
        args.push(OsString::from("-o"));
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// Parse a dimension, keeping it only when strictly positive
fn positive_dimension(raw: Option<&str>) -> Option<u32> {
    raw.and_then(parse_int)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

/// Lenient integer parsing matching what browsers' forms historically got
///
/// Leading whitespace and a sign are accepted; the longest run of leading
/// digits is parsed and anything after it is ignored. Returns `None` when no
/// digit follows the optional sign or the value does not fit in an `i64`.
pub(crate) fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
