//! Output filename resolution
//!
//! Display names are what the client sees: the download filename of a
//! single-file response, or the entry names inside a batch archive. They are
//! never used as storage paths; artifacts on disk are named by job id.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Extension of every converted artifact
pub const OUTPUT_EXTENSION: &str = "webp";

/// Base name used when an upload carries no usable filename at all
const FALLBACK_BASE: &str = "image";

// Literal patterns; a compile failure is a programming error
#[allow(clippy::expect_used)]
static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("valid sanitization pattern"));

#[allow(clippy::expect_used)]
static TRAILING_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^/.]+$").expect("valid extension pattern"));

/// Resolve the display filename of one output
///
/// The client's desired name only applies when the batch holds exactly one
/// file; otherwise (or when sanitizing leaves nothing) the name is derived
/// from the upload's own filename.
///
/// # Examples
///
/// ```
/// use webp_convert::naming::resolve_display_name;
///
/// assert_eq!(resolve_display_name("IMG_0001.JPG", Some("holiday pic.png"), 1), "holiday_pic.webp");
/// assert_eq!(resolve_display_name("IMG_0001.JPG", Some("holiday"), 3), "IMG_0001.webp");
/// assert_eq!(resolve_display_name("IMG_0001.JPG", Some("***"), 1), "IMG_0001.webp");
/// ```
pub fn resolve_display_name(
    original_name: &str,
    desired_name: Option<&str>,
    batch_size: usize,
) -> String {
    let desired_base = if batch_size == 1 {
        desired_name.and_then(sanitize_desired_name)
    } else {
        None
    };

    let base = desired_base.unwrap_or_else(|| original_base_name(original_name));

    format!("{base}.{OUTPUT_EXTENSION}")
}

/// Strip one trailing extension and replace anything outside `[A-Za-z0-9_-]`
///
/// Returns `None` when no allowed character remains, i.e. the name would be
/// nothing but replacement underscores.
pub fn sanitize_desired_name(desired: &str) -> Option<String> {
    let without_extension = TRAILING_EXTENSION.replace(desired, "");
    if !without_extension
        .chars()
        .any(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }

    Some(
        DISALLOWED_CHARS
            .replace_all(&without_extension, "_")
            .into_owned(),
    )
}

/// Base name of an uploaded file: final path component, last extension removed
///
/// Clients may send full paths (some browsers do) with either separator. A
/// leading dot does not start an extension, so `.hidden` stays as is.
pub fn original_base_name(original_name: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let base = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };

    if base.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        base.to_string()
    }
}

/// Make archive entry names unique, keeping upload order
///
/// Later duplicates get ` (1)`, ` (2)`, ... inserted before the extension.
pub fn dedupe_entry_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut taken = HashSet::new();
    let mut unique = Vec::new();

    for name in names {
        let name = name.as_ref();
        let mut candidate = name.to_string();

        if taken.contains(&candidate) {
            let (stem, extension) = match name.rfind('.') {
                Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
                _ => (name, ""),
            };

            let mut counter = 1;
            loop {
                candidate = format!("{stem} ({counter}){extension}");
                if !taken.contains(&candidate) {
                    break;
                }
                counter += 1;
            }
        }

        taken.insert(candidate.clone());
        unique.push(candidate);
    }

    unique
}

/// `Content-Disposition` value for an attachment download
///
/// Carries an ASCII fallback and an RFC 5987 `filename*` for clients that
/// understand it.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}
