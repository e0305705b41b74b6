//! Fake encoder script, multipart bodies and router setup

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use webp_convert::api::create_router;
use webp_convert::{BatchOrchestrator, Config, encoder};

pub const BOUNDARY: &str = "----WebpConvertTestBoundary";

/// Stand-in for cwebp with the same command line
///
/// Writes a RIFF/WEBP header followed by the input bytes to the `-o` path.
/// Inputs containing `BROKEN` fail with a diagnostic on stderr; inputs
/// containing `SLOW` sleep before converting.
const FAKE_CWEBP: &str = r#"#!/bin/sh
out=""
in=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -q|-m) shift 2 ;;
    -resize) shift 3 ;;
    -lossless) shift ;;
    *) in="$1"; shift ;;
  esac
done
if grep -q BROKEN "$in"; then
  echo "Could not process file $in" >&2
  exit 1
fi
if grep -q SLOW "$in"; then
  sleep 5
fi
printf 'RIFF\044\000\000\000WEBPVP8 ' > "$out"
cat "$in" >> "$out"
"#;

/// 1x1 transparent PNG
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Path of the fake cwebp script, written once per test binary
pub fn fake_cwebp() -> &'static Path {
    static SCRIPT: OnceLock<PathBuf> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let path = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fake-cwebp.sh");
        std::fs::write(&path, FAKE_CWEBP).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

/// Config with the work dir inside `root` and the fake cwebp configured
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.batch.work_dir = root.join("uploads");
    config.encoder.binary_path = Some(fake_cwebp().to_path_buf());
    config
}

/// Router wired the same way the binary wires it
pub fn build_router(config: Config) -> Router {
    let config = Arc::new(config);
    let encoder = encoder::from_config(&config.encoder);
    let orchestrator = Arc::new(BatchOrchestrator::from_config(encoder, &config));
    create_router(orchestrator, config)
}

/// One part of a multipart form
pub enum Part<'a> {
    Image(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Image(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn convert_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Every file left under `dir`
pub fn leftover_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Wait for the response cleanup to delete every artifact under `work_dir`
pub async fn assert_no_artifacts(work_dir: &Path) {
    for _ in 0..200 {
        let workspaces = std::fs::read_dir(work_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        if workspaces == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "artifacts left behind: {:?}",
        leftover_files(work_dir)
    );
}
