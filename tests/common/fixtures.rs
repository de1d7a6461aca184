//! Mock patch server and manifest builders

use patch_dl::verify::DigestAlgorithm;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One file served by the mock patch server
pub struct PatchFile {
    pub path: &'static str,
    pub body: Vec<u8>,
}

impl PatchFile {
    pub fn new(path: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            body: body.into(),
        }
    }

    pub fn md5(&self) -> String {
        DigestAlgorithm::Md5.hex_digest(&self.body)
    }
}

/// A small client patch: a config file, a texture and a map in nested folders
pub fn sample_patch() -> Vec<PatchFile> {
    vec![
        PatchFile::new("system/l2.ini", b"[Engine]\nGameName=L2\n".to_vec()),
        PatchFile::new("textures/ui/icons.utx", vec![0x7Fu8; 2048]),
        PatchFile::new("maps/20_21.unr", (0..=255u8).cycle().take(4096).collect::<Vec<_>>()),
    ]
}

/// Serve every file under `/patch/<path>`
pub async fn serve(files: &[PatchFile]) -> MockServer {
    let server = MockServer::start().await;
    for file in files {
        Mock::given(method("GET"))
            .and(path(format!("/patch/{}", file.path)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(file.body.clone()))
            .mount(&server)
            .await;
    }
    server
}

/// Manifest JSON with declared lengths and MD5 digests, links resolved from `base_url`
pub fn manifest(server: &MockServer, files: &[PatchFile]) -> String {
    let entries: Vec<_> = files
        .iter()
        .map(|file| {
            json!({
                "path": file.path,
                "length": file.body.len(),
                "hash": file.md5(),
            })
        })
        .collect();

    json!({
        "base_url": format!("{}/patch/", server.uri()),
        "files": entries,
    })
    .to_string()
}
