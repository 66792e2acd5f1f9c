//! Builder for store archives: base64 text of a zlib-compressed zip with
//! `root/`, `reports/` and `content_hashes.json` entries.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finding record as found in `reports/*.json`.
pub fn finding(checker: &str, file: usize, line: i32, message: &str) -> Value {
    json!({
        "checkerName": checker,
        "analyzerName": "clangsa",
        "message": message,
        "file": file,
        "line": line,
        "column": 1,
    })
}

/// Content hash of a source file as the analyzer side computes it.
pub fn content_hash_of(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn bug_path_step(file: usize, line: i32, message: &str) -> Value {
    json!({ "file": file, "line": line, "column": 1, "message": message })
}

#[derive(Default)]
pub struct ArchiveBuilder {
    sources: BTreeMap<String, Vec<u8>>,
    report_files: BTreeMap<String, Value>,
    metadata: Option<Value>,
    skip_file: Option<String>,
    content_hashes: BTreeMap<String, String>,
    extra_entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an analyzed source file, e.g. `/src/main.c`, together with its
    /// content hash.
    pub fn source(mut self, path: &str, content: &str) -> Self {
        self.content_hashes
            .insert(path.to_string(), content_hash_of(content));
        self.sources
            .insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn report_file(mut self, name: &str, files: &[&str], reports: Vec<Value>) -> Self {
        self.report_files.insert(
            name.to_string(),
            json!({ "files": files, "reports": reports }),
        );
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn skip_file(mut self, content: &str) -> Self {
        self.skip_file = Some(content.to_string());
        self
    }

    /// Hash entry without a source file, for contents the server already
    /// has.
    pub fn content_hash(mut self, path: &str, hash: &str) -> Self {
        self.content_hashes
            .insert(path.to_string(), hash.to_string());
        self
    }

    /// Raw zip entry, for archives the server should reject.
    pub fn raw_entry(mut self, name: &str, content: &[u8]) -> Self {
        self.extra_entries.push((name.to_string(), content.to_vec()));
        self
    }

    pub fn zip_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut add = |name: &str, bytes: &[u8]| -> io::Result<()> {
            writer.start_file(name, options).map_err(to_io)?;
            writer.write_all(bytes)
        };

        for (path, content) in &self.sources {
            add(&format!("root/{}", path.trim_start_matches('/')), content)?;
        }
        for (name, report) in &self.report_files {
            add(&format!("reports/{}", name), &serde_json::to_vec(report)?)?;
        }
        if let Some(metadata) = &self.metadata {
            add("reports/metadata.json", &serde_json::to_vec(metadata)?)?;
        }
        if let Some(skip) = &self.skip_file {
            add("reports/skip_file", skip.as_bytes())?;
        }
        if !self.content_hashes.is_empty() {
            add("content_hashes.json", &serde_json::to_vec(&self.content_hashes)?)?;
        }
        for (name, content) in &self.extra_entries {
            add(name, content)?;
        }

        Ok(writer.finish().map_err(to_io)?.into_inner())
    }

    /// The encoded payload of a store request.
    pub fn build(&self) -> io::Result<String> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.zip_bytes()?)?;
        Ok(STANDARD.encode(encoder.finish()?))
    }
}

fn to_io(err: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
