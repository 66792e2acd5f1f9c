//! Store archive handling
//!
//! A store request carries its payload as base64 text of a zlib-compressed
//! zip file. [`StoreArchive::decode`] unpacks it into a scratch directory
//! that is removed when the value is dropped:
//!
//! - `root/<path>` source files, keyed by the analyzed path without its leading `/`
//! - `reports/*.json` finding records, `reports/metadata.json`, `reports/skip_file`
//! - `content_hashes.json` mapping analyzed paths to content hashes

pub mod metadata;
pub mod records;
pub mod skip_list;

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::ZlibDecoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::errors::{ArchiveError, ArchiveResult};

pub use metadata::{AnalyzerStats, CheckerInfo, CheckerSet, Metadata};
pub use records::{BugPathStep, FindingFile, FindingRecord};
pub use skip_list::SkipList;

const SOURCE_DIR: &str = "root";
const REPORTS_DIR: &str = "reports";
const METADATA_FILE: &str = "metadata.json";
const SKIP_FILE: &str = "skip_file";
const CONTENT_HASHES_FILE: &str = "content_hashes.json";

/// An unpacked store archive living in a temporary directory.
pub struct StoreArchive {
    dir: TempDir,
}

impl StoreArchive {
    /// Decode and unpack a store payload. This does blocking IO.
    pub fn decode(payload: &str) -> ArchiveResult<Self> {
        let compressed = STANDARD.decode(payload.trim())?;
        let mut zip_bytes = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut zip_bytes)
            .map_err(ArchiveError::Decompress)?;

        let dir = tempfile::Builder::new().prefix("reportdb-store-").tempdir()?;
        let written = extract_zip(&zip_bytes, dir.path())?;
        debug!(
            "Unpacked {} archive entries into {}",
            written,
            dir.path().display()
        );
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of an analyzed source file inside the archive.
    pub fn source_path(&self, analyzed_path: &str) -> PathBuf {
        self.dir
            .path()
            .join(SOURCE_DIR)
            .join(analyzed_path.trim_start_matches('/'))
    }

    pub fn read_source(&self, analyzed_path: &str) -> Option<Vec<u8>> {
        fs::read(self.source_path(analyzed_path)).ok()
    }

    pub fn metadata(&self) -> ArchiveResult<Metadata> {
        let path = self.dir.path().join(REPORTS_DIR).join(METADATA_FILE);
        if !path.exists() {
            return Ok(Metadata::default());
        }
        read_json(&path)
    }

    pub fn skip_list(&self) -> ArchiveResult<SkipList> {
        let path = self.dir.path().join(REPORTS_DIR).join(SKIP_FILE);
        if !path.exists() {
            return Ok(SkipList::default());
        }
        Ok(SkipList::parse(&fs::read_to_string(path)?))
    }

    /// Analyzed path to content hash. Sources missing from the sender's map
    /// are hashed here.
    pub fn content_hashes(&self) -> ArchiveResult<HashMap<String, String>> {
        let path = self.dir.path().join(CONTENT_HASHES_FILE);
        let mut hashes: HashMap<String, String> = if path.exists() {
            read_json(&path)?
        } else {
            HashMap::new()
        };

        let source_root = self.dir.path().join(SOURCE_DIR);
        for file in list_files(&source_root)? {
            let Ok(relative) = file.strip_prefix(&source_root) else {
                continue;
            };
            let analyzed = format!("/{}", relative.to_string_lossy());
            if !hashes.contains_key(&analyzed) {
                let bytes = fs::read(&file)?;
                hashes.insert(analyzed, sha256_hex(&bytes));
            }
        }
        Ok(hashes)
    }

    /// Parsed finding files. Files that fail to parse are logged and skipped.
    pub fn finding_files(&self) -> ArchiveResult<Vec<(PathBuf, FindingFile)>> {
        let reports_dir = self.dir.path().join(REPORTS_DIR);
        let mut parsed = Vec::new();
        for path in list_files(&reports_dir)? {
            let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
            let is_metadata = path.file_name().map(|n| n == METADATA_FILE).unwrap_or(false);
            if !is_json || is_metadata {
                continue;
            }
            match read_json::<FindingFile>(&path) {
                Ok(file) => parsed.push((path, file)),
                Err(e) => warn!("Skipping unparsable report file: {}", e),
            }
        }
        parsed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(parsed)
    }
}

/// Remove the longest matching prefix from an analyzed path.
///
/// Prefixes are matched on directory boundaries and the result keeps its
/// leading `/`.
pub fn trim_path_prefixes(path: &str, prefixes: &[String]) -> String {
    let longest = prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| {
            if prefix.ends_with('/') {
                prefix.clone()
            } else {
                format!("{}/", prefix)
            }
        })
        .filter(|prefix| path.starts_with(prefix.as_str()))
        .max_by_key(|prefix| prefix.len());

    match longest {
        Some(prefix) => path[prefix.len() - 1..].to_string(),
        None => path.to_string(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn sanitize_relative_path(path: &str) -> ArchiveResult<PathBuf> {
    let candidate = Path::new(path);
    if candidate.is_absolute()
        || candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(ArchiveError::UnsafeEntry(path.to_string()));
    }
    Ok(candidate.components().collect())
}

fn extract_zip(bytes: &[u8], target_dir: &Path) -> ArchiveResult<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let rel_path = sanitize_relative_path(entry.name())?;
        let out_path = target_dir.join(&rel_path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }

    Ok(written)
}

fn list_files(dir: &Path) -> ArchiveResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ArchiveResult<T> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw).map_err(|source| ArchiveError::Descriptor {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;
    use zip::write::FileOptions;

    fn encode(entries: &[(&str, &[u8])]) -> String {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            for (name, bytes) in entries {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(bytes).unwrap();
            }
            zip.finish().unwrap();
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&cursor.into_inner()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn trims_longest_prefix() {
        let prefixes = vec!["/home".to_string(), "/home/user/".to_string()];
        assert_eq!(trim_path_prefixes("/home/user/src/a.c", &prefixes), "/src/a.c");
        assert_eq!(trim_path_prefixes("/home/other/a.c", &prefixes), "/other/a.c");
        assert_eq!(trim_path_prefixes("/homework/a.c", &prefixes), "/homework/a.c");
        assert_eq!(trim_path_prefixes("/x/a.c", &[]), "/x/a.c");
    }

    #[test]
    fn decodes_layout_and_hashes_missing_sources() {
        let payload = encode(&[
            ("root/src/a.c", b"int main() {}\n"),
            ("root/src/b.c", b"void f();\n"),
            ("content_hashes.json", br#"{"/src/a.c": "given-hash"}"#),
            ("reports/a.json", br#"{"files": ["/src/a.c"], "reports": []}"#),
            ("reports/broken.json", b"{not json"),
            ("reports/skip_file", b"-/src/gen/*"),
        ]);
        let archive = StoreArchive::decode(&payload).unwrap();

        let hashes = archive.content_hashes().unwrap();
        assert_eq!(hashes["/src/a.c"], "given-hash");
        assert_eq!(hashes["/src/b.c"], sha256_hex(b"void f();\n"));

        let files = archive.finding_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(archive.skip_list().unwrap().should_skip("/src/gen/x.c"));
        assert_eq!(archive.metadata().unwrap().commands.len(), 0);
        assert_eq!(
            archive.read_source("/src/a.c").unwrap(),
            b"int main() {}\n".to_vec()
        );
    }

    #[test]
    fn lists_nested_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/z.c"), b"z").unwrap();
        fs::write(dir.path().join("a.c"), b"a").unwrap();
        fs::write(dir.path().join("b/y.c"), b"y").unwrap();

        let files: Vec<PathBuf> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a.c"),
                PathBuf::from("b/c/z.c"),
                PathBuf::from("b/y.c"),
            ]
        );
        assert!(list_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn rejects_escaping_entries() {
        let payload = encode(&[("../evil.txt", b"x")]);
        assert!(matches!(
            StoreArchive::decode(&payload),
            Err(ArchiveError::UnsafeEntry(_))
        ));
    }

    #[test]
    fn rejects_garbage_payloads() {
        assert!(matches!(
            StoreArchive::decode("@@not base64@@"),
            Err(ArchiveError::Base64(_))
        ));
        let not_zlib = STANDARD.encode(b"plain");
        assert!(matches!(
            StoreArchive::decode(&not_zlib),
            Err(ArchiveError::Decompress(_))
        ));
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let payload = encode(&[("root/a.c", b"x")]);
        let archive = StoreArchive::decode(&payload).unwrap();
        let path = archive.path().to_path_buf();
        assert!(path.exists());
        drop(archive);
        assert!(!path.exists());
    }
}
