//! Quarantine directory for removed records
//!
//! Every record removed by repair is first written here, byte for byte:
//!
//! 1. Create `header.<index>` exclusively (never overwrite an earlier dump)
//! 2. Write the raw value, fsync the file
//! 3. fsync the quarantine directory
//! 4. Append one JSON line to `manifest.jsonl` and fsync it
//!
//! Only after all four steps succeed may the record be deleted from the store.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::RepairTarget;

/// File name prefix of quarantined record dumps
pub const DUMP_PREFIX: &str = "header";

/// Append-only log describing every dump in the directory
pub const MANIFEST_FILE: &str = "manifest.jsonl";

/// Upper bound on `.N` suffixes tried before giving up on a free name
const MAX_NAME_ATTEMPTS: u32 = 1024;

/// One line of `manifest.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub run_id: Uuid,
    /// Format: YYYY-MM-DDTHH:MM:SSZ
    pub quarantined_at: String,
    pub index: u64,
    pub kind: String,
    /// Hex encoding of the exact key bytes
    pub key: String,
    pub key_len: usize,
    pub instance: u32,
    pub bytes: usize,
    pub crc32: u32,
    /// Dump file name, relative to the quarantine directory
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handle on a prepared quarantine directory.
#[derive(Debug, Clone)]
pub struct Quarantine {
    dir: PathBuf,
    run_id: Uuid,
}

impl Quarantine {
    /// Creates `dir` (mode 0700 on unix) if missing.
    pub fn prepare(dir: &Path, run_id: Uuid) -> io::Result<Self> {
        if !dir.is_dir() {
            create_private_dir(dir)?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            run_id,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Durably writes `value` for `target` and returns the dump path.
    pub fn dump(&self, target: &RepairTarget, value: &[u8]) -> io::Result<PathBuf> {
        let (path, mut file) = self.create_dump_file(target.index)?;

        file.write_all(value)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        fsync_dir(&self.dir)?;
        self.append_manifest(target, value, &path)?;

        Ok(path)
    }

    /// Reads back every manifest line.
    pub fn read_manifest(dir: &Path) -> io::Result<Vec<QuarantineEntry>> {
        let path = dir.join(MANIFEST_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .collect()
    }

    fn create_dump_file(&self, index: u64) -> io::Result<(PathBuf, File)> {
        let base = format!("{}.{}", DUMP_PREFIX, index);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{}.{}", base, attempt)
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free quarantine name for {}", base),
        ))
    }

    fn append_manifest(&self, target: &RepairTarget, value: &[u8], path: &Path) -> io::Result<()> {
        let entry = QuarantineEntry {
            run_id: self.run_id,
            quarantined_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            index: target.index,
            kind: target.kind.to_string(),
            key: target.key.to_hex(),
            key_len: target.key.len(),
            instance: target.instance,
            bytes: value.len(),
            crc32: crc32fast::hash(value),
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            message: target.message.clone(),
        };

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut manifest = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(MANIFEST_FILE))?;
        manifest.write_all(line.as_bytes())?;
        manifest.sync_data()
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// fsync a directory so new entries survive a crash.
#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::classification::{RecordKey, TargetKind};
    use tempfile::TempDir;

    fn target(index: u64, key: Vec<u8>) -> RepairTarget {
        let key = RecordKey::new(key);
        RepairTarget {
            index,
            kind: TargetKind::Damaged,
            instance: key.instance(),
            key,
            message: Some("hdr tags: BAD".to_string()),
        }
    }

    #[test]
    fn test_prepare_creates_private_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("broken");

        let quarantine = Quarantine::prepare(&dir, Uuid::new_v4()).unwrap();
        assert!(quarantine.dir().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&dir).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_dump_writes_exact_bytes_and_manifest() {
        let temp = TempDir::new().unwrap();
        let quarantine = Quarantine::prepare(temp.path(), Uuid::new_v4()).unwrap();
        let value = b"\x00\x00\x00\x00garbage".to_vec();

        let path = quarantine.dump(&target(6, vec![0, 0, 0, 7]), &value).unwrap();

        assert_eq!(path, temp.path().join("header.6"));
        assert_eq!(fs::read(&path).unwrap(), value);

        let manifest = Quarantine::read_manifest(temp.path()).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].index, 6);
        assert_eq!(manifest[0].instance, 7);
        assert_eq!(manifest[0].key, "00000007");
        assert_eq!(manifest[0].bytes, value.len());
        assert_eq!(manifest[0].crc32, crc32fast::hash(&value));
        assert_eq!(manifest[0].file, "header.6");
        assert_eq!(manifest[0].run_id, quarantine.run_id());
    }

    #[test]
    fn test_existing_dump_is_never_overwritten() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("header.3"), b"from an earlier run").unwrap();
        fs::write(temp.path().join("header.3.1"), b"and another").unwrap();
        let quarantine = Quarantine::prepare(temp.path(), Uuid::new_v4()).unwrap();

        let path = quarantine.dump(&target(3, vec![1, 2, 3, 4]), b"new").unwrap();

        assert_eq!(path, temp.path().join("header.3.2"));
        assert_eq!(
            fs::read(temp.path().join("header.3")).unwrap(),
            b"from an earlier run"
        );
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_missing_manifest_reads_empty() {
        let temp = TempDir::new().unwrap();
        assert!(Quarantine::read_manifest(temp.path()).unwrap().is_empty());
    }
}
