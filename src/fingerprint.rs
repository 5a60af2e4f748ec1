//! Format-aware content fingerprints.
//!
//! Spreadsheets are hashed over their cell values so that re-saving a file
//! (new modification date, column widths, styling) does not register as a
//! change. Everything else is hashed byte for byte.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Read buffer for byte-stream hashing.
const CHUNK_SIZE: usize = 4096;

/// Formats accepted for site-reported change times, tried in order.
const HINT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Spreadsheet formats hashed by cell value.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm"];

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("spreadsheet has no readable worksheets")]
    EmptyWorkbook,
}

/// Content fingerprint plus the best-effort change time reported by the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Hex-encoded SHA-256.
    pub hashsum: String,
    pub last_changed: DateTime<Utc>,
}

/// Whether files with this extension are hashed by cell value.
pub fn is_spreadsheet(extension: Option<&str>) -> bool {
    extension
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Fingerprint a downloaded file.
///
/// `extension` decides the hashing strategy; it is the extension of the file
/// after any conversion, not necessarily the one in the URL.
pub fn fingerprint(
    path: &Path,
    extension: Option<&str>,
    last_changed_hint: Option<&str>,
) -> Result<Fingerprint, FingerprintError> {
    let hashsum = if is_spreadsheet(extension) {
        hash_spreadsheet(path)?
    } else {
        hash_bytes(path)?
    };

    Ok(Fingerprint {
        hashsum,
        last_changed: parse_last_changed(last_changed_hint, Utc::now()),
    })
}

/// Hash every worksheet's cell values in sheet order.
///
/// Each row is serialized with the cell type so that the number `1` and the
/// text `"1"` hash differently. Formulas are not read; only cached values.
pub fn hash_spreadsheet(path: &Path) -> Result<String, FingerprintError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(FingerprintError::EmptyWorkbook);
    }

    let mut hasher = Sha256::new();
    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        hasher.update(b"\x1esheet\n");
        if let Some((row, col)) = range.start() {
            hasher.update(format!("@{},{}\n", row, col).as_bytes());
        }
        for row in range.rows() {
            hasher.update(format!("{:?}\n", row).as_bytes());
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash the raw byte stream in fixed-size chunks.
pub fn hash_bytes(path: &Path) -> Result<String, FingerprintError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Parse a site-reported change time, falling back to `now`.
///
/// RFC 3339 strings keep their offset; naive timestamps are taken as local
/// time.
pub fn parse_last_changed(hint: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
        return now;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(hint) {
        return dt.with_timezone(&Utc);
    }

    for format in HINT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(hint, format) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return local.with_timezone(&Utc);
            }
        }
    }

    tracing::debug!("Unparseable last-changed hint '{}', using current time", hint);
    now
}
