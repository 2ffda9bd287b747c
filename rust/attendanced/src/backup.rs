use crate::model::StudentAttendance;
use anyhow::{anyhow, Context};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const ROSTER_ENTRY: &str = "data/students.json";
pub const SNAPSHOT_FORMAT_V1: &str = "attendance-snapshot-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_id: String,
    pub student_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportedSnapshot {
    pub bundle_id: String,
    pub students: Vec<StudentAttendance>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Writes the roster to a zip bundle next to a manifest carrying the
/// payload checksum.
pub fn export_snapshot(
    students: &[Arc<StudentAttendance>],
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let payload = serde_json::to_vec_pretty(students).context("failed to serialize roster")?;
    let checksum = sha256_hex(&payload);
    let bundle_id = Uuid::new_v4().to_string();

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": SNAPSHOT_FORMAT_V1,
        "bundleId": bundle_id,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": Utc::now().to_rfc3339(),
        "studentCount": students.len(),
        "sha256": checksum,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(ROSTER_ENTRY, opts)
        .context("failed to start roster entry")?;
    zip.write_all(&payload)
        .context("failed to write roster entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    log::info!(
        "exported {} students to {}",
        students.len(),
        out_path.to_string_lossy()
    );
    Ok(ExportSummary {
        bundle_id,
        student_count: students.len(),
        sha256: checksum,
    })
}

pub fn import_snapshot(in_path: &Path) -> anyhow::Result<ImportedSnapshot> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != SNAPSHOT_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut payload = Vec::new();
    archive
        .by_name(ROSTER_ENTRY)
        .context("bundle missing data/students.json")?
        .read_to_end(&mut payload)
        .context("failed to read roster entry")?;

    let expected = manifest
        .get("sha256")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let actual = sha256_hex(&payload);
    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(anyhow!(
            "roster checksum mismatch (manifest {}, payload {})",
            expected,
            actual
        ));
    }

    let students: Vec<StudentAttendance> =
        serde_json::from_slice(&payload).context("roster entry is not a valid roster")?;
    let bundle_id = manifest
        .get("bundleId")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    log::info!(
        "imported {} students from {}",
        students.len(),
        in_path.to_string_lossy()
    );
    Ok(ImportedSnapshot {
        bundle_id,
        students,
    })
}
