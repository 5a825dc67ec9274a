//! Tools for `.zip` archives committed to a branch.
//!
//! Archive bytes come from git objects, never from the working tree. Listing
//! extracts into a fresh temporary directory that is removed when the tool
//! returns, on every path. Member reads are served from memory. Both are
//! bounded by decompressed size, not by the size of the archive.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::io::git::Git;
use crate::tools::ToolError;
use crate::tools::listing::{cap_entries, read_capped, truncate_text};
use crate::tools::local::sized_files_under;
use crate::tools::versioned::{ensure_not_option, qualify_ref};

const AVAILABLE_PREVIEW: usize = 20;

fn open_archive(
    git: &Git,
    branch: &str,
    zip_path: &str,
) -> Result<ZipArchive<Cursor<Vec<u8>>>, ToolError> {
    ensure_not_option("branch", branch)?;
    let reference = qualify_ref(branch);
    let bytes = git
        .show_bytes(&reference, zip_path)
        .map_err(|err| ToolError::Archive(format!("could not read zip: {err}")))?;
    debug!(bytes = bytes.len(), "fetched archive");
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ToolError::Archive(format!("could not open zip: {err}")))
}

/// Extract the archive to a scratch directory and list its files.
pub fn extract_and_list(
    git: &Git,
    branch: &str,
    zip_path: &str,
    scratch_root: Option<&Path>,
    max_entries: usize,
    max_extracted_bytes: usize,
) -> Result<String, ToolError> {
    info!(branch, zip_path, "extract_zip_and_list");
    let mut archive = open_archive(git, branch, zip_path)?;

    let builder = {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rankbot_zip_");
        builder
    };
    let scratch = match scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|err| ToolError::Io(format!("create extraction directory: {err}")))?;

    extract_bounded(&mut archive, scratch.path(), max_extracted_bytes)?;

    let entries = sized_files_under(scratch.path(), scratch.path())?;
    if entries.is_empty() {
        return Err(ToolError::EmptyListing("zip was empty"));
    }
    Ok(cap_entries(entries, max_entries))
}

/// Unpack every member under `dest`, giving up once the decompressed total
/// passes `max_bytes`. Members whose names leave `dest` are skipped.
fn extract_bounded(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    dest: &Path,
    max_bytes: usize,
) -> Result<(), ToolError> {
    let budget = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut remaining = budget;
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(extract_error)?;
        let Some(relative) = member.enclosed_name() else {
            warn!(member = member.name(), "skipping zip member outside the archive");
            continue;
        };
        let target = dest.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&target).map_err(extract_error)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(extract_error)?;
        }
        let mut out = fs::File::create(&target).map_err(extract_error)?;
        let written = io::copy(&mut (&mut member).take(remaining.saturating_add(1)), &mut out)
            .map_err(extract_error)?;
        if written > remaining {
            return Err(ToolError::Archive(format!(
                "zip expands beyond {budget} bytes"
            )));
        }
        remaining -= written;
    }
    Ok(())
}

fn extract_error(err: impl std::fmt::Display) -> ToolError {
    ToolError::Archive(format!("could not extract zip: {err}"))
}

/// Read one member of the archive.
pub fn read_member(
    git: &Git,
    branch: &str,
    zip_path: &str,
    member: &str,
    max_lines: usize,
    max_bytes: usize,
) -> Result<String, ToolError> {
    info!(branch, zip_path, member, "read_file_from_zip");
    let mut archive = open_archive(git, branch, zip_path)?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if !names.iter().any(|name| name == member) {
        return Err(ToolError::MemberNotFound {
            member: member.to_string(),
            available: names.into_iter().take(AVAILABLE_PREVIEW).collect(),
        });
    }

    let file = archive
        .by_name(member)
        .map_err(|err| ToolError::Archive(format!("could not open {member}: {err}")))?;
    let bytes = read_capped(file, max_bytes)
        .map_err(|err| ToolError::Archive(format!("could not read {member}: {err}")))?;
    Ok(truncate_text(&String::from_utf8_lossy(&bytes), max_lines, max_bytes))
}
