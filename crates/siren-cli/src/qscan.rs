//! Distribution of qscan diagnostic results from a remote cluster.
//!
//! A followup batch produces one `.tar.gz` of qscan output per remote
//! interferometer, plus cache manifests naming where each result
//! belongs. Each manifest line is whitespace-separated
//! `<ifo> <qscan-type> <gps-time> <output-path>`; the GPS time names the
//! result subdirectory under `RESULTS/results_<type>/` inside the
//! archive. The relocation plan is an explicit mapping from qscan type
//! to its entries, looked up directly from the manifests.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;

/// One relocation: where a result subdirectory sits in the archive and
/// where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QscanEntry {
    /// Destination directory from the cache manifest.
    pub output_dir: PathBuf,
    /// GPS-time-named subdirectory under `RESULTS/results_<type>/`.
    pub result_subdir: String,
}

/// Relocation plan: qscan types in request order, each with its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QscanPlan {
    /// Per-type entry lists, in the requested type order.
    pub types: Vec<(String, Vec<QscanEntry>)>,
}

/// Parse the entries of one qscan type for one interferometer out of a
/// cache manifest. Entries come back in file order; blank lines and
/// `#` comments are skipped.
pub fn entries_from_cache(cache: &Path, qscan_type: &str, ifo: &str) -> Result<Vec<QscanEntry>> {
    let text = fs::read_to_string(cache)
        .with_context(|| format!("cache file {} could not be read", cache.display()))?;

    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            bail!(
                "{}:{}: expected 4 fields (ifo, type, gps time, path), got {}",
                cache.display(),
                lineno + 1,
                fields.len()
            );
        }
        if fields[0] == ifo && fields[1] == qscan_type {
            entries.push(QscanEntry {
                output_dir: PathBuf::from(fields[3]),
                result_subdir: fields[2].to_string(),
            });
        }
    }
    Ok(entries)
}

/// Build the relocation plan, looking each qscan type up in the
/// foreground or background manifest according to its prefix.
pub fn build_plan(
    types: &[String],
    foreground_cache: &Path,
    background_cache: &Path,
    ifo: &str,
) -> Result<QscanPlan> {
    let mut plan = Vec::new();
    for qscan_type in types {
        let cache = match qscan_type.split('-').next() {
            Some("foreground") => foreground_cache,
            Some("background") => background_cache,
            _ => bail!("qscan type {:?} has no foreground/background prefix", qscan_type),
        };
        plan.push((qscan_type.clone(), entries_from_cache(cache, qscan_type, ifo)?));
    }
    Ok(QscanPlan { types: plan })
}

/// Unpack the results archive in its parent directory and move every
/// planned result subdirectory into its destination.
///
/// An already-existing destination is left untouched with a warning; a
/// result subdirectory missing from the archive is an error. The
/// scratch `<ifo>_qscans_results` directory left behind by the remote
/// batch is removed afterwards. Returns the number of directories moved.
pub fn distribute(archive: &Path, plan: &QscanPlan, ifo: &str) -> Result<usize> {
    let name = match archive.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => bail!("archive path {} has no file name", archive.display()),
    };
    let stem = match name.strip_suffix(".tar.gz") {
        Some(stem) => stem,
        None => bail!("file {} is not a .tar.gz archive", archive.display()),
    };
    let parent = archive.parent().unwrap_or_else(|| Path::new("."));

    let gz = fs::File::open(archive)
        .with_context(|| format!("archive {} could not be opened", archive.display()))?;
    Archive::new(GzDecoder::new(gz))
        .unpack(parent)
        .with_context(|| format!("unpacking {}", archive.display()))?;

    let results_root = parent.join(stem).join("RESULTS");
    let mut moved = 0;
    for (qscan_type, entries) in &plan.types {
        let type_root = results_root.join(format!("results_{}", qscan_type));
        for entry in entries {
            let result_path = type_root.join(&entry.result_subdir);
            if !result_path.is_dir() {
                bail!("directory {} could not be found in the archive", result_path.display());
            }
            if entry.output_dir.exists() {
                log::warn!(
                    "directory {} already exists, not overwritten with new qscan results",
                    entry.output_dir.display()
                );
                continue;
            }
            if let Some(dest_parent) = entry.output_dir.parent() {
                fs::create_dir_all(dest_parent)
                    .with_context(|| format!("creating {}", dest_parent.display()))?;
            }
            fs::rename(&result_path, &entry.output_dir).with_context(|| {
                format!(
                    "moving {} to {}",
                    result_path.display(),
                    entry.output_dir.display()
                )
            })?;
            log::info!(
                "moved {} to {}",
                result_path.display(),
                entry.output_dir.display()
            );
            moved += 1;
        }
    }

    // clean up the scratch directory the remote batch ships alongside
    // the results
    let scratch = parent.join(format!("{}_qscans_results", ifo));
    if scratch.exists() {
        fs::remove_dir_all(&scratch)
            .with_context(|| format!("removing {}", scratch.display()))?;
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_cache(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn test_entries_filtered_by_type_and_ifo() {
        let dir = tempfile::tempdir().unwrap();
        let cache = write_cache(
            dir.path(),
            "foreground.cache",
            &[
                "# comment",
                "V1 foreground-qscan 934567890 /data/events/934567890/qscan",
                "V1 foreground-seismic-qscan 934567890 /data/events/934567890/seismic",
                "H1 foreground-qscan 934567891 /data/events/934567891/qscan",
                "",
                "V1 foreground-qscan 934567892 /data/events/934567892/qscan",
            ],
        );

        let entries = entries_from_cache(&cache, "foreground-qscan", "V1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].result_subdir, "934567890");
        assert_eq!(entries[1].result_subdir, "934567892");
        assert_eq!(
            entries[0].output_dir,
            PathBuf::from("/data/events/934567890/qscan")
        );
    }

    #[test]
    fn test_malformed_cache_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = write_cache(dir.path(), "bad.cache", &["V1 foreground-qscan 934567890"]);
        assert!(entries_from_cache(&cache, "foreground-qscan", "V1").is_err());
    }

    #[test]
    fn test_plan_routes_types_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let fg = write_cache(
            dir.path(),
            "fg.cache",
            &["V1 foreground-qscan 1000 /out/fg/1000"],
        );
        let bg = write_cache(
            dir.path(),
            "bg.cache",
            &["V1 background-qscan 2000 /out/bg/2000"],
        );

        let types = vec!["foreground-qscan".to_string(), "background-qscan".to_string()];
        let plan = build_plan(&types, &fg, &bg, "V1").unwrap();
        assert_eq!(plan.types.len(), 2);
        assert_eq!(plan.types[0].1[0].result_subdir, "1000");
        assert_eq!(plan.types[1].1[0].result_subdir, "2000");

        let bad = vec!["sideband-qscan".to_string()];
        assert!(build_plan(&bad, &fg, &bg, "V1").is_err());
    }

    fn build_archive(dir: &Path, stem: &str, members: &[&str]) -> PathBuf {
        let payload_root = dir.join("payload");
        for member in members {
            let full = payload_root.join(stem).join(member);
            fs::create_dir_all(&full).unwrap();
            fs::write(full.join("summary.txt"), "qscan output").unwrap();
        }
        let archive_path = dir.join(format!("{}.tar.gz", stem));
        let gz = GzEncoder::new(fs::File::create(&archive_path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        builder.append_dir_all(stem, payload_root.join(stem)).unwrap();
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        fs::remove_dir_all(&payload_root).unwrap();
        archive_path
    }

    #[test]
    fn test_distribute_moves_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(
            dir.path(),
            "V1_results",
            &[
                "RESULTS/results_foreground-qscan/1000",
                "RESULTS/results_foreground-qscan/2000",
            ],
        );

        let dest_a = dir.path().join("events/1000/qscan");
        let dest_b = dir.path().join("events/2000/qscan");
        // pre-existing destination must survive untouched
        fs::create_dir_all(&dest_b).unwrap();
        fs::write(dest_b.join("keep.txt"), "old").unwrap();

        let plan = QscanPlan {
            types: vec![(
                "foreground-qscan".to_string(),
                vec![
                    QscanEntry { output_dir: dest_a.clone(), result_subdir: "1000".into() },
                    QscanEntry { output_dir: dest_b.clone(), result_subdir: "2000".into() },
                ],
            )],
        };

        let moved = distribute(&archive, &plan, "V1").unwrap();
        assert_eq!(moved, 1);
        assert!(dest_a.join("summary.txt").is_file());
        assert!(dest_b.join("keep.txt").is_file());
        assert!(!dest_b.join("summary.txt").exists());
    }

    #[test]
    fn test_distribute_missing_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(
            dir.path(),
            "V1_results",
            &["RESULTS/results_foreground-qscan/1000"],
        );
        let plan = QscanPlan {
            types: vec![(
                "foreground-qscan".to_string(),
                vec![QscanEntry {
                    output_dir: dir.path().join("events/9999/qscan"),
                    result_subdir: "9999".into(),
                }],
            )],
        };
        assert!(distribute(&archive, &plan, "V1").is_err());
    }

    #[test]
    fn test_distribute_rejects_non_targz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.zip");
        fs::write(&path, "not a tarball").unwrap();
        let plan = QscanPlan { types: vec![] };
        assert!(distribute(&path, &plan, "V1").is_err());
    }

    #[test]
    fn test_distribute_removes_scratch_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(
            dir.path(),
            "V1_results",
            &["RESULTS/results_background-qscan/3000"],
        );
        let scratch = dir.path().join("V1_qscans_results");
        fs::create_dir_all(&scratch).unwrap();

        let plan = QscanPlan {
            types: vec![(
                "background-qscan".to_string(),
                vec![QscanEntry {
                    output_dir: dir.path().join("events/3000/qscan"),
                    result_subdir: "3000".into(),
                }],
            )],
        };
        distribute(&archive, &plan, "V1").unwrap();
        assert!(!scratch.exists());
    }
}
