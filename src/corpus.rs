//! Facilities for discovering input files and loading text corpora.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{Result, TextBpeError};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Directories are traversed recursively by default; set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level.  Symlink traversal is controlled through
/// [`IngestConfig::follow_symlinks`].  Files found inside a directory are returned in
/// lexicographic path order so that training over a directory is reproducible.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(TextBpeError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| TextBpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let max_depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .follow_links(cfg.follow_symlinks)
                .max_depth(max_depth)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|err| TextBpeError::Internal(err.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if metadata.is_file() || (cfg.follow_symlinks && path.is_file()) {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(TextBpeError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Reads a whole file and decodes it as UTF-8.
///
/// Invalid UTF-8 is reported as [`TextBpeError::Utf8`]; no replacement characters are
/// substituted.
pub fn load_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| TextBpeError::io(err, Some(path.to_path_buf())))?;
    String::from_utf8(bytes).map_err(|err| TextBpeError::utf8(err, Some(path.to_path_buf())))
}

/// Loads every discovered file as one UTF-8 document, in discovery order.
///
/// Empty files are kept: an empty corpus is valid training input.
pub fn load_text_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<String>> {
    collect_paths(inputs, cfg)?
        .into_iter()
        .map(load_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(&file_b, "beta").expect("write b");

        let cfg = IngestConfig::default();
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_respects_non_recursive_mode() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let top = dir.path().join("top.txt");
        fs::write(&top, "top").expect("write top");
        fs::write(nested.join("deep.txt"), "deep").expect("write deep");

        let cfg = IngestConfig::builder().recursive(false).build();
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![top]);
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.txt");
        let err = collect_paths(&[missing], &IngestConfig::default()).expect_err("must fail");
        assert!(matches!(err, TextBpeError::InvalidConfig(msg) if msg.contains("does not exist")));
    }

    #[test]
    fn load_text_rejects_invalid_utf8() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("bad.txt");
        fs::write(&file, [b'o', b'k', 0xFF, 0xFE]).expect("write bytes");
        let err = load_text(&file).expect_err("invalid utf-8 must fail");
        assert!(matches!(err, TextBpeError::Utf8 { path: Some(p), .. } if p == file));
    }

    #[test]
    fn load_text_corpus_keeps_empty_documents() {
        let dir = tempdir().expect("tempdir");
        let empty = dir.path().join("a_empty.txt");
        let full = dir.path().join("b_full.txt");
        fs::write(&empty, "").expect("write empty");
        fs::write(&full, "héllo").expect("write full");
        let docs = load_text_corpus(&[dir.path()], &IngestConfig::default()).expect("load");
        assert_eq!(docs, vec![String::new(), "héllo".to_string()]);
    }
}
