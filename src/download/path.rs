//! File name inference, sanitization, and collision-free path allocation.

use std::path::{Component, Path, PathBuf};

use url::Url;

use super::constants::FALLBACK_FILE_NAME;

/// Allocates a destination path under `dir` that does not exist yet.
///
/// Probes `dir/file_name`, then `dir/stem_1.ext`, `dir/stem_2.ext`, ... until
/// an unoccupied path is found. Nothing is created or reserved; two calls for
/// the same name before either file exists return the same path.
///
/// Any directory entry counts as occupied, dangling symlinks included.
#[must_use]
pub fn allocate(dir: &Path, file_name: &str) -> PathBuf {
    allocate_excluding(dir, file_name, &[])
}

/// Like [`allocate`], but also skips every path in `claimed`.
///
/// Used after an exclusive create lost a race: the path is known to be taken
/// even if the probe cannot see why.
pub(crate) fn allocate_excluding(dir: &Path, file_name: &str, claimed: &[PathBuf]) -> PathBuf {
    let file_name = {
        let sanitized = sanitize_filename(file_name);
        if sanitized.trim_matches('_').is_empty() {
            FALLBACK_FILE_NAME.to_string()
        } else {
            sanitized
        }
    };
    let is_free = |path: &Path| !is_occupied(path) && !claimed.iter().any(|c| c == path);

    let base_path = dir.join(&file_name);
    if is_free(&base_path) {
        return base_path;
    }

    let (stem, ext) = split_file_name(&file_name);
    let mut counter: u64 = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{ext}"));
        if is_free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// `symlink_metadata` does not follow links, so a dangling symlink is occupied.
fn is_occupied(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Splits a file name into stem and extension (extension keeps its dot).
///
/// A leading dot belongs to the stem, so `.gitattributes` has no extension.
pub(crate) fn split_file_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => (&file_name[..pos], &file_name[pos..]),
        _ => (file_name, ""),
    }
}

/// Infers the file name a URL should be saved under.
///
/// Uses the last path segment, percent-decoded. Strings that are not valid
/// URLs fall back to the text after the last `/`.
#[must_use]
pub fn infer_file_name(url: &str) -> String {
    let raw = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|last| {
                urlencoding::decode(last)
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| last.to_string())
            })
            .unwrap_or_default(),
        Err(_) => url
            .rsplit('/')
            .next()
            .map(str::to_string)
            .unwrap_or_default(),
    };

    let sanitized = sanitize_filename(raw.trim());
    if sanitized.trim_matches('_').is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

/// Sanitizes a filename for safe filesystem use.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_no_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let path = allocate(temp_dir.path(), "report.json");
        assert_eq!(path, temp_dir.path().join("report.json"));
    }

    #[test]
    fn test_allocate_with_conflict() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("report.json"), b"existing").unwrap();

        let path = allocate(temp_dir.path(), "report.json");
        assert_eq!(path, temp_dir.path().join("report_1.json"));
    }

    #[test]
    fn test_allocate_multiple_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("test.pdf"), b"1").unwrap();
        std::fs::write(temp_dir.path().join("test_1.pdf"), b"2").unwrap();
        std::fs::write(temp_dir.path().join("test_2.pdf"), b"3").unwrap();

        let path = allocate(temp_dir.path(), "test.pdf");
        assert_eq!(path, temp_dir.path().join("test_3.pdf"));
    }

    #[test]
    fn test_allocate_does_not_reserve() {
        let temp_dir = TempDir::new().unwrap();
        let first = allocate(temp_dir.path(), "config.json");
        let second = allocate(temp_dir.path(), "config.json");
        assert_eq!(first, second);
        assert_eq!(first, temp_dir.path().join("config.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_allocate_treats_dangling_symlink_as_taken() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("nowhere/target"),
            temp_dir.path().join("f.bin"),
        )
        .unwrap();

        let path = allocate(temp_dir.path(), "f.bin");
        assert_eq!(path, temp_dir.path().join("f_1.bin"));
    }

    #[test]
    fn test_allocate_excluding_skips_claimed_paths() {
        let temp_dir = TempDir::new().unwrap();
        let claimed = vec![
            temp_dir.path().join("data.csv"),
            temp_dir.path().join("data_1.csv"),
        ];

        let path = allocate_excluding(temp_dir.path(), "data.csv", &claimed);
        assert_eq!(path, temp_dir.path().join("data_2.csv"));
    }

    #[test]
    fn test_allocate_leading_dot_name_has_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".gitattributes"), b"*").unwrap();

        let path = allocate(temp_dir.path(), ".gitattributes");
        assert_eq!(path, temp_dir.path().join(".gitattributes_1"));
    }

    #[test]
    fn test_allocate_multi_dot_name_suffixes_last_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("archive.tar.gz"), b"x").unwrap();

        let path = allocate(temp_dir.path(), "archive.tar.gz");
        assert_eq!(path, temp_dir.path().join("archive.tar_1.gz"));
    }

    #[test]
    fn test_allocate_dot_segment_stays_under_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = allocate(temp_dir.path(), "..");
        assert_eq!(path, temp_dir.path().join("download.bin"));
    }

    #[test]
    fn test_allocate_protects_against_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        for malicious in ["../../etc/passwd", "subdir/../../../etc/passwd", "a/\\b\\c"] {
            let path = allocate(base, malicious);
            assert!(
                path.starts_with(base),
                "allocated path must be under dir: got {}",
                path.display()
            );
            assert_eq!(path.parent(), Some(base));
        }
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("report.json"), ("report", ".json"));
        assert_eq!(split_file_name("LICENSE"), ("LICENSE", ""));
        assert_eq!(split_file_name(".env"), (".env", ""));
    }

    #[test]
    fn test_infer_file_name_uses_last_segment() {
        assert_eq!(
            infer_file_name("https://example.com/models/resolve/master/config.json"),
            "config.json"
        );
    }

    #[test]
    fn test_infer_file_name_ignores_query() {
        assert_eq!(
            infer_file_name("https://example.com/files/data.csv?token=abc"),
            "data.csv"
        );
    }

    #[test]
    fn test_infer_file_name_percent_decodes() {
        assert_eq!(
            infer_file_name("https://example.com/my%20paper.pdf"),
            "my paper.pdf"
        );
    }

    #[test]
    fn test_infer_file_name_empty_path_falls_back() {
        assert_eq!(infer_file_name("https://example.com/"), "download.bin");
    }

    #[test]
    fn test_infer_file_name_unparseable_uses_basename() {
        assert_eq!(infer_file_name("not a url/thing.txt"), "thing.txt");
    }

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("file:name.pdf"), "file_name.pdf");
        assert_eq!(sanitize_filename("a*b?c.txt"), "a_b_c.txt");
    }
}
