use std::collections::HashSet;
use std::path::Path;

use crate::error::StorageError;

/// Reads one source reference per line, trimming and dropping blank lines
/// and `#` comments.
pub fn read_source_ids(path: &Path) -> Result<Vec<String>, StorageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Removes repeats, keeping first occurrences in order. Returns the ids and
/// how many duplicates were dropped.
pub fn dedup_source_ids<I, S>(ids: I) -> (Vec<String>, usize)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = 0;

    for id in ids {
        let id = id.into();
        if seen.insert(id.clone()) {
            unique.push(id);
        } else {
            duplicates += 1;
        }
    }

    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_source_ids_skips_blanks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ids.txt");
        std::fs::write(&path, "# earnings\n  aaaaaaaaaaa \n\nbbbbbbbbbbb\n\t\n").unwrap();

        assert_eq!(read_source_ids(&path).unwrap(), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_source_ids(Path::new("/nonexistent/ids.txt"));
        assert!(matches!(result, Err(StorageError::ReadFile { .. })));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let (ids, duplicates) = dedup_source_ids(["c", "a", "c", "b", "a", "c"]);
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(duplicates, 3);
    }
}
