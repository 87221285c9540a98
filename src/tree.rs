//! Package tree walking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Everything found under a package root, as sorted paths relative to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    /// Regular files
    pub files: Vec<PathBuf>,
    /// Directories that were entered, including empty ones
    pub dirs: Vec<PathBuf>,
    /// Entries below the root that could not be read, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Walk the tree under `root`.
///
/// Directories whose name is in `ignored` are not entered. Symlinks are not
/// followed. Only an unreadable `root` is an error; anything unreadable
/// further down is logged, recorded in `unreadable` and skipped.
pub fn walk(root: &Path, ignored: &[String]) -> io::Result<TreeListing> {
    let mut listing = TreeListing::default();
    let entries = fs::read_dir(root)?;
    walk_entries(root, entries, ignored, &mut listing);
    listing.files.sort();
    listing.dirs.sort();
    listing.unreadable.sort();
    Ok(listing)
}

/// Regular files under `root`, sorted and relative to `root`.
pub fn walk_files(root: &Path, ignored: &[String]) -> io::Result<Vec<PathBuf>> {
    Ok(walk(root, ignored)?.files)
}

fn walk_entries(root: &Path, entries: fs::ReadDir, ignored: &[String], listing: &mut TreeListing) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let relative = relative_to(&path, root);

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                listing.unreadable.push((relative, e.to_string()));
                continue;
            }
        };

        if file_type.is_dir() {
            let name = entry.file_name();
            if ignored.iter().any(|i| name.to_str() == Some(i.as_str())) {
                continue;
            }
            match fs::read_dir(&path) {
                Ok(children) => {
                    listing.dirs.push(relative);
                    walk_entries(root, children, ignored, listing);
                }
                Err(e) => {
                    log::warn!("Skipping unreadable directory {}: {}", path.display(), e);
                    listing.unreadable.push((relative, e.to_string()));
                }
            }
        } else if file_type.is_file() {
            listing.files.push(relative);
        }
    }
}

/// `path` relative to `root` when it lies beneath it, otherwise unchanged.
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_walk_files_sorted_and_relative() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/src")).unwrap();
        fs::write(dir.path().join("pubspec.yaml"), "").unwrap();
        fs::write(dir.path().join("lib/src/b.dart"), "").unwrap();
        fs::write(dir.path().join("lib/a.dart"), "").unwrap();

        let files = walk_files(dir.path(), &[]).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("lib/a.dart"),
                PathBuf::from("lib/src/b.dart"),
                PathBuf::from("pubspec.yaml"),
            ]
        );
    }

    #[test]
    fn test_walk_lists_empty_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/src")).unwrap();
        fs::create_dir(dir.path().join("test")).unwrap();

        let listing = walk(dir.path(), &[]).unwrap();
        assert!(listing.files.is_empty());
        assert_eq!(
            listing.dirs,
            vec![PathBuf::from("lib"), PathBuf::from("lib/src"), PathBuf::from("test")]
        );
        assert!(listing.unreadable.is_empty());
    }

    #[test]
    fn test_walk_files_skips_ignored_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".dart_tool/cache")).unwrap();
        fs::write(dir.path().join(".dart_tool/cache/x"), "").unwrap();
        fs::write(dir.path().join("keep.dart"), "").unwrap();

        let listing = walk(dir.path(), &[".dart_tool".to_string()]).unwrap();
        assert_eq!(listing.files, vec![PathBuf::from("keep.dart")]);
        assert!(listing.dirs.is_empty());
    }

    #[test]
    fn test_walk_missing_root_is_error() {
        assert!(walk(Path::new("/nonexistent/modgate/root"), &[]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locked")).unwrap();
        fs::write(dir.path().join("locked/hidden.dart"), "").unwrap();
        fs::write(dir.path().join("kept.dart"), "").unwrap();
        fs::set_permissions(dir.path().join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory regardless of its mode
        let readable = fs::read_dir(dir.path().join("locked")).is_ok();
        let listing = walk(dir.path(), &[]);
        fs::set_permissions(dir.path().join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
        let listing = listing.unwrap();

        assert!(listing.files.contains(&PathBuf::from("kept.dart")));
        if !readable {
            assert_eq!(listing.files, vec![PathBuf::from("kept.dart")]);
            assert_eq!(listing.unreadable.len(), 1);
            assert_eq!(listing.unreadable[0].0, PathBuf::from("locked"));
        }
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to(Path::new("/pkg/lib/a.dart"), Path::new("/pkg")), PathBuf::from("lib/a.dart"));
        assert_eq!(relative_to(Path::new("/other/a.dart"), Path::new("/pkg")), PathBuf::from("/other/a.dart"));
    }
}
