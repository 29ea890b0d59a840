use std::path::{Path, PathBuf};

use anyhow::Result;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FileKind {
    Network,
    Vehicles,
    Aggregate,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "inpx" => Some(FileKind::Network),
            "fzp" => Some(FileKind::Vehicles),
            "fhz" => Some(FileKind::Aggregate),
            _ => None,
        }
    }
}

/// Finds every convertible file, recursing into directories. The result is sorted by path.
pub fn find_inputs(path: &Path) -> Result<Vec<(PathBuf, FileKind)>> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        walk(path, &mut files)?;
    } else {
        bail!("{} isn't a file or directory", path.display());
    }
    files.sort();

    let mut results = Vec::new();
    for file in files {
        match FileKind::from_path(&file) {
            Some(kind) => results.push((file, kind)),
            None => warn!("Skipping {}", file.display()),
        }
    }
    Ok(results)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs_err::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        for (path, kind) in [
            ("net.inpx", Some(FileKind::Network)),
            ("dir/run_001.FZP", Some(FileKind::Vehicles)),
            ("run_001.fhz", Some(FileKind::Aggregate)),
            ("run_001.fzp.geojson", None),
            ("README", None),
        ] {
            assert_eq!(FileKind::from_path(Path::new(path)), kind);
        }
    }

    #[test]
    fn walks_directories() {
        let root = std::env::temp_dir().join(format!("vissim2geojson_{}", std::process::id()));
        let nested = root.join("nested");
        fs_err::create_dir_all(&nested).unwrap();
        for name in ["b.fzp", "a.inpx", "notes.txt"] {
            fs_err::write(root.join(name), "").unwrap();
        }
        fs_err::write(nested.join("c.fhz"), "").unwrap();

        let found = find_inputs(&root).unwrap();
        fs_err::remove_dir_all(&root).unwrap();

        assert_eq!(
            found,
            vec![
                (root.join("a.inpx"), FileKind::Network),
                (root.join("b.fzp"), FileKind::Vehicles),
                (nested.join("c.fhz"), FileKind::Aggregate),
            ]
        );
        assert!(find_inputs(&root).is_err());
    }
}
