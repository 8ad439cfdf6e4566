use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::UnitError;
use crate::unit::model::{is_complete, CalculationUnit};
use crate::unit::name::unit_name;

/// Directories below `root` holding a complete input set, depth first
fn unit_dirs(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir() && is_complete(entry.path()))
        .map(|entry| entry.into_path())
}

/// Find every calculation unit below `root`
///
/// Each directory is named as it's found (see [`unit_name`]). A directory whose name can't be
/// worked out is returned as an error so the caller can report it without losing the rest of the
/// scan.
pub fn scan(root: &Path, persist_names: bool) -> Vec<Result<CalculationUnit, UnitError>> {
    unit_dirs(root)
        .map(|dir| {
            let name = unit_name(&dir, persist_names)?;
            debug!("Found unit {name} in {}", dir.display());
            Ok(CalculationUnit::new(&dir, name))
        })
        .collect()
}

/// Number of complete input sets below `root`
pub fn count_units(root: &Path) -> usize {
    unit_dirs(root).count()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::unit::model::REQUIRED_INPUTS;

    fn write_inputs(dir: &Path, incar: &str) {
        fs::create_dir_all(dir).unwrap();
        for file in REQUIRED_INPUTS {
            fs::write(dir.join(file), "").unwrap();
        }
        fs::write(dir.join("INCAR"), incar).unwrap();
    }

    #[test]
    fn finds_complete_directories_only() {
        let root = tempfile::tempdir().unwrap();
        write_inputs(&root.path().join("Fe2O3/relax"), "SYSTEM = hematite-relax\n");
        write_inputs(&root.path().join("Fe2O3/static"), "SYSTEM = hematite-static\n");
        let partial = root.path().join("NiO/relax");
        write_inputs(&partial, "SYSTEM = nio\n");
        fs::remove_file(partial.join("KPOINTS")).unwrap();

        let units: Vec<CalculationUnit> = scan(root.path(), true).into_iter().map(Result::unwrap).collect();
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["hematite-relax", "hematite-static"]);
        assert_eq!(count_units(root.path()), 2);
    }

    #[test]
    fn unnameable_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();
        write_inputs(&root.path().join("bad/unit"), "ENCUT = 520\n");
        write_inputs(&root.path().join("good/unit"), "SYSTEM = good\n");

        let results = scan(root.path(), true);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(UnitError::Configuration { .. })));
        assert_eq!(results[1].as_ref().unwrap().name, "good");
    }
}
