use std::fs;
use std::path::{Path, PathBuf};

use crate::config::incar::Incar;
use crate::error::UnitError;

/// Name of the per-unit stage manifest file
pub const CONVERGENCE: &str = "CONVERGENCE";

/// INCAR tag that marks a unit as staged and holds its current stage
pub const STAGE_NUMBER: &str = "STAGE_NUMBER";

/// One line of a stage manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub number: usize,
    pub settings: String,
}

/// Ordered convergence stages of a staged unit
///
/// The manifest file has one stage per line: `<stage number> <settings>`. Lines without a valid
/// leading integer are skipped, and the remaining stages must be numbered 0, 1, 2, ... in order.
#[derive(Debug, Clone, PartialEq)]
pub struct StageManifest {
    pub path: PathBuf,
    stages: Vec<Stage>,
}

impl StageManifest {
    pub fn parse(path: &Path, text: &str) -> Result<StageManifest, UnitError> {
        let mut stages: Vec<Stage> = Vec::new();

        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let Some(Ok(number)) = fields.next().map(str::parse::<usize>) else {
                continue;
            };
            let settings = fields.collect::<Vec<&str>>().join(" ");
            if settings.is_empty() {
                continue;
            }
            if number != stages.len() {
                return Err(UnitError::configuration(
                    path,
                    format!("expected stage {} but found stage {number}", stages.len()),
                ));
            }
            stages.push(Stage { number, settings });
        }

        if stages.is_empty() {
            return Err(UnitError::configuration(path, "manifest has no stages"));
        }

        Ok(StageManifest { path: path.to_path_buf(), stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Index of the final stage
    pub fn max_stage(&self) -> usize {
        self.stages.len() - 1
    }
}

pub fn manifest_exists(dir: &Path) -> bool {
    dir.join(CONVERGENCE).is_file()
}

/// Read a unit's stage manifest
///
/// Returns `None` for a single-stage unit. A unit whose INCAR carries `STAGE_NUMBER` but has no
/// manifest can't be resubmitted until the manifest is copied in, so that is a configuration error.
pub fn read_manifest(dir: &Path, incar: &Incar) -> Result<Option<StageManifest>, UnitError> {
    let path = dir.join(CONVERGENCE);
    if !path.is_file() {
        return match incar.contains(STAGE_NUMBER) {
            true => Err(UnitError::configuration(
                &path,
                format!(
                    "copy {CONVERGENCE} into the directory to run a staged job, \
                     or remove {STAGE_NUMBER} from {} for a single stage job",
                    incar.path().display()
                ),
            )),
            false => Ok(None),
        };
    }

    let text = fs::read_to_string(&path).map_err(|err| UnitError::io(&path, err))?;
    StageManifest::parse(&path, &text).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_stages_with_leading_integer() {
        let text = "0 ISIF=2,EDIFF=1e-4\n1 EDIFF=1e-5\nMAGMOM = 5*0.6\n2 EDIFF=1e-6\n";
        let manifest = StageManifest::parse(Path::new(CONVERGENCE), text).unwrap();
        assert_eq!(manifest.max_stage(), 2);
        assert_eq!(manifest.stages()[1].settings, "EDIFF=1e-5");
    }

    #[test]
    fn rejects_gaps_in_stage_numbers() {
        let text = "0 a\n2 b\n";
        assert!(StageManifest::parse(Path::new(CONVERGENCE), text).is_err());
    }

    #[test]
    fn rejects_empty_manifest() {
        assert!(StageManifest::parse(Path::new(CONVERGENCE), "# nothing\n").is_err());
    }

    #[test]
    fn staged_unit_without_manifest_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let staged = Incar::parse(&dir.path().join("INCAR"), "STAGE_NUMBER = 0\n");
        let single = Incar::parse(&dir.path().join("INCAR"), "ENCUT = 520\n");

        assert!(matches!(
            read_manifest(dir.path(), &staged),
            Err(UnitError::Configuration { .. })
        ));
        assert_eq!(read_manifest(dir.path(), &single).unwrap(), None);
    }

    #[test]
    fn reads_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONVERGENCE), "0 a\n1 b\n").unwrap();
        let incar = Incar::parse(&dir.path().join("INCAR"), "STAGE_NUMBER = 1\n");
        let manifest = read_manifest(dir.path(), &incar).unwrap().unwrap();
        assert_eq!(manifest.max_stage(), 1);
    }
}
