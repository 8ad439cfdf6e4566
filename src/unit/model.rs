use std::path::{Path, PathBuf};

use crate::config::incar::{read_config, INCAR};
use crate::config::manifest::{manifest_exists, read_manifest, STAGE_NUMBER};
use crate::error::UnitError;
use crate::unit::fizzle;

/// Files that must all be present for a directory to be a calculation unit
pub const REQUIRED_INPUTS: [&str; 4] = [INCAR, "KPOINTS", "POTCAR", "POSCAR"];

/// INCAR tag holding the number of ionic steps, 0 for a single point calculation
pub const NSW: &str = "NSW";

/// INCAR tag holding the electronic iteration limit
pub const NELM: &str = "NELM";

/// INCAR tag that marks a chain-of-states (NEB) job
pub const IMAGES: &str = "IMAGES";

/// Does this directory hold a complete input set?
pub fn is_complete(dir: &Path) -> bool {
    REQUIRED_INPUTS.iter().all(|file| dir.join(file).is_file())
}

/// One simulation job bound to one directory
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationUnit {
    pub path: PathBuf,
    pub name: String,
    pub has_manifest: bool,
}

impl CalculationUnit {
    pub fn new(path: &Path, name: String) -> CalculationUnit {
        CalculationUnit {
            path: path.to_path_buf(),
            has_manifest: manifest_exists(path),
            name,
        }
    }

    /// Read everything the decision engine needs from the unit's files
    pub fn view(&self) -> Result<UnitView, UnitError> {
        let incar = read_config(&self.path)?;
        let manifest = read_manifest(&self.path, &incar)?;

        let stage = match (incar.get_int(STAGE_NUMBER)?, &manifest) {
            (Some(current), Some(manifest)) => {
                let current = usize::try_from(current).map_err(|_| {
                    UnitError::configuration(incar.path(), format!("{STAGE_NUMBER} = {current} is negative"))
                })?;
                Some(StageProgress::new(&self.path, current, manifest.max_stage())?)
            }
            _ => None,
        };

        // VASP defaults NSW to 0 when the tag is absent
        let nsw = incar.get_int(NSW)?.unwrap_or(0);

        Ok(UnitView {
            path: self.path.clone(),
            name: self.name.clone(),
            has_manifest: manifest.is_some(),
            stage,
            single_point: nsw == 0,
            multi_image: incar.contains(IMAGES),
            fizzled: fizzle::read_count(&self.path)?,
        })
    }
}

/// Position of a staged unit in its manifest, `current <= max` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    current: usize,
    max: usize,
}

impl StageProgress {
    pub fn new(path: &Path, current: usize, max: usize) -> Result<StageProgress, UnitError> {
        if current > max {
            return Err(UnitError::InvalidStage { path: path.to_path_buf(), current, max });
        }
        Ok(StageProgress { current, max })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_final(&self) -> bool {
        self.current == self.max
    }

    /// The following stage, `None` at the final stage
    pub fn next(&self) -> Option<StageProgress> {
        match self.is_final() {
            true => None,
            false => Some(StageProgress { current: self.current + 1, max: self.max }),
        }
    }
}

/// Typed snapshot of a unit, the only thing the decision engine looks at
#[derive(Debug, Clone, PartialEq)]
pub struct UnitView {
    pub path: PathBuf,
    pub name: String,
    pub has_manifest: bool,
    /// Present when the INCAR tracks stages and the manifest exists
    pub stage: Option<StageProgress>,
    pub single_point: bool,
    pub multi_image: bool,
    /// Consecutive fizzled runs so far
    pub fizzled: u32,
}
