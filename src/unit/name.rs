use std::fs;
use std::path::Path;

use log::info;

use crate::config::incar::{read_config, write_tag};
use crate::error::UnitError;

/// INCAR tag holding the user-settable unit name
pub const SYSTEM: &str = "SYSTEM";

/// Name of a unit, synthesizing and saving one if the INCAR has none
///
/// A synthesized name is `<formula>-<parent directory>-<directory>`. It's written back as the
/// SYSTEM tag unless `persist` is false, so the next scan reads the same name instead of
/// building it again.
pub fn unit_name(dir: &Path, persist: bool) -> Result<String, UnitError> {
    let incar = read_config(dir)?;
    if let Some(name) = incar.get(SYSTEM) {
        return Ok(name.to_string());
    }

    let name = default_name(dir)?;
    if persist {
        info!("Naming {} as {name}", dir.display());
        write_tag(dir, SYSTEM, &name)?;
    }
    Ok(name)
}

fn default_name(dir: &Path) -> Result<String, UnitError> {
    let poscar = dir.join("POSCAR");
    let text = fs::read_to_string(&poscar).map_err(|err| UnitError::io(&poscar, err))?;
    let formula = formula(&text)
        .ok_or_else(|| UnitError::configuration(&poscar, "can't read the composition"))?;

    let segments: Vec<String> = dir
        .components()
        .rev()
        .take(2)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    match segments.as_slice() {
        [last, parent] => Ok(format!("{formula}-{parent}-{last}")),
        _ => Err(UnitError::configuration(dir, "path is too short to name the unit")),
    }
}

/// Composition written without spaces, e.g. `Fe4O6`
///
/// Elements keep the order of their first appearance in the POSCAR, not electronegativity order,
/// so `O Fe` species give `O6Fe4`. Counts are always written. VASP 4 files
/// have no species line, in which case the species are taken from the comment line.
pub fn formula(poscar: &str) -> Option<String> {
    let lines: Vec<&str> = poscar.lines().collect();

    let sixth = tokens(&lines, 5);
    let (species, counts) = match sixth.iter().all(|t| t.parse::<usize>().is_ok()) {
        true => {
            let comment = tokens(&lines, 0);
            (comment.into_iter().take(sixth.len()).collect::<Vec<&str>>(), sixth)
        }
        false => (sixth, tokens(&lines, 6)),
    };

    if species.is_empty() || species.len() != counts.len() {
        return None;
    }

    let mut composition: Vec<(String, usize)> = Vec::new();
    for (symbol, count) in species.iter().zip(counts.iter()) {
        // POTCAR labels like Fe_pv or Fe/abcd carry suffixes after the element
        let element: String = symbol.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let count: usize = count.parse().ok()?;
        if element.is_empty() {
            return None;
        }
        match composition.iter_mut().find(|(e, _)| *e == element) {
            Some(entry) => entry.1 += count,
            None => composition.push((element, count)),
        }
    }

    Some(composition.iter().map(|(e, n)| format!("{e}{n}")).collect())
}

fn tokens<'a>(lines: &[&'a str], i: usize) -> Vec<&'a str> {
    lines.get(i).map(|l| l.split_whitespace().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::incar::INCAR;

    static POSCAR: &str = "Fe2O3 hematite\n1.0\n5.0 0 0\n0 5.0 0\n0 0 13.7\nFe_pv O\n4 6\nDirect\n";

    #[test]
    fn formula_from_species_line() {
        assert_eq!(formula(POSCAR).as_deref(), Some("Fe4O6"));
    }

    #[test]
    fn formula_from_vasp4_comment_line() {
        let poscar = "Na Cl\n1.0\n5.6 0 0\n0 5.6 0\n0 0 5.6\n1 1\nDirect\n";
        assert_eq!(formula(poscar).as_deref(), Some("Na1Cl1"));
    }

    #[test]
    fn formula_merges_repeated_species() {
        let poscar = "x\n1.0\n1 0 0\n0 1 0\n0 0 1\nNi O Ni\n1 2 3\n";
        assert_eq!(formula(poscar).as_deref(), Some("Ni4O2"));
    }

    #[test]
    fn formula_keeps_poscar_order() {
        let poscar = "x\n1.0\n1 0 0\n0 1 0\n0 0 1\nO Fe\n6 4\n";
        assert_eq!(formula(poscar).as_deref(), Some("O6Fe4"));
    }

    #[test]
    fn unreadable_composition() {
        assert_eq!(formula("too short\n"), None);
    }

    #[test]
    fn synthesized_name_is_persisted_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Fe2O3").join("relax");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INCAR), "ENCUT = 520\n").unwrap();
        fs::write(dir.join("POSCAR"), POSCAR).unwrap();

        assert_eq!(unit_name(&dir, true).unwrap(), "Fe4O6-Fe2O3-relax");
        assert_eq!(read_config(&dir).unwrap().get(SYSTEM), Some("Fe4O6-Fe2O3-relax"));

        // the tag is read back, not resynthesized
        fs::write(dir.join("POSCAR"), "garbage").unwrap();
        assert_eq!(unit_name(&dir, true).unwrap(), "Fe4O6-Fe2O3-relax");
    }

    #[test]
    fn dry_run_does_not_persist_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("NiO").join("static");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INCAR), "ENCUT = 520\n").unwrap();
        fs::write(dir.join("POSCAR"), POSCAR).unwrap();

        assert_eq!(unit_name(&dir, false).unwrap(), "Fe4O6-NiO-static");
        assert!(!read_config(&dir).unwrap().contains(SYSTEM));
    }
}
