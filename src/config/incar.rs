use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::UnitError;

/// Name of the per-unit key-value configuration file
pub const INCAR: &str = "INCAR";

/// Parsed contents of an INCAR file
///
/// Keys are stored upper case and in file order, so rewriting a file only changes the lines that
/// were actually set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Incar {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl Incar {
    /// Parse `KEY = VALUE` lines
    ///
    /// `#` and `!` start a comment, `;` separates several assignments on one line and lines
    /// without an `=` are ignored.
    pub fn parse(path: &Path, text: &str) -> Incar {
        let mut incar = Incar { path: path.to_path_buf(), entries: Vec::new() };

        for line in text.lines() {
            let line = match line.find(['#', '!']) {
                Some(i) => &line[..i],
                None => line,
            };
            for statement in line.split(';') {
                if let Some((key, value)) = statement.split_once('=') {
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    incar.set(key, value.trim());
                }
            }
        }

        incar
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_uppercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Integer value of a tag, `None` if the tag is absent
    pub fn get_int(&self, key: &str) -> Result<Option<i64>, UnitError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
                UnitError::configuration(&self.path, format!("{key} = {value} is not an integer"))
            }),
        }
    }

    /// Boolean value of a tag, accepting the Fortran spellings VASP uses
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, UnitError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.trim_matches('.').to_uppercase().as_str() {
            "TRUE" | "T" => Ok(Some(true)),
            "FALSE" | "F" => Ok(Some(false)),
            _ => Err(UnitError::configuration(&self.path, format!("{key} = {value} is not a boolean"))),
        }
    }

    /// Insert or replace a tag, keeping its position if it already exists
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let key = key.to_uppercase();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k} = {v}\n"))
            .collect()
    }
}

/// Read the INCAR of a unit directory
pub fn read_config(dir: &Path) -> Result<Incar, UnitError> {
    let path = dir.join(INCAR);
    let text = fs::read_to_string(&path).map_err(|err| UnitError::io(&path, err))?;
    Ok(Incar::parse(&path, &text))
}

/// Set a single tag in a unit's INCAR
///
/// The whole file is read, modified and written to a temporary sibling which is then renamed over
/// the original, so an interrupted write leaves the previous file intact.
pub fn write_tag(dir: &Path, key: &str, value: impl ToString) -> Result<(), UnitError> {
    let mut incar = read_config(dir)?;
    let value = value.to_string();
    debug!("Setting {key} = {value} in {}", incar.path().display());
    incar.set(key, &value);
    write_config(&incar)
}

/// Write a whole config back to its file, replacing what's there
pub fn write_config(incar: &Incar) -> Result<(), UnitError> {
    let path = incar.path();
    let tmp = path.with_file_name(format!(".{INCAR}.tmp"));
    fs::write(&tmp, incar.render()).map_err(|err| UnitError::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| UnitError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_multiple_statements() {
        let incar = Incar::parse(
            Path::new("INCAR"),
            "ENCUT = 520 # cutoff\nismear = 0; SIGMA = 0.05\n! full comment\nLWAVE = .FALSE.\n",
        );
        assert_eq!(incar.get("ENCUT"), Some("520"));
        assert_eq!(incar.get("ISMEAR"), Some("0"));
        assert_eq!(incar.get("sigma"), Some("0.05"));
        assert_eq!(incar.get_bool("LWAVE").unwrap(), Some(false));
        assert!(!incar.contains("STAGE_NUMBER"));
    }

    #[test]
    fn rejects_non_integer_values() {
        let incar = Incar::parse(Path::new("INCAR"), "NSW = many\n");
        assert!(matches!(incar.get_int("NSW"), Err(UnitError::Configuration { .. })));
        assert_eq!(incar.get_int("NELM").unwrap(), None);
    }

    #[test]
    fn write_tag_round_trips_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INCAR), "SYSTEM = old\nENCUT = 520\nNELM = 60\n").unwrap();

        write_tag(dir.path(), "NELM", 500).unwrap();
        write_tag(dir.path(), "STAGE_NUMBER", 3).unwrap();

        let incar = read_config(dir.path()).unwrap();
        assert_eq!(incar.get_int("NELM").unwrap(), Some(500));
        assert_eq!(incar.get_int("STAGE_NUMBER").unwrap(), Some(3));
        assert_eq!(incar.get("SYSTEM"), Some("old"));
        assert_eq!(incar.get("ENCUT"), Some("520"));
        assert!(!dir.path().join(".INCAR.tmp").exists());
    }
}
