use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;

use crate::error::UnitError;

/// Per-unit file counting consecutive fizzled runs
pub const FIZZLE_COUNT: &str = "FIZZLE_COUNT";

/// Consecutive fizzled runs recorded for a unit, 0 if none
pub fn read_count(dir: &Path) -> Result<u32, UnitError> {
    let path = dir.join(FIZZLE_COUNT);
    match fs::read_to_string(&path) {
        Ok(text) => text.trim().parse::<u32>().map_err(|_| {
            UnitError::configuration(&path, format!("{:?} is not a fizzle count", text.trim()))
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
        Err(err) => Err(UnitError::io(&path, err)),
    }
}

/// Record one more fizzled run and return the new count
pub fn record(dir: &Path) -> Result<u32, UnitError> {
    let count = read_count(dir)? + 1;
    let path = dir.join(FIZZLE_COUNT);
    debug!("Fizzle count for {} is now {count}", dir.display());
    fs::write(&path, format!("{count}\n")).map_err(|err| UnitError::io(&path, err))?;
    Ok(count)
}

/// Forget fizzled runs once the output parses again
pub fn clear(dir: &Path) -> Result<(), UnitError> {
    let path = dir.join(FIZZLE_COUNT);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(UnitError::io(&path, err)),
    }
}
