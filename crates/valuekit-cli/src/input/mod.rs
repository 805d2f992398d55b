pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use std::error::Error;

/// Typed input from `--input <file>` or, failing that, piped stdin.
/// `None` means neither was supplied and the caller should use its flags.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_structured(path)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}
