use crate::error::EvalError;
use rtq_abstract::EvalSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EvalError> {
    let data = fs::read(path).map_err(|e| EvalError::io(path, e))?;
    serde_json::from_slice(&data).map_err(|source| EvalError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` completely, then replace `path` in one rename so a
/// failed write never leaves a partial file behind.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), EvalError> {
    let data = serde_json::to_vec(value).map_err(|source| EvalError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(EvalError::io(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        EvalError::io(path, e)
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| "output".as_ref()));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load evaluation settings from a TOML file. Missing keys keep their defaults.
pub fn load_settings(path: &Path) -> Result<EvalSettings, EvalError> {
    let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    toml::from_str(&content).map_err(|source| EvalError::Settings {
        path: path.to_path_buf(),
        source,
    })
}
