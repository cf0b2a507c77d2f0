use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_IMAGE_SIZE: u32 = 150;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub class_indices_path: PathBuf,
    /// Side length of the square model input.
    pub image_size: u32,
    /// Largest accepted `file` part, in bytes.
    pub max_upload_bytes: usize,
    pub workers: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            model_path: PathBuf::from("waste_classifier.onnx"),
            class_indices_path: PathBuf::from("class_indices.txt"),
            image_size: DEFAULT_IMAGE_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            workers: None,
        }
    }
}

impl AppConfig {
    /// Reads the process environment, after merging in `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AppConfig::default();

        if let Some(host) = lookup("HOST") {
            cfg.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            cfg.port = port;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            cfg.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CLASS_INDICES_PATH") {
            cfg.class_indices_path = PathBuf::from(path);
        }
        if let Some(size) = parse_var(&lookup, "IMAGE_SIZE")? {
            cfg.image_size = non_zero("IMAGE_SIZE", size)?;
        }
        if let Some(limit) = parse_var(&lookup, "MAX_UPLOAD_BYTES")? {
            cfg.max_upload_bytes = non_zero("MAX_UPLOAD_BYTES", limit)?;
        }
        if let Some(workers) = parse_var(&lookup, "WORKERS")? {
            cfg.workers = Some(non_zero("WORKERS", workers)?);
        }

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                key,
                reason: e.to_string(),
                value,
            }),
    }
}

fn non_zero<T>(key: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default + ToString,
{
    if value == T::default() {
        return Err(ConfigError::InvalidEnv {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.image_size, 150);
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "5000"),
            ("MODEL_PATH", "/models/waste.onnx"),
            ("CLASS_INDICES_PATH", "/models/class_indices.txt"),
            ("IMAGE_SIZE", " 224 "),
            ("MAX_UPLOAD_BYTES", "2048"),
            ("WORKERS", "4"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr(), ("0.0.0.0".to_string(), 5000));
        assert_eq!(cfg.model_path, PathBuf::from("/models/waste.onnx"));
        assert_eq!(cfg.image_size, 224);
        assert_eq!(cfg.max_upload_bytes, 2048);
        assert_eq!(cfg.workers, Some(4));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("IMAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "IMAGE_SIZE", .. }));

        let err = AppConfig::from_lookup(lookup(&[("MAX_UPLOAD_BYTES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "MAX_UPLOAD_BYTES", .. }));

        let err = AppConfig::from_lookup(lookup(&[("WORKERS", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "WORKERS", .. }));
    }
}
