//! Configuration management for the OCR bridge

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    /// Directory for request-scoped temporary files
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum multipart body size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine identifier reported in responses
    pub name: String,
    /// Version tag reported by `/health`
    pub version: String,
    /// Engine executable
    pub command: String,
    /// Extra arguments placed before the bridge's own flags
    pub args: Vec<String>,
    pub language: String,
    /// Skip the engine's outbound model-source check at startup
    pub disable_model_source_check: bool,
    /// Recognitions allowed in flight at once
    pub max_concurrent: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            name: "paddle".to_string(),
            version: "3.4.0-compat".to_string(),
            command: "paddleocr-json".to_string(),
            args: Vec::new(),
            language: "en".to_string(),
            disable_model_source_check: true,
            max_concurrent: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            temp_dir: env::temp_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source, falling back to defaults per key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                )?,
            },
            engine: EngineConfig {
                name: lookup("OCR_ENGINE_NAME").unwrap_or(defaults.engine.name),
                version: lookup("OCR_ENGINE_VERSION").unwrap_or(defaults.engine.version),
                command: lookup("OCR_ENGINE_COMMAND").unwrap_or(defaults.engine.command),
                args: lookup("OCR_ENGINE_ARGS")
                    .map(|args| args.split_whitespace().map(str::to_string).collect())
                    .unwrap_or(defaults.engine.args),
                language: lookup("OCR_LANG").unwrap_or(defaults.engine.language),
                disable_model_source_check: parse_flag(
                    &lookup,
                    "OCR_DISABLE_MODEL_SOURCE_CHECK",
                    defaults.engine.disable_model_source_check,
                )?,
                max_concurrent: match parse_var(
                    &lookup,
                    "OCR_MAX_CONCURRENT",
                    defaults.engine.max_concurrent,
                )? {
                    0 => {
                        return Err(ConfigError {
                            name: "OCR_MAX_CONCURRENT",
                            value: "0".to_string(),
                        })
                    }
                    n => n,
                },
            },
            temp_dir: lookup("OCR_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError { name, value }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError { name, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.engine.name, "paddle");
        assert_eq!(config.engine.version, "3.4.0-compat");
        assert!(config.engine.disable_model_source_check);
        assert_eq!(config.engine.max_concurrent, 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "9100"),
            ("OCR_ENGINE_ARGS", "run.py  --device cpu"),
            ("OCR_DISABLE_MODEL_SOURCE_CHECK", "False"),
            ("OCR_MAX_CONCURRENT", "2"),
            ("OCR_TEMP_DIR", "/var/tmp/ocr"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.engine.args, vec!["run.py", "--device", "cpu"]);
        assert!(!config.engine.disable_model_source_check);
        assert_eq!(config.engine.max_concurrent, 2);
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/ocr"));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup_from(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.name, "SERVER_PORT");

        let err = Config::from_lookup(lookup_from(&[("OCR_DISABLE_MODEL_SOURCE_CHECK", "maybe")]))
            .unwrap_err();
        assert_eq!(err.name, "OCR_DISABLE_MODEL_SOURCE_CHECK");

        let err = Config::from_lookup(lookup_from(&[("OCR_MAX_CONCURRENT", "0")])).unwrap_err();
        assert_eq!(err.name, "OCR_MAX_CONCURRENT");
    }
}
