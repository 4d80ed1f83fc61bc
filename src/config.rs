use std::{env, path::PathBuf};

const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: resolve_data_path(env::var("APP_DATA_PATH").ok()),
            port: resolve_port(env::var("PORT").ok()),
        }
    }
}

pub fn resolve_data_path(value: Option<String>) -> PathBuf {
    match value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DATA_PATH),
    }
}

pub fn resolve_port(value: Option<String>) -> u16 {
    value
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}
