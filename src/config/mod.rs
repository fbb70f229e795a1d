use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, time::Duration};

const ENV_PREFIX: &str = "NOTES_CLIENT_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the notes REST API, e.g. `http://localhost:8000/rest`
    pub api_base_url: String,
    /// Quiet period after the last edit before a save is sent
    #[serde(with = "humantime_serde", default = "default_save_debounce")]
    pub save_debounce: Duration,
    /// How long the "Saved" badge stays up
    #[serde(with = "humantime_serde", default = "default_saved_linger")]
    pub saved_linger: Duration,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Characters of content shown per sidebar entry
    #[serde(default = "default_preview_width")]
    pub preview_width: usize,
}

const fn default_save_debounce() -> Duration {
    Duration::from_millis(450)
}

const fn default_saved_linger() -> Duration {
    Duration::from_millis(800)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_preview_width() -> usize {
    48
}

fn load_from_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(Into::into)
}

fn load_from_env<I>(vars: I) -> Result<Config, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter(vars)
        .map_err(Into::into)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path =
        env::var("NOTES_CLIENT_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return load_from_file(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return load_from_file("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        return load_from_file("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    match load_from_env(env::vars()) {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            Ok(config)
        }
        Err(e) => Err(format!(
            "Config file not found and environment variables are incomplete. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and {ENV_PREFIX}* variables. \
             Error: {e}"
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let cfg: Config = serde_yaml::from_str("api_base_url: http://localhost:8000/rest").unwrap();

        assert_eq!(cfg.api_base_url, "http://localhost:8000/rest");
        assert_eq!(cfg.save_debounce, Duration::from_millis(450));
        assert_eq!(cfg.saved_linger, Duration::from_millis(800));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.preview_width, 48);
    }

    #[test]
    fn yaml_reads_human_durations() {
        let yaml = "
api_base_url: http://notes.local
save_debounce: 1s 200ms
saved_linger: 2s
request_timeout: 1m
preview_width: 20
";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(cfg.save_debounce, Duration::from_millis(1200));
        assert_eq!(cfg.saved_linger, Duration::from_secs(2));
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
        assert_eq!(cfg.preview_width, 20);
    }

    #[test]
    fn yaml_without_base_url_is_rejected() {
        assert!(serde_yaml::from_str::<Config>("save_debounce: 450ms").is_err());
    }

    #[test]
    fn env_vars_use_prefix() {
        let cfg = load_from_env(vars(&[
            ("NOTES_CLIENT_API_BASE_URL", "http://env.local"),
            ("NOTES_CLIENT_SAVE_DEBOUNCE", "300ms"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(cfg.api_base_url, "http://env.local");
        assert_eq!(cfg.save_debounce, Duration::from_millis(300));
        assert_eq!(cfg.saved_linger, Duration::from_millis(800));
    }

    #[test]
    fn env_without_base_url_fails() {
        assert!(load_from_env(vars(&[("NOTES_CLIENT_SAVE_DEBOUNCE", "300ms")])).is_err());
    }

    #[test]
    fn reads_config_file_from_disk() {
        let path = env::temp_dir().join(format!("notes-client-{}.yaml", std::process::id()));
        fs::write(&path, "api_base_url: http://file.local\n").unwrap();

        let cfg = load_from_file(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(cfg.api_base_url, "http://file.local");
    }
}
