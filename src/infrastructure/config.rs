use crate::domain::heatmap::ColorScale;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const APP_JSON: &str = "app.json";
const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
const DEFAULT_SETTLE_DELAY_MS: u64 = 300;
const DEFAULT_WIDTH_PX: i64 = 960;
const TIMEZONE_ENV_KEYS: &[&str] = &["QUESTDROP_TIMEZONE"];
const FEED_BASE_URL_ENV_KEYS: &[&str] = &["QUESTDROP_FEED_BASE_URL"];

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapConfig {
    pub color_scale: ColorScale,
    pub settle_delay: Duration,
    pub default_width_px: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub app_name: String,
    pub timezone: Tz,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub feed_base_url: Option<Url>,
    pub heatmap: HeatmapConfig,
}

fn default_app_json() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "Quest Drop Reports",
        "timezone": DEFAULT_TIMEZONE,
        "inputDir": "input",
        "outputDir": "output",
        "feedBaseUrl": null,
        "heatmap": {
            "lowColor": "#d6e685",
            "highColor": "#1e6823",
            "settleDelayMs": DEFAULT_SETTLE_DELAY_MS,
            "defaultWidthPx": DEFAULT_WIDTH_PX
        }
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn lookup_override<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn load_app_config(workspace_root: &Path) -> Result<AppConfig, InfraError> {
    load_app_config_from_lookup(workspace_root, |key| std::env::var(key).ok())
}

/// Reads `config/app.json`; `lookup` supplies environment overrides.
pub fn load_app_config_from_lookup<F>(workspace_root: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let app = read_config(&workspace_root.join("config").join(APP_JSON))?;

    let timezone_name = lookup_override(&lookup, TIMEZONE_ENV_KEYS)
        .or_else(|| non_empty_str(&app, "timezone").map(ToOwned::to_owned))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = parse_timezone(&timezone_name)?;

    let feed_base_url = lookup_override(&lookup, FEED_BASE_URL_ENV_KEYS)
        .or_else(|| non_empty_str(&app, "feedBaseUrl").map(ToOwned::to_owned))
        .map(|raw| {
            Url::parse(&raw)
                .map_err(|error| InfraError::InvalidConfig(format!("invalid feedBaseUrl '{raw}': {error}")))
        })
        .transpose()?;

    let resolve_dir = |key: &str, fallback: &str| {
        let relative = non_empty_str(&app, key).unwrap_or(fallback);
        workspace_root.join(relative)
    };

    let heatmap = app
        .get("heatmap")
        .filter(|value| value.is_object())
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let color_scale: ColorScale = serde_json::from_value(heatmap.clone())
        .map_err(|error| InfraError::InvalidConfig(format!("invalid heatmap colors: {error}")))?;
    color_scale.validate().map_err(InfraError::InvalidConfig)?;

    let settle_delay_ms = heatmap
        .get("settleDelayMs")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(DEFAULT_SETTLE_DELAY_MS);
    let default_width_px = heatmap
        .get("defaultWidthPx")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(DEFAULT_WIDTH_PX);

    Ok(AppConfig {
        app_name: non_empty_str(&app, "appName")
            .unwrap_or("Quest Drop Reports")
            .to_string(),
        timezone,
        input_dir: resolve_dir("inputDir", "input"),
        output_dir: resolve_dir("outputDir", "output"),
        feed_base_url,
        heatmap: HeatmapConfig {
            color_scale,
            settle_delay: Duration::from_millis(settle_delay_ms),
            default_width_px,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "questdrop-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(path.join("config")).expect("create temp workspace");
            Self { path }
        }

        fn write_app_json(&self, value: serde_json::Value) {
            fs::write(self.path.join("config").join(APP_JSON), value.to_string()).expect("write app.json");
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_and_loaded() {
        let workspace = TempWorkspace::new();
        ensure_default_configs(&workspace.path.join("config")).expect("write defaults");

        let config = load_app_config_from_lookup(&workspace.path, |_| None).expect("load config");
        assert_eq!(config.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.output_dir, workspace.path.join("output"));
        assert_eq!(config.feed_base_url, None);
        assert_eq!(config.heatmap.settle_delay, Duration::from_millis(300));
        assert_eq!(config.heatmap.color_scale, ColorScale::default());
    }

    #[test]
    fn existing_config_is_not_overwritten() {
        let workspace = TempWorkspace::new();
        workspace.write_app_json(serde_json::json!({"schema": 1, "timezone": "UTC"}));
        ensure_default_configs(&workspace.path.join("config")).expect("ensure defaults");

        let config = load_app_config_from_lookup(&workspace.path, |_| None).expect("load config");
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.heatmap.default_width_px, 960);
    }

    #[test]
    fn environment_overrides_file_values() {
        let workspace = TempWorkspace::new();
        workspace.write_app_json(serde_json::json!({"schema": 1, "timezone": "UTC"}));

        let config = load_app_config_from_lookup(&workspace.path, |key| match key {
            "QUESTDROP_TIMEZONE" => Some("Europe/Berlin".to_string()),
            "QUESTDROP_FEED_BASE_URL" => Some("https://drops.example.com/reports/".to_string()),
            _ => None,
        })
        .expect("load config");
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(
            config.feed_base_url.as_ref().map(Url::as_str),
            Some("https://drops.example.com/reports/")
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let workspace = TempWorkspace::new();
        workspace.write_app_json(serde_json::json!({"schema": 2}));
        assert!(matches!(
            load_app_config_from_lookup(&workspace.path, |_| None),
            Err(InfraError::InvalidConfig(_))
        ));

        workspace.write_app_json(serde_json::json!({"schema": 1, "timezone": "Mars/Olympus"}));
        assert!(matches!(
            load_app_config_from_lookup(&workspace.path, |_| None),
            Err(InfraError::InvalidConfig(_))
        ));

        workspace.write_app_json(serde_json::json!({"schema": 1, "heatmap": {"lowColor": "green"}}));
        assert!(matches!(
            load_app_config_from_lookup(&workspace.path, |_| None),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn heatmap_colors_fall_back_per_field() {
        let workspace = TempWorkspace::new();
        workspace.write_app_json(serde_json::json!({"schema": 1, "heatmap": {"highColor": "#000000"}}));
        let config = load_app_config_from_lookup(&workspace.path, |_| None).expect("load config");
        assert_eq!(config.heatmap.color_scale.low, ColorScale::default().low);
        assert_eq!(config.heatmap.color_scale.high, "#000000");

        workspace.write_app_json(serde_json::json!({"schema": 1}));
        let config = load_app_config_from_lookup(&workspace.path, |_| None).expect("load config");
        assert_eq!(config.heatmap.color_scale, ColorScale::default());
        assert_eq!(config.heatmap.settle_delay, Duration::from_millis(300));
    }
}
