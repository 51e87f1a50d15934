// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Client configuration.

Configuration is layered: a JSON file of named profiles, a selected profile,
and command-line overrides, last wins. Override keys are dot paths
(`signing.gpgkey=KEY`) folded into a nested object; leaf values parse as
JSON literals when short enough and fall back to raw strings.
*/

use {
    crate::{
        error::{AptlyError, Result},
        signing::SigningConfig,
    },
    log::{debug, info, warn},
    serde_json::{Map, Value},
    std::{collections::HashMap, path::{Path, PathBuf}, time::Duration},
};

const DEFAULT_URL: &str = "http://localhost:8090";

/// Leaf values longer than this are taken as raw strings without attempting
/// JSON parsing.
const MAX_JSON_LEAF_LEN: usize = 1024;

/// Resolved client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the aptly API server.
    pub url: String,
    pub default_signing: SigningConfig,
    /// Per-publish signing overrides keyed on `"{prefix}/{distribution}"`.
    pub signing_map: HashMap<String, SigningConfig>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub max_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            default_signing: SigningConfig::default(),
            signing_map: HashMap::new(),
            connect_timeout: Some(Duration::from_secs(15)),
            read_timeout: None,
            max_workers: 5,
        }
    }
}

impl Config {
    /// Paths probed when no configuration file is given explicitly.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![];

        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            locations.push(home.join("aptly-ctl.json"));
            locations.push(home.join(".aptly-ctl.json"));
            locations.push(home.join(".config/aptly-ctl.json"));
        }
        locations.push(PathBuf::from("/etc/aptly-ctl.json"));

        locations
    }

    /// Load configuration from a file (or the default locations), select a
    /// profile, and apply overrides.
    pub fn load(path: Option<&Path>, profile: &str, overrides: &[String]) -> Result<Self> {
        let document = match path {
            Some(path) => {
                let data = std::fs::read_to_string(path)
                    .map_err(|e| AptlyError::Config(format!("cannot read {}: {}", path.display(), e)))?;
                info!("loaded config from {}", path.display());
                serde_json::from_str(&data)
                    .map_err(|e| AptlyError::Config(format!("cannot parse {}: {}", path.display(), e)))?
            }
            None => {
                let mut document = Value::Null;
                for candidate in Self::default_locations() {
                    match std::fs::read_to_string(&candidate) {
                        Ok(data) => {
                            info!("loaded config from {}", candidate.display());
                            document = serde_json::from_str(&data).map_err(|e| {
                                AptlyError::Config(format!(
                                    "cannot parse {}: {}",
                                    candidate.display(),
                                    e
                                ))
                            })?;
                            break;
                        }
                        Err(e) => {
                            debug!("no config at {}: {}", candidate.display(), e);
                        }
                    }
                }
                document
            }
        };

        let mut selected = select_profile(&document, profile)?;
        let override_map = parse_overrides(overrides)?;
        merge_value(&mut selected, Value::Object(override_map));

        Self::from_value(selected)
    }

    /// Build a configuration from a merged profile object.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut config = Self::default();

        let object = match value {
            Value::Null => Map::new(),
            Value::Object(object) => object,
            other => {
                return Err(AptlyError::Config(format!(
                    "profile must be an object, got {}",
                    other
                )))
            }
        };

        match object.get("url").and_then(|v| v.as_str()) {
            Some(url) => config.url = url.to_string(),
            None => warn!("no url configured; using default {}", config.url),
        }

        if let Some(signing) = object.get("signing") {
            config.default_signing = serde_json::from_value(signing.clone())
                .map_err(|e| AptlyError::Config(format!("invalid signing config: {}", e)))?;
            config.default_signing.validate()?;
        }

        if let Some(map) = object.get("signing map") {
            let map = map.as_object().ok_or_else(|| {
                AptlyError::Config("signing map must be an object".to_string())
            })?;

            for (key, value) in map {
                let signing: SigningConfig = serde_json::from_value(value.clone())
                    .map_err(|e| {
                        AptlyError::Config(format!("invalid signing map entry {}: {}", key, e))
                    })?;
                signing.validate()?;
                config.signing_map.insert(key.clone(), signing);
            }
        }

        for (key, target) in [
            ("connect_timeout", &mut config.connect_timeout),
            ("read_timeout", &mut config.read_timeout),
        ] {
            if let Some(value) = object.get(key) {
                let seconds = value.as_f64().filter(|s| *s >= 0.0).ok_or_else(|| {
                    AptlyError::Config(format!("{} must be a non-negative number of seconds", key))
                })?;
                *target = Some(Duration::from_secs_f64(seconds));
            }
        }

        if let Some(value) = object.get("max_workers") {
            config.max_workers = value
                .as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    AptlyError::Config("max_workers must be a positive integer".to_string())
                })? as usize;
        }

        Ok(config)
    }
}

/// Select a profile from the configuration document.
///
/// An empty selector picks the first profile; otherwise the selector must
/// match exactly one profile name, by full name or unique prefix.
fn select_profile(document: &Value, selector: &str) -> Result<Value> {
    let profiles = match document {
        Value::Null => {
            return if selector.is_empty() {
                Ok(Value::Object(Map::new()))
            } else {
                Err(AptlyError::Config(format!(
                    "no configuration file found to select profile {} from",
                    selector
                )))
            }
        }
        Value::Object(profiles) => profiles,
        _ => {
            return Err(AptlyError::Config(
                "configuration root must be an object of profiles".to_string(),
            ))
        }
    };

    if selector.is_empty() {
        return Ok(profiles
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())));
    }

    if let Some(profile) = profiles.get(selector) {
        return Ok(profile.clone());
    }

    let matches = profiles
        .keys()
        .filter(|name| name.starts_with(selector))
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [] => Err(AptlyError::Config(format!(
            "no profile {} in {:?}",
            selector,
            profiles.keys().collect::<Vec<_>>()
        ))),
        [name] => {
            info!("selected profile {}", name);
            Ok(profiles[name.as_str()].clone())
        }
        many => Err(AptlyError::Config(format!(
            "profile {} is ambiguous: matches {:?}",
            selector, many
        ))),
    }
}

/// Fold `key.path=VALUE` override strings into a nested object.
pub fn parse_overrides(overrides: &[String]) -> Result<Map<String, Value>> {
    let mut out = Map::new();

    for entry in overrides {
        let (key_path, raw_value) = entry
            .split_once('=')
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .ok_or_else(|| {
                AptlyError::Config(format!("override must be KEY=VALUE: {}", entry))
            })?;

        let keys = key_path.split('.').collect::<Vec<_>>();
        let mut cursor = &mut out;

        for key in &keys[..keys.len() - 1] {
            cursor = cursor
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| {
                    AptlyError::Config(format!(
                        "override path {} conflicts with a non-object value",
                        key_path
                    ))
                })?;
        }

        cursor.insert(
            keys[keys.len() - 1].to_string(),
            parse_leaf_value(raw_value),
        );
    }

    Ok(out)
}

/// Parse an override leaf: a JSON literal when short and valid, else the raw
/// string. The length cap guards the JSON parser against pathological input.
fn parse_leaf_value(raw: &str) -> Value {
    if raw.len() > MAX_JSON_LEAF_LEN {
        return Value::String(raw.to_string());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Merge `other` into `base`: objects merge recursively, anything else
/// replaces.
fn merge_value(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base), Value::Object(other)) => {
            for (key, value) in other {
                match base.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, other) => *base = other,
    }
}

#[cfg(test)]
mod test {
    use {super::*, serde_json::json};

    fn profiles() -> Value {
        json!({
            "production": {
                "url": "https://aptly.example.org",
                "signing": {"gpgkey": "K1", "passphrase_file": "/etc/gpg-pass"},
                "signing map": {
                    "./unstable": {"skip": true},
                },
                "connect_timeout": 5.0,
                "max_workers": 10,
            },
            "staging": {
                "url": "http://staging:8090",
            },
        })
    }

    fn load_profile(selector: &str, overrides: &[&str]) -> Result<Config> {
        let overrides = overrides.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut selected = select_profile(&profiles(), selector)?;
        merge_value(&mut selected, Value::Object(parse_overrides(&overrides)?));
        Config::from_value(selected)
    }

    #[test]
    fn selects_profiles() -> Result<()> {
        // Empty selector picks the first profile.
        assert_eq!(load_profile("", &[])?.url, "https://aptly.example.org");
        assert_eq!(load_profile("staging", &[])?.url, "http://staging:8090");
        // Unique prefix match.
        assert_eq!(load_profile("stag", &[])?.url, "http://staging:8090");

        Ok(())
    }

    #[test]
    fn rejects_unknown_and_ambiguous_profiles() {
        assert!(matches!(
            load_profile("nope", &[]),
            Err(AptlyError::Config(_))
        ));

        let two = json!({"prod-a": {}, "prod-b": {}});
        assert!(matches!(
            select_profile(&two, "prod"),
            Err(AptlyError::Config(_))
        ));
    }

    #[test]
    fn parses_profile_fields() -> Result<()> {
        let config = load_profile("production", &[])?;

        assert_eq!(config.url, "https://aptly.example.org");
        assert_eq!(config.default_signing.gpg_key.as_deref(), Some("K1"));
        assert!(config.signing_map["./unstable"].skip);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.max_workers, 10);

        Ok(())
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let config = Config::from_value(Value::Null)?;
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.max_workers, 5);

        Ok(())
    }

    #[test]
    fn overrides_win() -> Result<()> {
        let config = load_profile(
            "production",
            &[
                "url=http://other:8090",
                "signing.gpgkey=K2",
                "max_workers=3",
            ],
        )?;

        assert_eq!(config.url, "http://other:8090");
        assert_eq!(config.default_signing.gpg_key.as_deref(), Some("K2"));
        // Untouched sibling keys survive the merge.
        assert_eq!(
            config.default_signing.passphrase_file.as_deref(),
            Some("/etc/gpg-pass")
        );
        assert_eq!(config.max_workers, 3);

        Ok(())
    }

    #[test]
    fn override_leaves_parse_as_json_literals() {
        let overrides = ["a=true", "b=5", "c=plain string", r#"d="quoted""#]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let map = parse_overrides(&overrides).unwrap();

        assert_eq!(map["a"], json!(true));
        assert_eq!(map["b"], json!(5));
        assert_eq!(map["c"], json!("plain string"));
        assert_eq!(map["d"], json!("quoted"));
    }

    #[test]
    fn override_long_values_stay_raw() {
        let long = format!("x={}", "9".repeat(MAX_JSON_LEAF_LEN + 1));
        let map = parse_overrides(&[long]).unwrap();
        assert!(map["x"].is_string());
    }

    #[test]
    fn override_dot_paths_nest() {
        let map = parse_overrides(&["signing.gpgkey=K".to_string()]).unwrap();
        assert_eq!(map["signing"]["gpgkey"], json!("K"));
    }

    #[test]
    fn malformed_overrides_rejected() {
        for bad in ["nodelimiter", "=value", "key="] {
            assert!(parse_overrides(&[bad.to_string()]).is_err());
        }
    }

    #[test]
    fn invalid_signing_rejected_at_load() {
        let value = json!({"signing": {"gpgkey": "K1"}});
        assert!(matches!(
            Config::from_value(value),
            Err(AptlyError::Config(_))
        ));
    }
}
