//! Typed per-rule configuration on top of the free-form `[RULE]` tables.

use crate::config::Config;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Implemented by each rule's option struct
pub trait RuleConfig: Serialize + DeserializeOwned + Default {
    const RULE_NAME: &'static str;
}

/// Load a rule's options, falling back to defaults for a missing or invalid section
pub fn load_rule_config<T: RuleConfig>(config: &Config) -> T {
    let Some(rule_config) = config.rules.get(T::RULE_NAME) else {
        return T::default();
    };

    match serde_json::to_value(&rule_config.values).and_then(serde_json::from_value) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Invalid configuration for {}: {e}", T::RULE_NAME);
            T::default()
        }
    }
}

/// Convert JSON to TOML, dropping nulls which TOML cannot express
pub fn json_to_toml_value(json: &serde_json::Value) -> Option<toml::Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float)),
        serde_json::Value::String(s) => Some(toml::Value::String(s.clone())),
        serde_json::Value::Array(items) => Some(toml::Value::Array(
            items.iter().filter_map(json_to_toml_value).collect(),
        )),
        serde_json::Value::Object(map) => {
            let table = map
                .iter()
                .filter_map(|(k, v)| json_to_toml_value(v).map(|tv| (k.clone(), tv)))
                .collect();
            Some(toml::Value::Table(table))
        }
    }
}

/// `[RULE]` section holding the defaults of `T`, for generated config files
pub fn default_section<T: RuleConfig>() -> Option<(String, toml::Value)> {
    let json = serde_json::to_value(T::default()).ok()?;
    match json_to_toml_value(&json)? {
        toml::Value::Table(table) if !table.is_empty() => Some((T::RULE_NAME.to_string(), toml::Value::Table(table))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig as RuleSection;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "kebab-case")]
    struct SampleConfig {
        #[serde(default = "default_true")]
        flag: bool,
    }

    fn default_true() -> bool {
        true
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self { flag: true }
        }
    }

    impl RuleConfig for SampleConfig {
        const RULE_NAME: &'static str = "XX001";
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = Config::default();
        assert_eq!(load_rule_config::<SampleConfig>(&config), SampleConfig::default());
    }

    #[test]
    fn test_section_values_apply() {
        let mut config = Config::default();
        let mut section = RuleSection::default();
        section.values.insert("flag".to_string(), toml::Value::Boolean(false));
        config.rules.insert("XX001".to_string(), section);

        assert!(!load_rule_config::<SampleConfig>(&config).flag);
    }

    #[test]
    fn test_invalid_section_falls_back() {
        let mut config = Config::default();
        let mut section = RuleSection::default();
        section
            .values
            .insert("flag".to_string(), toml::Value::String("yes".to_string()));
        config.rules.insert("XX001".to_string(), section);

        assert!(load_rule_config::<SampleConfig>(&config).flag);
    }

    #[test]
    fn test_default_section() {
        let (name, value) = default_section::<SampleConfig>().unwrap();
        assert_eq!(name, "XX001");
        assert_eq!(value.get("flag"), Some(&toml::Value::Boolean(true)));
    }
}
