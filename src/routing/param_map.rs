//! Free-text value → canonical backend key.
//!
//! The pricing backend only understands a handful of market keys
//! (`Malvinas_online`, `Ferreteria_online`, ...) while the browser sends
//! whatever label the user picked. Lookup ignores case, accents, spaces and
//! separators; the canonical values themselves are accepted too.

use std::collections::HashMap;

use crate::config::ParamMapConfig;

#[derive(Debug, Clone)]
pub struct ParamMap {
    pub from: String,
    pub to: String,
    default: String,
    values: HashMap<String, String>,
}

impl ParamMap {
    /// Build the lookup table; aliases and canonical values are both keys.
    pub fn from_config(config: &ParamMapConfig) -> Self {
        let mut values = HashMap::new();
        for canonical in config.values.values() {
            values.insert(fold_key(canonical), canonical.clone());
        }
        // Explicit aliases win over canonical spellings.
        for (alias, canonical) in &config.values {
            values.insert(fold_key(alias), canonical.clone());
        }
        values.insert(fold_key(&config.default), config.default.clone());

        Self {
            from: config.from.clone(),
            to: config.to.clone(),
            default: config.default.clone(),
            values,
        }
    }

    /// Canonical value for an inbound value, or the default.
    pub fn resolve(&self, input: Option<&str>) -> &str {
        input
            .map(fold_key)
            .filter(|key| !key.is_empty())
            .and_then(|key| self.values.get(&key))
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Upper-case ASCII letters and digits only, accents stripped.
fn fold_key(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' | 'Ñ' => 'N',
            other => other.to_ascii_uppercase(),
        })
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markets() -> ParamMap {
        ParamMap::from_config(&ParamMapConfig {
            from: "id".into(),
            to: "mercado".into(),
            default: "Malvinas_online".into(),
            values: [
                ("MALVINAS".to_string(), "Malvinas_online".to_string()),
                ("FERRETERIA".to_string(), "Ferreteria_online".to_string()),
            ]
            .into_iter()
            .collect(),
        })
    }

    #[test]
    fn exact_key() {
        assert_eq!(markets().resolve(Some("FERRETERIA")), "Ferreteria_online");
    }

    #[test]
    fn loose_spellings() {
        let map = markets();
        assert_eq!(map.resolve(Some("ferretería")), "Ferreteria_online");
        assert_eq!(map.resolve(Some(" Ferreteria ")), "Ferreteria_online");
        assert_eq!(map.resolve(Some("ferreteria_online")), "Ferreteria_online");
    }

    #[test]
    fn unknown_or_missing_falls_back() {
        let map = markets();
        assert_eq!(map.resolve(Some("PARIS")), "Malvinas_online");
        assert_eq!(map.resolve(Some("  ")), "Malvinas_online");
        assert_eq!(map.resolve(None), "Malvinas_online");
    }

    #[test]
    fn fold_strips_separators() {
        assert_eq!(fold_key("Malvinas_online"), "MALVINASONLINE");
        assert_eq!(fold_key("Ñaña-2"), "NANA2");
    }
}
