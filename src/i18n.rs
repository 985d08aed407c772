use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, Weekday};
use std::collections::HashMap;
use std::fmt::Write;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_LOCALE: &str = "en";

const BUNDLED: [(&str, &str); 2] = [
    ("en", include_str!("../locales/en.toml")),
    ("de", include_str!("../locales/de.toml")),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid translation file for locale '{locale}': {source}")]
    Parse {
        locale: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid date format '{pattern}' for locale '{locale}'")]
    DateFormat { locale: String, pattern: String },
}

pub trait Translator {
    /// Look up `key` and substitute `%{name}` placeholders from `args`.
    fn translate(&self, key: &str, locale: &str, args: &[(&str, &str)]) -> String;

    fn format_date(&self, date: NaiveDate, locale: &str) -> String;

    fn day_name(&self, day: Weekday, locale: &str) -> String {
        let key = match day {
            Weekday::Mon => "date.day_names.monday",
            Weekday::Tue => "date.day_names.tuesday",
            Weekday::Wed => "date.day_names.wednesday",
            Weekday::Thu => "date.day_names.thursday",
            Weekday::Fri => "date.day_names.friday",
            Weekday::Sat => "date.day_names.saturday",
            Weekday::Sun => "date.day_names.sunday",
        };
        self.translate(key, locale, &[])
    }
}

/// Translation tables keyed by locale, flattened to dotted keys.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locales: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// The `en` and `de` tables shipped with the crate.
    pub fn bundled() -> Self {
        let mut catalog = Self::default();
        for (locale, source) in BUNDLED {
            // A broken embedded table only loses its locale.
            if let Err(err) = catalog.add_locale(locale, source) {
                warn!(locale, error = %err, "skipping bundled translations");
            }
        }
        catalog
    }

    /// Like [`Catalog::bundled`], but fails on the first broken table.
    pub fn try_bundled() -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for (locale, source) in BUNDLED {
            catalog.add_locale(locale, source)?;
        }
        Ok(catalog)
    }

    /// Merge a TOML table into `locale`. Nothing is merged when the table
    /// does not parse or carries an unusable `date.format`.
    pub fn add_locale(&mut self, locale: &str, source: &str) -> Result<(), CatalogError> {
        let table: toml::Table = toml::from_str(source).map_err(|source| CatalogError::Parse {
            locale: locale.to_string(),
            source,
        })?;
        let mut parsed = HashMap::new();
        flatten_into(&mut parsed, "", &table);
        if let Some(pattern) = parsed
            .get("date.format")
            .filter(|pattern| !is_valid_date_format(pattern))
        {
            return Err(CatalogError::DateFormat {
                locale: locale.to_string(),
                pattern: pattern.clone(),
            });
        }
        self.locales
            .entry(locale.to_string())
            .or_default()
            .extend(parsed);
        Ok(())
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    pub fn lookup(&self, key: &str, locale: &str) -> Option<&str> {
        self.locales
            .get(locale)
            .and_then(|entries| entries.get(key))
            .or_else(|| {
                self.locales
                    .get(DEFAULT_LOCALE)
                    .and_then(|entries| entries.get(key))
            })
            .map(String::as_str)
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, locale: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.lookup(key, locale) else {
            return key.to_string();
        };
        interpolate(template, args)
    }

    fn format_date(&self, date: NaiveDate, locale: &str) -> String {
        let pattern = self.lookup("date.format", locale).unwrap_or(ISO_DATE);
        let mut out = String::new();
        if write!(out, "{}", date.format(pattern)).is_err() {
            return date.format(ISO_DATE).to_string();
        }
        out
    }
}

const ISO_DATE: &str = "%Y-%m-%d";

fn is_valid_date_format(pattern: &str) -> bool {
    StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}

fn flatten_into(entries: &mut HashMap<String, String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                entries.insert(full_key, text.clone());
            }
            toml::Value::Table(nested) => flatten_into(entries, &full_key, nested),
            other => {
                entries.insert(full_key, other.to_string());
            }
        }
    }
}

/// Single pass, so substituted values are never expanded again.
fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find("%{") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[pos..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        match args.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[pos..pos + 3 + end]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
