//! Output key casing.

use std::fmt;
use std::str::FromStr;

/// How projected keys are spelled in emitted events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyCasing {
    /// Keep the field name (or alias) exactly as selected
    #[default]
    Verbatim,
    /// Convert camelCase / PascalCase names to snake_case
    SnakeCase,
}

impl KeyCasing {
    /// Apply this casing to an output key.
    pub fn apply(&self, key: &str) -> String {
        match self {
            Self::Verbatim => key.to_string(),
            Self::SnakeCase => to_snake_case(key),
        }
    }
}

impl FromStr for KeyCasing {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "verbatim" => Ok(Self::Verbatim),
            "snake_case" => Ok(Self::SnakeCase),
            other => anyhow::bail!(
                "Invalid key casing '{other}'. Expected 'verbatim' or 'snake_case'"
            ),
        }
    }
}

impl fmt::Display for KeyCasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbatim => f.write_str("verbatim"),
            Self::SnakeCase => f.write_str("snake_case"),
        }
    }
}

/// Convert a camelCase or PascalCase name to snake_case.
///
/// An underscore is inserted between a lowercase letter or digit and a
/// following uppercase letter, and before the last uppercase letter of an
/// uppercase run that is followed by a lowercase letter (`USAField` becomes
/// `usa_field`). Path separators and hyphens become underscores. Existing
/// underscores are kept, so `__c` suffixes survive unchanged.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name
        .chars()
        .map(|c| if c == '.' || c == '-' { '_' } else { c })
        .collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    out
}
