//! Data models representing database entities and API payloads.
//!
//! Status-like columns are stored as short lowercase strings and mapped to
//! enums through [`string_enum!`].

/// Unknown value read from a string-backed enum column.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a string-backed enum usable as a sqlx column (`try_from = "String"`)
/// and as a serde value.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                match value.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::models::UnknownVariant {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

/// Prefix of `value` with at most `max_chars` characters, the unit
/// PostgreSQL uses for `VARCHAR(n)`.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    value
        .char_indices()
        .nth(max_chars)
        .map_or(value, |(end, _)| &value[..end])
}

/// Alerts and their delivery bookkeeping
pub mod alert;
/// Organization API keys
pub mod api_key;
/// Bank connections, bank API integrations and inbound bank events
pub mod bank;
/// Dashboard overview
pub mod dashboard;
/// Per-organization alert recipients
pub mod notification_settings;
/// Organizations, plans and usage
pub mod organization;
/// Paging helpers shared by list endpoints
pub mod pagination;
/// PIX transactions
pub mod pix_transaction;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ação", 2), "aç");
        assert_eq!(truncate_chars("", 0), "");
    }
}
