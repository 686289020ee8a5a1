//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Several contract enums (HTTP verbs, platforms, error codes) travel as
//! fixed strings. This macro generates both directions from one table so
//! the spelling lives in exactly one place.
//!
//! # Example
//!
//! ```rust
//! use geoquest_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Stable,
//!     Beta,
//! }
//!
//! impl_wire_name_conversions!(Channel {
//!     Stable => "STABLE",
//!     Beta => "BETA",
//! });
//!
//! assert_eq!(Channel::Beta.to_string(), "BETA");
//! assert_eq!("stable".parse::<Channel>(), Ok(Channel::Stable));
//! ```

/// Implements `as_str`, Display and FromStr for wire-named enums
///
/// This macro generates:
/// - `as_str()`: the exact wire spelling as a `&'static str`
/// - Display trait: writes the wire spelling
/// - FromStr trait: parses case-insensitively back to the variant
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their wire spelling
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire spelling of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestVerb {
        Fetch,
        Store,
    }

    impl_wire_name_conversions!(TestVerb {
        Fetch => "FETCH",
        Store => "Store",
    });

    #[test]
    fn test_display_uses_wire_spelling() {
        assert_eq!(TestVerb::Fetch.to_string(), "FETCH");
        assert_eq!(TestVerb::Store.to_string(), "Store");
        assert_eq!(TestVerb::Store.as_str(), "Store");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(TestVerb::from_str("fetch").unwrap(), TestVerb::Fetch);
        assert_eq!(TestVerb::from_str("STORE").unwrap(), TestVerb::Store);
        assert_eq!(TestVerb::from_str("  Fetch ").unwrap(), TestVerb::Fetch);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestVerb::from_str("delete");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid TestVerb: delete"));
        assert!(TestVerb::from_str("").is_err());
    }
}
