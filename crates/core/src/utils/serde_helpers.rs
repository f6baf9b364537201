//! Case-insensitive string conversions for closed-set enums

/// Implements `FromStr`, `Display` and case-insensitive `Deserialize` for a
/// fieldless enum, plus an `ALL_NAMES` list of the canonical spellings.
///
/// Parsing failures produce [`crate::Error::ConfigError`] naming the accepted
/// values.
///
/// Usage:
/// ```ignore
/// impl_case_insensitive_enum!(
///     "environment",
///     Environment,
///     Wasmer => "wasmer",
///     Node => "node",
/// );
/// ```
#[macro_export]
macro_rules! impl_case_insensitive_enum {
    ($what:expr, $enum_type:ty, $($variant:ident => $str_val:expr),+ $(,)?) => {
        impl $enum_type {
            /// Canonical names of every variant
            pub const ALL_NAMES: &'static [&'static str] = &[$($str_val),+];

            /// Canonical spelling of this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str_val,)+
                }
            }
        }

        impl std::str::FromStr for $enum_type {
            type Err = $crate::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let lower = s.to_lowercase();
                $(
                    if lower == $str_val.to_lowercase() {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::Error::ConfigError(format!(
                    "unknown {} '{}', expected one of: {}",
                    $what,
                    s,
                    Self::ALL_NAMES.join(", ")
                )))
            }
        }

        impl std::fmt::Display for $enum_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $enum_type {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_type {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(|e: $crate::Error| serde::de::Error::custom(e.to_string()))
            }
        }
    };
}
