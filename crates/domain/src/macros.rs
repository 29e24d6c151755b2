//! Display/FromStr boilerplate for string-backed domain enums
//!
//! Used for the login state machine and for configuration enums that can be
//! set from environment variables.
//!
//! # Example
//!
//! ```rust
//! use authbroker_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Backend {
//!     Memory,
//!     Sqlite,
//! }
//!
//! impl_domain_status_conversions!(Backend {
//!     Memory => "memory",
//!     Sqlite => "sqlite",
//! });
//!
//! assert_eq!("SQLite".parse::<Backend>(), Ok(Backend::Sqlite));
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a fieldless enum
///
/// String forms must be lowercase; parsing lowercases its input first.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
