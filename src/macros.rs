//! Declarative tables for protocol constants.

/// Defines the `Feature` enum from `Name => "TOKEN"` pairs.
///
/// Each capability maps to exactly one wire-level feature token.
macro_rules! define_features {
    ($($(#[$meta:meta])* $name:ident => $token:literal),* $(,)?) => {
        /// A device capability that is advertised through a feature token.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $($(#[$meta])* $name),*
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$name),*];

            /// The token a device lists in its `feature` string for this capability.
            pub fn token(self) -> &'static str {
                match self {
                    $(Feature::$name => $token),*
                }
            }

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some(Feature::$name),)*
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for Feature {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $(Feature::$name => stringify!($name)),*
                };
                write!(f, "{} ({})", name, self.token())
            }
        }
    };
}

/// Implements [`Reply`](crate::command::Reply) for response leaves with
/// `err_code` and `err_msg` fields.
macro_rules! impl_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::command::Reply for $ty {
                fn err_code(&self) -> i64 {
                    self.err_code
                }

                fn err_msg(&self) -> Option<&str> {
                    self.err_msg.as_deref()
                }
            }
        )*
    };
}
