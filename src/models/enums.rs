use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Provider {
    Groq => "groq",
    Google => "google",
});

str_enum!(Role {
    User => "user",
    Assistant => "assistant",
});

str_enum!(AnalysisType {
    General => "general",
    Technical => "technical",
    Educational => "educational",
});

str_enum!(EnhancementProfile {
    Default => "default",
    Document => "document",
    Handwriting => "handwriting",
});

impl Provider {
    /// Environment variable holding this provider's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }

    /// Chat-completion providers take the running conversation as explicit
    /// message history. The generative endpoint is driven one prompt at a time.
    pub fn is_history_aware(&self) -> bool {
        matches!(self, Self::Groq)
    }
}

impl AnalysisType {
    /// Lenient lookup: unknown names fall back to `General`.
    pub fn from_name(name: &str) -> Self {
        name.trim()
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(Self::General)
    }
}

impl Default for AnalysisType {
    fn default() -> Self {
        Self::General
    }
}

impl EnhancementProfile {
    /// Lenient lookup: unknown names fall back to `Default`.
    pub fn from_name(name: &str) -> Self {
        name.trim()
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(Self::Default)
    }
}

impl Default for EnhancementProfile {
    fn default() -> Self {
        Self::Default
    }
}
