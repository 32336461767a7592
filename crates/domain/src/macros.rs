/// UUID v7 の Newtype 識別子を定義する
///
/// `new()` は UUID v7 を生成するので、ID の順序は作成順になる。
///
/// ```rust
/// use docflow_domain::workflow::WorkflowId;
///
/// let id = WorkflowId::new();
/// let restored = WorkflowId::from_uuid(*id.as_uuid());
/// assert_eq!(id, restored);
/// assert_eq!(id.to_string(), id.as_uuid().to_string());
/// ```
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display, derive_more::From,
        )]
        #[serde(transparent)]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// 空白除去・必須・最大文字数を検証する String Newtype を定義する
///
/// デシリアライズも `new()` を通るので、不正な値の構造体は作れない。
/// `redact_debug` を付けると `Debug` を `[REDACTED]` にし、`Display` を実装しない
/// （個人情報をログに平文で出さないため）。
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use docflow_domain::value_objects::StepName;
///
/// let name = StepName::new("  HOD Review ")?;
/// assert_eq!(name.as_str(), "HOD Review");
///
/// let parsed: Result<StepName, _> = serde_json::from_str("\"   \"");
/// assert!(parsed.is_err());
/// # Ok(())
/// # }
/// ```
macro_rules! define_validated_string {
    (@base $(#[$meta:meta])* $vis:vis $Name:ident, $label:expr, $max_length:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $Name(String);

        impl $Name {
            pub const MAX_LENGTH: usize = $max_length;

            pub fn new(value: impl Into<String>) -> Result<Self, $crate::DomainError> {
                let value = value.into();
                let trimmed = value.trim();

                if trimmed.is_empty() {
                    return Err($crate::DomainError::Validation(format!("{}は必須です", $label)));
                }
                if trimmed.chars().count() > Self::MAX_LENGTH {
                    return Err($crate::DomainError::Validation(format!(
                        "{}は {} 文字以内である必要があります",
                        $label,
                        Self::MAX_LENGTH
                    )));
                }

                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $Name {
            type Error = $crate::DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$Name> for String {
            fn from(value: $Name) -> Self {
                value.0
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            label: $label:expr,
            max_length: $max_length:expr,
            redact_debug $(,)?
        }
    ) => {
        define_validated_string!(@base $(#[$meta])* $vis $Name, $label, $max_length);

        impl std::fmt::Debug for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($Name)).field(&"[REDACTED]").finish()
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            label: $label:expr,
            max_length: $max_length:expr $(,)?
        }
    ) => {
        define_validated_string!(@base $(#[$meta])* #[derive(Debug)] $vis $Name, $label, $max_length);

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}
