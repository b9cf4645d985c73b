use std::fmt;

use crate::store::{StoredValue, has_scheme};

/// A type with a direct mapping to one primitive [`StoredValue`] kind.
///
/// `decode` returns `None` when the stored kind does not match, which makes
/// the binding fall back to its default.
pub trait StorageValue: Sized {
    /// Encode into a stored primitive. `None` means "remove the key".
    fn encode(&self) -> Option<StoredValue>;

    /// Decode from a stored primitive.
    fn decode(value: StoredValue) -> Option<Self>;
}

/// A type persisted as a single underlying primitive, such as an enum
/// backed by a string or integer.
///
/// Implement by hand or with [`raw_representable!`](crate::raw_representable).
pub trait RawRepresentable: Sized {
    /// The primitive the value is persisted as.
    type Raw: StorageValue;

    /// The persisted form.
    fn to_raw(&self) -> Self::Raw;

    /// Rebuild from the persisted form; unknown raw values yield `None`.
    fn from_raw(raw: Self::Raw) -> Option<Self>;
}

impl StorageValue for bool {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Bool(*self))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Bool(value) => Some(value),
            _ => None,
        }
    }
}

impl StorageValue for i64 {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Integer(*self))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Integer(value) => Some(value),
            _ => None,
        }
    }
}

impl StorageValue for i32 {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Integer(i64::from(*self)))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Integer(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }
}

impl StorageValue for u32 {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Integer(i64::from(*self)))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Integer(value) => u32::try_from(value).ok(),
            _ => None,
        }
    }
}

impl StorageValue for f64 {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Double(*self))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Double(value) => Some(value),
            _ => None,
        }
    }
}

impl StorageValue for String {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::String(self.clone()))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl StorageValue for Vec<u8> {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Data(self.clone()))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Data(value) => Some(value),
            _ => None,
        }
    }
}

impl StorageValue for Uri {
    fn encode(&self) -> Option<StoredValue> {
        Some(StoredValue::Url(self.0.clone()))
    }

    fn decode(value: StoredValue) -> Option<Self> {
        match value {
            StoredValue::Url(value) => Uri::parse(value),
            _ => None,
        }
    }
}

impl<T: StorageValue> StorageValue for Option<T> {
    fn encode(&self) -> Option<StoredValue> {
        self.as_ref().and_then(T::encode)
    }

    fn decode(value: StoredValue) -> Option<Self> {
        T::decode(value).map(Some)
    }
}

/// An absolute URI in `scheme:rest` form, stored with the URL kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    /// Accepts `input` if it starts with a valid scheme.
    pub fn parse(input: impl Into<String>) -> Option<Self> {
        let input = input.into();
        has_scheme(&input).then_some(Self(input))
    }

    /// The URI text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme, without the trailing colon.
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map_or("", |(scheme, _)| scheme)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Implements [`RawRepresentable`](crate::storage::RawRepresentable) for a
/// fieldless enum.
///
/// # Example
/// ```ignore
/// #[derive(Clone, PartialEq)]
/// enum Theme { Light, Dark }
///
/// raw_representable!(Theme: String {
///     Theme::Light => "light",
///     Theme::Dark => "dark",
/// });
/// ```
#[macro_export]
macro_rules! raw_representable {
    ($ty:ty : $raw:ty { $($variant:path => $value:expr),+ $(,)? }) => {
        impl $crate::storage::RawRepresentable for $ty {
            type Raw = $raw;

            fn to_raw(&self) -> $raw {
                match self {
                    $($variant => <$raw>::from($value),)+
                }
            }

            fn from_raw(raw: $raw) -> ::std::option::Option<Self> {
                $(
                    if raw == <$raw>::from($value) {
                        return ::std::option::Option::Some($variant);
                    }
                )+
                ::std::option::Option::None
            }
        }
    };
}
