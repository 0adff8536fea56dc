//! Candidate items and text-member resolution.
//!
//! The widget shows each candidate as text. When a text member is configured
//! (say `"Name"`), the text comes from that member of the item, matched
//! case-insensitively; otherwise, or when the item has no such member, the
//! item's `Display` form is used. A missing member is never an error.
//!
//! # Example
//!
//! ```
//! use lazy_combo::{combo_item, display_text};
//!
//! #[derive(Clone, PartialEq)]
//! struct Person {
//!     name: String,
//!     email: String,
//! }
//!
//! impl std::fmt::Display for Person {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{} <{}>", self.name, self.email)
//!     }
//! }
//!
//! combo_item!(Person { name, email });
//!
//! let alice = Person { name: "Alice".into(), email: "alice@example.com".into() };
//! assert_eq!(display_text(&alice, Some("NAME")), "Alice");
//! assert_eq!(display_text(&alice, Some("phone")), "Alice <alice@example.com>");
//! assert_eq!(display_text(&alice, None), "Alice <alice@example.com>");
//! ```

use std::fmt;

/// A candidate the selector can list and select.
///
/// Items are compared with `PartialEq` when a new collection arrives, to find
/// the already selected item in it.
pub trait ComboItem: Clone + PartialEq + fmt::Display + Send + Sync + 'static {
    /// Look up a named member's text.
    ///
    /// Implementations should match `name` case-insensitively and return
    /// `None` for unknown members. The default has no members.
    fn member(&self, name: &str) -> Option<String> {
        let _ = name;
        None
    }
}

/// Resolve the text shown for `item`.
///
/// Uses `text_member` when it is set, non-empty and known to the item;
/// falls back to the item's `Display` form otherwise.
pub fn display_text<T: ComboItem>(item: &T, text_member: Option<&str>) -> String {
    text_member
        .filter(|member| !member.is_empty())
        .and_then(|member| item.member(member))
        .unwrap_or_else(|| item.to_string())
}

/// Implement [`ComboItem`] for a struct, exposing the listed fields as members.
///
/// Field names are matched case-insensitively; every listed field must
/// implement `Display`.
#[macro_export]
macro_rules! combo_item {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::ComboItem for $ty {
            fn member(&self, name: &str) -> Option<String> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($field)) {
                        return Some(self.$field.to_string());
                    }
                )*
                None
            }
        }
    };
}

impl ComboItem for String {}

impl ComboItem for &'static str {}

macro_rules! impl_plain_items {
    ($($ty:ty),* $(,)?) => {
        $(impl ComboItem for $ty {})*
    };
}

impl_plain_items!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, char, bool);

/// JSON objects expose their keys as members.
///
/// String members yield their contents without quotes; `null` yields an empty
/// string; other values yield their JSON text.
impl ComboItem for serde_json::Value {
    fn member(&self, name: &str) -> Option<String> {
        let object = self.as_object()?;
        let (_, value) = object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}
