//! Data models for visitors, deliveries, works and user profiles.

pub mod delivery;
pub mod profile;
pub mod visitor;
pub mod work;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub use delivery::{Delivery, DeliveryPhotos, NewDelivery, UpdateDelivery};
pub use profile::{Profile, Role, UpdateProfile};
pub use visitor::{Epi, NewVisitor, UpdateVisitor, Vehicle, Visitor, VisitorPhotos};
pub use work::{NewWork, Work};

/// Which register a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordKind {
    #[default]
    Visitor,
    Delivery,
}

impl RecordKind {
    /// Display name (plural) used in tabs and toggles.
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Visitor => "Visitantes",
            RecordKind::Delivery => "Entregas",
        }
    }

    /// Backend table holding this kind of record.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Visitor => visitor::TABLE,
            RecordKind::Delivery => delivery::TABLE,
        }
    }
}

/// Common behaviour of a gate entry.
///
/// A record with no exit time is active (on site). Exit is one-way.
pub trait GateRecord {
    fn id(&self) -> i64;
    fn work_id(&self) -> i64;
    fn entry_time(&self) -> DateTime<Utc>;
    fn exit_time(&self) -> Option<DateTime<Utc>>;

    /// Name used in confirmations ("register exit of ...").
    fn display_name(&self) -> &str;

    /// Case-insensitive free-text match over the searchable fields.
    fn matches_search(&self, term: &str) -> bool;

    fn is_active(&self) -> bool {
        self.exit_time().is_none()
    }
}

/// Set `slot` to `at` unless an exit is already recorded.
///
/// Returns `true` when the record transitioned.
pub(crate) fn record_exit(slot: &mut Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(at);
    true
}

/// Lower-cased containment over several fields.
pub(crate) fn any_contains(fields: &[&str], term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

/// Nullable text columns map to empty strings.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Nullable boolean columns map to `false`.
pub(crate) fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}
