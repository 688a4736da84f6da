use std::{
    any::type_name,
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::NonZeroU64,
};

use serde::{
    de::{Error as DeError, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

/// Milliseconds between the unix epoch and the service epoch (2015-01-01).
const ID_EPOCH_MS: u64 = 1_420_070_400_000;

pub mod marker {
    //! Zero-sized marker types distinguishing ids of different entity kinds
    //! at the type level.

    #[non_exhaustive]
    pub struct ApplicationMarker;

    #[non_exhaustive]
    pub struct ChannelMarker;

    #[non_exhaustive]
    pub struct GuildMarker;

    #[non_exhaustive]
    pub struct MessageMarker;

    #[non_exhaustive]
    pub struct RoleMarker;

    #[non_exhaustive]
    pub struct UserMarker;
}

/// A 64-bit time-sortable unique id.
///
/// The marker parameter only exists at the type level so that e.g. a guild id
/// cannot be passed where a channel id is expected. The timestamp of creation
/// sits in the high 22 bits, making ids of one kind sortable by age.
pub struct Id<M> {
    value: NonZeroU64,
    phantom: PhantomData<fn(M) -> M>,
}

impl<M> Id<M> {
    /// Create an id from a raw value.
    ///
    /// # Panics
    ///
    /// Panics if the value is zero.
    #[track_caller]
    pub const fn new(value: u64) -> Self {
        match NonZeroU64::new(value) {
            Some(value) => Self {
                value,
                phantom: PhantomData,
            },
            None => panic!("id must be non-zero"),
        }
    }

    pub const fn from_nonzero(value: NonZeroU64) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }

    pub const fn get(self) -> u64 {
        self.value.get()
    }

    pub const fn into_nonzero(self) -> NonZeroU64 {
        self.value
    }

    /// Unix timestamp in milliseconds at which the id was created.
    pub const fn timestamp(self) -> u64 {
        (self.value.get() >> 22) + ID_EPOCH_MS
    }

    /// Reinterpret the id as one of a different entity kind.
    pub const fn cast<N>(self) -> Id<N> {
        Id {
            value: self.value,
            phantom: PhantomData,
        }
    }
}

impl<M> Clone for Id<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Id<M> {}

impl<M> PartialEq for Id<M> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<M> Eq for Id<M> {}

impl<M> PartialOrd for Id<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Id<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<M> Hash for Id<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<M> Debug for Id<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let full_name = type_name::<M>();
        let marker = full_name.rsplit("::").next().unwrap_or(full_name);

        f.write_str("Id<")?;
        f.write_str(marker)?;
        f.write_str(">(")?;
        Display::fmt(&self.value, f)?;
        f.write_str(")")
    }
}

impl<M> Display for Id<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.value, f)
    }
}

impl<M> From<NonZeroU64> for Id<M> {
    fn from(value: NonZeroU64) -> Self {
        Self::from_nonzero(value)
    }
}

struct IdVisitor<M> {
    phantom: PhantomData<fn(M) -> M>,
}

impl<'de, M> Visitor<'de> for IdVisitor<M> {
    type Value = Id<M>;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a non-zero integer or a string containing one")
    }

    fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
        let value = NonZeroU64::new(value)
            .ok_or_else(|| DeError::invalid_value(Unexpected::Unsigned(value), &self))?;

        Ok(Id::from_nonzero(value))
    }

    fn visit_str<E: DeError>(self, value: &str) -> Result<Self::Value, E> {
        value
            .parse()
            .map(Id::from_nonzero)
            .map_err(|_| DeError::invalid_value(Unexpected::Str(value), &self))
    }
}

// The wire sends ids as decimal strings to spare consumers that truncate
// large integers; some payloads still carry them as numbers.
impl<'de, M> Deserialize<'de> for Id<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor {
            phantom: PhantomData,
        })
    }
}

impl<M> Serialize for Id<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{marker::GuildMarker, Id};

    #[test]
    fn timestamp_is_in_high_bits() {
        let id: Id<GuildMarker> = Id::new(175_928_847_299_117_063);
        assert_eq!(id.timestamp(), 1_462_015_105_796);
    }

    #[test]
    fn deserializes_from_string_and_number() {
        let from_str: Id<GuildMarker> = serde_json::from_value(json!("123")).unwrap();
        let from_num: Id<GuildMarker> = serde_json::from_value(json!(123)).unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn serializes_as_string() {
        let id: Id<GuildMarker> = Id::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }

    #[test]
    fn ordering_follows_creation_time() {
        let older: Id<GuildMarker> = Id::new(1 << 22);
        let newer: Id<GuildMarker> = Id::new(2 << 22);
        assert!(older < newer);
    }
}
