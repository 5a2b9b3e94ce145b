//! Message envelope and the codec contract (spec §4.2, §6).
//!
//! `id`, `timestamp`, and `notifiedSet` are assignable only by the node
//! runtime — `Envelope` keeps them private and exposes read-only accessors;
//! `payload` is owned by the application and is public.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GossipError;
use crate::peer::PeerIdentity;

/// Carries one application payload plus the propagation bookkeeping fields
/// every message needs regardless of payload type.
///
/// `Serialize` is derived; `Deserialize` is hand-written below so that the
/// three required field names — `id`, `timestamp`, `notifiedNodes` — match
/// case-insensitively on decode, per spec §6.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<P> {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(rename = "notifiedNodes")]
    notified: Vec<PeerIdentity>,
    pub payload: P,
}

impl<'de, P> Deserialize<'de> for Envelope<P>
where
    P: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};
        use std::fmt;

        enum Field {
            Id,
            Timestamp,
            Notified,
            Payload,
            Unknown,
        }

        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = Field;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("`id`, `timestamp`, `notifiedNodes`, or `payload` (case-insensitive)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Field, E>
            where
                E: de::Error,
            {
                Ok(match v.to_ascii_lowercase().as_str() {
                    "id" => Field::Id,
                    "timestamp" => Field::Timestamp,
                    "notifiednodes" => Field::Notified,
                    "payload" => Field::Payload,
                    _ => Field::Unknown,
                })
            }
        }

        impl<'de> Deserialize<'de> for Field {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_identifier(FieldVisitor)
            }
        }

        struct EnvelopeVisitor<P>(std::marker::PhantomData<P>);

        impl<'de, P: Deserialize<'de>> Visitor<'de> for EnvelopeVisitor<P> {
            type Value = Envelope<P>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a message envelope object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut id: Option<Uuid> = None;
                let mut timestamp: Option<DateTime<Utc>> = None;
                let mut notified: Option<Vec<PeerIdentity>> = None;
                let mut payload: Option<P> = None;

                while let Some(key) = map.next_key::<Field>()? {
                    match key {
                        Field::Id => {
                            if id.is_some() {
                                return Err(de::Error::duplicate_field("id"));
                            }
                            id = Some(map.next_value()?);
                        }
                        Field::Timestamp => {
                            if timestamp.is_some() {
                                return Err(de::Error::duplicate_field("timestamp"));
                            }
                            timestamp = Some(map.next_value()?);
                        }
                        Field::Notified => {
                            if notified.is_some() {
                                return Err(de::Error::duplicate_field("notifiedNodes"));
                            }
                            notified = Some(map.next_value()?);
                        }
                        Field::Payload => {
                            if payload.is_some() {
                                return Err(de::Error::duplicate_field("payload"));
                            }
                            payload = Some(map.next_value()?);
                        }
                        Field::Unknown => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let id = id.ok_or_else(|| de::Error::missing_field("id"))?;
                let timestamp = timestamp.ok_or_else(|| de::Error::missing_field("timestamp"))?;
                let notified =
                    notified.ok_or_else(|| de::Error::missing_field("notifiedNodes"))?;
                let payload = payload.ok_or_else(|| de::Error::missing_field("payload"))?;

                Ok(Envelope {
                    id,
                    timestamp,
                    notified,
                    payload,
                })
            }
        }

        const FIELDS: &[&str] = &["id", "timestamp", "notifiedNodes", "payload"];
        deserializer.deserialize_struct(
            "Envelope",
            FIELDS,
            EnvelopeVisitor(std::marker::PhantomData),
        )
    }
}

impl<P> Envelope<P> {
    /// Construct a freshly originated envelope: a new id, the current UTC
    /// instant, and an empty notified-set. Only the node runtime calls this.
    pub(crate) fn originate(payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            notified: Vec::new(),
            payload,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn notified(&self) -> &[PeerIdentity] {
        &self.notified
    }

    /// True iff `peer` already appears in the notified-set (spec's
    /// literal-equality rule on `PeerIdentity`).
    pub fn is_notified(&self, peer: &PeerIdentity) -> bool {
        self.notified.contains(peer)
    }

    /// Append `peer` to the notified-set if absent. Monotone: callers never
    /// remove an entry once added (invariant (b)/(c) in spec §3).
    pub(crate) fn mark_notified(&mut self, peer: PeerIdentity) {
        if !self.is_notified(&peer) {
            self.notified.push(peer);
        }
    }
}

/// Serialization contract supplied by the application's payload type.
///
/// Implementations must round-trip `id`, `timestamp`, and `notifiedSet`
/// (including insertion order) exactly — see P5 in spec §8.
pub trait Codec<P>: Send + Sync + 'static {
    fn encode(&self, envelope: &Envelope<P>) -> Result<Vec<u8>, GossipError>;
    fn decode(&self, bytes: &[u8]) -> Result<Envelope<P>, GossipError>;
}

/// Reference JSON codec (spec §6: "a JSON encoding is the reference
/// implementation and MUST interoperate between codec implementations").
///
/// Any `P: Serialize + DeserializeOwned` payload works with no extra glue;
/// this is the codec the demo binary and the test suite use.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl<P> Codec<P> for JsonCodec
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self, envelope: &Envelope<P>) -> Result<Vec<u8>, GossipError> {
        serde_json::to_vec(envelope).map_err(|e| GossipError::Decode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope<P>, GossipError> {
        serde_json::from_slice(bytes).map_err(|e| GossipError::Decode(e.to_string()))
    }
}
