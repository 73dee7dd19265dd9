use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
};

/// Child elements of a `<stream>` node that are picked up by the parser.
pub const STREAM_FIELDS: &[&str] = &[
    "name",
    "time",
    "bw_in",
    "bytes_in",
    "bw_out",
    "bytes_out",
    "bw_audio",
    "bw_video",
    "nclients",
];

/// Child elements of a `<client>` node that are picked up by the parser.
pub const CLIENT_FIELDS: &[&str] = &[
    "id",
    "address",
    "time",
    "flashver",
    "swfurl",
    "pageurl",
    "dropped",
    "avsync",
    "timestamp",
];

/// Known fields of a stream or client record. Keys the server did not report are absent.
pub type Fields = BTreeMap<String, FieldValue>;

/// A scalar value as reported by the stat page.
///
/// Values made up only of decimal digits are stored as integers, everything else stays text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn coerce(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = raw.parse::<i64>() {
                return Self::Integer(value);
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Integer(_) => None,
            Self::Text(value) => Some(value.as_str()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One connected client of a stream, rebuilt on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub fields: Fields,
    /// The client element carried an `<active/>` marker.
    pub active: bool,
    /// The client element carried a `<publishing/>` marker, i.e. it is the stream's source.
    pub publishing: bool,
}

impl ClientRecord {
    pub fn new(fields: Fields, active: bool, publishing: bool) -> Self {
        Self {
            fields,
            active,
            publishing,
        }
    }

    pub fn publisher() -> Self {
        Self::new(Fields::new(), true, true)
    }

    pub fn viewer() -> Self {
        Self::new(Fields::new(), true, false)
    }

    pub fn with_integer(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), FieldValue::Integer(value));
        self
    }

    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), FieldValue::Text(value.to_string()));
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn id(&self) -> Option<i64> {
        self.integer("id")
    }

    pub fn address(&self) -> Option<&FieldValue> {
        self.field("address")
    }

    pub fn flashver(&self) -> Option<&FieldValue> {
        self.field("flashver")
    }

    pub fn dropped(&self) -> Option<i64> {
        self.integer("dropped")
    }

    pub fn avsync(&self) -> Option<&FieldValue> {
        self.field("avsync")
    }

    fn integer(&self, key: &str) -> Option<i64> {
        self.field(key).and_then(FieldValue::as_integer)
    }
}

/// A single fetch's view of one stream. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub name: String,
    /// Known stream-level fields except `name`.
    pub fields: Fields,
    pub clients: Vec<ClientRecord>,
    pub active: bool,
    pub publishing: bool,
}

impl StreamSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Fields::new(),
            clients: Vec::new(),
            active: false,
            publishing: false,
        }
    }

    pub fn with_integer(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), FieldValue::Integer(value));
        self
    }

    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), FieldValue::Text(value.to_string()));
        self
    }

    pub fn with_client(mut self, client: ClientRecord) -> Self {
        self.clients.push(client);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn time(&self) -> Option<i64> {
        self.integer("time")
    }

    pub fn bytes_in(&self) -> Option<i64> {
        self.integer("bytes_in")
    }

    pub fn bytes_out(&self) -> Option<i64> {
        self.integer("bytes_out")
    }

    pub fn bw_in(&self) -> Option<i64> {
        self.integer("bw_in")
    }

    pub fn bw_out(&self) -> Option<i64> {
        self.integer("bw_out")
    }

    pub fn bw_audio(&self) -> Option<i64> {
        self.integer("bw_audio")
    }

    pub fn bw_video(&self) -> Option<i64> {
        self.integer("bw_video")
    }

    pub fn nclients(&self) -> Option<i64> {
        self.integer("nclients")
    }

    /// The client that is sending the stream's media, if the server flagged one.
    pub fn publisher(&self) -> Option<&ClientRecord> {
        self.clients.iter().find(|client| client.publishing)
    }

    fn integer(&self, key: &str) -> Option<i64> {
        self.field(key).and_then(FieldValue::as_integer)
    }
}
