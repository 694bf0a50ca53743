use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

/// A sorted-set member with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ZMember {
    pub score: f64,
    pub member: Vec<u8>,
}

impl ZMember {
    pub fn new(score: f64, member: impl Into<Vec<u8>>) -> Self {
        Self {
            score,
            member: member.into(),
        }
    }
}

/// Distance unit for GEODIST / GEOSEARCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoUnit {
    Meters,
    Kilometers,
    Miles,
}

impl GeoUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoUnit::Meters => "m",
            GeoUnit::Kilometers => "km",
            GeoUnit::Miles => "mi",
        }
    }
}

/// A geospatial member: longitude first, matching the GEOADD argument order.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMember {
    pub longitude: f64,
    pub latitude: f64,
    pub member: Vec<u8>,
}

impl GeoMember {
    pub fn new(longitude: f64, latitude: f64, member: impl Into<Vec<u8>>) -> Self {
        Self {
            longitude,
            latitude,
            member: member.into(),
        }
    }
}

/// One stream entry: its id plus the field/value pairs in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(String, Bytes)>,
}

impl StreamEntry {
    /// Field lookup by name; fields keep server order so small linear scan.
    pub fn field(&self, name: &str) -> Option<&Bytes> {
        self.fields
            .iter()
            .find(|(f, _)| f == name)
            .map(|(_, v)| v)
    }

    pub fn fields_map(&self) -> HashMap<String, Bytes> {
        self.fields.iter().cloned().collect()
    }
}

/// Entries returned for one stream key by XREADGROUP / XREAD.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamKey {
    pub key: String,
    pub entries: Vec<StreamEntry>,
}

/// Options for XREADGROUP.
///
/// `block` asks the server to hold the read open up to the given duration
/// when no entries are available; expiry yields an empty result, not an
/// error. While a blocking read is outstanding it occupies the connection's
/// reply slot, so replies to later commands queue behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct XReadOptions {
    pub count: Option<u64>,
    pub block: Option<Duration>,
}

impl XReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn block(mut self, block: Duration) -> Self {
        self.block = Some(block);
        self
    }
}
