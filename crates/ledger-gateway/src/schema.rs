//! Wire-facing value types shared by every gateway implementation.
//!
//! - `Identity`, `Fee`, `OracleIndex`, `AssignedIndexSet`: registration side
//! - `InboundRequest`, `ResponseSubmission`, `StatusCode`: request/response side
//! - `BlockOffset`: where a request subscription starts

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Registration types
// ---------------------------------------------------------------------------

/// Opaque account handle an oracle agent signs with (a hex address in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(handle: impl Into<String>) -> Self {
        Identity(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 10 chars) for log lines.
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(10)
            .map_or(&self.0[..], |(end, _)| &self.0[..end])
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity(s)
    }
}

/// Registration fee in the ledger's smallest currency unit.
///
/// Travels as a decimal string so amounts above 2^53 survive JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fee(pub u128);

impl TryFrom<String> for Fee {
    type Error = GatewayError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let digits = s.trim();
        let parsed = match digits.strip_prefix("0x") {
            Some(hex) => u128::from_str_radix(hex, 16),
            None => digits.parse::<u128>(),
        };
        parsed
            .map(Fee)
            .map_err(|e| GatewayError::Decode(format!("invalid fee {s:?}: {e}")))
    }
}

impl From<Fee> for String {
    fn from(fee: Fee) -> Self {
        fee.0.to_string()
    }
}

impl std::fmt::Display for Fee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One opaque oracle index. Requests are tagged with exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleIndex(pub u32);

impl std::fmt::Display for OracleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three indices the registry assigns an agent at registration.
///
/// Immutable once built. Indices may repeat inside a set and across agents;
/// nothing here assumes uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignedIndexSet([OracleIndex; 3]);

impl AssignedIndexSet {
    pub fn new(indexes: [OracleIndex; 3]) -> Self {
        AssignedIndexSet(indexes)
    }

    /// An agent answers a request when any of its indices equals the tag.
    pub fn contains(&self, index: OracleIndex) -> bool {
        self.0.contains(&index)
    }

    pub fn as_array(&self) -> &[OracleIndex; 3] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<[u32; 3]> for AssignedIndexSet {
    fn from(raw: [u32; 3]) -> Self {
        AssignedIndexSet(raw.map(OracleIndex))
    }
}

impl TryFrom<Vec<OracleIndex>> for AssignedIndexSet {
    type Error = GatewayError;

    fn try_from(v: Vec<OracleIndex>) -> std::result::Result<Self, Self::Error> {
        let len = v.len();
        let arr: [OracleIndex; 3] = v
            .try_into()
            .map_err(|_| GatewayError::Decode(format!("expected 3 indexes, got {len}")))?;
        Ok(AssignedIndexSet(arr))
    }
}

impl std::fmt::Display for AssignedIndexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.0[0], self.0[1], self.0[2])
    }
}

/// Starting point of a request subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockOffset(pub u64);

impl BlockOffset {
    /// Beginning of ledger history.
    pub const GENESIS: BlockOffset = BlockOffset(0);
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Flight status category an oracle reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StatusCode {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    /// Every defined code, in wire order.
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    /// Numeric value the registry expects.
    pub fn code(self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Unknown => "unknown",
            StatusCode::OnTime => "on-time",
            StatusCode::LateAirline => "late-due-to-airline",
            StatusCode::LateWeather => "late-due-to-weather",
            StatusCode::LateTechnical => "late-due-to-technical-issue",
            StatusCode::LateOther => "late-other",
        }
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = GatewayError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| GatewayError::Decode(format!("unknown status code {code}")))
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// A registry-emitted request for a flight's status, tagged with one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundRequest {
    /// Index group that must respond
    pub index: OracleIndex,
    /// Requesting entity (the airline account)
    pub airline: Identity,
    /// Subject flight code
    pub flight: String,
    /// Subject departure time, unix seconds
    pub timestamp: u64,
    /// Block the event was emitted in, when the gateway reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<u64>,
}

/// One agent's answer to one request.
///
/// Fields are private so the identifying part is always an exact echo of
/// the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseSubmission {
    index: OracleIndex,
    airline: Identity,
    flight: String,
    timestamp: u64,
    status: StatusCode,
}

impl ResponseSubmission {
    /// Build the answer to `request` carrying `status`.
    pub fn answer(request: &InboundRequest, status: StatusCode) -> Self {
        Self {
            index: request.index,
            airline: request.airline.clone(),
            flight: request.flight.clone(),
            timestamp: request.timestamp,
            status,
        }
    }

    pub fn index(&self) -> OracleIndex {
        self.index
    }

    pub fn airline(&self) -> &Identity {
        &self.airline
    }

    pub fn flight(&self) -> &str {
        &self.flight
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether this submission answers `request`.
    pub fn answers(&self, request: &InboundRequest) -> bool {
        self.index == request.index
            && self.airline == request.airline
            && self.flight == request.flight
            && self.timestamp == request.timestamp
    }
}
