//! Engine configuration: segment sizing, parity ratio, default hop
//! count, delay accounting, and request timeouts. Each field carries
//! a documented default so a deployment only overrides what it needs
//! to, mirroring the teacher's `#[serde(default = "fn")]` per-field
//! pattern rather than one blanket `#[serde(default)]` on the struct.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes per FEC shard.
    pub segment_size: usize,
    /// Parity shards per 256 data shards (0..=255), per §4.6.
    pub parity_ratio: u8,
    /// Hop count for a freshly built circuit.
    pub default_hop_count: usize,
    /// Units of balance charged per second a `Delay` layer holds a
    /// chain, resolving the delay-accounting Open Question.
    pub delay_rate_per_sec: u64,
    /// How long a pending request waits for its `Response` or
    /// `Confirmation` before firing `Timeout`.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Relay rate charged per kilobyte of billable traffic.
    pub hop_rate_per_kb: u64,
    /// How long an installed session stays open with no further
    /// activity before it is treated as expired.
    #[serde(with = "duration_secs")]
    pub session_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment_size: default_segment_size(),
            parity_ratio: default_parity_ratio(),
            default_hop_count: default_hop_count(),
            delay_rate_per_sec: default_delay_rate_per_sec(),
            request_timeout: default_request_timeout(),
            hop_rate_per_kb: default_hop_rate_per_kb(),
            session_ttl: default_session_ttl(),
        }
    }
}

fn default_segment_size() -> usize {
    512
}

fn default_parity_ratio() -> u8 {
    32
}

fn default_hop_count() -> usize {
    3
}

fn default_delay_rate_per_sec() -> u64 {
    1
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_hop_rate_per_kb() -> u64 {
    1
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(3600)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
