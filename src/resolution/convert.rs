use super::error::ResolutionError;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Wall-clock representation of an instant in a specific zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTime {
    /// The offset from UTC in seconds, DST included.
    pub offset_seconds: i32,
    /// ISO 8601 with the offset embedded, e.g. `2024-06-01T19:00:00+09:00`.
    pub local_time: String,
}

/// Re-expresses `instant` in the IANA zone `zone_id`.
///
/// The instant itself never changes: parsing `local_time` with its embedded offset gives
/// back exactly `instant`. Offsets that cannot be written at minute precision (historic
/// local mean time) break that law and are reported as [`ResolutionError::OffsetLookup`].
pub fn convert(instant: DateTime<Utc>, zone_id: &str) -> Result<LocalTime, ResolutionError> {
    let tz =
        Tz::from_str(zone_id).map_err(|_| ResolutionError::UnknownZone(zone_id.to_string()))?;
    let zoned = instant.with_timezone(&tz).fixed_offset();
    let local_time = zoned.to_rfc3339_opts(SecondsFormat::AutoSi, false);

    let round_trip = DateTime::parse_from_rfc3339(&local_time)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));
    if round_trip != Some(instant) {
        return Err(ResolutionError::OffsetLookup {
            zone_id: zone_id.to_string(),
            instant,
        });
    }

    Ok(LocalTime {
        offset_seconds: zoned.offset().local_minus_utc(),
        local_time,
    })
}
