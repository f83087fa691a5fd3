//! Geofence monitoring.
//!
//! The monitor keeps the previous fix and compares each new one against it as
//! floating-point degrees. The very first observation only establishes the
//! baseline; afterwards a latitude or longitude delta above the threshold
//! counts as movement. The new fix becomes the baseline either way.

use crate::gnss::GpsFix;

pub struct GeofenceMonitor {
    last: Option<GpsFix>,
    threshold_deg: f64,
}

impl GeofenceMonitor {
    pub fn new(threshold_deg: f64) -> Self {
        GeofenceMonitor {
            last: None,
            threshold_deg,
        }
    }

    pub fn last(&self) -> Option<&GpsFix> {
        self.last.as_ref()
    }

    /// Returns true when the fix moved beyond the threshold from the previous
    /// one. Coordinates that fail to parse establish a baseline but never
    /// alert.
    pub fn observe(&mut self, fix: &GpsFix) -> bool {
        let moved = match (self.last.as_ref().and_then(degrees), degrees(fix)) {
            (Some((last_lat, last_lon)), Some((lat, lon))) => {
                (lat - last_lat).abs() > self.threshold_deg
                    || (lon - last_lon).abs() > self.threshold_deg
            }
            _ => false,
        };
        self.last = Some(fix.clone());
        moved
    }
}

fn degrees(fix: &GpsFix) -> Option<(f64, f64)> {
    Some((fix.latitude.parse().ok()?, fix.longitude.parse().ok()?))
}
