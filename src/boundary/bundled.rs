use super::ZoneLookup;
use tzf_rs::DefaultFinder;

/// Zone lookup backed by the timezone-boundary-builder dataset compiled into `tzf-rs`.
///
/// Used when no boundary file is supplied. The bundled data covers the oceans with
/// `Etc/GMT±N` zones, so in practice it rarely reports "not found".
pub struct BundledFinder {
    finder: DefaultFinder,
}

impl BundledFinder {
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for BundledFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneLookup for BundledFinder {
    fn lookup(&self, latitude: f64, longitude: f64) -> Option<&str> {
        let name = self.finder.get_tz_name(longitude, latitude);
        (!name.is_empty()).then_some(name)
    }
}
