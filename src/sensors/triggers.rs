// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Threshold triggers over sensor snapshots

use super::SensorSnapshot;

pub const DEFAULT_PROXIMITY_MM: i64 = 50;

/// A condition raised by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorTrigger {
    /// Something is right in front of the face
    Proximity { mm: i64 },
    /// Something is in range but not close
    Distance { mm: i64 },
}

impl SensorTrigger {
    pub fn name(&self) -> &'static str {
        match self {
            SensorTrigger::Proximity { .. } => "proximity",
            SensorTrigger::Distance { .. } => "distance",
        }
    }

    pub fn mm(&self) -> i64 {
        match self {
            SensorTrigger::Proximity { mm } | SensorTrigger::Distance { mm } => *mm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTriggers {
    pub proximity_mm: i64,
    /// Disabled when `None`
    pub distance_mm: Option<i64>,
}

impl Default for SensorTriggers {
    fn default() -> Self {
        Self { proximity_mm: DEFAULT_PROXIMITY_MM, distance_mm: None }
    }
}

impl SensorTriggers {
    pub fn new(proximity_mm: i64, distance_mm: Option<i64>) -> Self {
        Self { proximity_mm, distance_mm }
    }

    pub fn check_proximity(&self, snapshot: &SensorSnapshot) -> bool {
        snapshot.tof.is_ok() && snapshot.tof.mm < self.proximity_mm
    }

    pub fn check_distance(&self, snapshot: &SensorSnapshot) -> bool {
        match self.distance_mm {
            Some(limit) => snapshot.tof.is_ok() && snapshot.tof.mm < limit,
            None => false,
        }
    }

    /// Strongest condition for this snapshot; proximity wins over distance
    pub fn evaluate(&self, snapshot: &SensorSnapshot) -> Option<SensorTrigger> {
        let mm = snapshot.tof.mm;
        if self.check_proximity(snapshot) {
            Some(SensorTrigger::Proximity { mm })
        } else if self.check_distance(snapshot) {
            Some(SensorTrigger::Distance { mm })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::TofReading;

    fn at(mm: i64) -> SensorSnapshot {
        SensorSnapshot::from_tof(TofReading::ok(mm))
    }

    #[test]
    fn test_proximity_threshold() {
        let triggers = SensorTriggers::default();
        assert_eq!(triggers.evaluate(&at(49)), Some(SensorTrigger::Proximity { mm: 49 }));
        assert_eq!(triggers.evaluate(&at(50)), None);
    }

    #[test]
    fn test_bad_status_never_triggers() {
        let triggers = SensorTriggers::new(50, Some(500));
        let snapshot = SensorSnapshot::from_tof(TofReading { mm: 10, status: "timeout".into() });
        assert_eq!(triggers.evaluate(&snapshot), None);
    }

    #[test]
    fn test_distance_when_enabled() {
        assert_eq!(SensorTriggers::default().evaluate(&at(200)), None);

        let triggers = SensorTriggers::new(50, Some(500));
        let hit = triggers.evaluate(&at(200)).unwrap();
        assert_eq!(hit.name(), "distance");
        assert_eq!(hit.mm(), 200);
        assert_eq!(triggers.evaluate(&at(30)).map(|t| t.name()), Some("proximity"));
    }
}
