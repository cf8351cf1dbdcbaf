//! Authoritative occupancy of each parking space

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{Occupant, ParkingSpace, RecordId, SpotId};

/// What `occupy` does when the space already holds a vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupyPolicy {
    /// Fail with `AlreadyOccupied`
    #[default]
    Reject,
    /// Replace the current occupant (staff correction)
    Overwrite,
}

impl FromStr for OccupyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown occupy policy: {}", other)),
        }
    }
}

/// The fixed set of spaces, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotRegistry {
    spaces: BTreeMap<SpotId, ParkingSpace>,
}

impl SpotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted spaces
    pub fn from_spaces(spaces: impl IntoIterator<Item = ParkingSpace>) -> Self {
        Self {
            spaces: spaces.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Create spaces `1..=count` that do not exist yet. Existing spaces keep
    /// their state. Returns the number of spaces created.
    pub fn initialize(&mut self, count: u32) -> usize {
        let mut created = 0;
        for id in 1..=count {
            self.spaces.entry(SpotId(id)).or_insert_with(|| {
                created += 1;
                ParkingSpace::new(SpotId(id))
            });
        }
        created
    }

    /// Park `license_plate` in `spot_id`.
    ///
    /// Returns the displaced occupant when `policy` is `Overwrite` and the
    /// space was taken.
    pub fn occupy(
        &mut self,
        spot_id: SpotId,
        license_plate: &str,
        entry_time: DateTime<Utc>,
        record_id: RecordId,
        policy: OccupyPolicy,
    ) -> Result<Option<Occupant>> {
        let space = self
            .spaces
            .get_mut(&spot_id)
            .ok_or(Error::InvalidSpot(spot_id))?;

        if space.is_occupied() && policy == OccupyPolicy::Reject {
            return Err(Error::AlreadyOccupied(spot_id));
        }

        Ok(space.occupant.replace(Occupant {
            license_plate: license_plate.to_string(),
            entry_time,
            record_id,
        }))
    }

    /// Free `spot_id`, returning who was parked there
    pub fn vacate(&mut self, spot_id: SpotId, exit_time: DateTime<Utc>) -> Result<Occupant> {
        let space = self
            .spaces
            .get_mut(&spot_id)
            .ok_or(Error::InvalidSpot(spot_id))?;

        let entry = space.entry_time().ok_or(Error::NotOccupied(spot_id))?;
        if exit_time < entry {
            return Err(Error::InvalidInterval {
                entry,
                exit: exit_time,
            });
        }

        space.occupant.take().ok_or(Error::NotOccupied(spot_id))
    }

    pub fn get(&self, spot_id: SpotId) -> Option<&ParkingSpace> {
        self.spaces.get(&spot_id)
    }

    /// Spaces ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &ParkingSpace> {
        self.spaces.values()
    }

    pub fn snapshot(&self) -> Vec<ParkingSpace> {
        self.spaces.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.spaces.values().filter(|s| s.is_occupied()).count()
    }

    pub fn available_count(&self) -> usize {
        self.len() - self.occupied_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn registry() -> SpotRegistry {
        let mut registry = SpotRegistry::new();
        registry.initialize(8);
        registry
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut registry = SpotRegistry::new();
        assert_eq!(registry.initialize(8), 8);

        registry
            .occupy(SpotId(2), "XYZ789", t(8, 0), RecordId(1), OccupyPolicy::Reject)
            .unwrap();

        assert_eq!(registry.initialize(8), 0);
        assert_eq!(registry.len(), 8);
        assert!(registry.get(SpotId(2)).unwrap().is_occupied());

        // Growing the lot only adds the missing spaces
        assert_eq!(registry.initialize(10), 2);
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn test_occupy_then_vacate() {
        let mut registry = registry();

        registry
            .occupy(SpotId(5), "ABC123", t(8, 0), RecordId(1), OccupyPolicy::Reject)
            .unwrap();

        let snapshot = registry.snapshot();
        let space = &snapshot[4];
        assert_eq!(space.id, SpotId(5));
        assert_eq!(space.license_plate(), Some("ABC123"));
        assert_eq!(space.entry_time(), Some(t(8, 0)));
        assert_eq!(registry.occupied_count(), 1);
        assert_eq!(registry.available_count(), 7);

        let occupant = registry.vacate(SpotId(5), t(9, 0)).unwrap();
        assert_eq!(occupant.license_plate, "ABC123");
        assert_eq!(occupant.record_id, RecordId(1));

        let space = registry.get(SpotId(5)).unwrap();
        assert!(!space.is_occupied());
        assert!(space.license_plate().is_none());
        assert!(space.entry_time().is_none());
    }

    #[test]
    fn test_unknown_spot() {
        let mut registry = registry();

        let result =
            registry.occupy(SpotId(9), "ABC123", t(8, 0), RecordId(1), OccupyPolicy::Reject);
        assert!(matches!(result, Err(Error::InvalidSpot(SpotId(9)))));

        let result = registry.vacate(SpotId(0), t(8, 0));
        assert!(matches!(result, Err(Error::InvalidSpot(SpotId(0)))));
    }

    #[test]
    fn test_double_booking_rejected() {
        let mut registry = registry();
        registry
            .occupy(SpotId(1), "AAA111", t(8, 0), RecordId(1), OccupyPolicy::Reject)
            .unwrap();

        let result =
            registry.occupy(SpotId(1), "BBB222", t(8, 5), RecordId(2), OccupyPolicy::Reject);
        assert!(matches!(result, Err(Error::AlreadyOccupied(SpotId(1)))));
        assert_eq!(registry.get(SpotId(1)).unwrap().license_plate(), Some("AAA111"));
    }

    #[test]
    fn test_overwrite_returns_displaced_occupant() {
        let mut registry = registry();
        registry
            .occupy(SpotId(1), "AAA111", t(8, 0), RecordId(1), OccupyPolicy::Reject)
            .unwrap();

        let displaced = registry
            .occupy(SpotId(1), "BBB222", t(8, 5), RecordId(2), OccupyPolicy::Overwrite)
            .unwrap()
            .expect("previous occupant");

        assert_eq!(displaced.license_plate, "AAA111");
        assert_eq!(registry.get(SpotId(1)).unwrap().license_plate(), Some("BBB222"));
    }

    #[test]
    fn test_vacate_free_space_leaves_state_unchanged() {
        let mut registry = registry();
        let before = registry.clone();

        let result = registry.vacate(SpotId(3), t(8, 0));
        assert!(matches!(result, Err(Error::NotOccupied(SpotId(3)))));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_vacate_before_entry_is_rejected() {
        let mut registry = registry();
        registry
            .occupy(SpotId(4), "ABC123", t(9, 0), RecordId(1), OccupyPolicy::Reject)
            .unwrap();

        let result = registry.vacate(SpotId(4), t(8, 0));
        assert!(matches!(result, Err(Error::InvalidInterval { .. })));
        assert!(registry.get(SpotId(4)).unwrap().is_occupied());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("reject".parse::<OccupyPolicy>().unwrap(), OccupyPolicy::Reject);
        assert_eq!(" Overwrite ".parse::<OccupyPolicy>().unwrap(), OccupyPolicy::Overwrite);
        assert!("sometimes".parse::<OccupyPolicy>().is_err());
    }
}
