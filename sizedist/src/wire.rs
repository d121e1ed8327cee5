use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::{Error, Result, SizeData, SizeDistribution};

/// Layout version written into every persisted distribution.
pub const WIRE_VERSION: u32 = 1;

// Cached probabilities and the quantile table are derived from the counts,
// so only the counts go on the wire.
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct PersistedState {
    version: u32,
    total_count: u64,
    sizes: Vec<(i32, u64)>,
}

impl PersistedState {
    fn capture(sd: &SizeDistribution) -> Self {
        PersistedState {
            version: WIRE_VERSION,
            total_count: sd.total_observations(),
            sizes: sd.iter().map(|(size, data)| (size, data.count())).collect(),
        }
    }

    fn restore(self) -> Result<SizeDistribution> {
        if self.version != WIRE_VERSION {
            return Err(Error::UnsupportedVersion {
                found: self.version,
                expected: WIRE_VERSION,
            });
        }

        let mut sizes = BTreeMap::new();
        let mut summed = 0u64;
        for (size, count) in self.sizes {
            if count == 0 {
                return Err(Error::EmptyRecord { value: size });
            }
            match sizes.entry(size) {
                Entry::Occupied(_) => return Err(Error::DuplicateValue { value: size }),
                Entry::Vacant(slot) => {
                    slot.insert(SizeData { count, cprob: 0.0 });
                }
            }
            summed = summed
                .checked_add(count)
                .ok_or(Error::CountOverflow { value: size })?;
        }

        if summed != self.total_count {
            return Err(Error::CountMismatch {
                declared: self.total_count,
                summed,
            });
        }

        debug!(
            total = self.total_count,
            distinct = sizes.len(),
            "loaded size distribution"
        );

        Ok(SizeDistribution::from_parts(self.total_count, sizes))
    }
}

impl Serialize for SizeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PersistedState::capture(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SizeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let state = PersistedState::deserialize(deserializer)?;
        state.restore().map_err(de::Error::custom)
    }
}

impl SizeDistribution {
    /// Encodes the distribution into its versioned binary layout.
    pub fn wire_encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(&PersistedState::capture(self))
            .map_err(|err| Error::Encode(err.to_string()))
    }

    /// Restores a distribution written by `wire_encode`. Derived statistics
    /// are always rebuilt on the first query after loading.
    pub fn wire_decode(bts: &[u8]) -> Result<SizeDistribution> {
        let state: PersistedState = bincode::deserialize(bts)?;
        state.restore()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&PersistedState::capture(self))
            .map_err(|err| Error::Encode(err.to_string()))
    }

    pub fn from_json(payload: &str) -> Result<SizeDistribution> {
        let state: PersistedState = serde_json::from_str(payload)?;
        state.restore()
    }
}
