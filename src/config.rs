// Copyright  (C) 2020, Kisio Digital and/or its affiliates. All rights reserved.
//
// This file is part of Navitia,
// the software to build cool stuff with public transport.
//
// Hope you'll enjoy and contribute to this project,
// powered by Kisio Digital (www.kisio.com).
// Help us simplify mobility and open public transport:
// a non ending quest to the responsive locomotion way of traveling!
//
// This contribution is a part of the research and development work of the
// IVA Project which aims to enhance traveler information and is carried out
// under the leadership of the Technological Research Institute SystemX,
// with the partnership and support of the transport organization authority
// Ile-De-France Mobilités (IDFM), SNCF, and public funds
// under the scope of the French Program "Investissements d’Avenir".
//
// LICENCE: This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.
//
// Stay tuned using
// twitter @navitia
// channel `#navitia` on riot https://riot.im/app/#/room/#navitia:matrix.org
// https://groups.google.com/d/forum/navitia
// www.navitia.io

use serde::{Deserialize, Serialize};

use crate::time::PositiveDuration;

/// Policy for pushing a delay observed at some stop backwards onto the
/// preceding stops that carry no realtime data of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackwardsDelayPropagation {
    /// Shift earlier times only where needed to keep the times of the
    /// trip non-decreasing, and flag the shifted stops as carrying no
    /// data.
    #[default]
    RequiredNoData,
    /// Same shifts, but the stops keep their updated flag.
    Required,
    /// Shift every earlier stop by the first observed delay.
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotParams {
    /// Minimum interval between two snapshot publications. Zero means
    /// publish after every batch.
    #[serde(default = "default_max_snapshot_frequency")]
    pub max_snapshot_frequency: PositiveDuration,

    /// Drop realtime timetables of past service dates at each commit.
    #[serde(default = "default_purge_expired_data")]
    pub purge_expired_data: bool,

    #[serde(default)]
    pub backwards_delay_propagation: BackwardsDelayPropagation,
}

impl Default for SnapshotParams {
    fn default() -> Self {
        Self {
            max_snapshot_frequency: default_max_snapshot_frequency(),
            purge_expired_data: default_purge_expired_data(),
            backwards_delay_propagation: BackwardsDelayPropagation::default(),
        }
    }
}

pub fn default_max_snapshot_frequency() -> PositiveDuration {
    PositiveDuration::from_hms(0, 0, 1)
}

pub fn default_purge_expired_data() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_from_json() {
        let params: SnapshotParams = serde_json::from_str(
            r#"{
                "max_snapshot_frequency": 0,
                "purge_expired_data": false,
                "backwards_delay_propagation": "always"
            }"#,
        )
        .unwrap();
        assert!(params.max_snapshot_frequency.is_zero());
        assert!(!params.purge_expired_data);
        assert_eq!(
            params.backwards_delay_propagation,
            BackwardsDelayPropagation::Always
        );
    }

    #[test]
    fn params_use_defaults_for_missing_fields() {
        let params: SnapshotParams = serde_json::from_str("{}").unwrap();
        assert_eq!(
            params.max_snapshot_frequency,
            default_max_snapshot_frequency()
        );
        assert!(params.purge_expired_data);
        assert_eq!(
            params.backwards_delay_propagation,
            BackwardsDelayPropagation::RequiredNoData
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<SnapshotParams>(r#"{"max_snapshot": 3}"#);
        assert!(parsed.is_err());
    }
}
