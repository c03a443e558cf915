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

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// a trip may run past midnight of its service date, but not two full days past it
pub const MAX_SECONDS_SINCE_DAY_START: i32 = 48 * 60 * 60;

/// Time of an arrival/departure event, counted in seconds relative to
/// midnight of the service date of the trip. May exceed 24h for trips
/// running past midnight.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SecondsSinceDayStart {
    seconds: i32,
}

impl SecondsSinceDayStart {
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> SecondsSinceDayStart {
        let total_seconds = seconds + 60 * minutes + 60 * 60 * hours;
        SecondsSinceDayStart {
            seconds: total_seconds as i32,
        }
    }

    pub fn from_seconds(seconds: i32) -> Option<Self> {
        if seconds > MAX_SECONDS_SINCE_DAY_START || seconds < -MAX_SECONDS_SINCE_DAY_START {
            None
        } else {
            let result = Self { seconds };
            Some(result)
        }
    }

    pub fn total_seconds(&self) -> i32 {
        self.seconds
    }

    /// Signed number of seconds between `self` and `earlier`.
    pub fn seconds_since(&self, earlier: &SecondsSinceDayStart) -> i32 {
        self.seconds - earlier.seconds
    }

    pub fn checked_add_seconds(&self, seconds: i32) -> Option<SecondsSinceDayStart> {
        self.seconds
            .checked_add(seconds)
            .and_then(Self::from_seconds)
    }
}

impl Display for SecondsSinceDayStart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds < 0 { "-" } else { "" };
        let abs = self.seconds.unsigned_abs();
        let hours = abs / (60 * 60);
        let minutes = (abs % (60 * 60)) / 60;
        let seconds = abs % 60;
        write!(f, "{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
    }
}

#[derive(Debug)]
pub struct TimeParseError {
    value: String,
}

impl Display for TimeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot parse '{}' as a HH:MM:SS time", self.value)
    }
}

impl std::error::Error for TimeParseError {}

impl FromStr for SecondsSinceDayStart {
    type Err = TimeParseError;

    // accepts "HH:MM:SS", where HH may exceed 23 for times past midnight
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError {
            value: s.to_string(),
        };
        let mut fields = s.split(':');
        let hours: u32 = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(err)?;
        let minutes: u32 = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(err)?;
        let seconds: u32 = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(err)?;
        if fields.next().is_some() || minutes > 59 || seconds > 59 {
            return Err(err());
        }
        SecondsSinceDayStart::from_seconds((hours * 3600 + minutes * 60 + seconds) as i32)
            .ok_or_else(err)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PositiveDuration {
    pub(crate) seconds: u32,
}

impl PositiveDuration {
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> PositiveDuration {
        let total_seconds = seconds + 60 * minutes + 60 * 60 * hours;
        PositiveDuration {
            seconds: total_seconds,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0
    }

    pub fn total_seconds(&self) -> u64 {
        self.seconds as u64
    }
}

impl Display for PositiveDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds / (60 * 60);
        let minutes_in_secs = self.seconds % (60 * 60);
        let minutes = minutes_in_secs / 60;
        let seconds = minutes_in_secs % 60;
        if hours != 0 {
            write!(f, "{}h{:02}m{:02}s", hours, minutes, seconds)
        } else if minutes != 0 {
            write!(f, "{}m{:02}s", minutes, seconds)
        } else {
            write!(f, "{}s", seconds)
        }
    }
}
