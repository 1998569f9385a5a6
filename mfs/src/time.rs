// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};

use crate::MAC_EPOCH_OFFSET;

/// Converts seconds since 1904-01-01 into seconds since 1970-01-01.
///
/// Dates before 1970 come out negative.
pub const fn mac_to_unix(secs: u32) -> i64 {
    secs as i64 - MAC_EPOCH_OFFSET
}

pub fn mac_time(secs: u32) -> DateTime<Utc> {
    // Every `u32` lands between 1904 and 2040, well within what `chrono` can represent.
    DateTime::from_timestamp(mac_to_unix(secs), 0).unwrap_or_default()
}
