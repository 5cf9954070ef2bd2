// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device snapshot model.
//!
//! A [`DeviceSnapshot`] is what one poll learns about one device: its
//! [`DeviceId`], descriptive [`DeviceInfo`] with the list of exposed
//! [`DeviceAttribute`]s, and the measured [`DeviceState`].
//!
//! Change detection is plain structural equality, exposed as
//! [`DeviceSnapshot::differs_from`].

mod attribute;
mod device_id;
mod device_snapshot;

pub use attribute::{
    AttributeKind, DeviceAttribute, PROPERTY_CURRENT, PROPERTY_ON, PROPERTY_POWER,
    PROPERTY_VOLTAGE,
};
pub use device_id::DeviceId;
pub use device_snapshot::{
    DeviceInfo, DeviceSnapshot, DeviceSnapshotBuilder, DeviceState, MeterReading, VENDOR,
};
