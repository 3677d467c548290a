// Originally taken from `upower-dbus` crate
// <https://github.com/pop-os/upower-dbus/blob/main/LICENSE>
//  Copyright 2021 System76 <info@system76.com>
//  SPDX-License-Identifier: MPL-2.0
use zbus::proxy;
use zbus::zvariant::{OwnedValue, Value};

/// Power state of a UPower device, as carried by its `State` property.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, OwnedValue)]
#[repr(u32)]
pub enum BatteryState {
    #[default]
    Unknown = 0,
    Charging = 1,
    Discharging = 2,
    Empty = 3,
    FullyCharged = 4,
    PendingCharge = 5,
    PendingDischarge = 6,
}

impl BatteryState {
    pub const ALL: [Self; 7] = [
        Self::Unknown,
        Self::Charging,
        Self::Discharging,
        Self::Empty,
        Self::FullyCharged,
        Self::PendingCharge,
        Self::PendingDischarge,
    ];
}

impl From<u32> for BatteryState {
    fn from(number: u32) -> Self {
        match number {
            1 => Self::Charging,
            2 => Self::Discharging,
            3 => Self::Empty,
            4 => Self::FullyCharged,
            5 => Self::PendingCharge,
            6 => Self::PendingDischarge,
            _ => Self::Unknown,
        }
    }
}

impl TryFrom<&Value<'_>> for BatteryState {
    type Error = zbus::zvariant::Error;

    fn try_from(value: &Value<'_>) -> Result<Self, Self::Error> {
        let value = value.downcast_ref::<u32>()?;
        Ok(value.into())
    }
}

#[proxy(
    interface = "org.freedesktop.UPower.Device",
    default_service = "org.freedesktop.UPower",
    assume_defaults = false
)]
pub trait Device {
    #[zbus(property)]
    fn percentage(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn state(&self) -> zbus::Result<BatteryState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_wire_value() {
        for state in BatteryState::ALL {
            assert_eq!(BatteryState::from(state as u32), state);
        }
    }

    #[test]
    fn pending_discharge() {
        assert_eq!(BatteryState::from(6), BatteryState::PendingDischarge);
    }

    #[test]
    fn out_of_range_is_unknown() {
        assert_eq!(BatteryState::from(7), BatteryState::Unknown);
        assert_eq!(BatteryState::from(u32::MAX), BatteryState::Unknown);
    }

    #[test]
    fn from_variant() {
        let value = Value::from(2u32);
        assert_eq!(
            BatteryState::try_from(&value).ok(),
            Some(BatteryState::Discharging)
        );
    }

    #[test]
    fn from_wrong_variant_type() {
        let value = Value::from("charging");
        assert!(BatteryState::try_from(&value).is_err());
    }
}
