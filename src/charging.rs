use crate::clients::upower::BatteryState;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Charging status as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingStatus {
    Charging,
    Discharging,
    Full,
}

impl ChargingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Charging => "charging",
            Self::Discharging => "discharging",
            Self::Full => "full",
        }
    }
}

impl From<BatteryState> for ChargingStatus {
    fn from(state: BatteryState) -> Self {
        match state {
            BatteryState::Charging => Self::Charging,
            BatteryState::Discharging => Self::Discharging,
            // TODO: report a separate unknown status for machines without a battery
            BatteryState::Unknown
            | BatteryState::Empty
            | BatteryState::FullyCharged
            | BatteryState::PendingCharge
            | BatteryState::PendingDischarge => Self::Full,
        }
    }
}

impl From<ChargingStatus> for Value {
    fn from(status: ChargingStatus) -> Self {
        Self::from(status.as_str())
    }
}

impl Display for ChargingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: BatteryState) -> &'static str {
        ChargingStatus::from(state).as_str()
    }

    #[test]
    fn charging() {
        assert_eq!(status(BatteryState::Charging), "charging");
    }

    #[test]
    fn discharging() {
        assert_eq!(status(BatteryState::Discharging), "discharging");
    }

    #[test]
    fn everything_else_is_full() {
        for state in [
            BatteryState::Unknown,
            BatteryState::Empty,
            BatteryState::FullyCharged,
            BatteryState::PendingCharge,
            BatteryState::PendingDischarge,
        ] {
            assert_eq!(status(state), "full", "{state:?}");
        }
    }

    #[test]
    fn total() {
        for state in BatteryState::ALL {
            assert!(["charging", "discharging", "full"].contains(&status(state)));
        }
    }

    #[test]
    fn event_value() {
        let value = Value::from(ChargingStatus::Discharging);
        assert_eq!(value, Value::String("discharging".to_string()));
    }
}
