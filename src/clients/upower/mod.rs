mod dbus;
pub mod test_client;

use crate::error::ServiceError;
use dbus::DeviceProxy;
use futures_lite::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::proxy::CacheProperties;
use zbus::zvariant::Value;

pub use dbus::BatteryState;

pub const SERVICE: &str = "org.freedesktop.UPower";
pub const DEVICE_INTERFACE: &str = "org.freedesktop.UPower.Device";

/// Object path of the aggregate battery UPower composes
/// from every battery present on the system.
pub const DISPLAY_DEVICE_PATH: &str = "/org/freedesktop/UPower/devices/DisplayDevice";

/// Callback invoked with the new state whenever the device announces
/// a change of its `State` property.
pub type StateCallback = Box<dyn FnMut(BatteryState) + Send + 'static>;

/// Creates handles onto a single power device.
pub trait Connector {
    type Device: Device;

    /// Opens a new, exclusively owned handle onto the device.
    fn connect(&self) -> impl Future<Output = Result<Self::Device, ServiceError>> + Send;
}

/// A live handle onto a power device.
///
/// Dropping the handle releases it,
/// including any registered change callback.
pub trait Device: Send + 'static {
    /// Reads the current charge, as a percentage between 0 and 100.
    fn percentage(&self) -> impl Future<Output = Result<f64, ServiceError>> + Send;

    /// Reads the current power state.
    fn state(&self) -> impl Future<Output = Result<BatteryState, ServiceError>> + Send;

    /// Registers `callback` to be called on every change of the `State` property.
    ///
    /// There is a single callback slot:
    /// registering again replaces the previous callback.
    fn on_state_changed(
        &mut self,
        callback: StateCallback,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Connects to a UPower device on the system bus.
#[derive(Debug, Clone)]
pub struct UPowerConnector {
    service: String,
    device_path: String,
}

impl UPowerConnector {
    pub fn new(service: impl Into<String>, device_path: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            device_path: device_path.into(),
        }
    }
}

impl Default for UPowerConnector {
    fn default() -> Self {
        Self::new(SERVICE, DISPLAY_DEVICE_PATH)
    }
}

impl Connector for UPowerConnector {
    type Device = UPowerDevice;

    async fn connect(&self) -> Result<UPowerDevice, ServiceError> {
        debug!("Connecting to {} at {}", self.service, self.device_path);

        let dbus = Box::pin(zbus::Connection::system()).await?;

        let proxy = DeviceProxy::builder(&dbus)
            .destination(self.service.clone())?
            .path(self.device_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        // building a proxy does not talk to the bus,
        // so a missing service or object would otherwise only show on first read
        proxy.percentage().await?;

        let properties = PropertiesProxy::builder(&dbus)
            .destination(self.service.clone())?
            .path(self.device_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        Ok(UPowerDevice {
            proxy,
            properties,
            watcher: None,
        })
    }
}

#[derive(Debug)]
pub struct UPowerDevice {
    proxy: DeviceProxy<'static>,
    properties: PropertiesProxy<'static>,
    watcher: Option<JoinHandle<()>>,
}

impl Device for UPowerDevice {
    async fn percentage(&self) -> Result<f64, ServiceError> {
        Ok(self.proxy.percentage().await?)
    }

    async fn state(&self) -> Result<BatteryState, ServiceError> {
        Ok(self.proxy.state().await?)
    }

    async fn on_state_changed(&mut self, mut callback: StateCallback) -> Result<(), ServiceError> {
        let mut stream = self.properties.receive_properties_changed().await?;

        let watcher = tokio::spawn(async move {
            while let Some(ev) = stream.next().await {
                let args = match ev.args() {
                    Ok(args) => args,
                    Err(err) => {
                        warn!("Invalid PropertiesChanged signal arguments: {err}");
                        continue;
                    }
                };

                if let Some(state) = changed_state(&args.interface_name, &args.changed_properties)
                {
                    trace!(?state, "Device state changed");
                    callback(state);
                }
            }

            debug!("Property change stream closed");
        });

        if let Some(previous) = self.watcher.replace(watcher) {
            previous.abort();
        }

        Ok(())
    }
}

/// Picks the new `State` out of a `PropertiesChanged` signal,
/// ignoring other interfaces and other properties.
fn changed_state(
    interface: &InterfaceName<'_>,
    changed: &HashMap<&str, Value<'_>>,
) -> Option<BatteryState> {
    if interface.as_str() != DEVICE_INTERFACE {
        return None;
    }

    let value = changed.get("State")?;
    match BatteryState::try_from(value) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!("Unexpected value for State property: {err}");
            None
        }
    }
}

impl Drop for UPowerDevice {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> InterfaceName<'static> {
        InterfaceName::from_static_str_unchecked(DEVICE_INTERFACE)
    }

    #[test]
    fn state_on_device_interface() {
        let changed = HashMap::from([
            ("State", Value::from(2u32)),
            ("Percentage", Value::from(64.0)),
        ]);

        assert_eq!(
            changed_state(&device(), &changed),
            Some(BatteryState::Discharging)
        );
    }

    #[test]
    fn state_on_other_interface() {
        let interface =
            InterfaceName::from_static_str_unchecked("org.freedesktop.UPower.KbdBacklight");
        let changed = HashMap::from([("State", Value::from(1u32))]);

        assert_eq!(changed_state(&interface, &changed), None);
    }

    #[test]
    fn percentage_only() {
        let changed = HashMap::from([("Percentage", Value::from(63.0))]);
        assert_eq!(changed_state(&device(), &changed), None);
    }

    #[test]
    fn state_with_wrong_type() {
        let changed = HashMap::from([("State", Value::from("charging"))]);
        assert_eq!(changed_state(&device(), &changed), None);
    }
}
