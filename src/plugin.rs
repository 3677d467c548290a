use crate::channels::EventSink;
use crate::charging::ChargingStatus;
use crate::clients::upower::{BatteryState, Connector, Device};
use crate::codec::{MethodCall, MethodResponse};
use crate::error::ServiceError;
use tracing::{debug, trace};

pub const GET_BATTERY_LEVEL: &str = "getBatteryLevel";

/// An active state subscription.
///
/// Holding the device keeps its change callback registered;
/// dropping it deregisters the callback.
struct Subscription<D: Device> {
    _device: D,
}

/// Serves the battery method channel and charging event channel
/// on top of a single power device.
///
/// At most one event subscription is active at a time.
pub struct BatteryPlugin<C: Connector> {
    connector: C,
    subscription: Option<Subscription<C::Device>>,
}

impl<C: Connector> BatteryPlugin<C> {
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            subscription: None,
        }
    }

    pub const fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Handles a call on the method channel.
    pub async fn handle_method_call(&self, call: &MethodCall) -> MethodResponse {
        match call.method.as_str() {
            GET_BATTERY_LEVEL => match self.battery_level().await {
                Ok(level) => MethodResponse::success(level),
                Err(err) => {
                    debug!("Failed to read battery level: {err}");
                    err.into()
                }
            },
            method => {
                debug!("Method '{method}' is not implemented");
                MethodResponse::NotImplemented
            }
        }
    }

    /// Reads the current charge, rounded to the nearest whole percent.
    ///
    /// The device handle is opened for this call only.
    pub async fn battery_level(&self) -> Result<i64, ServiceError> {
        let device = self.connector.connect().await?;
        let level = device.percentage().await?;

        Ok(level.round() as i64)
    }

    /// Starts a state subscription emitting into `sink`.
    ///
    /// The change callback is registered first, then the current state
    /// is read and emitted once before this returns.
    /// One event follows per state change until cancelled.
    /// Any previously active subscription is cancelled first.
    pub async fn listen<S>(&mut self, sink: S) -> Result<(), ServiceError>
    where
        S: EventSink + Clone,
    {
        if self.subscription.take().is_some() {
            debug!("Replacing active battery state subscription");
        }

        let mut device = self.connector.connect().await?;

        // register before reading, so a change between the two is never missed
        let callback_sink = sink.clone();
        device
            .on_state_changed(Box::new(move |state| {
                send_state_event(&callback_sink, state);
            }))
            .await?;

        let state = device.state().await?;
        send_state_event(&sink, state);

        self.subscription = Some(Subscription { _device: device });
        debug!("Battery state subscription started");

        Ok(())
    }

    /// Cancels the active subscription, if any.
    pub fn cancel(&mut self) {
        if self.subscription.take().is_some() {
            debug!("Battery state subscription cancelled");
        }
    }

    /// Releases everything held by the plugin.
    pub fn dispose(&mut self) {
        self.cancel();
    }
}

fn send_state_event(sink: &impl EventSink, state: BatteryState) {
    let status = ChargingStatus::from(state);
    trace!(?state, %status, "Sending battery state event");
    sink.send_or_warn(status.into());
}
