//! An in-process stand-in for the UPower service.
//!
//! Used by tests and by the `--simulate` flag
//! to drive the bridge without a system bus.

use super::{BatteryState, Connector, Device, StateCallback};
use crate::error::ServiceError;
use crate::lock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct Inner {
    percentage: f64,
    state: BatteryState,
    failure: Option<String>,
    handles: HashSet<u64>,
    next_id: u64,
    callbacks: HashMap<u64, StateCallback>,
}

/// Simulated power service holding a single device.
///
/// Clones share the same device.
#[derive(Clone)]
pub struct TestService {
    inner: Arc<Mutex<Inner>>,
}

impl TestService {
    pub fn new(percentage: f64, state: BatteryState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                percentage,
                state,
                failure: None,
                handles: HashSet::new(),
                next_id: 0,
                callbacks: HashMap::new(),
            })),
        }
    }

    pub fn connector(&self) -> TestConnector {
        TestConnector {
            service: self.clone(),
        }
    }

    /// Makes every subsequent connection and read fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        lock!(self.inner).failure = Some(message.into());
    }

    pub fn recover(&self) {
        lock!(self.inner).failure = None;
    }

    /// Changes the charge without announcing a state change.
    pub fn set_percentage(&self, percentage: f64) {
        lock!(self.inner).percentage = percentage;
    }

    /// Changes the state and announces it to every registered callback.
    ///
    /// Callbacks run without the service lock held,
    /// so they may call back into the service.
    pub fn set_state(&self, state: BatteryState) {
        let mut callbacks = {
            let mut inner = lock!(self.inner);
            inner.state = state;
            std::mem::take(&mut inner.callbacks)
        };

        for callback in callbacks.values_mut() {
            callback(state);
        }

        let mut inner = lock!(self.inner);
        for (id, callback) in callbacks {
            // skip handles dropped meanwhile, keep callbacks registered meanwhile
            if inner.handles.contains(&id) {
                inner.callbacks.entry(id).or_insert(callback);
            }
        }
    }

    /// Number of device handles currently alive.
    pub fn open_handles(&self) -> usize {
        lock!(self.inner).handles.len()
    }

    /// Number of change callbacks currently registered.
    pub fn watchers(&self) -> usize {
        lock!(self.inner).callbacks.len()
    }

    /// Spawns a task which endlessly drains the battery to empty
    /// and charges it back to full, one percent per `step`.
    pub fn animate(&self, step: Duration) -> JoinHandle<()> {
        let service = self.clone();

        tokio::spawn(async move {
            loop {
                service.set_state(BatteryState::Discharging);
                for i in (0..=100).rev() {
                    service.set_percentage(f64::from(i));
                    tokio::time::sleep(step).await;
                }

                service.set_state(BatteryState::Charging);
                for i in 0..=100 {
                    service.set_percentage(f64::from(i));
                    tokio::time::sleep(step).await;
                }

                service.set_state(BatteryState::FullyCharged);
                tokio::time::sleep(step * 10).await;
            }
        })
    }

    fn check(&self) -> Result<(), ServiceError> {
        match &lock!(self.inner).failure {
            Some(message) => Err(ServiceError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct TestConnector {
    service: TestService,
}

impl Connector for TestConnector {
    type Device = TestDevice;

    async fn connect(&self) -> Result<TestDevice, ServiceError> {
        self.service.check()?;

        let mut inner = lock!(self.service.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handles.insert(id);

        debug!("Opened simulated device handle {id}");

        Ok(TestDevice {
            service: self.service.clone(),
            id,
        })
    }
}

pub struct TestDevice {
    service: TestService,
    id: u64,
}

impl Device for TestDevice {
    async fn percentage(&self) -> Result<f64, ServiceError> {
        self.service.check()?;
        Ok(lock!(self.service.inner).percentage)
    }

    async fn state(&self) -> Result<BatteryState, ServiceError> {
        self.service.check()?;
        Ok(lock!(self.service.inner).state)
    }

    async fn on_state_changed(&mut self, callback: StateCallback) -> Result<(), ServiceError> {
        self.service.check()?;
        lock!(self.service.inner).callbacks.insert(self.id, callback);
        Ok(())
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        let mut inner = lock!(self.service.inner);
        inner.callbacks.remove(&self.id);
        inner.handles.remove(&self.id);

        debug!("Released simulated device handle {}", self.id);
    }
}
