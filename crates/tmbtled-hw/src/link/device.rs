//! Bluetooth LE backend built on btleplug.

use super::{Bindings, LinkEvent, Radio, EVENT_QUEUE_SIZE};
use crate::pairing::{CharacteristicDescriptor, DeviceId, DeviceMetadata};
use crate::protocol::{ConnectionParameters, HID_REPORT_UUID, HID_SERVICE_UUID};
use crate::{Error, Result};
use btleplug::api::bleuuid::uuid_from_u16;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// An open connection to a cluster.
struct Session {
    peripheral: Peripheral,
    state: Characteristic,
    notifications: Option<JoinHandle<()>>,
}

/// Radio backed by the host's first Bluetooth adapter.
pub struct BleRadio {
    adapter: Adapter,
    events: mpsc::Sender<LinkEvent>,
    central_events: JoinHandle<()>,
    session: Option<Session>,
}

impl BleRadio {
    /// Opens the first adapter and starts forwarding its events.
    pub async fn open() -> Result<(Self, mpsc::Receiver<LinkEvent>)> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::AdapterNotFound)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("Using Bluetooth adapter {}", info),
            Err(e) => debug!("Adapter info unavailable: {}", e),
        }

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let stream = adapter.events().await?;
        let central_events = tokio::spawn(forward_central_events(adapter.clone(), stream, tx.clone()));

        Ok((
            Self {
                adapter,
                events: tx,
                central_events,
                session: None,
            },
            rx,
        ))
    }

    async fn find_peripheral(&self, device: &DeviceId) -> Result<Peripheral> {
        for peripheral in self.adapter.peripherals().await? {
            if DeviceId::from(peripheral.address()) == *device {
                return Ok(peripheral);
            }
        }
        Err(Error::DeviceNotFound(device.to_string()))
    }
}

impl Drop for BleRadio {
    fn drop(&mut self) {
        self.central_events.abort();
        if let Some(task) = self.session.as_mut().and_then(|s| s.notifications.take()) {
            task.abort();
        }
    }
}

/// Returns true if a live HID report characteristic matches a paired one.
///
/// Several reports share one UUID, so they are told apart by the property
/// bits recorded at pairing time.
fn binds(characteristic: &Characteristic, paired: &CharacteristicDescriptor) -> bool {
    characteristic.service_uuid == uuid_from_u16(HID_SERVICE_UUID)
        && characteristic.uuid == uuid_from_u16(HID_REPORT_UUID)
        && characteristic
            .properties
            .contains(CharPropFlags::from_bits_truncate(paired.properties))
}

async fn forward_central_events(
    adapter: Adapter,
    mut stream: std::pin::Pin<Box<dyn futures::Stream<Item = CentralEvent> + Send>>,
    tx: mpsc::Sender<LinkEvent>,
) {
    while let Some(event) = stream.next().await {
        let forwarded = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                match adapter.peripheral(&id).await {
                    Ok(p) => Some(LinkEvent::Discovered(DeviceId::from(p.address()))),
                    Err(e) => {
                        debug!("Discovered peripheral vanished: {}", e);
                        None
                    }
                }
            }
            CentralEvent::DeviceDisconnected(id) => match adapter.peripheral(&id).await {
                Ok(p) => Some(LinkEvent::Disconnected(DeviceId::from(p.address()))),
                Err(e) => {
                    debug!("Disconnected peripheral vanished: {}", e);
                    None
                }
            },
            _ => None,
        };

        if let Some(event) = forwarded {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }
    debug!("Central event stream ended");
}

async fn forward_notifications(peripheral: Peripheral, tx: mpsc::Sender<LinkEvent>) {
    let mut stream = match peripheral.notifications().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to open notification stream: {}", e);
            return;
        }
    };

    let report_uuid = uuid_from_u16(HID_REPORT_UUID);
    while let Some(notification) = stream.next().await {
        if notification.uuid != report_uuid {
            continue;
        }
        if tx.send(LinkEvent::Report(notification.value)).await.is_err() {
            break;
        }
    }
    debug!("Notification stream ended");
}

impl Radio for BleRadio {
    async fn start_scan(&mut self) -> Result<()> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&mut self, device: &DeviceId, metadata: &DeviceMetadata) -> Result<Bindings> {
        self.disconnect().await?;

        let state_desc = metadata
            .state_characteristic()
            .ok_or(Error::StateCharacteristicMissing)?;
        let events_desc = metadata.events_characteristic();

        let peripheral = self.find_peripheral(device).await?;
        info!("Connecting to {} ({})", metadata.name, device);
        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let Some(state) = characteristics.iter().find(|c| binds(c, state_desc)).cloned() else {
            if let Err(e) = peripheral.disconnect().await {
                debug!("Disconnect after failed bind: {}", e);
            }
            return Err(Error::StateCharacteristicMissing);
        };
        debug!("Bound state characteristic (handle {})", state_desc.value_handle);

        let mut notifications = None;
        match events_desc.and_then(|desc| characteristics.iter().find(|c| binds(c, desc))) {
            Some(events) => match peripheral.subscribe(events).await {
                Ok(()) => {
                    notifications = Some(tokio::spawn(forward_notifications(
                        peripheral.clone(),
                        self.events.clone(),
                    )));
                }
                Err(e) => warn!("Failed to subscribe to button reports: {}", e),
            },
            None => warn!("Button report characteristic not found, mode buttons disabled"),
        }

        let bindings = Bindings {
            events: notifications.is_some(),
        };
        self.session = Some(Session {
            peripheral,
            state,
            notifications,
        });
        Ok(bindings)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        if let Some(task) = session.notifications.take() {
            task.abort();
        }
        if session.peripheral.is_connected().await? {
            session.peripheral.disconnect().await?;
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        session
            .peripheral
            .write(&session.state, frame, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    async fn update_connection(&mut self, params: ConnectionParameters) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotConnected);
        }
        debug!(
            "Requested connection interval {}-{} ms",
            params.min_interval_ms, params.max_interval_ms
        );
        Err(Error::Unsupported("connection parameter update"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const SAMPLE: &str = r#"{
        "uuid": "aabbcc001122",
        "address": "aa:bb:cc:00:11:22",
        "characteristics": {
            "1812": [
                { "uuid": "2a4d", "valueHandle": 54, "properties": 18, "propsDecoded": ["read", "notify"] },
                { "uuid": "2a4d", "valueHandle": 58, "properties": 14, "propsDecoded": ["read", "writeWithoutResponse", "write"] }
            ]
        }
    }"#;

    fn report(properties: CharPropFlags) -> Characteristic {
        Characteristic {
            uuid: uuid_from_u16(HID_REPORT_UUID),
            service_uuid: uuid_from_u16(HID_SERVICE_UUID),
            properties,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_binds_by_paired_properties() {
        let metadata: DeviceMetadata = serde_json::from_str(SAMPLE).unwrap();
        let state = metadata.state_characteristic().unwrap();
        let events = metadata.events_characteristic().unwrap();

        let writable = report(
            CharPropFlags::READ | CharPropFlags::WRITE_WITHOUT_RESPONSE | CharPropFlags::WRITE,
        );
        let notifying = report(CharPropFlags::READ | CharPropFlags::NOTIFY);

        assert!(binds(&writable, state));
        assert!(!binds(&notifying, state));
        assert!(binds(&notifying, events));
        assert!(!binds(&writable, events));
    }

    #[test]
    fn test_binds_requires_hid_report() {
        let metadata: DeviceMetadata = serde_json::from_str(SAMPLE).unwrap();
        let state = metadata.state_characteristic().unwrap();

        let mut other = report(
            CharPropFlags::READ | CharPropFlags::WRITE_WITHOUT_RESPONSE | CharPropFlags::WRITE,
        );
        other.service_uuid = uuid_from_u16(0x180f);
        assert!(!binds(&other, state));
    }
}
