//! BLE-MIDI GATT service on the SoftDevice.
//!
//! One service with one characteristic. The central writes BLE-MIDI
//! packets without response; we send ours as notifications. Subscribing
//! to notifications is what makes the central a connected MIDI client,
//! whether it writes the CCCD or a bonded central gets its CCCD back
//! from flash.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::ble::connection::ConnHandle;
use crate::ble::events::StackEvent;
use crate::ble::peripheral::post_event;
use crate::config::MIDI_INBOX_DEPTH;
use crate::error::{Error, GattError, Result};
use crate::midi::packet::{self, PacketDecoder, MAX_PACKET_SIZE};
use crate::midi::{MidiTransport, TimestampedMessage, TIMESTAMP_MASK};
use defmt::{debug, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::{self, NotifyValueError};
use nrf_softdevice::ble::Connection;

/// Inbound messages, tagged with the connection they arrived on.
pub static MIDI_INBOX: Channel<
    CriticalSectionRawMutex,
    (ConnHandle, TimestampedMessage),
    MIDI_INBOX_DEPTH,
> = Channel::new();

/// Whether the central has enabled notifications on the I/O characteristic.
static NOTIFY_ENABLED: AtomicBool = AtomicBool::new(false);

/// Record the central's subscription to MIDI notifications and report
/// the change to the main loop.
pub fn set_subscribed(handle: ConnHandle, enabled: bool) {
    let was = NOTIFY_ENABLED.swap(enabled, Ordering::Relaxed);
    if enabled && !was {
        post_event(StackEvent::MidiServiceConnected(handle));
    } else if !enabled && was {
        post_event(StackEvent::MidiServiceDisconnected);
    }
}

#[nrf_softdevice::gatt_service(uuid = "03B80E5A-EDE8-4B33-A751-6CE34EC4C700")]
pub struct MidiService {
    /// BLE-MIDI I/O characteristic. Reads return an empty value.
    #[characteristic(
        uuid = "7772E5DB-3868-4112-A1A9-F2669D106BF3",
        read,
        write_without_response,
        notify
    )]
    pub io: Vec<u8, MAX_PACKET_SIZE>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub midi: MidiService,
}

/// Run the GATT server on `conn` until the link drops.
///
/// Returns whether the central was still subscribed when the link went
/// away, i.e. whether the MIDI service has to be reported disconnected.
pub async fn serve(server: &Server, conn: &Connection) -> bool {
    let Some(raw_handle) = conn.handle() else {
        return false;
    };
    let handle = ConnHandle(raw_handle);
    let mut decoder = PacketDecoder::new();

    let reason = gatt_server::run(conn, server, |e| match e {
        ServerEvent::Midi(MidiServiceEvent::IoWrite(packet)) => {
            let result = decoder.decode(&packet, |msg| {
                if MIDI_INBOX.try_send((handle, msg)).is_err() {
                    warn!("MIDI inbox full, dropping message");
                }
            });
            if let Err(e) = result {
                warn!("Dropping BLE-MIDI packet: {}", e);
            }
        }
        ServerEvent::Midi(MidiServiceEvent::IoCccdWrite { notifications }) => {
            debug!("MIDI notifications: {}", notifications);
            set_subscribed(handle, notifications);
        }
    })
    .await;

    info!("GATT server exited: {:?}", reason);
    MIDI_INBOX.clear();
    NOTIFY_ENABLED.swap(false, Ordering::Relaxed)
}

/// [`MidiTransport`] over the [`MidiService`] of a SoftDevice server.
pub struct SoftdeviceMidiTransport {
    server: &'static Server,
}

impl SoftdeviceMidiTransport {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }
}

impl MidiTransport for SoftdeviceMidiTransport {
    fn write(&self, handle: ConnHandle, bytes: &[u8]) -> Result<()> {
        if !NOTIFY_ENABLED.load(Ordering::Relaxed) {
            return Err(GattError::NotifyDisabled.into());
        }
        let conn = Connection::from_handle(handle.0).ok_or(GattError::Disconnected)?;
        let timestamp = Instant::now().as_millis() as u16 & TIMESTAMP_MASK;
        let payload = packet::notify_payload(conn.att_mtu());

        packet::encode(bytes, timestamp, payload, |pkt| {
            let value = Vec::from_slice(pkt).map_err(|_| Error::BufferOverflow)?;
            self.server
                .midi
                .io_notify(&conn, &value)
                .map_err(|e| match e {
                    NotifyValueError::Disconnected => Error::Gatt(GattError::Disconnected),
                    NotifyValueError::Raw(raw) => Error::Gatt(GattError::Raw(raw as u32)),
                })
        })
    }

    fn read(&self, handle: ConnHandle) -> Option<TimestampedMessage> {
        loop {
            let (from, msg) = MIDI_INBOX.try_receive().ok()?;
            if from == handle {
                return Some(msg);
            }
        }
    }
}
