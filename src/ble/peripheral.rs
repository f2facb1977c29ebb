//! SoftDevice bring-up, advertising loop and security handling.
//!
//! The SoftDevice drives pairing through [`SecurityHandler`] callbacks;
//! [`Bonder`] turns those into [`StackEvent`]s and keeps the keys and
//! the CCCD state of each central in a [`BondStore`]. [`SoftdeviceStack`] is the [`BleStack`] the dispatcher
//! acts on: advertising requests go to [`ble_task`] through a signal,
//! bond deletions go to the bond store.

use core::cell::{Cell, RefCell};
use core::mem;

use crate::ble::adv_payload::AdvertisingParams;
use crate::ble::bonds::{BondRecord, BondStore, MasterKeyId, SysAttrs};
use crate::ble::connection::{AddressKind, ConnHandle, PeerAddress};
use crate::ble::events::{BleStack, HciStatus, ReencryptionTracker, StackEvent};
use crate::ble::midi_service::{self, Server};
use crate::config::{
    ATT_MTU, DEVICE_NAME, HVN_TX_QUEUE_SIZE, STACK_EVENT_QUEUE_DEPTH, SYS_ATTRS_CAPACITY,
};
use defmt::{debug, error, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    gatt_server, peripheral, Address, AddressType, Connection, EncryptionInfo, IdentityKey,
    MasterId, SecurityMode,
};
use nrf_softdevice::{raw, Softdevice};

/// Events from the SoftDevice side, consumed by the main loop.
pub static STACK_EVENTS: Channel<CriticalSectionRawMutex, StackEvent, STACK_EVENT_QUEUE_DEPTH> =
    Channel::new();

/// Raised whenever the bond store changes and should be written to flash.
pub static BOND_FLUSH: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Latest advertising configuration requested by the dispatcher.
static ADVERTISING: Signal<CriticalSectionRawMutex, AdvertisingRequest> = Signal::new();

/// Queue `event` for the main loop. Dropped with a warning when full.
pub fn post_event(event: StackEvent) {
    if STACK_EVENTS.try_send(event).is_err() {
        warn!("Stack event queue full, dropping {}", event);
    }
}

/// Enable the SoftDevice with a single peripheral link.
pub fn enable_softdevice() -> &'static mut Softdevice {
    let config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU }),
        conn_gatts: Some(raw::ble_gatts_conn_cfg_t {
            hvn_tx_queue_size: HVN_TX_QUEUE_SIZE,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    Softdevice::enable(&config)
}

/// The stack's own address, reported with the first `StackState` event.
pub fn local_address(sd: &Softdevice) -> PeerAddress {
    peer_address(nrf_softdevice::ble::get_address(sd))
}

fn peer_address(address: Address) -> PeerAddress {
    let kind = match address.address_type() {
        AddressType::Public => AddressKind::Public,
        AddressType::RandomStatic => AddressKind::RandomStatic,
        AddressType::RandomPrivateResolvable => AddressKind::RandomPrivateResolvable,
        AddressType::RandomPrivateNonResolvable => AddressKind::RandomPrivateNonResolvable,
        AddressType::Anonymous => AddressKind::Anonymous,
    };
    PeerAddress::new(kind, address.bytes())
}

fn conn_handle(conn: &Connection) -> ConnHandle {
    ConnHandle(conn.handle().unwrap_or(raw::BLE_CONN_HANDLE_INVALID as u16))
}

/// Just Works bonding backed by a [`BondStore`].
pub struct Bonder {
    bonds: RefCell<BondStore>,
    /// Bond of the current link, once keys were exchanged or looked up.
    peer: Cell<Option<PeerAddress>>,
    reencryption: ReencryptionTracker,
}

impl Bonder {
    pub fn new(bonds: BondStore) -> Self {
        Self {
            bonds: RefCell::new(bonds),
            peer: Cell::new(None),
            reencryption: ReencryptionTracker::new(),
        }
    }

    /// The current link is gone. Settles a re-encryption that never
    /// completed.
    pub fn link_lost(&self) {
        self.peer.set(None);
        if let Some(event) = self.reencryption.link_lost() {
            post_event(event);
        }
    }

    /// Delete the bond for `address` and schedule a flash write.
    pub fn forget(&self, address: &PeerAddress) -> bool {
        let removed = self.bonds.borrow_mut().remove(address);
        if removed {
            BOND_FLUSH.signal(());
        }
        removed
    }

    /// Copy of the store for writing to flash; the live store is marked
    /// clean.
    pub fn take_snapshot(&self) -> BondStore {
        let mut bonds = self.bonds.borrow_mut();
        let snapshot = bonds.clone();
        bonds.mark_clean();
        snapshot
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, conn: &Connection) -> bool {
        post_event(StackEvent::PairingStarted);
        post_event(StackEvent::JustWorksRequest(conn_handle(conn)));
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        let passkey = passkey
            .iter()
            .fold(0u32, |acc, d| acc * 10 + d.wrapping_sub(b'0') as u32);
        post_event(StackEvent::PasskeyDisplay { passkey });
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let address = peer_address(peer_id.addr);
        self.bonds.borrow_mut().add(BondRecord {
            address,
            ltk: key.ltk,
            master_id: MasterKeyId {
                ediv: master_id.ediv,
                rand: master_id.rand,
            },
            key_flags: key.flags,
            irk: peer_id.irk.as_raw().irk,
            sys_attrs: SysAttrs::EMPTY,
        });
        self.peer.set(Some(address));
        BOND_FLUSH.signal(());

        post_event(StackEvent::PairingComplete {
            status: HciStatus::Success,
            reason: 0,
        });
        post_event(StackEvent::IdentityCreated { address });
    }

    fn get_key(&self, conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        let wanted = MasterKeyId {
            ediv: master_id.ediv,
            rand: master_id.rand,
        };
        let Some(bond) = self.bonds.borrow().find_by_master_id(&wanted).copied() else {
            post_event(StackEvent::ReencryptionComplete {
                status: HciStatus::PinOrKeyMissing,
                address: peer_address(conn.peer_address()),
            });
            return None;
        };

        if bond.irk != [0; 16] {
            post_event(StackEvent::IdentityResolved {
                address: bond.address,
            });
        }
        post_event(StackEvent::ReencryptionStarted {
            address: bond.address,
        });
        self.peer.set(Some(bond.address));
        self.reencryption.start(bond.address);

        Some(EncryptionInfo {
            ltk: bond.ltk,
            flags: bond.key_flags,
        })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
        if matches!(mode, SecurityMode::NoAccess | SecurityMode::Open) {
            return;
        }
        if let Some(event) = self.reencryption.encrypted() {
            post_event(event);
        }
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        let Some(address) = self.peer.get() else {
            return;
        };
        let mut buf = [0u8; SYS_ATTRS_CAPACITY];
        match gatt_server::get_sys_attrs(conn, &mut buf) {
            Ok(len) => {
                let attrs = &buf[..len.min(SYS_ATTRS_CAPACITY)];
                if self.bonds.borrow_mut().set_sys_attrs(&address, attrs) {
                    debug!("Saved {} bytes of system attributes for {}", attrs.len(), address);
                    BOND_FLUSH.signal(());
                }
            }
            Err(e) => warn!("Reading system attributes failed: {:?}", e),
        }
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let attrs = self
            .peer
            .get()
            .and_then(|address| self.bonds.borrow().find_by_address(&address).copied())
            .map(|bond| bond.sys_attrs)
            .filter(|attrs| !attrs.is_empty());

        let result = gatt_server::set_sys_attrs(conn, attrs.as_ref().map(SysAttrs::as_slice));
        if let Err(e) = result {
            warn!("Restoring system attributes failed: {:?}", e);
            return;
        }
        if attrs.is_some_and(|attrs| attrs.notifications_enabled()) {
            debug!("MIDI notifications restored from bond");
            midi_service::set_subscribed(conn_handle(conn), true);
        }
    }
}

/// Advertising configuration collected from the dispatcher.
#[derive(Clone, Copy)]
struct AdvertisingRequest {
    params: AdvertisingParams,
    adv_data: &'static [u8],
    scan_data: &'static [u8],
}

/// [`BleStack`] over the SoftDevice.
///
/// Parameters and payloads are staged until advertising is enabled,
/// then handed to [`ble_task`] as one request.
pub struct SoftdeviceStack {
    bonder: &'static Bonder,
    staged: AdvertisingRequest,
}

impl SoftdeviceStack {
    pub fn new(bonder: &'static Bonder) -> Self {
        Self {
            bonder,
            staged: AdvertisingRequest {
                params: AdvertisingParams::default(),
                adv_data: &[],
                scan_data: &[],
            },
        }
    }
}

impl BleStack for SoftdeviceStack {
    fn set_advertising_params(&mut self, params: &AdvertisingParams) {
        self.staged.params = *params;
    }

    fn set_advertising_data(&mut self, data: &'static [u8]) {
        self.staged.adv_data = data;
    }

    fn set_scan_response_data(&mut self, data: &'static [u8]) {
        self.staged.scan_data = data;
    }

    fn enable_advertising(&mut self, enabled: bool) {
        if enabled {
            ADVERTISING.signal(self.staged);
        } else {
            ADVERTISING.reset();
        }
    }

    // The SoftDevice accepts Just Works on its own once `can_bond`
    // returned true; nothing left to confirm.
    fn confirm_just_works(&mut self, handle: ConnHandle) {
        debug!("Just Works accepted on handle {}", handle.0);
    }

    fn confirm_numeric_comparison(&mut self, handle: ConnHandle) {
        debug!("Numeric comparison accepted on handle {}", handle.0);
    }

    fn delete_bonding(&mut self, address: &PeerAddress) {
        if self.bonder.forget(address) {
            info!("Deleted bond for {}", address);
        }
    }
}

/// Advertise, serve one central, repeat.
///
/// Waits for the first advertising request from the dispatcher; a newer
/// request replaces the configuration before the next round.
pub async fn ble_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    let mut request = ADVERTISING.wait().await;

    loop {
        if let Some(newer) = ADVERTISING.try_take() {
            request = newer;
        }

        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: request.adv_data,
            scan_data: request.scan_data,
        };
        let config = peripheral::Config {
            interval: u32::from(request.params.interval),
            ..Default::default()
        };

        let conn = match peripheral::advertise_pairable(sd, adv, &config, bonder).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Advertising failed: {:?}", e);
                request = ADVERTISING.wait().await;
                continue;
            }
        };
        info!("Central connected, handle {:?}", conn.handle());

        let subscribed = midi_service::serve(server, &conn).await;

        bonder.link_lost();
        post_event(StackEvent::DisconnectionComplete);
        if subscribed {
            post_event(StackEvent::MidiServiceDisconnected);
        }
    }
}
