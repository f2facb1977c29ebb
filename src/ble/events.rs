//! BLE stack event dispatch.
//!
//! The SoftDevice glue translates its callbacks into [`StackEvent`]s and
//! hands them to [`EventDispatcher::dispatch`]. Each variant has its own
//! handler. Handlers act on the stack through the [`BleStack`] trait,
//! update the [`ConnectionManager`], and return a [`Notice`] for the
//! console when the event is worth reporting.
//!
//! The dispatcher never retries. The only recovery it performs is
//! deleting a stale bond when a central has lost its keys.

use core::cell::Cell;
use core::fmt;

use crate::ble::adv_payload::{AdvertisingData, AdvertisingParams};
use crate::ble::connection::{ConnHandle, ConnectionManager, PeerAddress};
use crate::error::Error;

/// HCI / Security Manager status code carried by pairing events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HciStatus {
    Success,
    AuthenticationFailure,
    PinOrKeyMissing,
    ConnectionTimeout,
    RemoteUserTerminatedConnection,
    Other(u8),
}

impl From<u8> for HciStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => HciStatus::Success,
            0x05 => HciStatus::AuthenticationFailure,
            0x06 => HciStatus::PinOrKeyMissing,
            0x08 => HciStatus::ConnectionTimeout,
            0x13 => HciStatus::RemoteUserTerminatedConnection,
            other => HciStatus::Other(other),
        }
    }
}

/// ATT status code of a completed GATT query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttStatus {
    Success,
    InsufficientAuthentication,
    InsufficientEncryption,
    BondingInformationMissing,
    Other(u8),
}

impl From<u8> for AttStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => AttStatus::Success,
            0x05 => AttStatus::InsufficientAuthentication,
            0x0F => AttStatus::InsufficientEncryption,
            0x70 => AttStatus::BondingInformationMissing,
            other => AttStatus::Other(other),
        }
    }
}

impl AttStatus {
    pub fn code(self) -> u8 {
        match self {
            AttStatus::Success => 0x00,
            AttStatus::InsufficientAuthentication => 0x05,
            AttStatus::InsufficientEncryption => 0x0F,
            AttStatus::BondingInformationMissing => 0x70,
            AttStatus::Other(code) => code,
        }
    }
}

/// Asynchronous notifications from the BLE stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    /// The stack changed state; `working` once it can advertise.
    StackState {
        working: bool,
        local_address: PeerAddress,
    },
    /// A link went down.
    DisconnectionComplete,
    /// A central subscribed to the MIDI characteristic.
    MidiServiceConnected(ConnHandle),
    /// The MIDI client went away.
    MidiServiceDisconnected,
    JustWorksRequest(ConnHandle),
    NumericComparisonRequest { handle: ConnHandle, passkey: u32 },
    PasskeyDisplay { passkey: u32 },
    IdentityCreated { address: PeerAddress },
    IdentityResolved { address: PeerAddress },
    IdentityResolvingFailed,
    PairingStarted,
    PairingComplete { status: HciStatus, reason: u8 },
    /// The central asked to re-encrypt with keys from an earlier bond.
    ReencryptionStarted { address: PeerAddress },
    ReencryptionComplete {
        status: HciStatus,
        address: PeerAddress,
    },
    GattQueryComplete { att_status: AttStatus },
}

/// Actions the dispatcher can ask of the BLE stack.
pub trait BleStack {
    fn set_advertising_params(&mut self, params: &AdvertisingParams);
    fn set_advertising_data(&mut self, data: &'static [u8]);
    fn set_scan_response_data(&mut self, data: &'static [u8]);
    fn enable_advertising(&mut self, enabled: bool);
    fn confirm_just_works(&mut self, handle: ConnHandle);
    fn confirm_numeric_comparison(&mut self, handle: ConnHandle);
    /// Forget the bond stored for `address`.
    fn delete_bonding(&mut self, address: &PeerAddress);
}

/// Result of a pairing attempt, as reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingOutcome {
    Success,
    Timeout,
    Disconnected,
    AuthenticationFailure { reason: u8 },
}

/// Result of a re-encryption attempt, as reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReencryptionOutcome {
    Success,
    Timeout,
    Disconnected,
    /// The central no longer has our keys; the local bond was deleted.
    BondingInformationMissing,
}

/// Human-readable report of a dispatched event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notice {
    StackUp(PeerAddress),
    AdvertisingRejected(Error),
    Disconnected,
    MidiServiceDisconnected,
    JustWorksRequested,
    ConfirmingNumericComparison(u32),
    DisplayPasskey(u32),
    IdentityCreated(PeerAddress),
    IdentityResolved(PeerAddress),
    IdentityResolvingFailed,
    PairingStarted,
    Pairing(PairingOutcome),
    ReencryptionStarted(PeerAddress),
    Reencryption(ReencryptionOutcome),
    GattQuery(AttStatus),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::StackUp(addr) => write!(f, "BLE stack up and running on {}.", addr),
            Notice::AdvertisingRejected(e) => write!(f, "Advertising not enabled: {}", e),
            Notice::Disconnected => f.write_str("Disconnected"),
            Notice::MidiServiceDisconnected => f.write_str("MIDI service disconnected"),
            Notice::JustWorksRequested => f.write_str("Just Works requested"),
            Notice::ConfirmingNumericComparison(passkey) => {
                write!(f, "Confirming numeric comparison: {}", passkey)
            }
            Notice::DisplayPasskey(passkey) => write!(f, "Display Passkey: {}", passkey),
            Notice::IdentityCreated(addr) => write!(
                f,
                "Identity created: type {} address {}",
                addr.kind.code(),
                addr
            ),
            Notice::IdentityResolved(addr) => write!(
                f,
                "Identity resolved: type {} address {}",
                addr.kind.code(),
                addr
            ),
            Notice::IdentityResolvingFailed => f.write_str("Identity resolving failed"),
            Notice::PairingStarted => f.write_str("Pairing started"),
            Notice::Pairing(outcome) => match outcome {
                PairingOutcome::Success => f.write_str("Pairing complete, success"),
                PairingOutcome::Timeout => f.write_str("Pairing failed, timeout"),
                PairingOutcome::Disconnected => f.write_str("Pairing failed, disconnected"),
                PairingOutcome::AuthenticationFailure { reason } => write!(
                    f,
                    "Pairing failed, authentication failure with reason = {}",
                    reason
                ),
            },
            Notice::ReencryptionStarted(addr) => write!(
                f,
                "Bonding information exists for addr type {}, identity addr {} -> re-encryption started",
                addr.kind.code(),
                addr
            ),
            Notice::Reencryption(outcome) => match outcome {
                ReencryptionOutcome::Success => f.write_str("Re-encryption complete, success"),
                ReencryptionOutcome::Timeout => f.write_str("Re-encryption failed, timeout"),
                ReencryptionOutcome::Disconnected => {
                    f.write_str("Re-encryption failed, disconnected")
                }
                ReencryptionOutcome::BondingInformationMissing => f.write_str(
                    "Re-encryption failed, bonding information missing\r\n\r\n\
                     Assuming remote lost bonding information\r\n\
                     Deleting local bonding information to allow for new pairing...",
                ),
            },
            Notice::GattQuery(status) => match status {
                AttStatus::Success => f.write_str("GATT Query successful"),
                AttStatus::InsufficientEncryption => {
                    f.write_str("GATT Query failed, Insufficient Encryption")
                }
                AttStatus::InsufficientAuthentication => {
                    f.write_str("GATT Query failed, Insufficient Authentication")
                }
                AttStatus::BondingInformationMissing => {
                    f.write_str("GATT Query failed, Bonding Information Missing")
                }
                AttStatus::Other(code) => write!(f, "GATT Query failed, status 0x{:02x}", code),
            },
        }
    }
}

/// Reacts to [`StackEvent`]s.
pub struct EventDispatcher<'a> {
    conn: &'a ConnectionManager,
    advertising: AdvertisingData,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(conn: &'a ConnectionManager, advertising: AdvertisingData) -> Self {
        Self { conn, advertising }
    }

    /// Handle one event, returning what should be reported, if anything.
    pub fn dispatch(&self, event: StackEvent, stack: &mut impl BleStack) -> Option<Notice> {
        match event {
            StackEvent::StackState {
                working,
                local_address,
            } => self.on_stack_state(working, local_address, stack),
            StackEvent::DisconnectionComplete => Some(Notice::Disconnected),
            StackEvent::MidiServiceConnected(handle) => {
                self.conn.connect(handle);
                None
            }
            StackEvent::MidiServiceDisconnected => {
                self.conn.disconnect();
                Some(Notice::MidiServiceDisconnected)
            }
            StackEvent::JustWorksRequest(handle) => {
                stack.confirm_just_works(handle);
                Some(Notice::JustWorksRequested)
            }
            StackEvent::NumericComparisonRequest { handle, passkey } => {
                stack.confirm_numeric_comparison(handle);
                Some(Notice::ConfirmingNumericComparison(passkey))
            }
            StackEvent::PasskeyDisplay { passkey } => Some(Notice::DisplayPasskey(passkey)),
            StackEvent::IdentityCreated { address } => Some(Notice::IdentityCreated(address)),
            StackEvent::IdentityResolved { address } => Some(Notice::IdentityResolved(address)),
            StackEvent::IdentityResolvingFailed => Some(Notice::IdentityResolvingFailed),
            StackEvent::PairingStarted => Some(Notice::PairingStarted),
            StackEvent::PairingComplete { status, reason } => {
                self.on_pairing_complete(status, reason)
            }
            StackEvent::ReencryptionStarted { address } => {
                Some(Notice::ReencryptionStarted(address))
            }
            StackEvent::ReencryptionComplete { status, address } => {
                self.on_reencryption_complete(status, address, stack)
            }
            StackEvent::GattQueryComplete { att_status } => Some(Notice::GattQuery(att_status)),
        }
    }

    fn on_stack_state(
        &self,
        working: bool,
        local_address: PeerAddress,
        stack: &mut impl BleStack,
    ) -> Option<Notice> {
        if !working {
            return None;
        }
        if let Err(e) = self.advertising.validate() {
            return Some(Notice::AdvertisingRejected(e));
        }

        stack.set_advertising_params(&AdvertisingParams::default());
        stack.set_advertising_data(self.advertising.adv);
        stack.set_scan_response_data(self.advertising.scan_response);
        stack.enable_advertising(true);
        Some(Notice::StackUp(local_address))
    }

    fn on_pairing_complete(&self, status: HciStatus, reason: u8) -> Option<Notice> {
        let outcome = match status {
            HciStatus::Success => PairingOutcome::Success,
            HciStatus::ConnectionTimeout => PairingOutcome::Timeout,
            HciStatus::RemoteUserTerminatedConnection => PairingOutcome::Disconnected,
            HciStatus::AuthenticationFailure => PairingOutcome::AuthenticationFailure { reason },
            _ => return None,
        };
        Some(Notice::Pairing(outcome))
    }

    fn on_reencryption_complete(
        &self,
        status: HciStatus,
        address: PeerAddress,
        stack: &mut impl BleStack,
    ) -> Option<Notice> {
        let outcome = match status {
            HciStatus::Success => ReencryptionOutcome::Success,
            HciStatus::ConnectionTimeout => ReencryptionOutcome::Timeout,
            HciStatus::RemoteUserTerminatedConnection => ReencryptionOutcome::Disconnected,
            HciStatus::PinOrKeyMissing => {
                stack.delete_bonding(&address);
                ReencryptionOutcome::BondingInformationMissing
            }
            _ => return None,
        };
        Some(Notice::Reencryption(outcome))
    }
}

/// Follows a re-encryption from the key lookup to its outcome.
///
/// The stack reports a finished re-encryption as a security update but
/// says nothing when the link drops half way. Whatever is still pending
/// when the link goes away is reported as a disconnect, so it can never
/// be attributed to the next connection.
#[derive(Debug, Default)]
pub struct ReencryptionTracker {
    pending: Cell<Option<PeerAddress>>,
}

impl ReencryptionTracker {
    pub const fn new() -> Self {
        Self {
            pending: Cell::new(None),
        }
    }

    /// Keys for `address` were handed to the stack.
    pub fn start(&self, address: PeerAddress) {
        self.pending.set(Some(address));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// The link is now encrypted.
    pub fn encrypted(&self) -> Option<StackEvent> {
        self.pending
            .take()
            .map(|address| StackEvent::ReencryptionComplete {
                status: HciStatus::Success,
                address,
            })
    }

    /// The link went down.
    pub fn link_lost(&self) -> Option<StackEvent> {
        self.pending
            .take()
            .map(|address| StackEvent::ReencryptionComplete {
                status: HciStatus::RemoteUserTerminatedConnection,
                address,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::connection::AddressKind;

    #[derive(Debug, PartialEq)]
    enum Call {
        Params(AdvertisingParams),
        AdvData(usize),
        ScanData(usize),
        Enable(bool),
        JustWorks(ConnHandle),
        Numeric(ConnHandle),
        DeleteBond(PeerAddress),
    }

    #[derive(Default)]
    struct RecordingStack {
        calls: Vec<Call>,
    }

    impl BleStack for RecordingStack {
        fn set_advertising_params(&mut self, params: &AdvertisingParams) {
            self.calls.push(Call::Params(*params));
        }
        fn set_advertising_data(&mut self, data: &'static [u8]) {
            self.calls.push(Call::AdvData(data.len()));
        }
        fn set_scan_response_data(&mut self, data: &'static [u8]) {
            self.calls.push(Call::ScanData(data.len()));
        }
        fn enable_advertising(&mut self, enabled: bool) {
            self.calls.push(Call::Enable(enabled));
        }
        fn confirm_just_works(&mut self, handle: ConnHandle) {
            self.calls.push(Call::JustWorks(handle));
        }
        fn confirm_numeric_comparison(&mut self, handle: ConnHandle) {
            self.calls.push(Call::Numeric(handle));
        }
        fn delete_bonding(&mut self, address: &PeerAddress) {
            self.calls.push(Call::DeleteBond(*address));
        }
    }

    const LOCAL: PeerAddress =
        PeerAddress::new(AddressKind::Public, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    const PEER: PeerAddress =
        PeerAddress::new(AddressKind::RandomStatic, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xCF]);

    fn enable_count(stack: &RecordingStack) -> usize {
        stack
            .calls
            .iter()
            .filter(|c| **c == Call::Enable(true))
            .count()
    }

    #[test]
    fn working_stack_configures_and_enables_advertising_once() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        let notice = dispatcher.dispatch(
            StackEvent::StackState {
                working: true,
                local_address: LOCAL,
            },
            &mut stack,
        );

        assert_eq!(notice, Some(Notice::StackUp(LOCAL)));
        assert_eq!(
            stack.calls,
            [
                Call::Params(AdvertisingParams::default()),
                Call::AdvData(21),
                Call::ScanData(15),
                Call::Enable(true),
            ]
        );
    }

    #[test]
    fn repeated_stack_ready_reconfigures_each_time() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();
        let ready = StackEvent::StackState {
            working: true,
            local_address: LOCAL,
        };

        dispatcher.dispatch(ready, &mut stack);
        dispatcher.dispatch(ready, &mut stack);
        assert_eq!(enable_count(&stack), 2);
    }

    #[test]
    fn non_working_state_does_not_advertise() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        let notice = dispatcher.dispatch(
            StackEvent::StackState {
                working: false,
                local_address: LOCAL,
            },
            &mut stack,
        );
        assert_eq!(notice, None);
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn oversized_payload_blocks_advertising() {
        static LONG: [u8; 40] = [0; 40];
        let conn = ConnectionManager::new();
        let data = AdvertisingData {
            adv: &LONG,
            scan_response: &LONG,
        };
        let dispatcher = EventDispatcher::new(&conn, data);
        let mut stack = RecordingStack::default();

        let notice = dispatcher.dispatch(
            StackEvent::StackState {
                working: true,
                local_address: LOCAL,
            },
            &mut stack,
        );
        assert_eq!(notice, Some(Notice::AdvertisingRejected(Error::AdvPayloadTooLong)));
        assert_eq!(enable_count(&stack), 0);
    }

    #[test]
    fn midi_service_events_track_connection_handle() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        dispatcher.dispatch(StackEvent::MidiServiceConnected(ConnHandle(3)), &mut stack);
        assert_eq!(conn.handle(), Some(ConnHandle(3)));

        let notice = dispatcher.dispatch(StackEvent::MidiServiceDisconnected, &mut stack);
        assert_eq!(notice, Some(Notice::MidiServiceDisconnected));
        assert_eq!(conn.handle(), None);
    }

    #[test]
    fn link_disconnect_alone_keeps_handle() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        dispatcher.dispatch(StackEvent::MidiServiceConnected(ConnHandle(3)), &mut stack);
        let notice = dispatcher.dispatch(StackEvent::DisconnectionComplete, &mut stack);
        assert_eq!(notice, Some(Notice::Disconnected));
        assert_eq!(conn.handle(), Some(ConnHandle(3)));
    }

    #[test]
    fn pairing_requests_are_auto_confirmed() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        dispatcher.dispatch(StackEvent::JustWorksRequest(ConnHandle(1)), &mut stack);
        let notice = dispatcher.dispatch(
            StackEvent::NumericComparisonRequest {
                handle: ConnHandle(1),
                passkey: 123456,
            },
            &mut stack,
        );

        assert_eq!(
            stack.calls,
            [Call::JustWorks(ConnHandle(1)), Call::Numeric(ConnHandle(1))]
        );
        assert_eq!(
            notice.unwrap().to_string(),
            "Confirming numeric comparison: 123456"
        );
    }

    #[test]
    fn pairing_outcomes_are_reported_by_category() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();
        let complete = |status: u8, reason: u8| StackEvent::PairingComplete {
            status: status.into(),
            reason,
        };

        let text = |n: Option<Notice>| n.map(|n| n.to_string());
        assert_eq!(
            text(dispatcher.dispatch(complete(0x00, 0), &mut stack)).as_deref(),
            Some("Pairing complete, success")
        );
        assert_eq!(
            text(dispatcher.dispatch(complete(0x08, 0), &mut stack)).as_deref(),
            Some("Pairing failed, timeout")
        );
        assert_eq!(
            text(dispatcher.dispatch(complete(0x13, 0), &mut stack)).as_deref(),
            Some("Pairing failed, disconnected")
        );
        assert_eq!(
            text(dispatcher.dispatch(complete(0x05, 3), &mut stack)).as_deref(),
            Some("Pairing failed, authentication failure with reason = 3")
        );
        assert_eq!(dispatcher.dispatch(complete(0x3D, 0), &mut stack), None);
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn missing_bond_on_reencryption_deletes_only_that_peer() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        let notice = dispatcher.dispatch(
            StackEvent::ReencryptionComplete {
                status: HciStatus::PinOrKeyMissing,
                address: PEER,
            },
            &mut stack,
        );

        assert_eq!(stack.calls, [Call::DeleteBond(PEER)]);
        let text = notice.unwrap().to_string();
        assert!(text.starts_with("Re-encryption failed, bonding information missing"));
        assert!(text.ends_with("to allow for new pairing..."));
    }

    #[test]
    fn other_reencryption_failures_keep_bonds() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        for status in [
            HciStatus::Success,
            HciStatus::ConnectionTimeout,
            HciStatus::RemoteUserTerminatedConnection,
            HciStatus::Other(0x22),
        ] {
            dispatcher.dispatch(
                StackEvent::ReencryptionComplete {
                    status,
                    address: PEER,
                },
                &mut stack,
            );
        }
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn gatt_query_status_text() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();
        let query = |code: u8| StackEvent::GattQueryComplete {
            att_status: code.into(),
        };

        let cases = [
            (0x00, "GATT Query successful"),
            (0x0F, "GATT Query failed, Insufficient Encryption"),
            (0x05, "GATT Query failed, Insufficient Authentication"),
            (0x70, "GATT Query failed, Bonding Information Missing"),
            (0x0A, "GATT Query failed, status 0x0a"),
        ];
        for (code, expected) in cases {
            let notice = dispatcher.dispatch(query(code), &mut stack).unwrap();
            assert_eq!(notice.to_string(), expected);
        }
    }

    #[test]
    fn identity_notices_include_type_and_address() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();

        let notice = dispatcher
            .dispatch(StackEvent::IdentityCreated { address: PEER }, &mut stack)
            .unwrap();
        assert_eq!(
            notice.to_string(),
            "Identity created: type 1 address CF:EE:DD:CC:BB:AA"
        );
    }

    #[test]
    fn reencryption_cut_short_by_disconnect_is_reported_once() {
        let conn = ConnectionManager::new();
        let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());
        let mut stack = RecordingStack::default();
        let tracker = ReencryptionTracker::new();

        tracker.start(PEER);
        let lost = tracker.link_lost();
        assert_eq!(
            lost,
            Some(StackEvent::ReencryptionComplete {
                status: HciStatus::RemoteUserTerminatedConnection,
                address: PEER,
            })
        );
        let notice = dispatcher.dispatch(lost.unwrap(), &mut stack).unwrap();
        assert_eq!(notice.to_string(), "Re-encryption failed, disconnected");

        // A later fresh pairing on another link must not inherit the peer.
        assert!(!tracker.is_pending());
        assert_eq!(tracker.encrypted(), None);
        assert_eq!(tracker.link_lost(), None);
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn encrypted_link_completes_pending_reencryption() {
        let tracker = ReencryptionTracker::new();
        assert_eq!(tracker.encrypted(), None);

        tracker.start(PEER);
        assert_eq!(
            tracker.encrypted(),
            Some(StackEvent::ReencryptionComplete {
                status: HciStatus::Success,
                address: PEER,
            })
        );
        assert_eq!(tracker.link_lost(), None);
    }

    #[test]
    fn reencryption_outcome_text() {
        let text = |outcome| Notice::Reencryption(outcome).to_string();
        assert_eq!(text(ReencryptionOutcome::Success), "Re-encryption complete, success");
        assert_eq!(text(ReencryptionOutcome::Timeout), "Re-encryption failed, timeout");
    }

    #[test]
    fn att_status_codes_roundtrip() {
        for code in [0x00, 0x05, 0x0F, 0x70, 0x42] {
            assert_eq!(AttStatus::from(code).code(), code);
        }
    }
}
