//! BLE-MIDI peripheral demo - firmware entry point.
//!
//! Advertises the BLE-MIDI service, pairs with a central using Just
//! Works, and bridges a UART console to the MIDI characteristic:
//! `send 90 40 7f` on the console becomes a note-on at the central,
//! MIDI from the central is printed on the console.
//!
//! Build: `cargo build --release --features embedded`
//! Flash: `probe-rs run --chip nRF52840_xxAA`

#![no_std]
#![no_main]

mod app;
mod ble;
mod config;
mod console;
mod error;
mod midi;
mod storage;

use core::fmt::Write;
use core::future::pending;

use ble::adv_payload::AdvertisingData;
use ble::bonds::BondStore;
use ble::connection::ConnectionManager;
use ble::events::{EventDispatcher, StackEvent};
use ble::midi_service::{Server, SoftdeviceMidiTransport, MIDI_INBOX};
use ble::peripheral::{self, Bonder, SoftdeviceStack, BOND_FLUSH, STACK_EVENTS};
use config::{CONSOLE_HISTORY_DEPTH, CONSOLE_LINE_CAPACITY};
use console::command::{Args, CommandBinding, CommandTable};
use console::line_editor::LineEditor;
use console::send::{self, SEND_HELP, SEND_NAME};
use console::uart::Console;
use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::{Flash, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

type Editor = LineEditor<CONSOLE_LINE_CAPACITY, CONSOLE_HISTORY_DEPTH>;

static SERVER: StaticCell<Server> = StaticCell::new();
static BONDER: StaticCell<Bonder> = StaticCell::new();
static TRANSPORT: StaticCell<SoftdeviceMidiTransport> = StaticCell::new();
static EDITOR: StaticCell<Editor> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    peripheral::ble_task(sd, server, bonder).await
}

/// Writes the bond store to flash whenever it changed.
#[embassy_executor::task]
async fn bond_flush_task(bonder: &'static Bonder, mut flash: Flash) -> ! {
    loop {
        BOND_FLUSH.wait().await;
        let mut snapshot = bonder.take_snapshot();
        storage::save_bonds(&mut snapshot, &mut flash).await;
    }
}

/// Console, stack events and inbound MIDI, one at a time.
#[embassy_executor::task]
async fn app_task(
    console: &'static mut Console,
    editor: &'static mut Editor,
    transport: &'static SoftdeviceMidiTransport,
    mut stack: SoftdeviceStack,
) -> ! {
    let conn = ConnectionManager::new();
    let dispatcher = EventDispatcher::new(&conn, AdvertisingData::midi_demo());

    let mut sender = app::MidiSender::new(&conn, transport);
    let mut on_send = |args: &Args<'_>, out: &mut dyn Write| send::run(args, out, &mut sender);
    let mut commands = CommandTable::new();
    unwrap!(commands.add_binding(CommandBinding::new(SEND_NAME, SEND_HELP, true, &mut on_send)));

    app::print_banner(&mut console.out);
    editor.prompt(&mut console.out);
    if let Err(e) = console.flush().await {
        warn!("Console write failed: {}", e);
    }

    loop {
        let inbound = async {
            if conn.is_connected() {
                MIDI_INBOX.ready_to_receive().await
            } else {
                pending::<()>().await
            }
        };

        match select3(console.read_byte(), STACK_EVENTS.receive(), inbound).await {
            Either3::First(Ok(byte)) => {
                app::handle_console_byte(byte, editor, &mut commands, &mut console.out);
            }
            Either3::First(Err(e)) => warn!("Console read failed: {}", e),
            Either3::Second(event) => {
                if let Some(notice) =
                    app::report_event(&dispatcher, event, &mut stack, &mut console.out)
                {
                    info!("{}", notice);
                }
            }
            Either3::Third(()) => {
                app::poll_inbound(&conn, transport, &mut console.out);
            }
        }

        if let Err(e) = console.flush().await {
            warn!("Console write failed: {}", e);
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("BLE-MIDI demo starting");

    // The SoftDevice reserves interrupt priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let console = console::uart::init(
        p.UARTE0, p.TIMER1, p.PPI_CH0, p.PPI_CH1, p.PPI_GROUP0, p.P0_08, p.P0_06,
    );

    let sd = peripheral::enable_softdevice();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    let mut flash = Flash::take(sd);
    let mut bonds = BondStore::new();
    storage::load_bonds(&mut bonds, &mut flash).await;
    let bonder: &'static Bonder = BONDER.init(Bonder::new(bonds));

    let transport: &'static SoftdeviceMidiTransport =
        TRANSPORT.init(SoftdeviceMidiTransport::new(server));
    let editor = EDITOR.init(Editor::new());

    peripheral::post_event(StackEvent::StackState {
        working: true,
        local_address: peripheral::local_address(sd),
    });

    unwrap!(spawner.spawn(bond_flush_task(bonder, flash)));
    unwrap!(spawner.spawn(ble_task(sd, server, bonder)));
    unwrap!(spawner.spawn(app_task(
        console,
        editor,
        transport,
        SoftdeviceStack::new(bonder)
    )));
}
