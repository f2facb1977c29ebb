//! UART console transport on the nRF52840-DK virtual COM port.
//!
//! Input is read one byte at a time through the buffered UARTE so no
//! keystroke is lost while a line is being processed. Output is staged
//! in [`Console::out`] by the synchronous console code and written to
//! the UART by [`Console::flush`].

use core::fmt;

use crate::config::{CONSOLE_BAUD, CONSOLE_OUT_CAPACITY, CONSOLE_RX_BUFFER, CONSOLE_TX_BUFFER};
use crate::error::{Error, Result};
use defmt::warn;
use embassy_nrf::buffered_uarte::{self, BufferedUarte};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::peripherals::{P0_06, P0_08, PPI_CH0, PPI_CH1, PPI_GROUP0, TIMER1, UARTE0};
use embassy_nrf::{bind_interrupts, uarte};
use embedded_io_async::{BufRead, Write as _};
use heapless::String;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    UARTE0 => buffered_uarte::InterruptHandler<UARTE0>;
});

static RX_BUF: StaticCell<[u8; CONSOLE_RX_BUFFER]> = StaticCell::new();
static TX_BUF: StaticCell<[u8; CONSOLE_TX_BUFFER]> = StaticCell::new();
static CONSOLE: StaticCell<Console> = StaticCell::new();

/// Text waiting to be written to the UART.
///
/// Output past the capacity is dropped; the `overflowed` flag makes the
/// next flush log it.
pub struct OutBuf {
    text: String<CONSOLE_OUT_CAPACITY>,
    overflowed: bool,
}

impl fmt::Write for OutBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s).map_err(|_| {
            self.overflowed = true;
            fmt::Error
        })
    }
}

pub struct Console {
    uart: BufferedUarte<'static, UARTE0, TIMER1>,
    pub out: OutBuf,
}

/// Bring up the console UART (115 200 8N1, RX P0.08, TX P0.06).
///
/// Must be called exactly once. All static buffers are consumed here.
#[allow(clippy::too_many_arguments)]
pub fn init(
    uarte: UARTE0,
    timer: TIMER1,
    ppi_ch1: PPI_CH0,
    ppi_ch2: PPI_CH1,
    ppi_group: PPI_GROUP0,
    rxd: P0_08,
    txd: P0_06,
) -> &'static mut Console {
    let mut config = uarte::Config::default();
    config.parity = uarte::Parity::EXCLUDED;
    config.baudrate = match CONSOLE_BAUD {
        9_600 => uarte::Baudrate::BAUD9600,
        57_600 => uarte::Baudrate::BAUD57600,
        _ => uarte::Baudrate::BAUD115200,
    };

    // The SoftDevice reserves priorities 0, 1 and 4.
    interrupt::UARTE0.set_priority(Priority::P3);

    let uart = BufferedUarte::new(
        uarte,
        timer,
        ppi_ch1,
        ppi_ch2,
        ppi_group,
        Irqs,
        rxd,
        txd,
        config,
        RX_BUF.init([0; CONSOLE_RX_BUFFER]),
        TX_BUF.init([0; CONSOLE_TX_BUFFER]),
    );

    CONSOLE.init(Console {
        uart,
        out: OutBuf {
            text: String::new(),
            overflowed: false,
        },
    })
}

impl Console {
    /// Wait for the next received byte.
    ///
    /// Cancel-safe: a byte is only consumed once it is returned.
    pub async fn read_byte(&mut self) -> Result<u8> {
        let buf = self.uart.fill_buf().await.map_err(|_| Error::Console)?;
        let Some(&byte) = buf.first() else {
            return Err(Error::Console);
        };
        self.uart.consume(1);
        Ok(byte)
    }

    /// Write the staged output to the UART.
    pub async fn flush(&mut self) -> Result<()> {
        if self.out.overflowed {
            warn!("Console output truncated");
            self.out.overflowed = false;
        }
        if self.out.text.is_empty() {
            return Ok(());
        }
        let result = self.uart.write_all(self.out.text.as_bytes()).await;
        self.out.text.clear();
        result.map_err(|_| Error::Console)
    }
}
