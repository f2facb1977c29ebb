//! Persistent storage for bonding keys.
//!
//! Uses the nRF52840's internal flash via `sequential-storage` so that a
//! bonded central can re-encrypt after a power cycle.
//!
//! Storage layout:
//!   - One map item under [`KEY_BONDS`] holding the whole serialized
//!     [`BondStore`] (count byte + fixed-size records, keys and CCCD
//!     state of each bonded central).
//!   - `sequential-storage` appends new versions and garbage-collects
//!     the pages; the range sits above the application in `memory.x`.

use crate::ble::bonds::{BondStore, BOND_STORE_SIZE};
use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Key for the bond list in the map storage.
const KEY_BONDS: u8 = 0x01;

/// Scratch size for `sequential-storage`: the item plus key and headers.
const WORK_BUFFER_SIZE: usize = BOND_STORE_SIZE + 32;

/// Replace the contents of `store` with what is in flash.
///
/// A read error leaves the store empty; the device then simply has no
/// bonds and peers pair again.
pub async fn load_bonds(store: &mut BondStore, flash: &mut impl NorFlash) {
    let mut buf = [0u8; WORK_BUFFER_SIZE];

    match sequential_storage::map::fetch_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_BONDS,
    )
    .await
    {
        Ok(Some(data)) => {
            store.deserialize_all(data);
            info!("Loaded {} bonds from flash", store.len());
        }
        Ok(None) => {
            *store = BondStore::new();
            info!("No bonds in flash");
        }
        Err(e) => {
            *store = BondStore::new();
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
        }
    }
    store.mark_clean();
}

/// Write `store` to flash if it changed since the last load or save.
pub async fn save_bonds(store: &mut BondStore, flash: &mut impl NorFlash) {
    if !store.is_dirty() {
        debug!("BondStore: no changes to save");
        return;
    }

    let mut buf = [0u8; WORK_BUFFER_SIZE];
    let mut data_buf = [0u8; BOND_STORE_SIZE];
    let len = store.serialize_all(&mut data_buf);
    let item = &data_buf[..len];

    match sequential_storage::map::store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_BONDS,
        &item,
    )
    .await
    {
        Ok(()) => {
            store.mark_clean();
            info!("Saved {} bonds to flash", store.len());
        }
        Err(e) => {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
        }
    }
}
