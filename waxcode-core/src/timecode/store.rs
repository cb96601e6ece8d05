// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `store` module reads and writes wide-code lookup tables on disk.
//!
//! Building a 110-bit lookup table walks millions of LFSR cycles, so the MK2 tables are
//! persisted after the first build. The file layout is little-endian with a versioned header:
//!
//! ```text
//! magic "WXLU" | version u16 | bits u8 | reserved u8 | length u32 | avail u32
//! length x slot records: high u64 | low u64 | next u32
//! 65536 bucket heads: u32
//! ```
//!
//! The headerless host-endian layout written by xwax/Mixxx (24-byte padded slot records followed
//! by bucket heads and a trailing `avail`) is accepted on load behind an explicit opt-in; stores
//! always write the versioned format.

use std::fs::{DirBuilder, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::errors::{malformed_error, unsupported_error, Error, Result};
use crate::timecode::def::TimecodeDef;
use crate::timecode::lut::{Lut, Slot, SlotNo, NO_SLOT};
use crate::util::wide::Wide;

const MAGIC: [u8; 4] = *b"WXLU";
const FORMAT_VERSION: u16 = 1;

const N_BUCKETS: usize = 1 << 16;

/// The default lookup-table directory, `$HOME/.mixxx/lut`.
pub fn default_lut_dir() -> Result<PathBuf> {
    match std::env::var_os("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(".mixxx").join("lut")),
        None => unsupported_error("HOME is not set"),
    }
}

/// The path of the lookup-table file for the named code within `dir`.
pub fn lut_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.lut", name))
}

fn create_lut_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(dir)?;
    Ok(())
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Writes the lookup table of a wide code to `path` in the versioned format, creating the
/// parent directory if necessary.
pub fn store(path: &Path, def: &TimecodeDef, lut: &Lut<Wide>) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_lut_dir(dir)?;
    }

    info!("storing LUT at {}", path.display());

    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&[def.bits as u8, 0])?;
    writer.write_all(&def.length.to_le_bytes())?;
    writer.write_all(&lut.avail().to_le_bytes())?;

    for slot in lut.slots() {
        writer.write_all(&slot.value.high.to_le_bytes())?;
        writer.write_all(&slot.value.low.to_le_bytes())?;
        writer.write_all(&slot.next.to_le_bytes())?;
    }

    for &head in lut.buckets() {
        writer.write_all(&head.to_le_bytes())?;
    }

    writer.flush()?;

    Ok(())
}

/// Loads the lookup table of a wide code from `path`, validating the header against `def` and
/// every chain link against the slot count.
pub fn load(path: &Path, def: &TimecodeDef) -> Result<Lut<Wide>> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return malformed_error("bad magic");
    }
    if read_u16(&mut reader)? != FORMAT_VERSION {
        return malformed_error("unsupported format version");
    }

    let mut code = [0u8; 2];
    reader.read_exact(&mut code)?;
    if u32::from(code[0]) != def.bits {
        return malformed_error("code width does not match definition");
    }

    let length = read_u32(&mut reader)?;
    if length != def.length {
        return malformed_error("code length does not match definition");
    }

    let avail = read_u32(&mut reader)?;
    if avail != length {
        return malformed_error("table is not fully populated");
    }

    info!("loading LUT from {}", path.display());

    let mut slots = Vec::with_capacity(length as usize);
    for _ in 0..length {
        let high = read_u64(&mut reader)?;
        let low = read_u64(&mut reader)?;
        let next = read_u32(&mut reader)?;

        if next != NO_SLOT && next >= length {
            return malformed_error("chain link out of bounds");
        }

        slots.push(Slot { value: Wide::new(high, low), next });
    }

    let mut buckets = Vec::with_capacity(N_BUCKETS);
    for _ in 0..N_BUCKETS {
        let head = read_u32(&mut reader)?;

        if head != NO_SLOT && head >= length {
            return malformed_error("bucket head out of bounds");
        }

        buckets.push(head);
    }

    expect_eof(&mut reader)?;

    Ok(Lut::from_parts(slots, buckets))
}

/// Loads a lookup table in the headerless legacy layout.
///
/// Slot records are 24 bytes (`high`, `low`, `next`, four bytes of struct padding), followed by
/// the bucket heads and a trailing `avail` counter. The layout is whatever the writing host's
/// memory layout was; only the little-endian x86-64 form is accepted here.
pub fn load_legacy(path: &Path, def: &TimecodeDef) -> Result<Lut<Wide>> {
    let mut reader = BufReader::new(File::open(path)?);

    info!("loading legacy-format LUT from {}", path.display());

    let length = def.length;

    let mut slots = Vec::with_capacity(length as usize);
    for _ in 0..length {
        let high = read_u64(&mut reader)?;
        let low = read_u64(&mut reader)?;
        let next = read_u32(&mut reader)?;

        // Struct padding.
        let mut pad = [0u8; 4];
        reader.read_exact(&mut pad)?;

        if next != NO_SLOT && next >= length {
            return malformed_error("chain link out of bounds");
        }

        slots.push(Slot { value: Wide::new(high, low), next });
    }

    let mut buckets = Vec::with_capacity(N_BUCKETS);
    for _ in 0..N_BUCKETS {
        let head = read_u32(&mut reader)?;

        if head != NO_SLOT && head >= length {
            return malformed_error("bucket head out of bounds");
        }

        buckets.push(head);
    }

    // The trailing slot counter is required: a table that was not fully written must not be
    // trusted.
    let avail = read_u32(&mut reader)?;
    if avail != length {
        return malformed_error("table is not fully populated");
    }

    expect_eof(&mut reader)?;

    Ok(Lut::from_parts(slots, buckets))
}

fn expect_eof<R: Read>(reader: &mut R) -> Result<()> {
    let mut excess = [0u8; 1];
    match reader.read(&mut excess) {
        Ok(0) => Ok(()),
        Ok(_) => malformed_error("trailing bytes after table"),
        Err(err) => Err(Error::IoError(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::{build_wide_lut, def::CodeFlags, def::CodeKeys};

    use std::fs;

    fn tiny_def() -> TimecodeDef {
        TimecodeDef {
            name: "tiny_mk2",
            desc: "Synthetic wide code for tests",
            resolution: 1000,
            flags: CodeFlags::MK2,
            bits: 20,
            keys: CodeKeys::Mk2 {
                seed: Wide::new(0, 0x59017),
                taps: Wide::new(0, 0x361e4),
            },
            length: 4096,
            safe: 4000,
        }
    }

    fn temp_path(file: &str) -> PathBuf {
        std::env::temp_dir().join(format!("waxcode-store-{}-{}", std::process::id(), file))
    }

    #[test]
    fn verify_round_trip() {
        let def = tiny_def();
        let lut = build_wide_lut(&def).unwrap();

        let path = temp_path("round_trip.lut");
        store(&path, &def, &lut).unwrap();

        let loaded = load(&path, &def).unwrap();
        assert_eq!(loaded, lut);
        assert_eq!(loaded.avail(), lut.avail());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn verify_load_rejects_wrong_definition() {
        let def = tiny_def();
        let lut = build_wide_lut(&def).unwrap();

        let path = temp_path("wrong_def.lut");
        store(&path, &def, &lut).unwrap();

        let mut other = tiny_def();
        other.length = 8192;
        assert!(matches!(load(&path, &other), Err(Error::Malformed(_))));

        let mut other = tiny_def();
        other.bits = 110;
        assert!(matches!(load(&path, &other), Err(Error::Malformed(_))));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn verify_load_rejects_truncated_file() {
        let def = tiny_def();
        let lut = build_wide_lut(&def).unwrap();

        let path = temp_path("truncated.lut");
        store(&path, &def, &lut).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(load(&path, &def).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn verify_load_rejects_bad_magic() {
        let def = tiny_def();

        let path = temp_path("bad_magic.lut");
        fs::write(&path, b"NOPE").unwrap();

        assert!(load(&path, &def).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn verify_legacy_layout_loads() {
        let def = tiny_def();
        let lut = build_wide_lut(&def).unwrap();

        // Write the headerless xwax layout by hand.
        let mut bytes = Vec::new();
        for slot in lut.slots() {
            bytes.extend_from_slice(&slot.value.high.to_le_bytes());
            bytes.extend_from_slice(&slot.value.low.to_le_bytes());
            bytes.extend_from_slice(&slot.next.to_le_bytes());
            bytes.extend_from_slice(&[0u8; 4]);
        }
        for &head in lut.buckets() {
            bytes.extend_from_slice(&head.to_le_bytes());
        }
        bytes.extend_from_slice(&lut.avail().to_le_bytes());

        let path = temp_path("legacy.lut");
        fs::write(&path, bytes).unwrap();

        let loaded = load_legacy(&path, &def).unwrap();
        assert_eq!(loaded, lut);

        fs::remove_file(&path).unwrap();
    }
}
