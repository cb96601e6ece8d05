// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `registry` module owns the built lookup tables and hands out decodable codes.
//!
//! Lookup tables are expensive: building one walks the full LFSR orbit, and the wide (MK2)
//! tables additionally persist to disk. The registry builds each table at most once behind a
//! per-entry latch and shares the result read-only between decoders. Applications own a
//! registry instance; there is no module-level mutable state.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::OnceCell;

use crate::errors::{unsupported_error, Result};
use crate::timecode::def::{TimecodeDef, BUILTIN};
use crate::timecode::{store, CodeTable, Timecode};

/// Options for a [`TimecodeRegistry`].
#[derive(Clone, Debug)]
pub struct RegistryOptions {
    /// Directory holding persisted lookup tables. When `None`, the default of
    /// `$HOME/.mixxx/lut` applies.
    pub lut_dir: Option<PathBuf>,
    /// Accept lookup-table files in the headerless legacy layout.
    pub read_legacy_luts: bool,
    /// Persist wide lookup tables after building them.
    pub store_luts: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        RegistryOptions { lut_dir: None, read_legacy_luts: false, store_luts: true }
    }
}

struct Entry {
    def: &'static TimecodeDef,
    code: OnceCell<Arc<Timecode>>,
}

/// The registry of supported timecodes and their lazily built lookup tables.
pub struct TimecodeRegistry {
    opts: RegistryOptions,
    entries: Vec<Entry>,
}

impl TimecodeRegistry {
    pub fn new(opts: RegistryOptions) -> Self {
        let entries = BUILTIN.iter().map(|def| Entry { def, code: OnceCell::new() }).collect();
        TimecodeRegistry { opts, entries }
    }

    /// Iterates the definitions the registry knows, built or not.
    pub fn definitions(&self) -> impl Iterator<Item = &'static TimecodeDef> + '_ {
        self.entries.iter().map(|entry| entry.def)
    }

    /// Finds a code by definition name, building or loading its lookup table on first use.
    ///
    /// For wide codes the table is loaded from disk when a valid file exists, and otherwise
    /// built and then stored. Persistence failures are not fatal: a table that cannot be read
    /// is rebuilt, and one that cannot be written is used in memory.
    pub fn find(&self, name: &str) -> Result<Arc<Timecode>> {
        let Some(entry) = self.entries.iter().find(|entry| entry.def.name == name) else {
            return unsupported_error("unknown timecode name");
        };

        entry.code.get_or_try_init(|| self.init_code(entry.def)).cloned()
    }

    fn init_code(&self, def: &'static TimecodeDef) -> Result<Arc<Timecode>> {
        if !def.is_mk2() {
            return Ok(Arc::new(Timecode::build(def)?));
        }

        let dir = match &self.opts.lut_dir {
            Some(dir) => Ok(dir.clone()),
            None => store::default_lut_dir(),
        };

        if let Ok(dir) = &dir {
            let path = store::lut_path(dir, def.name);

            match store::load(&path, def) {
                Ok(lut) => {
                    return Ok(Arc::new(Timecode::with_table(def.clone(), CodeTable::Mk2(lut))))
                }
                Err(err) => debug!("no stored LUT for {}: {}", def.name, err),
            }

            if self.opts.read_legacy_luts {
                match store::load_legacy(&path, def) {
                    Ok(lut) => {
                        return Ok(Arc::new(Timecode::with_table(
                            def.clone(),
                            CodeTable::Mk2(lut),
                        )))
                    }
                    Err(err) => debug!("no legacy LUT for {}: {}", def.name, err),
                }
            }
        }

        let code = Timecode::build(def)?;

        if self.opts.store_luts {
            match &dir {
                Ok(dir) => {
                    let path = store::lut_path(dir, def.name);
                    if let CodeTable::Mk2(lut) = code.table() {
                        if let Err(err) = store::store(&path, def, lut) {
                            warn!("couldn't store LUT for {}: {}", def.name, err);
                        }
                    }
                }
                Err(err) => warn!("couldn't store LUT for {}: {}", def.name, err),
            }
        }

        Ok(Arc::new(code))
    }

    /// Returns the next code, after the named one, whose lookup table is already built; wraps
    /// around the definition order and comes back to the named code itself if it is the only
    /// one ready.
    pub fn next_ready(&self, current: &str) -> Option<Arc<Timecode>> {
        let pos = self.entries.iter().position(|entry| entry.def.name == current).unwrap_or(0);
        let n = self.entries.len();

        for i in 1..=n {
            let entry = &self.entries[(pos + i) % n];
            if let Some(code) = entry.code.get() {
                return Some(code.clone());
            }
        }

        None
    }

    /// Drops every built lookup table. Decoders still holding a code keep it alive until they
    /// are dropped themselves.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.code = OnceCell::new();
        }
    }
}

impl Default for TimecodeRegistry {
    fn default() -> Self {
        TimecodeRegistry::new(RegistryOptions::default())
    }
}
