//! Kernel occupancy side-channel data.
//!
//! The profiler agent writes occupancy statistics to a separate file, one
//! record per kernel dispatch per thread, in dispatch order. Correlation with
//! the trace is positional: the Nth occupancy record for a thread belongs to
//! the Nth kernel-dispatching enqueue call on that thread. The container
//! keeps the running cursor; we only answer positional lookups.
//!
//! The file is a JSON document:
//!
//! {
//!   "threads": [
//!     {
//!       "thread_id": 1234,
//!       "kernels": [
//!         {
//!           "kernel_name": "reduce_rows",
//!           "device_name": "gfx1030",
//!           "occupancy_pct": 87.5,
//!           "wavefronts": 40,
//!           "work_group_size": 256
//!         }
//!       ]
//!     }
//!   ]
//! }

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OccupancyInfo {
    pub kernel_name: String,
    pub device_name: String,
    pub occupancy_pct: f64,
    pub wavefronts: u32,
    pub work_group_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OccupancyFileThread {
    thread_id: u64,
    kernels: Vec<OccupancyInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OccupancyFile {
    threads: Vec<OccupancyFileThread>,
}

fn read_occupancy_file(path: &Path) -> Result<HashMap<u64, Vec<OccupancyInfo>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read occupancy file {}", path.display()))?;
    let parsed: OccupancyFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse occupancy file {}", path.display()))?;
    let mut table = HashMap::new();
    for thread in parsed.threads {
        table
            .entry(thread.thread_id)
            .or_insert_with(Vec::new)
            .extend(thread.kernels);
    }
    Ok(table)
}

/// Thread -> ordered occupancy records. Loaded once, read-only afterwards.
#[derive(Debug, Default)]
pub struct OccupancyIndex {
    table: HashMap<u64, Vec<OccupancyInfo>>,
    loaded: bool,
    load_in_progress: bool,
}

impl OccupancyIndex {
    /// Load the side-channel file. Repeated calls are no-ops once a load has
    /// completed or while one is underway. A missing or malformed file leaves
    /// the index empty and returns false; occupancy columns simply stay
    /// blank in that case.
    pub fn load(&mut self, path: &Path) -> bool {
        if self.loaded || self.load_in_progress {
            return self.loaded;
        }
        self.load_in_progress = true;
        match read_occupancy_file(path) {
            Ok(table) => {
                self.table = table;
                self.loaded = true;
            }
            Err(err) => {
                tracing::warn!("occupancy data unavailable: {err:#}");
            }
        }
        self.load_in_progress = false;
        self.loaded
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The record at `position` for `thread_id`, or None past the end.
    pub fn find(&self, thread_id: u64, position: usize) -> Option<&OccupancyInfo> {
        self.table.get(&thread_id).and_then(|list| list.get(position))
    }

    pub fn thread_kernel_count(&self, thread_id: u64) -> usize {
        self.table.get(&thread_id).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, thread_id: u64, records: Vec<OccupancyInfo>) {
        self.table.insert(thread_id, records);
        self.loaded = true;
    }
}
