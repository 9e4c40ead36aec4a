//! Ingestion listener: the bridge between the streaming .atp parser and the
//! session data container.
//!
//! The parser pushes one typed record per callback and honors the boolean we
//! hand back: `true` means stop parsing. We stop for two reasons, neither of
//! which is an error: the record ceiling was crossed (huge traces would
//! otherwise drown the UI) or the user cancelled the load. Either way the
//! container is finalized on whatever made it in, so the partial session is
//! still consistent and displayable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::container::SessionDataContainer;
use crate::item::ItemId;
use crate::record::TraceRecord;

/// Ceiling on ingested records before parsing is cut short.
pub const MAX_TRACE_ENTRIES: usize = 200_000;

/// Cooperative cancellation flag, shared between the loader thread and
/// whoever owns the cancel button. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress push callback: `(message, current_item, total_items)`.
/// `current_item == 0` marks the start of a new parse phase.
pub type ProgressFn = Box<dyn FnMut(&str, u64, u64)>;

pub struct TraceIngestListener {
    container: SessionDataContainer,
    cancel: CancellationToken,
    max_items: usize,
    parse_calls: usize,
    ingested: usize,
    truncated: bool,
    /// Largest record end time seen after parsing stopped; tells the
    /// consumer where the displayed (partial) timeline ends.
    stopped_at_timestamp: Option<u64>,
    /// (thread, seq) of each ingested OpenCL host call, for resolving the
    /// owners of GPU-side records. Overwritten on reuse so the latest call
    /// with a sequence index wins.
    cl_owners: HashMap<(u64, u32), ItemId>,
    progress: Option<ProgressFn>,
    last_progress_message: String,
}

impl TraceIngestListener {
    pub fn new(cancel: CancellationToken) -> Self {
        Self::with_capacity(cancel, MAX_TRACE_ENTRIES)
    }

    /// `max_items` caps how many records are ingested before the parser is
    /// told to stop.
    pub fn with_capacity(cancel: CancellationToken, max_items: usize) -> Self {
        TraceIngestListener {
            container: SessionDataContainer::new(),
            cancel,
            max_items,
            parse_calls: 0,
            ingested: 0,
            truncated: false,
            stopped_at_timestamp: None,
            cl_owners: HashMap::new(),
            progress: None,
            last_progress_message: String::new(),
        }
    }

    pub fn set_progress_callback(&mut self, callback: ProgressFn) {
        self.progress = Some(callback);
    }

    pub fn container(&self) -> &SessionDataContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut SessionDataContainer {
        &mut self.container
    }

    /// True once parsing stopped early, by ceiling or cancellation.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn parse_calls(&self) -> usize {
        self.parse_calls
    }

    pub fn stopped_at_timestamp(&self) -> Option<u64> {
        self.stopped_at_timestamp
    }

    fn check_stop_parsing(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.truncated = true;
            return true;
        }
        if self.ingested >= self.max_items {
            if !self.truncated {
                tracing::warn!(
                    ceiling = self.max_items,
                    "trace entry ceiling reached, stopping the parser"
                );
            }
            self.truncated = true;
            return true;
        }
        false
    }

    /// Deliver one parsed record. Returns `true` when the parser should stop;
    /// records delivered after that point are counted but not ingested.
    pub fn on_parse(&mut self, record: TraceRecord) -> bool {
        self.parse_calls += 1;
        if self.check_stop_parsing() {
            let ts = record.end_timestamp();
            if ts != u64::MAX {
                self.stopped_at_timestamp =
                    Some(self.stopped_at_timestamp.map_or(ts, |prev| prev.max(ts)));
            }
            return true;
        }
        self.ingested += 1;

        match record {
            TraceRecord::ClApi(info) => {
                let key = (info.thread_id, info.seq_id);
                let id = self.container.add_cl_item(info);
                self.cl_owners.insert(key, id);
            }
            TraceRecord::ClGpu(info) => {
                // The OpenCL protocol has no sample ids; resolve the owner by
                // the host call's sequence index on the issuing thread.
                match self.cl_owners.get(&(info.thread_id, info.owner_seq_id)).copied() {
                    Some(owner) => {
                        self.container.add_cl_gpu_item(owner, info);
                    }
                    None => {
                        tracing::warn!(
                            thread_id = info.thread_id,
                            seq_id = info.owner_seq_id,
                            "OpenCL GPU record has no matching host call, dropping"
                        );
                        self.ingested -= 1;
                    }
                }
            }
            TraceRecord::HsaApi(info) => {
                self.container.add_hsa_item(info);
            }
            TraceRecord::HsaGpu(info) => {
                self.container.add_hsa_gpu_item(info);
            }
            TraceRecord::Dx12Api(info) => {
                self.container.add_dx12_api_item(info);
            }
            TraceRecord::Dx12Gpu(info) => {
                if self.container.add_dx12_gpu_trace_item(info).is_none() {
                    self.ingested -= 1;
                }
            }
            TraceRecord::VkApi(info) => {
                self.container.add_vk_api_item(info);
            }
            TraceRecord::VkGpu(info) => {
                if self.container.add_vk_gpu_trace_item(info).is_none() {
                    self.ingested -= 1;
                }
            }
            TraceRecord::PerfMarker(entry) => {
                if self.container.add_performance_marker(entry).is_none() {
                    self.ingested -= 1;
                }
            }
            TraceRecord::Symbol(entry) => {
                self.container.add_symbol_entry(&entry);
            }
        }
        false
    }

    /// Progress relay from the parser. `current == 0` marks the start of a
    /// parse phase; the consumer sets up its display on that call. The last
    /// message is retained so consumers can skip redundant text updates.
    pub fn on_parser_progress(&mut self, message: &str, current: u64, total: u64) {
        if current == 0 {
            self.last_progress_message.clear();
        }
        if self.last_progress_message != message {
            self.last_progress_message = message.to_string();
        }
        if let Some(callback) = self.progress.as_mut() {
            callback(message, current, total);
        }
    }

    pub fn last_progress_message(&self) -> &str {
        &self.last_progress_message
    }

    /// Finish ingestion: finalize the container (also after truncation or
    /// cancellation, so a partial session still displays) and hand it over.
    pub fn finish(mut self) -> SessionDataContainer {
        self.container.finalize_data_collection();
        self.container
    }
}
