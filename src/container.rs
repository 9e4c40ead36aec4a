//! The session data container.
//!
//! Central aggregate of one profiled run: owns every reconstructed item in an
//! append-only arena, indexes them by thread, queue, sample id and start
//! time, and runs the one-shot finalization pass that stitches raw parsed
//! records into the navigable tree the UI consumes.
//!
//! Everything here is single-threaded by contract: ingestion, finalization
//! and queries all happen on the loader thread, one after the other.
//! Reconstruction is best-effort throughout; malformed input loses the
//! affected linkage, never the whole session, because traces are routinely
//! truncated by the profiled process dying mid-run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::path::Path;

use crate::command_list::{CommandListInstance, CommandListNamer};
use crate::item::{ItemId, ItemKind, ItemType, SessionItem};
use crate::occupancy::{OccupancyIndex, OccupancyInfo};
use crate::record::{
    ApiFamily, ClApiInfo, ClGpuInfo, CommandListOp, Dx12ApiInfo, Dx12GpuInfo, HsaApiInfo,
    HsaGpuInfo, PerfMarkerEntry, PerfMarkerType, SymbolFileEntry, TimeUnit, VkApiInfo, VkGpuInfo,
};
use crate::symbols::{SymbolEntry, SymbolTable};

/// Synthetic queue for OpenCL and HSA GPU records, which have no explicit
/// queue abstraction in the source protocol.
pub const DEFAULT_QUEUE_NAME: &str = "Queue0";

/// Device name the OpenCL runtime reports for host-side execution. Dispatches
/// on it never have occupancy records.
const CPU_DEVICE_NAME: &str = "CPU";

#[derive(Default)]
pub struct SessionDataContainer {
    /// Item arena. Append-only for the life of the session so that ItemIds
    /// stay valid; only `clear` empties it.
    items: Vec<SessionItem>,

    /// Thread id -> CPU API calls, in ingestion (= call) order.
    cpu_items: BTreeMap<u64, Vec<ItemId>>,

    /// Thread id -> performance marker items, in begin order.
    perf_markers: BTreeMap<u64, Vec<ItemId>>,

    /// Queue / command-buffer name -> GPU items, in ingestion order.
    queue_items: BTreeMap<String, Vec<ItemId>>,

    /// Queue name -> command-list type reported by the first record seen.
    queue_types: HashMap<String, u32>,

    /// Sample-id correlation maps for O(1) CPU<->GPU pairing.
    sample_to_cpu: HashMap<u64, Vec<ItemId>>,
    sample_to_gpu: HashMap<u64, Vec<ItemId>>,

    /// Thread id -> synthetic root item.
    thread_roots: BTreeMap<u64, ItemId>,

    /// Stack of currently open performance markers, innermost last.
    open_markers: Vec<ItemId>,

    /// Start time -> items, for search in time order. Roots excluded.
    items_by_start: BTreeMap<u64, Vec<ItemId>>,

    /// Expected per-thread call counts announced by the parser. Display hint
    /// only, never used for sizing.
    api_count_hints: HashMap<u64, u32>,

    occupancy: OccupancyIndex,
    /// Per-thread running cursor into the occupancy lists.
    occupancy_cursor: HashMap<u64, usize>,

    symbols: SymbolTable,

    command_list_instances: Vec<CommandListInstance>,
    /// GPU-sampled calls that never fell inside an observed command-list
    /// submission. Not an error; some capture paths have no list wrapper.
    unattached_calls: Vec<ItemId>,

    session_time_range: Option<(u64, u64)>,
    finalized: bool,
    api_count: u64,

    last_search: String,
    last_find_start: Option<u64>,
}

impl SessionDataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, item: SessionItem) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        let indexable = !item.is_root();
        let start = item.start;
        self.items.push(item);
        if indexable {
            self.items_by_start.entry(start).or_default().push(id);
        }
        id
    }

    fn root_for_thread(&mut self, thread_id: u64, family: ApiFamily) -> ItemId {
        if let Some(&root) = self.thread_roots.get(&thread_id) {
            return root;
        }
        let root = self.alloc(SessionItem::root(thread_id, family));
        self.thread_roots.insert(thread_id, root);
        root
    }

    fn add_item_to_thread(&mut self, id: ItemId) {
        let (thread_id, family) = {
            let item = &self.items[id.index()];
            (item.thread_id, item.item_type.family)
        };
        self.cpu_items.entry(thread_id).or_default().push(id);
        let root = self.root_for_thread(thread_id, family);
        self.items[id.index()].parent = Some(root);
        self.items[root.index()].children.push(id);
        self.api_count += 1;
    }

    /// Record the expected call count for a thread. Display hint only.
    pub fn set_api_num(&mut self, thread_id: u64, count: u32) {
        self.api_count_hints.insert(thread_id, count);
    }

    pub fn load_occupancy_file(&mut self, path: &Path) -> bool {
        self.occupancy.load(path)
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    /// Advance the per-thread occupancy cursor for an enqueue call and return
    /// the matched positional index, if any. A kernel dispatch with garbage
    /// device timing on a non-CPU device consumes its slot without matching,
    /// keeping later dispatches aligned with their records.
    fn match_occupancy(&mut self, info: &ClApiInfo) -> Option<usize> {
        if !info.is_enqueue || self.occupancy.is_empty() {
            return None;
        }
        let mut cursor = self.occupancy_cursor.get(&info.thread_id).copied().unwrap_or(0);
        let mut matched = None;

        let timing_invalid = info.gpu_end < info.gpu_start
            || info.gpu_start < info.submitted
            || info.submitted < info.queued;
        if timing_invalid && info.is_kernel_dispatch && info.device_name != CPU_DEVICE_NAME {
            // The dispatch reported garbage timing; its record is skipped so
            // later dispatches stay aligned, and it gets no occupancy itself.
            cursor += 1;
        } else if info.is_kernel_dispatch {
            if let Some(record) = self.occupancy.find(info.thread_id, cursor) {
                if record.device_name == info.device_name {
                    matched = Some(cursor);
                    cursor += 1;
                }
            }
        }

        self.occupancy_cursor.insert(info.thread_id, cursor);
        matched
    }

    pub fn add_cl_item(&mut self, info: ClApiInfo) -> ItemId {
        let occupancy = self.match_occupancy(&info);
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::OpenCl, ItemKind::Api),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Milliseconds,
        );
        item.call_index = info.seq_id;
        item.end_index = info.seq_id;
        item.name = info.name;
        item.args = info.args;
        item.occupancy = occupancy;
        let id = self.alloc(item);
        self.add_item_to_thread(id);
        id
    }

    pub fn add_hsa_item(&mut self, info: HsaApiInfo) -> ItemId {
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::Hsa, ItemKind::Api),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Milliseconds,
        );
        item.call_index = info.seq_id;
        item.end_index = info.seq_id;
        item.name = info.name;
        item.args = info.args;
        let id = self.alloc(item);
        self.add_item_to_thread(id);
        id
    }

    pub fn add_dx12_api_item(&mut self, info: Dx12ApiInfo) -> ItemId {
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::Dx12, ItemKind::Api),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Microseconds,
        );
        item.call_index = info.seq_id;
        item.end_index = info.seq_id;
        item.name = info.name;
        item.args = info.args;
        item.sample_id = info.sample_id;
        let id = self.alloc(item);
        self.add_item_to_thread(id);
        if let Some(sample_id) = info.sample_id {
            self.sample_to_cpu.entry(sample_id).or_default().push(id);
        }
        id
    }

    pub fn add_vk_api_item(&mut self, info: VkApiInfo) -> ItemId {
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::Vulkan, ItemKind::Api),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Microseconds,
        );
        item.call_index = info.seq_id;
        item.end_index = info.seq_id;
        item.name = info.name;
        item.args = info.args;
        item.sample_id = info.sample_id;
        let id = self.alloc(item);
        self.add_item_to_thread(id);
        if let Some(sample_id) = info.sample_id {
            self.sample_to_cpu.entry(sample_id).or_default().push(id);
        }
        id
    }

    /// OpenCL GPU work carries no sample id; the parser resolves the owning
    /// enqueue call before handing us the record.
    pub fn add_cl_gpu_item(&mut self, owner: ItemId, info: ClGpuInfo) -> Option<ItemId> {
        if self.items.get(owner.index()).is_none() {
            tracing::warn!(?owner, "OpenCL GPU record references unknown owner, skipping");
            return None;
        }
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::OpenCl, ItemKind::Gpu),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Microseconds,
        );
        item.call_index = info.owner_seq_id;
        item.end_index = info.owner_seq_id;
        item.name = info.name;
        item.queue_name = Some(DEFAULT_QUEUE_NAME.to_string());
        item.owner = Some(owner);
        let id = self.alloc(item);
        self.items[owner.index()].gpu_items.push(id);
        self.queue_items
            .entry(DEFAULT_QUEUE_NAME.to_string())
            .or_default()
            .push(id);
        Some(id)
    }

    pub fn add_hsa_gpu_item(&mut self, info: HsaGpuInfo) -> ItemId {
        let mut item = SessionItem::new(
            ItemType::new(ApiFamily::Hsa, ItemKind::Gpu),
            info.thread_id,
            info.start,
            info.end,
            TimeUnit::Microseconds,
        );
        item.call_index = info.seq_id;
        item.end_index = info.seq_id;
        item.name = info.kernel_name;
        item.sample_id = info.sample_id;
        item.queue_name = Some(DEFAULT_QUEUE_NAME.to_string());
        let id = self.alloc(item);
        self.queue_items
            .entry(DEFAULT_QUEUE_NAME.to_string())
            .or_default()
            .push(id);
        if let Some(sample_id) = info.sample_id {
            self.sample_to_gpu.entry(sample_id).or_default().push(id);
        }
        id
    }

    pub fn add_dx12_gpu_trace_item(&mut self, info: Dx12GpuInfo) -> Option<ItemId> {
        self.add_gpu_trace_item(
            ApiFamily::Dx12,
            info.thread_id,
            info.seq_id,
            info.name,
            info.args,
            info.start,
            info.end,
            info.sample_id,
            info.queue_name,
            info.command_list_ptr,
            info.command_list_type,
            info.list_op,
        )
    }

    pub fn add_vk_gpu_trace_item(&mut self, info: VkGpuInfo) -> Option<ItemId> {
        self.add_gpu_trace_item(
            ApiFamily::Vulkan,
            info.thread_id,
            info.seq_id,
            info.name,
            info.args,
            info.start,
            info.end,
            info.sample_id,
            info.queue_name,
            info.command_list_ptr,
            info.command_list_type,
            info.list_op,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn add_gpu_trace_item(
        &mut self,
        family: ApiFamily,
        thread_id: u64,
        seq_id: u32,
        name: String,
        args: String,
        start: u64,
        end: u64,
        sample_id: Option<u64>,
        queue_name: String,
        command_list_ptr: String,
        command_list_type: u32,
        list_op: CommandListOp,
    ) -> Option<ItemId> {
        if queue_name.is_empty() {
            tracing::warn!(name, "GPU record carries no queue identifier, skipping");
            return None;
        }
        let mut item = SessionItem::new(
            ItemType::new(family, ItemKind::Gpu),
            thread_id,
            start,
            end,
            TimeUnit::Microseconds,
        );
        item.call_index = seq_id;
        item.end_index = seq_id;
        item.name = name;
        item.args = args;
        item.sample_id = sample_id;
        item.queue_name = Some(queue_name.clone());
        if !command_list_ptr.is_empty() {
            item.command_list_ptr = Some(command_list_ptr);
        }
        item.list_op = list_op;
        let id = self.alloc(item);

        match self.queue_types.get(&queue_name) {
            None => {
                self.queue_types.insert(queue_name.clone(), command_list_type);
            }
            Some(&existing) if existing != command_list_type => {
                tracing::warn!(
                    queue = %queue_name,
                    existing,
                    reported = command_list_type,
                    "queue reported with conflicting command-list types"
                );
            }
            Some(_) => {}
        }

        self.queue_items.entry(queue_name).or_default().push(id);
        if let Some(sample_id) = sample_id {
            self.sample_to_gpu.entry(sample_id).or_default().push(id);
        }
        Some(id)
    }

    /// Begin pushes an open marker; End closes the innermost open marker on
    /// the same thread (matched by name too, when the end record carries
    /// one). An End with nothing to close is dropped.
    pub fn add_performance_marker(&mut self, entry: PerfMarkerEntry) -> Option<ItemId> {
        match entry.marker_type {
            PerfMarkerType::Begin => {
                let mut item = SessionItem::new(
                    ItemType::new(ApiFamily::PerfMarker, ItemKind::Marker),
                    entry.thread_id,
                    entry.timestamp,
                    entry.timestamp,
                    TimeUnit::Milliseconds,
                );
                item.name = entry.name;
                item.args = entry.group;
                let id = self.alloc(item);
                self.perf_markers.entry(entry.thread_id).or_default().push(id);
                self.open_markers.push(id);
                Some(id)
            }
            PerfMarkerType::End => {
                let pos = self.open_markers.iter().rposition(|&id| {
                    let item = &self.items[id.index()];
                    item.thread_id == entry.thread_id
                        && (entry.name.is_empty() || item.name == entry.name)
                });
                let Some(pos) = pos else {
                    tracing::warn!(
                        thread_id = entry.thread_id,
                        name = %entry.name,
                        "marker end with no matching begin, dropping"
                    );
                    return None;
                };
                let id = self.open_markers.remove(pos);
                let item = &mut self.items[id.index()];
                if entry.timestamp >= item.start {
                    item.end = entry.timestamp;
                } else {
                    tracing::warn!(
                        thread_id = entry.thread_id,
                        "marker end precedes begin, clamping"
                    );
                }
                Some(id)
            }
        }
    }

    pub fn add_symbol_entry(&mut self, entry: &SymbolFileEntry) {
        self.symbols.add_entry(entry);
    }

    /// One-shot post-ingestion pass: merge markers into the per-thread call
    /// trees, pair CPU and GPU items by sample id, partition queue timelines
    /// into command-list instances, and fix the session time range. A second
    /// call is a no-op.
    pub fn finalize_data_collection(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        if !self.open_markers.is_empty() {
            tracing::warn!(
                count = self.open_markers.len(),
                "markers had begin but no end; they are kept flat, not merged"
            );
        }
        let unclosed: HashSet<ItemId> = self.open_markers.iter().copied().collect();

        let marker_threads: Vec<u64> = self.perf_markers.keys().copied().collect();
        for thread_id in marker_threads {
            self.merge_markers_for_thread(thread_id, &unclosed);
        }

        self.pair_sample_ids();
        self.partition_command_lists();
        self.compute_time_range();
    }

    /// Merge the thread's CPU calls and closed markers into one tree. Both
    /// sequences are already in start-time order (ingestion order), so a
    /// single forward pass with a stack of open markers suffices: each item
    /// becomes a child of the innermost marker still open at its start time.
    fn merge_markers_for_thread(&mut self, thread_id: u64, unclosed: &HashSet<ItemId>) {
        let apis = self.cpu_items.get(&thread_id).cloned().unwrap_or_default();
        let markers: Vec<ItemId> = self
            .perf_markers
            .get(&thread_id)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|id| !unclosed.contains(id))
                    .collect()
            })
            .unwrap_or_default();
        if markers.is_empty() {
            return;
        }

        let root = self.root_for_thread(thread_id, ApiFamily::PerfMarker);
        self.items[root.index()].children.clear();

        let mut open: Vec<ItemId> = Vec::new();
        let (mut ai, mut mi) = (0usize, 0usize);

        while ai < apis.len() || mi < markers.len() {
            let take_api = match (apis.get(ai), markers.get(mi)) {
                (Some(&a), Some(&m)) => {
                    self.items[a.index()].start <= self.items[m.index()].start
                }
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let (next, is_marker) = if take_api {
                let id = apis[ai];
                ai += 1;
                (id, false)
            } else {
                let id = markers[mi];
                mi += 1;
                (id, true)
            };

            // Close every marker that ended before this item started.
            let current_start = self.items[next.index()].start;
            while let Some(&top) = open.last() {
                if self.items[top.index()].end < current_start {
                    open.pop();
                } else {
                    break;
                }
            }
            let parent = open.last().copied().unwrap_or(root);
            if is_marker {
                open.push(next);
            }

            self.items[next.index()].parent = Some(parent);
            self.items[parent.index()].children.push(next);
            // A freshly adopted marker has no covered range yet; its calls
            // propagate upward through it once they arrive. API calls widen
            // every enclosing marker, not just the immediate parent.
            if !is_marker {
                let (first, last) = {
                    let child = &self.items[next.index()];
                    (child.call_index, child.end_index)
                };
                let mut ancestor = parent;
                while ancestor != root {
                    self.items[ancestor.index()].update_indices(first, last);
                    ancestor = match self.items[ancestor.index()].parent {
                        Some(up) => up,
                        None => break,
                    };
                }
            }
        }
    }

    /// Point every GPU item at the CPU call that shares its sample id, and
    /// link the CPU call forward to its GPU work. Sample ids with no CPU
    /// counterpart stay orphaned; that is expected in truncated traces.
    fn pair_sample_ids(&mut self) {
        let sample_ids: Vec<u64> = self.sample_to_gpu.keys().copied().collect();
        for sample_id in sample_ids {
            let Some(cpu_ids) = self.sample_to_cpu.get(&sample_id) else {
                tracing::debug!(sample_id, "GPU sample id has no CPU counterpart");
                continue;
            };
            let owner = cpu_ids[0];
            let gpu_ids = self.sample_to_gpu[&sample_id].clone();
            for &gpu_id in &gpu_ids {
                self.items[gpu_id.index()].owner = Some(owner);
            }
            self.items[owner.index()].gpu_items.extend(gpu_ids);
        }
    }

    /// Scan each queue's GPU items in ingestion order and group them into
    /// command-list submissions. A Begin on a list pointer opens an instance
    /// (resubmissions of the same pointer get an incremented instance index),
    /// the matching End closes it, and everything on that pointer in between
    /// is covered. Sampled calls outside any submission become unattached.
    fn partition_command_lists(&mut self) {
        let mut namer = CommandListNamer::default();
        // Submission counter per command-list pointer, shared across queues
        // since pointer identity is process-wide.
        let mut submissions: HashMap<String, u32> = HashMap::new();

        let queues: Vec<String> = self.queue_items.keys().cloned().collect();
        for queue_name in queues {
            let ids = self.queue_items[&queue_name].clone();
            // Open instance per list pointer, plus the covered ids (begin and
            // end records included) for naming on close.
            let mut open: HashMap<String, (CommandListInstance, Vec<ItemId>)> = HashMap::new();

            for id in ids {
                let (ptr, op, seq, start, end, sample_id, family) = {
                    let item = &self.items[id.index()];
                    (
                        item.command_list_ptr.clone(),
                        item.list_op,
                        item.call_index,
                        item.start,
                        item.end,
                        item.sample_id,
                        item.item_type.family,
                    )
                };
                let Some(ptr) = ptr else {
                    if sample_id.is_some() {
                        self.unattached_calls.push(id);
                    }
                    continue;
                };
                let is_buffer = family == ApiFamily::Vulkan;

                match op {
                    CommandListOp::Begin => {
                        if let Some((instance, covered)) = open.remove(&ptr) {
                            tracing::warn!(
                                ptr = %ptr,
                                "command list reopened without close, finishing previous instance"
                            );
                            self.close_instance(instance, covered, &mut namer, is_buffer);
                        }
                        let index = submissions.entry(ptr.clone()).or_insert(0);
                        let mut instance =
                            CommandListInstance::open(ptr.clone(), queue_name.clone(), *index);
                        *index += 1;
                        instance.start_time = start;
                        instance.end_time = end;
                        open.insert(ptr, (instance, vec![id]));
                    }
                    CommandListOp::End => {
                        let Some((mut instance, mut covered)) = open.remove(&ptr) else {
                            tracing::warn!(ptr = %ptr, "command list close without open, skipping");
                            if sample_id.is_some() {
                                self.unattached_calls.push(id);
                            }
                            continue;
                        };
                        instance.end_time = instance.end_time.max(end);
                        covered.push(id);
                        self.close_instance(instance, covered, &mut namer, is_buffer);
                    }
                    CommandListOp::Other => {
                        if let Some((instance, covered)) = open.get_mut(&ptr) {
                            instance.add_call(id, seq, start, end);
                            covered.push(id);
                        } else if sample_id.is_some() {
                            self.unattached_calls.push(id);
                        }
                    }
                }
            }

            // A truncated trace can leave submissions without a close. Sort
            // by pointer so leftover instances are recorded in a stable order.
            let mut leftovers: Vec<_> = open.into_iter().collect();
            leftovers.sort_by(|a, b| a.0.cmp(&b.0));
            for (ptr, (instance, covered)) in leftovers {
                tracing::warn!(ptr = %ptr, "command list never closed, keeping partial instance");
                let is_buffer = covered
                    .first()
                    .is_some_and(|id| self.items[id.index()].item_type.family == ApiFamily::Vulkan);
                self.close_instance(instance, covered, &mut namer, is_buffer);
            }
        }
    }

    fn close_instance(
        &mut self,
        mut instance: CommandListInstance,
        covered: Vec<ItemId>,
        namer: &mut CommandListNamer,
        is_buffer: bool,
    ) {
        if instance.end_time < instance.start_time {
            instance.end_time = instance.start_time;
        }
        let name = namer.name(&instance.command_list_ptr, instance.instance_index, is_buffer);
        for id in covered {
            self.items[id.index()].command_list = Some(name.clone());
        }
        self.command_list_instances.push(instance);
    }

    /// Min start / max end over every non-root item, `(0, 0)` when the
    /// container is empty.
    fn compute_time_range(&mut self) {
        let mut min_start = u64::MAX;
        let mut max_end = u64::MIN;
        for item in &self.items {
            if item.is_root() {
                continue;
            }
            min_start = min_start.min(item.start);
            max_end = max_end.max(item.end);
        }
        self.session_time_range = Some(if min_start > max_end {
            (0, 0)
        } else {
            (min_start, max_end)
        });
    }

    // ---- query surface ----

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn item(&self, id: ItemId) -> Option<&SessionItem> {
        self.items.get(id.index())
    }

    pub fn api_count(&self) -> u64 {
        self.api_count
    }

    pub fn threads_count(&self) -> usize {
        self.cpu_items.len()
    }

    pub fn thread_id(&self, index: usize) -> Option<u64> {
        self.cpu_items.keys().nth(index).copied()
    }

    /// The announced call count for a thread if the parser provided one,
    /// otherwise the count actually ingested.
    pub fn thread_api_count(&self, thread_id: u64) -> usize {
        self.api_count_hints
            .get(&thread_id)
            .map(|&n| n as usize)
            .unwrap_or_else(|| self.cpu_items.get(&thread_id).map_or(0, Vec::len))
    }

    pub fn thread_perf_markers_count(&self, thread_id: u64) -> usize {
        self.perf_markers.get(&thread_id).map_or(0, Vec::len)
    }

    pub fn thread_contains_performance_markers(&self, thread_id: u64) -> bool {
        self.thread_perf_markers_count(thread_id) > 0
    }

    pub fn api_item(&self, thread_id: u64, index: usize) -> Option<ItemId> {
        self.cpu_items.get(&thread_id)?.get(index).copied()
    }

    pub fn perf_marker_item(&self, thread_id: u64, index: usize) -> Option<ItemId> {
        self.perf_markers.get(&thread_id)?.get(index).copied()
    }

    pub fn root_item(&self, thread_id: u64) -> Option<ItemId> {
        self.thread_roots.get(&thread_id).copied()
    }

    pub fn queues_count(&self) -> usize {
        self.queue_items.len()
    }

    pub fn queue_name(&self, index: usize) -> Option<&str> {
        self.queue_items.keys().nth(index).map(String::as_str)
    }

    pub fn queue_items_count(&self, queue_name: &str) -> usize {
        self.queue_items.get(queue_name).map_or(0, Vec::len)
    }

    pub fn queue_item(&self, queue_name: &str, index: usize) -> Option<ItemId> {
        self.queue_items.get(queue_name)?.get(index).copied()
    }

    /// The queue item whose call-sequence index is `seq_id`.
    pub fn queue_item_by_call_index(&self, queue_name: &str, seq_id: u32) -> Option<ItemId> {
        self.queue_items
            .get(queue_name)?
            .iter()
            .copied()
            .find(|id| self.items[id.index()].call_index == seq_id)
    }

    pub fn queue_type(&self, queue_name: &str) -> Option<u32> {
        self.queue_types.get(queue_name).copied()
    }

    pub fn cpu_items_by_sample_id(&self, sample_id: u64) -> &[ItemId] {
        self.sample_to_cpu
            .get(&sample_id)
            .map_or(&[], Vec::as_slice)
    }

    pub fn gpu_items_by_sample_id(&self, sample_id: u64) -> &[ItemId] {
        self.sample_to_gpu
            .get(&sample_id)
            .map_or(&[], Vec::as_slice)
    }

    pub fn command_list_instances(&self) -> &[CommandListInstance] {
        &self.command_list_instances
    }

    pub fn unattached_calls(&self) -> &[ItemId] {
        &self.unattached_calls
    }

    /// `(min_start, max_end)` over all items, fixed by finalization. `(0, 0)`
    /// before finalization or for an empty session.
    pub fn session_time_range(&self) -> (u64, u64) {
        self.session_time_range.unwrap_or((0, 0))
    }

    pub fn symbol_info(&self, thread_id: u64, call_index: usize) -> Option<&SymbolEntry> {
        self.symbols.entry(thread_id, call_index)
    }

    pub fn session_has_symbol_information(&self) -> bool {
        !self.symbols.is_empty()
    }

    pub fn occupancy_info_for_item(&self, id: ItemId) -> Option<&OccupancyInfo> {
        let item = self.item(id)?;
        self.occupancy.find(item.thread_id, item.occupancy?)
    }

    // ---- search ----

    /// First item in start-time order whose display columns contain `needle`.
    /// Resets the find-next cursor.
    pub fn find_item(&mut self, needle: &str, case_sensitive: bool) -> Option<ItemId> {
        self.last_search = needle.to_string();
        self.last_find_start = None;
        self.find_from(None, needle, case_sensitive)
    }

    /// Next match strictly after the previous hit's start time. Restarts from
    /// the beginning when the needle changes or the previous scan ran off the
    /// end.
    pub fn find_next_item(&mut self, needle: &str, case_sensitive: bool) -> Option<ItemId> {
        if self.last_search != needle {
            self.last_search = needle.to_string();
            self.last_find_start = None;
        }
        let found = self.find_from(self.last_find_start, needle, case_sensitive);
        if found.is_none() {
            self.last_find_start = None;
        }
        found
    }

    fn find_from(
        &mut self,
        after: Option<u64>,
        needle: &str,
        case_sensitive: bool,
    ) -> Option<ItemId> {
        let lower = match after {
            Some(t) => Bound::Excluded(t),
            None => Bound::Unbounded,
        };
        let mut hit = None;
        'scan: for (&start, ids) in self.items_by_start.range((lower, Bound::Unbounded)) {
            for &id in ids {
                if self.items[id.index()].matches(needle, case_sensitive) {
                    hit = Some((start, id));
                    break 'scan;
                }
            }
        }
        if let Some((start, id)) = hit {
            self.last_find_start = Some(start);
            return Some(id);
        }
        None
    }

    /// Drop every item and index and return to the pre-ingestion state.
    pub fn clear(&mut self) {
        *self = SessionDataContainer::default();
    }
}
