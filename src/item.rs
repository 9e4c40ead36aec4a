//! Session items: the nodes of the reconstructed timeline tree.
//!
//! Items live in a single append-only arena owned by the container. Every
//! link between items (parent, child, GPU owner) is an [`ItemId`] index into
//! that arena, so teardown order never matters and no link can dangle while
//! the session is alive.

use crate::record::{ApiFamily, CommandListOp, TimeUnit};

/// Index of a [`SessionItem`] in the container's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A CPU-side API call.
    Api,
    /// A GPU-side execution record.
    Gpu,
    /// A performance marker region.
    Marker,
    /// The synthetic per-thread root. Never matches content queries.
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemType {
    pub family: ApiFamily,
    pub kind: ItemKind,
}

impl ItemType {
    pub fn new(family: ApiFamily, kind: ItemKind) -> Self {
        ItemType { family, kind }
    }

    pub fn root() -> Self {
        ItemType {
            family: ApiFamily::Unknown,
            kind: ItemKind::Root,
        }
    }
}

/// One node of the reconstructed session tree.
#[derive(Debug, Clone)]
pub struct SessionItem {
    pub item_type: ItemType,
    pub thread_id: u64,
    /// Raw timestamps in `unit`. Never rescaled after ingestion.
    pub start: u64,
    pub end: u64,
    pub unit: TimeUnit,
    /// Call-sequence index within the thread (CPU) or queue (GPU).
    pub call_index: u32,
    /// Last call index covered by this item. Equal to `call_index` for leaf
    /// items; widened for markers that contain calls.
    pub end_index: u32,
    pub name: String,
    pub args: String,
    pub sample_id: Option<u64>,
    /// Queue / command-buffer name for GPU items.
    pub queue_name: Option<String>,
    /// Display name of the containing command-list instance, set during
    /// finalization.
    pub command_list: Option<String>,
    /// Pointer identity of the command list this GPU record was issued on.
    pub command_list_ptr: Option<String>,
    /// Begin/End/Other lifecycle tag for command-list partitioning.
    pub list_op: CommandListOp,
    /// The CPU call that issued this GPU item. Non-owning back-reference.
    pub owner: Option<ItemId>,
    /// GPU items issued by this CPU call. Filled during finalization.
    pub gpu_items: Vec<ItemId>,
    pub parent: Option<ItemId>,
    pub children: Vec<ItemId>,
    /// Positional index into the thread's occupancy record list.
    pub occupancy: Option<usize>,
    /// Set once `update_indices` has adopted a first covered range; until
    /// then `call_index`/`end_index` hold meaningless defaults for markers.
    pub(crate) index_range_set: bool,
}

impl SessionItem {
    pub fn new(item_type: ItemType, thread_id: u64, start: u64, end: u64, unit: TimeUnit) -> Self {
        // A corrupt record can report end before start; clamp rather than
        // carry a negative-duration item through finalization.
        let end = if end < start {
            tracing::warn!(start, end, "item end time precedes start time, clamping");
            start
        } else {
            end
        };
        SessionItem {
            item_type,
            thread_id,
            start,
            end,
            unit,
            call_index: 0,
            end_index: 0,
            name: String::new(),
            args: String::new(),
            sample_id: None,
            queue_name: None,
            command_list: None,
            command_list_ptr: None,
            list_op: CommandListOp::Other,
            owner: None,
            gpu_items: Vec::new(),
            parent: None,
            children: Vec::new(),
            occupancy: None,
            index_range_set: false,
        }
    }

    pub fn root(thread_id: u64, family: ApiFamily) -> Self {
        SessionItem::new(
            ItemType::new(family, ItemKind::Root),
            thread_id,
            0,
            0,
            TimeUnit::default(),
        )
    }

    pub fn is_root(&self) -> bool {
        self.item_type.kind == ItemKind::Root
    }

    pub fn is_gpu(&self) -> bool {
        self.item_type.kind == ItemKind::Gpu
    }

    pub fn is_marker(&self) -> bool {
        self.item_type.kind == ItemKind::Marker
    }

    pub fn start_time_millis(&self) -> f64 {
        self.unit.to_millis(self.start)
    }

    pub fn end_time_millis(&self) -> f64 {
        self.unit.to_millis(self.end)
    }

    /// Widen this item's covered call-index range to include `[first, last]`.
    /// Used when markers adopt API calls during the merge pass. The first
    /// update defines the range; later ones min/max against it.
    pub fn update_indices(&mut self, first: u32, last: u32) {
        if self.index_range_set {
            self.call_index = self.call_index.min(first);
            self.end_index = self.end_index.max(last);
        } else {
            self.call_index = first;
            self.end_index = last;
            self.index_range_set = true;
        }
    }

    /// Substring match against the item's display columns. Roots are
    /// structural and never match.
    pub fn matches(&self, needle: &str, case_sensitive: bool) -> bool {
        if self.is_root() || needle.is_empty() {
            return false;
        }
        let contains = |hay: &str| {
            if case_sensitive {
                hay.contains(needle)
            } else {
                hay.to_lowercase().contains(&needle.to_lowercase())
            }
        };
        contains(&self.name)
            || contains(&self.args)
            || self.queue_name.as_deref().is_some_and(contains)
            || self.command_list.as_deref().is_some_and(contains)
    }
}
