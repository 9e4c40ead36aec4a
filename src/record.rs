//! Parsed trace record model.
//!
//! These are the already-decoded records handed to us by the streaming .atp
//! parser. Each API family has its own info struct; `TraceRecord` is the
//! closed variant the ingestion listener dispatches on. Wire decoding happens
//! upstream and is not our concern.

/// Clock domain of a record's timestamps. GPU-vendor APIs (DX12, Vulkan, HSA
/// device side) report in microseconds, the legacy CPU-side APIs in
/// milliseconds. Stored values are never rescaled; conversion is display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Microseconds,
    Milliseconds,
}

impl TimeUnit {
    /// Convert a raw timestamp in this unit to milliseconds for display.
    pub fn to_millis(self, raw: u64) -> f64 {
        match self {
            TimeUnit::Microseconds => raw as f64 / 1000.0,
            TimeUnit::Milliseconds => raw as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiFamily {
    OpenCl,
    Hsa,
    Dx12,
    Vulkan,
    PerfMarker,
    #[default]
    Unknown,
}

/// Command-list lifecycle tag on a GPU trace record. `Begin`/`End` delimit
/// one recorded submission of a command list / command buffer; everything
/// observed between them on the same list pointer belongs to that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandListOp {
    Begin,
    End,
    #[default]
    Other,
}

/// One OpenCL host API call.
#[derive(Debug, Clone, Default)]
pub struct ClApiInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
    pub is_enqueue: bool,
    pub is_kernel_dispatch: bool,
    pub device_name: String,
    // Device-side timestamps for enqueue calls, used to keep the occupancy
    // cursor aligned when a dispatch reports garbage timing.
    pub queued: u64,
    pub submitted: u64,
    pub gpu_start: u64,
    pub gpu_end: u64,
}

/// GPU-side execution of an OpenCL enqueue, correlated by (thread, seq) to
/// the host call that issued it.
#[derive(Debug, Clone, Default)]
pub struct ClGpuInfo {
    pub thread_id: u64,
    pub owner_seq_id: u32,
    pub name: String,
    pub start: u64,
    pub end: u64,
}

/// One HSA host API call.
#[derive(Debug, Clone, Default)]
pub struct HsaApiInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
}

/// One HSA kernel dispatch observed on the device.
#[derive(Debug, Clone, Default)]
pub struct HsaGpuInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub kernel_name: String,
    pub start: u64,
    pub end: u64,
    pub sample_id: Option<u64>,
}

/// One DX12 host API call.
#[derive(Debug, Clone, Default)]
pub struct Dx12ApiInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
    pub sample_id: Option<u64>,
    pub interface_ptr: String,
}

/// One DX12 GPU-side record from the command-queue timeline.
#[derive(Debug, Clone, Default)]
pub struct Dx12GpuInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
    pub sample_id: Option<u64>,
    pub queue_name: String,
    pub command_list_ptr: String,
    pub command_list_type: u32,
    pub list_op: CommandListOp,
}

/// One Vulkan host API call.
#[derive(Debug, Clone, Default)]
pub struct VkApiInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
    pub sample_id: Option<u64>,
    pub interface_ptr: String,
}

/// One Vulkan GPU-side record from the queue timeline.
#[derive(Debug, Clone, Default)]
pub struct VkGpuInfo {
    pub thread_id: u64,
    pub seq_id: u32,
    pub name: String,
    pub args: String,
    pub start: u64,
    pub end: u64,
    pub sample_id: Option<u64>,
    pub queue_name: String,
    pub command_list_ptr: String,
    pub command_list_type: u32,
    pub list_op: CommandListOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfMarkerType {
    Begin,
    End,
}

/// A user-inserted begin/end annotation on the CPU timeline.
#[derive(Debug, Clone)]
pub struct PerfMarkerEntry {
    pub marker_type: PerfMarkerType,
    pub thread_id: u64,
    pub timestamp: u64,
    pub name: String,
    pub group: String,
}

/// One call-stack symbol entry, positional per thread.
#[derive(Debug, Clone, Default)]
pub struct SymbolFileEntry {
    pub thread_id: u64,
    pub api_name: String,
    pub symbol_name: String,
    pub file_name: String,
    pub line_number: u32,
}

/// The tagged variant the parser callback delivers.
#[derive(Debug, Clone)]
pub enum TraceRecord {
    ClApi(ClApiInfo),
    ClGpu(ClGpuInfo),
    HsaApi(HsaApiInfo),
    HsaGpu(HsaGpuInfo),
    Dx12Api(Dx12ApiInfo),
    Dx12Gpu(Dx12GpuInfo),
    VkApi(VkApiInfo),
    VkGpu(VkGpuInfo),
    PerfMarker(PerfMarkerEntry),
    Symbol(SymbolFileEntry),
}

impl TraceRecord {
    /// The timestamp used by the ingestion ceiling check. Symbol entries have
    /// no timing of their own.
    pub fn end_timestamp(&self) -> u64 {
        match self {
            TraceRecord::ClApi(i) => i.end,
            TraceRecord::ClGpu(i) => i.end,
            TraceRecord::HsaApi(i) => i.end,
            TraceRecord::HsaGpu(i) => i.end,
            TraceRecord::Dx12Api(i) => i.end,
            TraceRecord::Dx12Gpu(i) => i.end,
            TraceRecord::VkApi(i) => i.end,
            TraceRecord::VkGpu(i) => i.end,
            TraceRecord::PerfMarker(m) => m.timestamp,
            TraceRecord::Symbol(_) => u64::MAX,
        }
    }
}
