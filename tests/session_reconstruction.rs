//! End-to-end tests for trace session reconstruction.
//!
//! These drive the full pipeline the way the .atp parser does: typed records
//! pushed through the ingestion listener, finalization, then queries against
//! the reconstructed session.

use std::io::Write;

use gputrace::ingest::{CancellationToken, TraceIngestListener};
use gputrace::record::{
    ClApiInfo, CommandListOp, Dx12ApiInfo, Dx12GpuInfo, PerfMarkerEntry, PerfMarkerType,
    SymbolFileEntry, TraceRecord,
};

fn cl_call(tid: u64, seq: u32, name: &str, start: u64, end: u64) -> TraceRecord {
    TraceRecord::ClApi(ClApiInfo {
        thread_id: tid,
        seq_id: seq,
        name: name.to_string(),
        start,
        end,
        ..Default::default()
    })
}

fn marker(tid: u64, ty: PerfMarkerType, ts: u64, name: &str) -> TraceRecord {
    TraceRecord::PerfMarker(PerfMarkerEntry {
        marker_type: ty,
        thread_id: tid,
        timestamp: ts,
        name: name.to_string(),
        group: String::new(),
    })
}

fn dx12_api(tid: u64, seq: u32, name: &str, start: u64, end: u64, sample: Option<u64>) -> TraceRecord {
    TraceRecord::Dx12Api(Dx12ApiInfo {
        thread_id: tid,
        seq_id: seq,
        name: name.to_string(),
        start,
        end,
        sample_id: sample,
        ..Default::default()
    })
}

fn dx12_gpu(
    seq: u32,
    name: &str,
    start: u64,
    end: u64,
    sample: Option<u64>,
    queue: &str,
    ptr: &str,
    op: CommandListOp,
) -> TraceRecord {
    TraceRecord::Dx12Gpu(Dx12GpuInfo {
        thread_id: 1,
        seq_id: seq,
        name: name.to_string(),
        start,
        end,
        sample_id: sample,
        queue_name: queue.to_string(),
        command_list_ptr: ptr.to_string(),
        list_op: op,
        ..Default::default()
    })
}

fn ingest(records: Vec<TraceRecord>) -> gputrace::SessionDataContainer {
    let mut listener = TraceIngestListener::new(CancellationToken::new());
    for record in records {
        listener.on_parse(record);
    }
    listener.finish()
}

#[test]
fn test_plain_cpu_thread() {
    // Three CPU calls on one thread, no markers, no GPU work.
    let session = ingest(vec![
        cl_call(7, 0, "clCreateBuffer", 0, 5),
        cl_call(7, 1, "clEnqueueWriteBuffer", 10, 15),
        cl_call(7, 2, "clFinish", 20, 25),
    ]);

    assert_eq!(session.threads_count(), 1);
    assert_eq!(session.thread_id(0), Some(7));
    assert_eq!(session.thread_api_count(7), 3);
    let second = session.api_item(7, 1).unwrap();
    assert_eq!(session.item(second).unwrap().name, "clEnqueueWriteBuffer");
    assert_eq!(session.item(second).unwrap().call_index, 1);
}

#[test]
fn test_cpu_item_order_matches_ingestion() {
    // Per-thread call order is ingestion order, non-decreasing seq.
    let mut records = Vec::new();
    for seq in 0..50u32 {
        records.push(cl_call(3, seq, "clSetKernelArg", seq as u64 * 2, seq as u64 * 2 + 1));
    }
    let session = ingest(records);

    let mut last = None;
    for index in 0..session.thread_api_count(3) {
        let id = session.api_item(3, index).unwrap();
        let seq = session.item(id).unwrap().call_index;
        if let Some(prev) = last {
            assert!(seq >= prev, "call order regressed at index {index}");
        }
        last = Some(seq);
    }
}

#[test]
fn test_marker_wraps_contained_call() {
    // Marker at [10,20] around a call at [12,15] becomes its parent.
    let session = ingest(vec![
        marker(1, PerfMarkerType::Begin, 10, "frame"),
        cl_call(1, 0, "clEnqueueNDRangeKernel", 12, 15),
        marker(1, PerfMarkerType::End, 20, "frame"),
    ]);

    let root = session.root_item(1).unwrap();
    let root_item = session.item(root).unwrap();
    assert_eq!(root_item.children.len(), 1);

    let marker_item = session.item(root_item.children[0]).unwrap();
    assert_eq!((marker_item.start, marker_item.end), (10, 20));
    assert_eq!(marker_item.children.len(), 1);

    let call = session.item(marker_item.children[0]).unwrap();
    assert_eq!(call.name, "clEnqueueNDRangeKernel");
    assert!(marker_item.start <= call.start && call.end <= marker_item.end);
}

#[test]
fn test_marker_nesting_contains_all_calls() {
    // Every call ingested between begin and end lands inside the marker
    // interval after finalization.
    let session = ingest(vec![
        marker(1, PerfMarkerType::Begin, 0, "load"),
        cl_call(1, 0, "clCreateContext", 1, 4),
        cl_call(1, 1, "clCreateCommandQueue", 5, 9),
        cl_call(1, 2, "clCreateProgramWithSource", 10, 19),
        marker(1, PerfMarkerType::End, 30, "load"),
        cl_call(1, 3, "clReleaseContext", 40, 45),
    ]);

    let root = session.root_item(1).unwrap();
    let children = &session.item(root).unwrap().children;
    assert_eq!(children.len(), 2);

    let marker_item = session.item(children[0]).unwrap();
    assert_eq!(marker_item.children.len(), 3);
    for &child in &marker_item.children {
        let call = session.item(child).unwrap();
        assert!(marker_item.start <= call.start);
        assert!(call.end <= marker_item.end);
    }
    // The call after the end record stays on the root.
    assert_eq!(session.item(children[1]).unwrap().name, "clReleaseContext");
}

#[test]
fn test_cpu_gpu_pairing_by_sample_id() {
    // ExecuteCommandLists with sample id 42 and a GPU record
    // with the same id end up linked both ways.
    let session = ingest(vec![
        dx12_api(1, 0, "ID3D12CommandQueue::ExecuteCommandLists", 0, 10, Some(42)),
        dx12_gpu(0, "DrawIndexedInstanced", 100, 150, Some(42), "Q0", "", CommandListOp::Other),
    ]);

    let cpu_ids = session.cpu_items_by_sample_id(42);
    assert_eq!(cpu_ids.len(), 1);
    let cpu = cpu_ids[0];
    assert_eq!(
        session.item(cpu).unwrap().name,
        "ID3D12CommandQueue::ExecuteCommandLists"
    );

    let gpu_ids = session.gpu_items_by_sample_id(42);
    assert_eq!(gpu_ids.len(), 1);
    assert_eq!(session.item(gpu_ids[0]).unwrap().owner, Some(cpu));
    assert_eq!(session.item(cpu).unwrap().gpu_items, gpu_ids);
}

#[test]
fn test_command_list_submitted_twice() {
    // Begin CL1, two draws, end CL1, submitted twice -> two
    // instances with instance indices 0 and 1, each covering its own draws.
    let mut records = Vec::new();
    let mut seq = 0u32;
    for _submission in 0..2 {
        for (name, op) in [
            ("BeginCommandList", CommandListOp::Begin),
            ("DrawInstanced", CommandListOp::Other),
            ("Dispatch", CommandListOp::Other),
            ("CloseCommandList", CommandListOp::End),
        ] {
            let start = seq as u64 * 100;
            records.push(dx12_gpu(seq, name, start, start + 50, Some(1000 + seq as u64), "Q0", "0xCL1", op));
            seq += 1;
        }
    }
    let session = ingest(records);

    let instances = session.command_list_instances();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].command_list_ptr, "0xCL1");
    assert_eq!(instances[1].command_list_ptr, "0xCL1");
    assert_eq!(instances[0].instance_index, 0);
    assert_eq!(instances[1].instance_index, 1);
    assert_eq!(instances[0].api_indices, vec![1, 2]);
    assert_eq!(instances[1].api_indices, vec![5, 6]);
}

#[test]
fn test_command_list_partition_has_no_overlap() {
    // Instances on the same queue never share covered call indices.
    let mut records = Vec::new();
    let mut seq = 0u32;
    for ptr in ["0xA", "0xB", "0xA"] {
        records.push(dx12_gpu(seq, "Begin", seq as u64 * 10, seq as u64 * 10 + 1, None, "Q0", ptr, CommandListOp::Begin));
        seq += 1;
        records.push(dx12_gpu(seq, "Draw", seq as u64 * 10, seq as u64 * 10 + 1, Some(seq as u64), "Q0", ptr, CommandListOp::Other));
        seq += 1;
        records.push(dx12_gpu(seq, "Close", seq as u64 * 10, seq as u64 * 10 + 1, None, "Q0", ptr, CommandListOp::End));
        seq += 1;
    }
    let session = ingest(records);

    let instances = session.command_list_instances();
    assert_eq!(instances.len(), 3);
    let mut seen = std::collections::HashSet::new();
    for instance in instances {
        for &index in &instance.api_indices {
            assert!(seen.insert(index), "call index {index} covered twice");
        }
    }
    // Second submission of 0xA is instance 1.
    assert_eq!(instances[2].command_list_ptr, "0xA");
    assert_eq!(instances[2].instance_index, 1);
}

#[test]
fn test_session_time_range_is_stable() {
    // The range equals min start / max end and does not change between
    // calls.
    let session = ingest(vec![
        marker(1, PerfMarkerType::Begin, 5, "m"),
        cl_call(1, 0, "clFinish", 10, 90),
        marker(1, PerfMarkerType::End, 95, "m"),
        dx12_gpu(0, "Draw", 40, 120, None, "Q0", "", CommandListOp::Other),
    ]);

    let first = session.session_time_range();
    assert_eq!(first, (5, 120));
    assert_eq!(session.session_time_range(), first);
}

#[test]
fn test_truncation_retains_ceiling_and_finalizes() {
    // Ingesting more records than the ceiling keeps exactly the ceiling
    // and finalization still succeeds.
    let ceiling = 100;
    let mut listener = TraceIngestListener::with_capacity(CancellationToken::new(), ceiling);
    for seq in 0..(ceiling as u32 * 3) {
        listener.on_parse(cl_call(1, seq, "clFlush", seq as u64, seq as u64 + 1));
    }
    assert!(listener.truncated());

    let session = listener.finish();
    assert!(session.is_finalized());
    assert_eq!(session.thread_api_count(1), ceiling);
    assert_eq!(session.session_time_range(), (0, ceiling as u64));
}

#[test]
fn test_empty_session() {
    // Zero records; everything stays empty, nothing crashes.
    let session = ingest(Vec::new());
    assert_eq!(session.session_time_range(), (0, 0));
    assert_eq!(session.threads_count(), 0);
    assert_eq!(session.queues_count(), 0);
    assert!(session.command_list_instances().is_empty());
}

#[test]
fn test_orphan_marker_end_is_ignored() {
    // An end with no begin creates nothing and later records on
    // the thread are unaffected.
    let session = ingest(vec![
        marker(4, PerfMarkerType::End, 10, "ghost"),
        cl_call(4, 0, "clFinish", 20, 25),
    ]);

    assert_eq!(session.thread_perf_markers_count(4), 0);
    assert_eq!(session.thread_api_count(4), 1);
    let root = session.root_item(4).unwrap();
    assert_eq!(session.item(root).unwrap().children.len(), 1);
}

#[test]
fn test_symbol_entries_follow_call_order() {
    let mut listener = TraceIngestListener::new(CancellationToken::new());
    listener.on_parse(cl_call(2, 0, "clCreateBuffer", 0, 1));
    listener.on_parse(TraceRecord::Symbol(SymbolFileEntry {
        thread_id: 2,
        api_name: "clCreateBuffer".to_string(),
        symbol_name: "init_buffers".to_string(),
        file_name: "bootstrap.cpp".to_string(),
        line_number: 88,
    }));
    let session = listener.finish();

    assert!(session.session_has_symbol_information());
    let entry = session.symbol_info(2, 0).unwrap();
    assert_eq!(entry.symbol_name, "init_buffers");
    assert_eq!(entry.line_number, 88);
    assert!(session.symbol_info(2, 1).is_none());
}

#[test]
fn test_occupancy_loaded_from_side_channel_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            "threads": [
                {
                    "thread_id": 6,
                    "kernels": [
                        {
                            "kernel_name": "mat_mul",
                            "device_name": "gfx1030",
                            "occupancy_pct": 95.0,
                            "wavefronts": 64,
                            "work_group_size": 256
                        }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();

    let mut listener = TraceIngestListener::new(CancellationToken::new());
    assert!(listener.container_mut().load_occupancy_file(file.path()));
    listener.on_parse(TraceRecord::ClApi(ClApiInfo {
        thread_id: 6,
        seq_id: 0,
        name: "clEnqueueNDRangeKernel".to_string(),
        start: 0,
        end: 10,
        is_enqueue: true,
        is_kernel_dispatch: true,
        device_name: "gfx1030".to_string(),
        queued: 0,
        submitted: 1,
        gpu_start: 2,
        gpu_end: 3,
        ..Default::default()
    }));
    let session = listener.finish();

    let dispatch = session.api_item(6, 0).unwrap();
    let info = session.occupancy_info_for_item(dispatch).unwrap();
    assert_eq!(info.kernel_name, "mat_mul");
    assert_eq!(info.occupancy_pct, 95.0);
}

#[test]
fn test_find_across_sessions_items() {
    let mut session = ingest(vec![
        cl_call(1, 0, "clEnqueueWriteBuffer", 0, 5),
        dx12_gpu(0, "DrawIndexedInstanced", 10, 20, None, "Q0", "", CommandListOp::Other),
        cl_call(1, 1, "clEnqueueReadBuffer", 30, 35),
    ]);

    let hit = session.find_item("Enqueue", true).unwrap();
    assert_eq!(session.item(hit).unwrap().name, "clEnqueueWriteBuffer");
    let hit = session.find_next_item("Enqueue", true).unwrap();
    assert_eq!(session.item(hit).unwrap().name, "clEnqueueReadBuffer");
    assert!(session.find_next_item("Enqueue", true).is_none());

    // Queue-name matches count as display columns too.
    assert!(session.find_item("Q0", true).is_some());
}
