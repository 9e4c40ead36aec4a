//! Command-list / command-buffer instance data.
//!
//! DX12 command lists and Vulkan command buffers are recorded once and may be
//! submitted several times in a session. Each submission observed on a queue
//! becomes one `CommandListInstance`; instances of the same list share its
//! pointer identity and are told apart by `instance_index`.

use std::collections::HashMap;

use crate::item::ItemId;

#[derive(Debug, Clone)]
pub struct CommandListInstance {
    /// Pointer-identity string of the recorded list / buffer.
    pub command_list_ptr: String,
    /// Queue the submission was observed on.
    pub queue_name: String,
    /// Zero-based submission counter for this pointer.
    pub instance_index: u32,
    pub start_time: u64,
    pub end_time: u64,
    /// Queue call-sequence indices covered by this submission, in order.
    pub api_indices: Vec<u32>,
    /// Items covered by this submission.
    pub items: Vec<ItemId>,
    /// First and last covered call index, `None` until a call is adopted.
    pub index_range: Option<(u32, u32)>,
}

impl CommandListInstance {
    pub fn open(command_list_ptr: String, queue_name: String, instance_index: u32) -> Self {
        CommandListInstance {
            command_list_ptr,
            queue_name,
            instance_index,
            start_time: u64::MAX,
            end_time: u64::MIN,
            api_indices: Vec::new(),
            items: Vec::new(),
            index_range: None,
        }
    }

    pub fn add_call(&mut self, id: ItemId, seq_id: u32, start: u64, end: u64) {
        self.api_indices.push(seq_id);
        self.items.push(id);
        self.index_range = Some(match self.index_range {
            None => (seq_id, seq_id),
            Some((first, last)) => (first.min(seq_id), last.max(seq_id)),
        });
        self.start_time = self.start_time.min(start);
        self.end_time = self.end_time.max(end);
    }
}

/// Allocates stable display names for command lists and their repeated
/// submissions. The first list seen becomes "CommandList1" (or
/// "CommandBuffer1" for Vulkan); resubmissions get an instance suffix.
#[derive(Debug, Default)]
pub struct CommandListNamer {
    pointer_to_index: HashMap<String, usize>,
}

impl CommandListNamer {
    pub fn name(&mut self, command_list_ptr: &str, instance_index: u32, is_buffer: bool) -> String {
        let next = self.pointer_to_index.len() + 1;
        let index = *self
            .pointer_to_index
            .entry(command_list_ptr.to_string())
            .or_insert(next);
        let base = if is_buffer {
            "CommandBuffer"
        } else {
            "CommandList"
        };
        if instance_index > 0 {
            format!("{base}{index}_Instance{instance_index}")
        } else {
            format!("{base}{index}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_tracks_range_and_times() {
        let mut inst = CommandListInstance::open("0xA".into(), "Q0".into(), 0);
        inst.add_call(ItemId(3), 4, 200, 250);
        inst.add_call(ItemId(4), 5, 100, 300);
        assert_eq!(inst.index_range, Some((4, 5)));
        assert_eq!(inst.start_time, 100);
        assert_eq!(inst.end_time, 300);
        assert_eq!(inst.api_indices, vec![4, 5]);
    }

    #[test]
    fn test_namer_is_stable_per_pointer() {
        let mut namer = CommandListNamer::default();
        assert_eq!(namer.name("0xA", 0, false), "CommandList1");
        assert_eq!(namer.name("0xB", 0, false), "CommandList2");
        assert_eq!(namer.name("0xA", 1, false), "CommandList1_Instance1");
        assert_eq!(namer.name("0xB", 0, true), "CommandBuffer2");
    }
}
