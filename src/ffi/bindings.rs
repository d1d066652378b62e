#![allow(non_camel_case_types)]

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h

pub const PERF_TYPE_HARDWARE: u32 = 0;
pub const PERF_TYPE_SOFTWARE: u32 = 1;

pub const PERF_COUNT_HW_CPU_CYCLES: u64 = 0;
pub const PERF_COUNT_HW_INSTRUCTIONS: u64 = 1;
pub const PERF_COUNT_HW_CACHE_REFERENCES: u64 = 2;
pub const PERF_COUNT_HW_CACHE_MISSES: u64 = 3;
pub const PERF_COUNT_HW_BRANCH_INSTRUCTIONS: u64 = 4;
pub const PERF_COUNT_HW_BRANCH_MISSES: u64 = 5;
pub const PERF_COUNT_HW_BUS_CYCLES: u64 = 6;
pub const PERF_COUNT_HW_REF_CPU_CYCLES: u64 = 9;

pub const PERF_COUNT_SW_CPU_CLOCK: u64 = 0;
pub const PERF_COUNT_SW_TASK_CLOCK: u64 = 1;

pub const PERF_SAMPLE_IP: u64 = 1 << 0;

pub const PERF_FORMAT_TOTAL_TIME_ENABLED: u64 = 1 << 0;
pub const PERF_FORMAT_TOTAL_TIME_RUNNING: u64 = 1 << 1;

pub const PERF_FLAG_FD_CLOEXEC: u64 = 1 << 3;

pub const PERF_RECORD_LOST: u32 = 2;
pub const PERF_RECORD_SAMPLE: u32 = 9;

// enum perf_ioc_ops, expanded from the `_IO('$', n)` macros.
pub const PERF_IOC_OP_ENABLE: u64 = 0x2400;
pub const PERF_IOC_OP_DISABLE: u64 = 0x2401;
pub const PERF_IOC_OP_REFRESH: u64 = 0x2402;
pub const PERF_IOC_OP_RESET: u64 = 0x2403;

// Not available in the libc crate.
pub const F_SETSIG: i32 = 10;
pub const F_SETOWN_EX: i32 = 15;
pub const F_OWNER_TID: i32 = 0;
// si_code values for SIGPOLL.
pub const POLL_IN: i32 = 1;
pub const POLL_HUP: i32 = 6;

// Only read by the kernel.
#[allow(dead_code)]
#[repr(C)]
pub struct f_owner_ex {
    pub type_: i32,
    pub pid: libc::pid_t,
}

macro_rules! flags {
    ($($set:ident = $bit:literal,)+) => {
        impl perf_event_attr {
            $(
            pub fn $set(&mut self, val: u64) {
                self.flags = (self.flags & !(1 << $bit)) | ((val & 1) << $bit);
            }
            )+
        }
    };
}

// struct perf_event_attr, PERF_ATTR_SIZE_VER8.
// The unions collapse to their first member since they share a layout.
#[allow(dead_code)]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct perf_event_attr {
    pub type_: u32,
    pub size: u32,
    pub config: u64,
    pub sample_period: u64, // sample_freq
    pub sample_type: u64,
    pub read_format: u64,
    pub flags: u64,
    pub wakeup_events: u32, // wakeup_watermark
    pub bp_type: u32,
    pub config1: u64,
    pub config2: u64,
    pub branch_sample_type: u64,
    pub sample_regs_user: u64,
    pub sample_stack_user: u32,
    pub clockid: i32,
    pub sample_regs_intr: u64,
    pub aux_watermark: u32,
    pub sample_max_stack: u16,
    pub __reserved_2: u16,
    pub aux_sample_size: u32,
    pub aux_action: u32,
    pub sig_data: u64,
    pub config3: u64,
}

flags! {
    set_disabled = 0,
    set_exclude_kernel = 5,
    set_exclude_hv = 6,
    set_mmap = 8,
}

#[allow(dead_code)]
#[repr(C)]
pub struct perf_event_mmap_page {
    pub version: u32,
    pub compat_version: u32,
    pub lock: u32,
    pub index: u32,
    pub offset: i64,
    pub time_enabled: u64,
    pub time_running: u64,
    pub capabilities: u64,
    pub pmc_width: u16,
    pub time_shift: u16,
    pub time_mult: u32,
    pub time_offset: u64,
    pub time_zero: u64,
    pub size: u32,
    pub __reserved_1: u32,
    pub time_cycles: u64,
    pub time_mask: u64,
    pub __reserved: [u8; 116 * 8],
    pub data_head: u64,
    pub data_tail: u64,
    pub data_offset: u64,
    pub data_size: u64,
    pub aux_head: u64,
    pub aux_tail: u64,
    pub aux_offset: u64,
    pub aux_size: u64,
}

// struct perf_event_header
#[allow(dead_code)]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct perf_event_header {
    pub type_: u32,
    pub misc: u16,
    pub size: u16,
}

#[cfg(test)]
mod test {
    use std::mem::offset_of;

    use super::*;

    #[test]
    fn test_attr_layout() {
        assert_eq!(size_of::<perf_event_attr>(), 136);
        assert_eq!(offset_of!(perf_event_attr, flags), 40);
        assert_eq!(offset_of!(perf_event_attr, wakeup_events), 48);
        assert_eq!(offset_of!(perf_event_attr, config3), 128);
    }

    #[test]
    fn test_mmap_page_layout() {
        assert_eq!(offset_of!(perf_event_mmap_page, data_head), 1024);
        assert_eq!(offset_of!(perf_event_mmap_page, data_tail), 1032);
    }

    #[test]
    fn test_flag_setters() {
        let mut attr = perf_event_attr::default();
        attr.set_disabled(1);
        attr.set_exclude_kernel(1);
        attr.set_exclude_hv(1);
        assert_eq!(attr.flags, 0b110_0001);
        attr.set_disabled(0);
        assert_eq!(attr.flags, 0b110_0000);
    }
}
