//! Boot descriptor read by the platform loader before this core starts.
//!
//! The loader only looks at the header. Version 1 with zero entries asks for
//! no carveouts, trace buffers or vrings.

/// Resource table header with room for one entry offset.
#[repr(C)]
pub struct ResourceTable {
    pub version: u32,
    pub num: u32,
    pub reserved: [u32; 2],
    pub offset: [u32; 1],
}

impl ResourceTable {
    pub const fn empty() -> Self {
        Self {
            version: 1,
            num: 0,
            reserved: [0; 2],
            offset: [0; 1],
        }
    }
}

#[used]
#[no_mangle]
#[cfg_attr(all(target_arch = "arm", target_os = "none"), link_section = ".resource_table")]
pub static RESOURCE_TABLE: ResourceTable = ResourceTable::empty();
