mod memory;
mod registry_index;

pub use memory::MemoryCatalog;
pub use registry_index::RegistryIndex;
