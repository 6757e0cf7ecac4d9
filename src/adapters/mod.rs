// Adapters layer: concrete implementations for external systems (storage, volume headers).

pub mod nifti_loader;
pub mod storage;
