//! Camera registry contract
//!
//! The supervisor resolves cameras through [`CameraRegistry`] on every
//! operation, so a registry may reload its configuration at any time.

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    build_source_url, mask_credentials, output_base_name, CameraDescriptor, CameraId, CameraKind,
    Credentials, StreamLimits,
};
pub use registry::{parse_list, CameraRegistry, CameraSettings, StaticRegistry};
