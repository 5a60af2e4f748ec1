//! Data models for the schedule catalog.

mod descriptor;
mod file_version;
mod resource;
mod tag;

pub use descriptor::{FileDescriptor, ScheduleKind};
pub use file_version::{FileVersion, NewVersion, StorageLocation};
pub use resource::{Resource, ResourceIdentity, ResourcePlan};
pub use tag::{Tag, TagCategory, UNDEFINED};
