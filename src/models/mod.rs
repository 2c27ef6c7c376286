//! # Platform Data Models
//!
//! Records returned by the labeling platform and the class/tag registry of a
//! project. Field names follow the platform's camelCase JSON.

pub mod entities;
pub mod labeling_queue;
pub mod project_meta;

pub use entities::{DatasetInfo, ProjectInfo, UserInfo};
pub use labeling_queue::{CreateQueueRequest, LabelingQueueInfo, QueueStatus};
pub use project_meta::{ObjClass, ProjectMeta, TagMeta};
