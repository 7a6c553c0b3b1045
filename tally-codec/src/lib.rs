//! # tally-codec
//!
//! Pure transformations between the platform's API JSON and the portable,
//! file-shaped representation kept in the source-of-truth repository.
//!
//! Nothing in this crate touches the network or the filesystem: decompose
//! functions return metadata plus side files, recompose functions take them
//! back. Writing and reading those files is `tally-sync`'s job.
//!
//! - [`task`]: workflow task codec (embedded code split into side files)
//! - [`relink`]: task-id re-linking between environments
//! - [`linkage`]: portable (name keyed) workflow linkages
//! - [`workflow`]: whole-workflow export / deployable payload assembly
//! - [`billing`]: billing document template codec and request forms
//! - [`markup`]: locating page elements by `id`
//! - [`version`]: workflow version tagging

pub mod billing;
pub mod error;
pub mod linkage;
pub mod markup;
pub mod names;
pub mod relink;
pub mod task;
pub mod version;
pub mod warning;
pub mod workflow;

pub use error::CodecError;
pub use linkage::{ApiLinkage, PortableLinkage};
pub use names::validate_name;
pub use relink::TaskMaps;
pub use task::{ActionType, CodeExt, DecomposedTask, SideFile, TaskBody, TaskDefinition};
pub use version::next_version;
pub use warning::Warning;
pub use workflow::{PortableWorkflow, WorkflowExport};
