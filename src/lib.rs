pub mod audit;
pub mod changes;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod persist;
pub mod ports;

pub use audit::{Violation, audit};
pub use changes::{CascadeReport, Changeset};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{CanvasConfig, load_config};
pub use error::{CanvasError, StoreError};
pub use interaction::{Canvas, ResizeSession};
pub use layout::{LayoutResult, layout, layout_with_groups};
pub use model::{BlockGroup, Edge, Endpoint, Step, StepType, Workflow};
pub use persist::{PersistReport, WorkflowStore, persist};
pub use ports::{PortCatalog, PortProvider};
