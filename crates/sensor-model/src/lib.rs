//! dispviz Sensor Model
//!
//! Defines the data contracts the renderer consumes:
//! - **Table:** Column-keyed displacement samples loaded from CSV
//! - **Channels:** Which columns are plotted, where, and how
//! - **Bounds:** The shared y-axis range across the selected channels
//!
//! The sample table is created once at load time and is read-only
//! afterwards; every other stage borrows it.

pub mod bounds;
pub mod channel;
pub mod table;

pub use bounds::*;
pub use channel::*;
pub use table::*;
