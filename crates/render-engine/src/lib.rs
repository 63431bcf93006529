//! dispviz Render Engine
//!
//! Offline pipeline that turns a sample table into an animated
//! displacement video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! input.csv ── SampleTable ──┬── AxisBounds ──┐
//!                            │                ├── Scene (2×2 grid, markers at frame 0)
//! ChannelSelection ──────────┘                │          │
//!                                             │          ├── Compositor (static background, once)
//!                                             │          │
//! Animation (frame 0..N) ── FrameUpdate ──────┴── Scene::apply ── Compositor::render
//!                                                                        │
//!                                                                        ▼
//!                                                         RenderBackend (ffmpeg / raw)
//!                                                                        │
//!                                                                        ▼
//!                                                                    sim.mp4
//! ```

pub mod animation;
pub mod compositor;
pub mod export;
pub mod layout;

pub use animation::*;
pub use export::*;
pub use layout::*;
