//! Caseboard Render Library
//!
//! Scene building for boards and PNG export of the rendered scene.

pub mod board_scene;
pub mod export;
pub mod scene;
pub mod style;

pub use board_scene::{SCENE_MARGIN, build_scene, state_class};
pub use export::{
    DEFAULT_FILENAME, DownloadSink, ExportError, ExportOptions, ExportReceipt, ExportResult,
    Exporter, FileDownload, MemoryDownload, ObjectUrl, ObjectUrls, png_filename,
};
pub use scene::{Element, Scene, VIEWPORT_ID};
pub use style::{RenderStyle, StyleError, StyleOrigin, StyleSheet, inline_rules};
