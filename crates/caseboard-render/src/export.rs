//! PNG export of a rendered board.
//!
//! The scene is copied with the camera reset, wrapped in an SVG document
//! together with the readable stylesheet rules, decoded, rasterized at a
//! fixed pixel ratio over an opaque background, encoded as PNG and handed
//! to a [`DownloadSink`].

use crate::scene::{Scene, svg_document};
use crate::style::{StyleSheet, inline_rules};
use kurbo::Size;
use peniko::Color;
use resvg::tiny_skia::{self, Pixmap};
use resvg::usvg;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Filename used when none is given.
pub const DEFAULT_FILENAME: &str = "board.png";

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("An export is already in progress")]
    Busy,
    #[error("Nothing to export: {width}x{height} surface")]
    EmptySurface { width: f64, height: f64 },
    #[error("Failed to decode the exported image: {0}")]
    Decode(String),
    #[error("Failed to allocate a {width}x{height} raster surface")]
    Surface { width: u32, height: u32 },
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
    #[error("Download failed: {0}")]
    Download(#[from] std::io::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Export settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Device pixels per canvas unit.
    pub pixel_ratio: f64,
    /// Smallest raster produced, in device pixels.
    pub min_size: Size,
    /// Fill beneath the content. Always made opaque.
    pub background: Color,
    /// Load system fonts so node titles and labels are drawn.
    pub load_system_fonts: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: 2.0,
            min_size: Size::new(800.0, 600.0),
            background: Color::WHITE,
            load_system_fonts: true,
        }
    }
}

impl ExportOptions {
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    pub fn with_min_size(mut self, size: Size) -> Self {
        self.min_size = size;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_system_fonts(mut self, load: bool) -> Self {
        self.load_system_fonts = load;
        self
    }
}

/// Append `.png` unless present; empty names fall back to [`DEFAULT_FILENAME`].
pub fn png_filename(name: Option<&str>) -> String {
    match name.map(str::trim) {
        None | Some("") => DEFAULT_FILENAME.to_string(),
        Some(name) if name.to_ascii_lowercase().ends_with(".png") => name.to_string(),
        Some(name) => format!("{name}.png"),
    }
}

#[derive(Debug, Default)]
struct UrlTable {
    next_id: u64,
    live: HashSet<String>,
}

/// Registry of temporary object URLs for in-memory blobs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrls {
    table: Arc<Mutex<UrlTable>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UrlTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `data`; the URL is revoked when the handle drops.
    pub fn create(&self, mime: &str, data: impl Into<Arc<[u8]>>) -> ObjectUrl {
        let mut table = self.lock();
        table.next_id += 1;
        let url = format!("blob:caseboard/{}", table.next_id);
        table.live.insert(url.clone());
        log::debug!("created {url} ({mime})");
        ObjectUrl {
            url,
            mime: mime.to_string(),
            data: data.into(),
            registry: self.clone(),
        }
    }

    /// Whether `url` has not been revoked yet.
    pub fn is_live(&self, url: &str) -> bool {
        self.lock().live.contains(url)
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().live.remove(url) {
            log::debug!("revoked {url}");
        }
    }
}

/// Handle to a registered object URL and the blob behind it.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    mime: String,
    data: Arc<[u8]>,
    registry: ObjectUrls,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

/// Destination of an exported file.
pub trait DownloadSink {
    /// Deliver the blob behind `url` under `filename`, returning where it
    /// went. The URL is revoked once this returns.
    fn download(&self, filename: &str, url: &ObjectUrl) -> std::io::Result<String>;
}

/// Writes downloads into a directory.
#[derive(Debug, Clone)]
pub struct FileDownload {
    dir: PathBuf,
}

impl FileDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl DownloadSink for FileDownload {
    fn download(&self, filename: &str, url: &ObjectUrl) -> std::io::Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        // Only the final path component is honoured.
        let name = std::path::Path::new(filename)
            .file_name()
            .map_or_else(|| DEFAULT_FILENAME.into(), |n| n.to_os_string());
        let path = self.dir.join(name);
        std::fs::write(&path, url.bytes())?;
        Ok(path.display().to_string())
    }
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemoryDownload {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryDownload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DownloadSink for MemoryDownload {
    fn download(&self, filename: &str, url: &ObjectUrl) -> std::io::Result<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filename.to_string(), url.bytes().to_vec()));
        Ok(format!("memory://{filename}"))
    }
}

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes.
    pub size: usize,
    pub location: String,
}

/// Clears the busy flag when an export ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs PNG exports, one at a time.
#[derive(Debug, Default)]
pub struct Exporter {
    options: ExportOptions,
    urls: ObjectUrls,
    busy: AtomicBool,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            urls: ObjectUrls::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Temporary URLs used by exports.
    pub fn urls(&self) -> &ObjectUrls {
        &self.urls
    }

    /// Whether an export is running; the trigger should be disabled.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export `scene` as a PNG and deliver it to `sink`.
    pub fn export(
        &self,
        scene: &Scene,
        sheets: &[StyleSheet],
        sink: &dyn DownloadSink,
        filename: Option<&str>,
    ) -> ExportResult<ExportReceipt> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ExportError::Busy)?;
        let filename = png_filename(filename);

        let ratio = self.options.pixel_ratio;
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(ExportError::EmptySurface {
                width: 0.0,
                height: 0.0,
            });
        }
        let floor = Size::new(
            self.options.min_size.width / ratio,
            self.options.min_size.height / ratio,
        );
        let region = scene.measure(floor);
        let (width, height) = (
            device_pixels(region.width(), ratio),
            device_pixels(region.height(), ratio),
        );
        if !(width >= 1.0 && height >= 1.0) {
            return Err(ExportError::EmptySurface {
                width: region.width(),
                height: region.height(),
            });
        }
        let (width, height) = (width as u32, height as u32);
        log::debug!("exporting {region:?} at {ratio}x -> {width}x{height}");

        let content = scene.detached_copy();
        let svg = svg_document(&content, region, &inline_rules(sheets));
        let svg_url = self.urls.create("image/svg+xml", svg.into_bytes());
        let tree = self.decode(&svg_url)?;
        drop(svg_url);

        let pixmap = self.rasterize(&tree, width, height)?;
        let png = encode_png(&pixmap)?;
        let size = png.len();
        let png_url = self.urls.create("image/png", png);
        let location = sink.download(&filename, &png_url)?;

        log::info!("exported {filename} ({width}x{height}, {size} bytes) to {location}");
        Ok(ExportReceipt {
            filename,
            width,
            height,
            size,
            location,
        })
    }

    fn decode(&self, url: &ObjectUrl) -> ExportResult<usvg::Tree> {
        let mut options = usvg::Options::default();
        if self.options.load_system_fonts {
            options.fontdb_mut().load_system_fonts();
        }
        usvg::Tree::from_data(url.bytes(), &options).map_err(|e| ExportError::Decode(e.to_string()))
    }

    fn rasterize(&self, tree: &usvg::Tree, width: u32, height: u32) -> ExportResult<Pixmap> {
        let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Surface { width, height })?;
        let bg = self.options.background.to_rgba8();
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, 255));
        let scale = self.options.pixel_ratio as f32;
        resvg::render(
            tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

/// Whole device pixels covering `len` canvas units.
fn device_pixels(len: f64, ratio: f64) -> f64 {
    // Absorb rounding noise from rect arithmetic before rounding up.
    (len * ratio - 1e-6).ceil()
}

/// Encode a pixmap as 8-bit RGBA PNG.
fn encode_png(pixmap: &Pixmap) -> ExportResult<Vec<u8>> {
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Element;
    use kurbo::Rect;

    fn exporter() -> Exporter {
        Exporter::new(ExportOptions::default().with_system_fonts(false))
    }

    fn scene(bounds: Rect) -> Scene {
        Scene::new(
            Element::new("g").with_child(
                Element::new("rect")
                    .with_attr("x", bounds.x0)
                    .with_attr("y", bounds.y0)
                    .with_attr("width", 10)
                    .with_attr("height", 10),
            ),
            bounds,
        )
    }

    #[test]
    fn test_png_filename() {
        assert_eq!(png_filename(None), "board.png");
        assert_eq!(png_filename(Some("  ")), "board.png");
        assert_eq!(png_filename(Some("case-12")), "case-12.png");
        assert_eq!(png_filename(Some("Case.PNG")), "Case.PNG");
    }

    #[test]
    fn test_object_url_released_on_drop() {
        let urls = ObjectUrls::new();
        let url = urls.create("text/plain", b"hi".to_vec());
        assert_eq!(url.bytes(), b"hi");
        assert_eq!(url.mime_type(), "text/plain");
        let name = url.as_str().to_string();
        assert!(urls.is_live(&name));
        drop(url);
        assert_eq!(urls.live_count(), 0);
        assert!(!urls.is_live(&name));
    }

    #[test]
    fn test_small_scene_is_floored() {
        let sink = MemoryDownload::new();
        let receipt = exporter()
            .export(&scene(Rect::new(0.0, 0.0, 50.0, 40.0)), &[], &sink, None)
            .unwrap();
        assert_eq!((receipt.width, receipt.height), (800, 600));
        assert_eq!(receipt.filename, "board.png");
    }

    #[test]
    fn test_large_scene_scaled() {
        let sink = MemoryDownload::new();
        let receipt = exporter()
            .export(&scene(Rect::new(-100.0, 0.0, 900.0, 350.0)), &[], &sink, Some("big"))
            .unwrap();
        assert_eq!((receipt.width, receipt.height), (2000, 700));
        assert_eq!(sink.files()[0].0, "big.png");
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let exporter = Exporter::new(
            ExportOptions::default()
                .with_pixel_ratio(0.0)
                .with_system_fonts(false),
        );
        let result = exporter.export(
            &scene(Rect::new(0.0, 0.0, 10.0, 10.0)),
            &[],
            &MemoryDownload::new(),
            None,
        );
        assert!(matches!(result, Err(ExportError::EmptySurface { .. })));
        assert!(!exporter.is_busy());
    }

    #[test]
    fn test_empty_scene_without_floor_rejected() {
        let exporter = Exporter::new(
            ExportOptions::default()
                .with_min_size(Size::ZERO)
                .with_system_fonts(false),
        );
        let result = exporter.export(&scene(Rect::ZERO), &[], &MemoryDownload::new(), None);
        assert!(matches!(result, Err(ExportError::EmptySurface { .. })));
    }
}
