//! Export pipeline tests, decoding the produced PNGs.

use caseboard_core::{BoardDocument, BoardView, Camera, RecordRef};
use caseboard_render::{
    DownloadSink, Element, ExportError, ExportOptions, Exporter, FileDownload, MemoryDownload,
    ObjectUrl, ObjectUrls, RenderStyle, Scene, StyleSheet, build_scene,
};
use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use std::cell::RefCell;

struct Decoded {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Decoded {
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

fn decode(bytes: &[u8]) -> Decoded {
    let decoder = png::Decoder::new(bytes);
    let mut reader = decoder.read_info().unwrap();
    let mut rgba = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut rgba).unwrap();
    assert_eq!(info.color_type, png::ColorType::Rgba);
    rgba.truncate(info.buffer_size());
    Decoded {
        width: info.width,
        height: info.height,
        rgba,
    }
}

fn exporter() -> Exporter {
    Exporter::new(ExportOptions::default().with_system_fonts(false))
}

/// A 400x300 region holding one 100x100 box at the origin.
fn boxed_scene() -> Scene {
    let root = Element::new("g").with_child(
        Element::new("rect")
            .with_attr("class", "box")
            .with_attr("width", 100)
            .with_attr("height", 100),
    );
    Scene::new(root, Rect::new(0.0, 0.0, 400.0, 300.0))
}

fn red_box() -> StyleSheet {
    StyleSheet::same_origin([".box { fill: #ff0000; }"])
}

#[test]
fn region_is_rasterized_at_twice_its_size_over_opaque_background() {
    let exporter = Exporter::new(
        ExportOptions::default()
            .with_background(Color::from_rgba8(240, 240, 240, 255))
            .with_system_fonts(false),
    );
    let sink = MemoryDownload::new();

    let receipt = exporter
        .export(&boxed_scene(), &[red_box()], &sink, Some("case"))
        .unwrap();

    assert_eq!((receipt.width, receipt.height), (800, 600));
    let files = sink.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, "case.png");
    assert_eq!(receipt.size, files[0].1.len());

    let image = decode(&files[0].1);
    assert_eq!((image.width, image.height), (800, 600));
    assert!(image.rgba.chunks(4).all(|p| p[3] == 255));
    assert_eq!(image.pixel(100, 100), [255, 0, 0, 255]);
    assert_eq!(image.pixel(799, 599), [240, 240, 240, 255]);
    assert_eq!(exporter.urls().live_count(), 0);
    assert!(!exporter.is_busy());
}

#[test]
fn translucent_background_is_made_opaque() {
    let exporter = Exporter::new(
        ExportOptions::default()
            .with_background(Color::from_rgba8(0, 0, 255, 10))
            .with_system_fonts(false),
    );
    let sink = MemoryDownload::new();
    exporter.export(&boxed_scene(), &[], &sink, None).unwrap();

    let image = decode(&sink.files()[0].1);
    assert_eq!(image.pixel(700, 500), [0, 0, 255, 255]);
}

#[test]
fn cross_origin_stylesheets_are_skipped() {
    let sink = MemoryDownload::new();
    let sheets = [
        StyleSheet::cross_origin("https://cdn.example.com/theme.css"),
        red_box(),
    ];

    exporter().export(&boxed_scene(), &sheets, &sink, None).unwrap();

    let image = decode(&sink.files()[0].1);
    assert_eq!(image.pixel(50, 50), [255, 0, 0, 255]);
}

#[test]
fn malformed_styles_reject_the_export() {
    let exporter = exporter();
    let sink = MemoryDownload::new();
    let broken = StyleSheet::same_origin([".box { fill: red; } ]]><broken"]);

    let result = exporter.export(&boxed_scene(), &[broken], &sink, None);

    assert!(matches!(result, Err(ExportError::Decode(_))));
    assert!(sink.files().is_empty());
    assert_eq!(exporter.urls().live_count(), 0);
    assert!(!exporter.is_busy());
}

#[test]
fn export_ignores_the_camera() {
    let mut doc = BoardDocument::new(1, 1);
    doc.add_item(Point::new(0.0, 0.0), RecordRef::new(1, "evidence", "Knife"));
    doc.add_item(Point::new(260.0, 40.0), RecordRef::new(2, "suspect", "Ann"));
    doc.add_connection(1, 2, None);
    let view = BoardView::from_document(&doc);
    let sheets = [RenderStyle::default().stylesheet()];

    let mut camera = Camera::new();
    camera.pan(Vec2::new(-300.0, 120.0));
    camera.zoom_at(Point::new(10.0, 10.0), 3.0);

    let plain = MemoryDownload::new();
    let moved = MemoryDownload::new();
    let exporter = exporter();
    exporter
        .export(&build_scene(&view, &Camera::new()), &sheets, &plain, None)
        .unwrap();
    exporter
        .export(&build_scene(&view, &camera), &sheets, &moved, None)
        .unwrap();

    assert_eq!(plain.files()[0].1, moved.files()[0].1);
}

#[test]
fn file_download_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileDownload::new(dir.path().join("exports"));

    let receipt = exporter()
        .export(&boxed_scene(), &[red_box()], &sink, Some("../escape.png"))
        .unwrap();

    let path = dir.path().join("exports").join("escape.png");
    assert_eq!(receipt.location, path.display().to_string());
    let image = decode(&std::fs::read(path).unwrap());
    assert_eq!((image.width, image.height), (800, 600));
}

/// Records what the sink was handed.
struct Inspecting {
    urls: ObjectUrls,
    seen: RefCell<Option<(String, bool, String, Vec<u8>)>>,
}

impl DownloadSink for Inspecting {
    fn download(&self, filename: &str, url: &ObjectUrl) -> std::io::Result<String> {
        *self.seen.borrow_mut() = Some((
            url.as_str().to_string(),
            self.urls.is_live(url.as_str()),
            url.mime_type().to_string(),
            url.bytes().to_vec(),
        ));
        Ok(format!("inspected://{filename}"))
    }
}

#[test]
fn sink_receives_live_png_url_revoked_afterwards() {
    let exporter = exporter();
    let sink = Inspecting {
        urls: exporter.urls().clone(),
        seen: RefCell::new(None),
    };

    let receipt = exporter.export(&boxed_scene(), &[red_box()], &sink, None).unwrap();

    let (url, live, mime, bytes) = sink.seen.into_inner().unwrap();
    assert!(live);
    assert_eq!(mime, "image/png");
    assert_eq!(bytes.len(), receipt.size);
    assert_eq!(decode(&bytes).width, 800);
    assert!(!exporter.urls().is_live(&url));
    assert_eq!(exporter.urls().live_count(), 0);
}

/// Tries to start a second export while delivering the first.
struct Reentrant<'a> {
    exporter: &'a Exporter,
    nested: RefCell<Option<bool>>,
}

impl DownloadSink for Reentrant<'_> {
    fn download(&self, _filename: &str, _url: &ObjectUrl) -> std::io::Result<String> {
        let busy = self.exporter.is_busy();
        let nested = self
            .exporter
            .export(&boxed_scene(), &[], &MemoryDownload::new(), None);
        *self.nested.borrow_mut() = Some(busy && matches!(nested, Err(ExportError::Busy)));
        Ok("nowhere".into())
    }
}

#[test]
fn only_one_export_runs_at_a_time() {
    let exporter = exporter();
    let sink = Reentrant {
        exporter: &exporter,
        nested: RefCell::new(None),
    };

    exporter.export(&boxed_scene(), &[], &sink, None).unwrap();

    assert_eq!(*sink.nested.borrow(), Some(true));
    assert!(!exporter.is_busy());
    assert_eq!(exporter.urls().live_count(), 0);
}
