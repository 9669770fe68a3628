//! Background loading of the manifest and images.
//!
//! Every request runs off the UI thread (a `std::thread` natively, a
//! `spawn_local` future on the web) and reports through a channel that the app
//! drains once per frame. Folder builds are a single job, so folder N+1 starts
//! only after every image of folder N has loaded or failed.

use std::sync::mpsc::{Receiver, Sender, channel};

use image::RgbaImage;
use image::imageops::FilterType;

use crate::error::{EditorError, Result};
use crate::filters::FilterChain;
use crate::manifest::Manifest;

/// Name of the manifest inside the data directory.
pub const MANIFEST_FILE: &str = "data.json";

/// Decoded pixels plus the size of the original file.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub native_size: [u32; 2],
    pub pixels: RgbaImage,
}

/// Where the manifest and images live, as `<root>/<folder>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    root: String,
}

impl AssetSource {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let root = root.trim_end_matches('/').to_owned();
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn manifest_path(&self) -> String {
        format!("{}/{MANIFEST_FILE}", self.root)
    }

    pub fn image_path(&self, folder: &str, file: &str) -> String {
        format!("{}/{folder}/{file}", self.root)
    }
}

/// One folder's share of the build.
#[derive(Debug, Clone)]
pub struct FolderJob {
    pub folder: String,
    pub files: Vec<String>,
}

#[derive(Debug)]
pub enum LoadEvent {
    Manifest(Result<Manifest>),
    FolderStarted {
        folder: String,
    },
    Thumbnail {
        folder: String,
        index: usize,
        file: String,
        image: LoadedImage,
    },
    ThumbnailFailed {
        folder: String,
        index: usize,
        path: String,
        error: EditorError,
    },
    FolderFinished {
        folder: String,
    },
    FullImage {
        request: u64,
        result: Result<LoadedImage>,
    },
}

pub fn decode_manifest(bytes: &[u8]) -> Result<Manifest> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EditorError::Manifest(format!("not UTF-8: {e}")))?;
    Manifest::from_json_str(text)
}

/// Decode and scale to `height`. The pixel width is capped at `max_side`;
/// the display width comes from `native_size`.
pub fn decode_thumbnail(bytes: &[u8], height: u32, max_side: u32) -> Result<LoadedImage> {
    let decoded = image::load_from_memory(bytes)?;
    let native_size = [decoded.width(), decoded.height()];
    let pixels = decoded
        .resize(max_side, height.min(max_side), FilterType::Triangle)
        .to_rgba8();
    Ok(LoadedImage {
        native_size,
        pixels,
    })
}

/// Decode at full size with `filters` applied, downscaled only if a side
/// exceeds `max_side`.
pub fn decode_full(bytes: &[u8], filters: &FilterChain, max_side: u32) -> Result<LoadedImage> {
    let decoded = image::load_from_memory(bytes)?;
    let native_size = [decoded.width(), decoded.height()];
    let decoded = if decoded.width() > max_side || decoded.height() > max_side {
        decoded.resize(max_side, max_side, FilterType::Triangle)
    } else {
        decoded
    };
    Ok(LoadedImage {
        native_size,
        pixels: filters.apply(&decoded.to_rgba8()),
    })
}

pub struct Loader {
    source: AssetSource,
    ctx: egui::Context,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
}

impl Loader {
    pub fn new(ctx: egui::Context, source: AssetSource) -> Self {
        let (tx, rx) = channel();
        Self {
            source,
            ctx,
            tx,
            rx,
        }
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    /// Events that arrived since the last call.
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.rx.try_iter().collect()
    }

    fn max_texture_side(&self) -> u32 {
        self.ctx.input(|i| i.max_texture_side) as u32
    }

    pub fn fetch_manifest(&self) {
        let path = self.source.manifest_path();
        let sink = EventSink::new(&self.tx, &self.ctx);
        log::info!("Loading manifest from {path}");
        spawn(async move {
            let result = match fetch_bytes(&path).await {
                Ok(bytes) => decode_manifest(&bytes),
                Err(e) => Err(e),
            };
            sink.send(LoadEvent::Manifest(result));
        });
    }

    /// Load every folder's thumbnails, strictly one folder after the other.
    pub fn build_folders(&self, jobs: Vec<FolderJob>, thumb_height: u32) {
        let source = self.source.clone();
        let max_side = self.max_texture_side();
        let sink = EventSink::new(&self.tx, &self.ctx);
        spawn(async move {
            for job in jobs {
                log::info!("Building section for {}", job.folder);
                sink.send(LoadEvent::FolderStarted {
                    folder: job.folder.clone(),
                });

                for (index, file) in job.files.iter().enumerate() {
                    let path = source.image_path(&job.folder, file);
                    log::debug!("Loading image {path}");
                    let result = match fetch_bytes(&path).await {
                        Ok(bytes) => decode_thumbnail(&bytes, thumb_height, max_side),
                        Err(e) => Err(e),
                    };
                    let event = match result {
                        Ok(image) => LoadEvent::Thumbnail {
                            folder: job.folder.clone(),
                            index,
                            file: file.clone(),
                            image,
                        },
                        Err(error) => LoadEvent::ThumbnailFailed {
                            folder: job.folder.clone(),
                            index,
                            path,
                            error,
                        },
                    };
                    sink.send(event);
                }

                sink.send(LoadEvent::FolderFinished { folder: job.folder });
            }
        });
    }

    /// Load one image at full size for the overlay.
    pub fn load_full_image(&self, request: u64, path: String, filters: FilterChain) {
        let max_side = self.max_texture_side();
        let sink = EventSink::new(&self.tx, &self.ctx);
        spawn(async move {
            let result = match fetch_bytes(&path).await {
                Ok(bytes) => decode_full(&bytes, &filters, max_side),
                Err(e) => Err(e),
            };
            sink.send(LoadEvent::FullImage { request, result });
        });
    }
}

/// Channel end handed to a worker; wakes the UI after every event.
struct EventSink {
    tx: Sender<LoadEvent>,
    ctx: egui::Context,
}

impl EventSink {
    fn new(tx: &Sender<LoadEvent>, ctx: &egui::Context) -> Self {
        Self {
            tx: tx.clone(),
            ctx: ctx.clone(),
        }
    }

    fn send(&self, event: LoadEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Loader event dropped, the app is gone");
            return;
        }
        self.ctx.request_repaint();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn(task: impl Future<Output = ()> + Send + 'static) {
    std::thread::spawn(move || pollster::block_on(task));
}

#[cfg(target_arch = "wasm32")]
fn spawn(task: impl Future<Output = ()> + 'static) {
    wasm_bindgen_futures::spawn_local(task);
}

#[cfg(not(target_arch = "wasm32"))]
async fn fetch_bytes(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| EditorError::io(path, e))
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(path: &str) -> Result<Vec<u8>> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let failed = |reason: String| EditorError::Fetch {
        path: path.to_owned(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| failed("no window".to_owned()))?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| failed(format!("{e:?}")))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| failed("not a Response".to_owned()))?;
    if !response.ok() {
        return Err(failed(format!("status {}", response.status())));
    }
    let buffer = response.array_buffer().map_err(|e| failed(format!("{e:?}")))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| failed(format!("{e:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::Path;
    use std::time::Duration;

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]))
            .save(path)
            .unwrap();
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255])))
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn next_event(loader: &Loader) -> LoadEvent {
        loader.rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    /// Suspends once and wakes itself, like a read that is not ready yet.
    struct PendingOnce(bool);

    impl Future for PendingOnce {
        type Output = ();

        fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<()> {
            if self.0 {
                return std::task::Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            std::task::Poll::Pending
        }
    }

    #[test]
    fn test_spawned_task_resumes_after_pending() {
        let (tx, rx) = channel();
        spawn(async move {
            PendingOnce(false).await;
            PendingOnce(false).await;
            tx.send("resumed").unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)), Ok("resumed"));
    }

    #[test]
    fn test_asset_paths() {
        let source = AssetSource::new("data/");
        assert_eq!(source.manifest_path(), "data/data.json");
        assert_eq!(source.image_path("beach", "a.jpg"), "data/beach/a.jpg");
    }

    #[test]
    fn test_decode_thumbnail_scales_to_height() {
        let image = decode_thumbnail(&png_bytes(200, 100), 50, 2048).unwrap();
        assert_eq!(image.native_size, [200, 100]);
        assert_eq!(image.pixels.dimensions(), (100, 50));
    }

    #[test]
    fn test_decode_thumbnail_caps_texture_width() {
        let image = decode_thumbnail(&png_bytes(400, 10), 100, 64).unwrap();
        assert_eq!(image.native_size, [400, 10]);
        assert!(image.pixels.width() <= 64);
    }

    #[test]
    fn test_decode_full_applies_filters() {
        let filters = FilterChain {
            brightness: crate::filters::Brightness { multiplier: 0.0 },
            ..Default::default()
        };
        let image = decode_full(&png_bytes(30, 20), &filters, 2048).unwrap();
        assert_eq!(image.native_size, [30, 20]);
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_thumbnail(b"nope", 10, 10), Err(EditorError::Image(_))));
        assert!(matches!(decode_manifest(&[0xff, 0xfe]), Err(EditorError::Manifest(_))));
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Loader::new(
            egui::Context::default(),
            AssetSource::new(dir.path().to_string_lossy()),
        );
        loader.fetch_manifest();
        match next_event(&loader) {
            LoadEvent::Manifest(Err(EditorError::Io { .. })) => {}
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_build_skips_broken_images_and_keeps_folder_order() {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["first", "second"] {
            std::fs::create_dir(dir.path().join(folder)).unwrap();
        }
        write_png(&dir.path().join("first/a.png"), 20, 10);
        std::fs::write(dir.path().join("first/b.png"), b"not an image").unwrap();
        write_png(&dir.path().join("first/c.png"), 10, 10);
        write_png(&dir.path().join("second/x.png"), 10, 20);

        let loader = Loader::new(
            egui::Context::default(),
            AssetSource::new(dir.path().to_string_lossy()),
        );
        loader.build_folders(
            vec![
                FolderJob {
                    folder: "first".into(),
                    files: vec!["a.png".into(), "b.png".into(), "c.png".into()],
                },
                FolderJob {
                    folder: "second".into(),
                    files: vec!["x.png".into()],
                },
            ],
            10,
        );

        let mut trace = Vec::new();
        loop {
            let event = next_event(&loader);
            let done = matches!(&event, LoadEvent::FolderFinished { folder } if folder == "second");
            trace.push(match event {
                LoadEvent::FolderStarted { folder } => format!("start {folder}"),
                LoadEvent::Thumbnail { folder, index, .. } => format!("ok {folder} {index}"),
                LoadEvent::ThumbnailFailed { folder, index, .. } => format!("fail {folder} {index}"),
                LoadEvent::FolderFinished { folder } => format!("done {folder}"),
                other => panic!("unexpected event {other:?}"),
            });
            if done {
                break;
            }
        }

        assert_eq!(
            trace,
            [
                "start first",
                "ok first 0",
                "fail first 1",
                "ok first 2",
                "done first",
                "start second",
                "ok second 0",
                "done second",
            ]
        );
    }
}
