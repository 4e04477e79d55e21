pub mod catalog;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

/// Handle to a texture owned by the [`TextureLoader`]. Valid immediately,
/// even while the image is still decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Color data (base maps, matcaps, backgrounds).
    Srgb,
    /// Non-color data (alpha masks).
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Pending,
    Ready,
    Failed,
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read texture at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

struct TextureEntry {
    path: PathBuf,
    color_space: ColorSpace,
    state: TextureState,
    image: Option<LoadedImage>,
}

struct DecodeRequest {
    handle: TextureHandle,
    path: PathBuf,
}

struct DecodeResult {
    handle: TextureHandle,
    result: Result<LoadedImage, AssetError>,
}

/// Tracks the aggregate "everything finished loading" signal.
#[derive(Debug, Default, Clone)]
pub struct LoadingManager {
    total: usize,
    finished: usize,
    failed: usize,
    announced: bool,
}

impl LoadingManager {
    pub fn item_start(&mut self) {
        self.total += 1;
        self.announced = false;
    }

    pub fn item_end(&mut self, ok: bool) {
        self.finished = (self.finished + 1).min(self.total);
        if !ok {
            self.failed += 1;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.finished == self.total
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.finished, self.total)
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// True exactly once per batch, on the first call after every queued item
    /// has finished.
    pub fn take_loaded_signal(&mut self) -> bool {
        if self.total > 0 && self.is_loaded() && !self.announced {
            self.announced = true;
            return true;
        }
        false
    }
}

/// Hands out texture handles right away and decodes the files on a
/// background worker. Results are picked up by [`TextureLoader::poll`].
pub struct TextureLoader {
    root: PathBuf,
    entries: Vec<TextureEntry>,
    by_path: HashMap<PathBuf, TextureHandle>,
    requests: Option<Sender<DecodeRequest>>,
    results: Receiver<DecodeResult>,
    worker: Option<JoinHandle<()>>,
    /// Decoded on the calling thread, not yet reported by `poll`.
    decoded_inline: Vec<TextureHandle>,
    loading: LoadingManager,
}

impl TextureLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<DecodeRequest>();
        let (result_tx, result_rx) = mpsc::channel::<DecodeResult>();
        let worker = std::thread::Builder::new()
            .name("texture-decode".to_string())
            .spawn(move || decode_worker(request_rx, result_tx));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::warn!("Failed to start texture worker, decoding inline: {}", err);
                None
            }
        };

        Self {
            root: root.into(),
            entries: Vec::new(),
            by_path: HashMap::new(),
            requests: worker.as_ref().map(|_| request_tx),
            results: result_rx,
            worker,
            decoded_inline: Vec::new(),
            loading: LoadingManager::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Queue `relative_path` (under the assets root) for decoding.
    /// Loading the same path twice returns the same handle.
    pub fn load(&mut self, relative_path: &str, color_space: ColorSpace) -> TextureHandle {
        let path = self.root.join(relative_path);
        if let Some(handle) = self.by_path.get(&path) {
            return *handle;
        }

        let handle = TextureHandle(self.entries.len() as u32);
        self.entries.push(TextureEntry {
            path: path.clone(),
            color_space,
            state: TextureState::Pending,
            image: None,
        });
        self.by_path.insert(path.clone(), handle);
        self.loading.item_start();

        let request = DecodeRequest { handle, path };
        let unsent = match &self.requests {
            Some(sender) => sender.send(request).err().map(|failed| failed.0),
            None => Some(request),
        };
        if let Some(request) = unsent {
            let result = decode_file(&request.path);
            self.finish(request.handle, result);
            self.decoded_inline.push(request.handle);
        }
        handle
    }

    /// Collect finished decodes. Returns handles whose state changed.
    pub fn poll(&mut self) -> Vec<TextureHandle> {
        let mut finished = std::mem::take(&mut self.decoded_inline);
        loop {
            match self.results.try_recv() {
                Ok(done) => {
                    self.finish(done.handle, done.result);
                    finished.push(done.handle);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        finished
    }

    fn finish(&mut self, handle: TextureHandle, result: Result<LoadedImage, AssetError>) {
        let Some(entry) = self.entries.get_mut(handle.index()) else {
            return;
        };
        match result {
            Ok(image) => {
                log::debug!(
                    "Texture {} decoded ({}x{})",
                    entry.path.display(),
                    image.width,
                    image.height
                );
                entry.state = TextureState::Ready;
                entry.image = Some(image);
                self.loading.item_end(true);
            }
            Err(err) => {
                log::warn!("{}", err);
                entry.state = TextureState::Failed;
                self.loading.item_end(false);
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self, handle: TextureHandle) -> Option<TextureState> {
        self.entries.get(handle.index()).map(|entry| entry.state)
    }

    pub fn color_space(&self, handle: TextureHandle) -> ColorSpace {
        self.entries
            .get(handle.index())
            .map(|entry| entry.color_space)
            .unwrap_or(ColorSpace::Srgb)
    }

    pub fn path(&self, handle: TextureHandle) -> Option<&Path> {
        self.entries.get(handle.index()).map(|entry| entry.path.as_path())
    }

    /// Move decoded pixels out for upload. The state stays `Ready`.
    pub fn take_image(&mut self, handle: TextureHandle) -> Option<LoadedImage> {
        self.entries
            .get_mut(handle.index())
            .and_then(|entry| entry.image.take())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn loading(&self) -> &LoadingManager {
        &self.loading
    }

    pub fn loading_mut(&mut self) -> &mut LoadingManager {
        &mut self.loading
    }
}

impl Drop for TextureLoader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn decode_worker(requests: Receiver<DecodeRequest>, results: Sender<DecodeResult>) {
    while let Ok(request) = requests.recv() {
        let result = decode_file(&request.path);
        if results
            .send(DecodeResult {
                handle: request.handle,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}

fn decode_file(path: &Path) -> Result<LoadedImage, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source| AssetError::Decode {
            path: path.display().to_string(),
            source,
        })?
        .to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        pixels: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cagebox_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn poll_until_loaded(loader: &mut TextureLoader) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !loader.loading().is_loaded() {
            loader.poll();
            assert!(Instant::now() < deadline, "texture loading timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn loading_manager_signals_once() {
        let mut manager = LoadingManager::default();
        assert!(!manager.take_loaded_signal());
        manager.item_start();
        manager.item_start();
        manager.item_end(true);
        assert!(!manager.is_loaded());
        assert!(!manager.take_loaded_signal());
        manager.item_end(false);
        assert!(manager.is_loaded());
        assert!(manager.take_loaded_signal());
        assert!(!manager.take_loaded_signal());
        assert_eq!(manager.progress(), (2, 2));
        assert_eq!(manager.failed(), 1);
    }

    #[test]
    fn handles_are_issued_before_decode_and_deduplicated() {
        let dir = scratch_dir("dedupe");
        let mut loader = TextureLoader::new(&dir);
        let first = loader.load("missing.png", ColorSpace::Srgb);
        let again = loader.load("missing.png", ColorSpace::Srgb);
        let other = loader.load("other.png", ColorSpace::Linear);
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.color_space(other), ColorSpace::Linear);
    }

    #[test]
    fn decodes_png_and_reports_missing_files() {
        let dir = scratch_dir("decode");
        let pixels = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        pixels.save(dir.join("tile.png")).unwrap();

        let mut loader = TextureLoader::new(&dir);
        let tile = loader.load("tile.png", ColorSpace::Srgb);
        let missing = loader.load("nope.png", ColorSpace::Srgb);
        assert!(!loader.loading().is_loaded());

        poll_until_loaded(&mut loader);
        assert_eq!(loader.state(tile), Some(TextureState::Ready));
        assert_eq!(loader.state(missing), Some(TextureState::Failed));
        assert!(loader.loading_mut().take_loaded_signal());

        let image = loader.take_image(tile).expect("decoded pixels");
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(&image.pixels[..4], &[10, 20, 30, 255]);
        assert!(loader.take_image(tile).is_none());
        assert!(loader.take_image(missing).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
