//! Off-thread image decoding with last-requested-wins delivery.
//!
//! Every request is tagged with a sequence number for its slot. Decodes run
//! on short-lived worker threads and report back over a channel that the
//! editor polls once per frame; only the newest request of a slot is ever
//! handed out.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("empty image reference")]
    EmptyReference,
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("remote images are not supported: {0}")]
    Remote(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to read image at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where the bytes of an image reference live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    Inline(Vec<u8>),
}

impl ImageSource {
    /// Accepts plain paths, `file://` URLs and base64 `data:` URLs.
    pub fn parse(reference: &str) -> Result<Self, LoadError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LoadError::EmptyReference);
        }
        if let Some(rest) = reference.strip_prefix("data:") {
            let (header, payload) = rest.split_once(',').ok_or(LoadError::MalformedDataUrl)?;
            if !header.ends_with(";base64") {
                return Err(LoadError::MalformedDataUrl);
            }
            return Ok(Self::Inline(BASE64.decode(payload.trim())?));
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Err(LoadError::Remote(reference.to_string()));
        }
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        Ok(Self::Path(PathBuf::from(path)))
    }

    fn read(self) -> Result<Vec<u8>, LoadError> {
        match self {
            Self::Inline(bytes) => Ok(bytes),
            Self::Path(path) => std::fs::read(&path).map_err(|source| LoadError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    }
}

/// Reads and decodes a reference into RGBA8 pixels. Blocking.
pub fn decode_reference(reference: &str) -> Result<RgbaImage, LoadError> {
    let bytes = ImageSource::parse(reference)?.read()?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSlot {
    Screen,
    Background,
}

impl LoadSlot {
    fn index(self) -> usize {
        match self {
            Self::Screen => 0,
            Self::Background => 1,
        }
    }
}

/// Latest issued sequence number per slot.
#[derive(Debug, Default, Clone)]
pub struct SequenceGate {
    latest: [u64; 2],
}

impl SequenceGate {
    pub fn issue(&mut self, slot: LoadSlot) -> u64 {
        let latest = &mut self.latest[slot.index()];
        *latest += 1;
        *latest
    }

    pub fn is_current(&self, slot: LoadSlot, sequence: u64) -> bool {
        self.latest[slot.index()] == sequence
    }
}

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub slot: LoadSlot,
    pub sequence: u64,
    pub reference: String,
    pub image: Arc<RgbaImage>,
}

#[derive(Debug)]
pub struct Completion {
    pub slot: LoadSlot,
    pub sequence: u64,
    pub reference: String,
    pub result: Result<RgbaImage, LoadError>,
}

pub struct TextureLoader {
    gate: SequenceGate,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    in_flight: usize,
}

impl Default for TextureLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureLoader {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            gate: SequenceGate::default(),
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Starts decoding `reference` for `slot` and returns its sequence number.
    /// Any earlier request for the slot becomes stale.
    pub fn request(&mut self, slot: LoadSlot, reference: &str) -> u64 {
        let sequence = self.gate.issue(slot);
        let sender = self.sender.clone();
        let owned = reference.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("image-load-{sequence}"))
            .spawn(move || {
                let result = decode_reference(&owned);
                let _ = sender.send(Completion {
                    slot,
                    sequence,
                    reference: owned,
                    result,
                });
            });
        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(err) => log::warn!("Could not start image load for {slot:?}: {err}"),
        }
        sequence
    }

    /// Invalidates whatever is in flight for `slot` without starting a load.
    pub fn supersede(&mut self, slot: LoadSlot) {
        self.gate.issue(slot);
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight > 0
    }

    /// Drains finished decodes. Failures are logged and stale results
    /// dropped; what is returned is safe to bind.
    pub fn poll(&mut self) -> Vec<LoadedImage> {
        let mut accepted = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if let Some(loaded) = self.accept(completion) {
                accepted.push(loaded);
            }
        }
        accepted
    }

    pub fn accept(&self, completion: Completion) -> Option<LoadedImage> {
        if !self.gate.is_current(completion.slot, completion.sequence) {
            log::debug!(
                "Dropping stale {:?} load #{} ({})",
                completion.slot,
                completion.sequence,
                abbreviate(&completion.reference)
            );
            return None;
        }
        match completion.result {
            Ok(image) => Some(LoadedImage {
                slot: completion.slot,
                sequence: completion.sequence,
                reference: completion.reference,
                image: Arc::new(image),
            }),
            Err(err) => {
                log::warn!(
                    "Failed to load {:?} image {}: {err}",
                    completion.slot,
                    abbreviate(&completion.reference)
                );
                None
            }
        }
    }
}

/// Keeps data URLs out of the log.
pub fn abbreviate(reference: &str) -> String {
    if reference.len() > 64 {
        let cut = reference
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= 48)
            .last()
            .unwrap_or(0);
        format!("{}… ({} bytes)", &reference[..cut], reference.len())
    } else {
        reference.to_string()
    }
}
