use std::fs::File;
use std::io::{BufRead, BufReader, Stdin};
use std::path::Path;

use anyhow::{Context, Result};
use fm_core::frame::{FaceRegion, Frame};
use fm_core::traits::FrameSource;
use serde::Deserialize;
use serde_json::{Value, json};

/// Une ligne du flux : `{"index", "face"?, "points"?, "width"?, "height"?}`.
#[derive(Debug, Deserialize)]
struct FrameRecord {
    index: Option<u64>,
    face: Option<FaceRegion>,
    points: Option<Value>,
    width: Option<u32>,
    height: Option<u32>,
}

impl FrameRecord {
    fn into_frame(self, fallback_index: u64) -> Frame {
        let index = self.index.unwrap_or(fallback_index);
        let face = self.face.or_else(|| {
            let points = self.points.as_ref()?.as_array()?;
            FaceRegion::from_normalized(
                points.iter().filter_map(planar),
                self.width.unwrap_or(1),
                self.height.unwrap_or(1),
            )
        });
        Frame {
            index,
            face,
            landmarks: self
                .points
                .map(|points| json!({ "index": index, "points": points })),
        }
    }
}

fn planar(point: &Value) -> Option<(f32, f32)> {
    let x = point.get("x")?.as_f64()?;
    let y = point.get("y")?.as_f64()?;
    Some((x as f32, y as f32))
}

/// Relecture paresseuse d'un flux JSON-lines de frames.
///
/// One frame per non-empty line. A malformed line yields a no-face frame
/// and a warning; a read error ends the stream.
///
/// # Example
/// ```
/// use fm_core::traits::FrameSource;
/// use fm_source::JsonlSource;
///
/// let data = "{\"index\": 4}\n\n{\"index\": 5, \"face\": {\"x_min\": 0, \"y_min\": 0, \"x_max\": 9, \"y_max\": 9}}\n";
/// let mut source = JsonlSource::from_reader(data.as_bytes());
/// assert_eq!(source.next_frame().map(|f| f.index), Some(4));
/// assert_eq!(source.next_frame().and_then(|f| f.face).map(|r| r.area()), Some(81));
/// assert!(source.next_frame().is_none());
/// ```
pub struct JsonlSource<R> {
    reader: R,
    line: String,
    line_no: u64,
    produced: u64,
    live: bool,
}

impl JsonlSource<BufReader<File>> {
    /// Open a JSON-lines file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl JsonlSource<BufReader<Stdin>> {
    /// Read frames from standard input, treated as a live source.
    #[must_use]
    pub fn stdin() -> Self {
        let mut source = Self::from_reader(BufReader::new(std::io::stdin()));
        source.live = true;
        source
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            produced: 0,
            live: false,
        }
    }

    /// Frames produced so far.
    #[must_use]
    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn read_frame(&mut self) -> Option<Frame> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Lecture du flux interrompue ligne {}: {e}", self.line_no + 1);
                    return None;
                }
            }
            self.line_no += 1;
            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            let fallback = self.produced;
            let frame = match serde_json::from_str::<FrameRecord>(text) {
                Ok(record) => record.into_frame(fallback),
                Err(e) => {
                    log::warn!("Ligne {} invalide, frame sans visage: {e}", self.line_no);
                    Frame::no_face(fallback)
                }
            };
            self.produced += 1;
            return Some(frame);
        }
    }
}

impl<R: BufRead + Send + 'static> FrameSource for JsonlSource<R> {
    fn next_frame(&mut self) -> Option<Frame> {
        self.read_frame()
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
