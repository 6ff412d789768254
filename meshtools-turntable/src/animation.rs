//! Assembles rendered PNG frames into a looping GIF.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use gif::{DisposalMethod, Encoder, Frame, Repeat};
use image::imageops::{self, ColorMap};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{TurntableError, TurntableResult};
use crate::frames::FrameSequence;

/// NeuQuant sampling speed passed to the quantizer (1 is slowest and best).
pub const DEFAULT_QUANTIZER_SPEED: i32 = 10;

/// Dithering applied when reducing frames to a 256-colour palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMethod {
    None,
    #[default]
    FloydSteinberg,
}

impl fmt::Display for DitherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::FloydSteinberg => "floyd-steinberg",
        })
    }
}

impl FromStr for DitherMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "floyd-steinberg" | "floydsteinberg" => Ok(Self::FloydSteinberg),
            other => Err(format!("unknown dither method '{other}' (expected none or floyd-steinberg)")),
        }
    }
}

/// Whether the last rendered frame is left out of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeamPolicy {
    /// Drop the last frame only when one more step would land on 360 degrees.
    #[default]
    Auto,
    /// Always drop the last frame.
    DropLast,
    KeepAll,
}

impl SeamPolicy {
    pub fn drops_last(self, sequence: &FrameSequence) -> bool {
        match self {
            Self::Auto => sequence.wraps_evenly(),
            Self::DropLast => true,
            Self::KeepAll => false,
        }
    }
}

impl fmt::Display for SeamPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::DropLast => "drop-last",
            Self::KeepAll => "keep-all",
        })
    }
}

impl FromStr for SeamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "drop-last" => Ok(Self::DropLast),
            "keep-all" => Ok(Self::KeepAll),
            other => Err(format!(
                "unknown seam policy '{other}' (expected auto, drop-last or keep-all)"
            )),
        }
    }
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifSummary {
    pub path: PathBuf,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
}

/// `*.png` files in `dir`, sorted lexicographically by name.
pub fn list_frames(dir: &Path) -> TurntableResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

/// Milliseconds to GIF centiseconds, rounded to nearest.
pub fn delay_centiseconds(ms: u32) -> u16 {
    let cs = (u64::from(ms) + 5) / 10;
    u16::try_from(cs).unwrap_or(u16::MAX)
}

#[derive(Debug, Clone)]
pub struct GifAssembler {
    pub frame_duration_ms: u32,
    pub dither: DitherMethod,
    pub optimize: bool,
    pub drop_last: bool,
    pub speed: i32,
}

impl Default for GifAssembler {
    fn default() -> Self {
        Self {
            frame_duration_ms: 100,
            dither: DitherMethod::FloydSteinberg,
            optimize: true,
            drop_last: false,
            speed: DEFAULT_QUANTIZER_SPEED,
        }
    }
}

impl GifAssembler {
    /// Encode the PNGs of `frames_dir` into `output`.
    pub fn assemble(&self, frames_dir: &Path, output: &Path) -> TurntableResult<GifSummary> {
        let mut frames = list_frames(frames_dir)?;
        if self.drop_last {
            if let Some(dropped) = frames.pop() {
                debug!(path = %dropped.display(), "Dropped seam frame");
            }
        }
        let Some(first) = frames.first() else {
            return Err(TurntableError::NoFrames {
                dir: frames_dir.to_path_buf(),
            });
        };

        let (width, height) = image::image_dimensions(first)?;
        let (canvas_w, canvas_h) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(TurntableError::CanvasTooLarge { width, height }),
        };

        let delay = delay_centiseconds(self.frame_duration_ms);
        let writer = BufWriter::new(File::create(output)?);
        let mut encoder = Encoder::new(writer, canvas_w, canvas_h, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;

        for path in &frames {
            let rgba = image::open(path)?.to_rgba8();
            if rgba.dimensions() != (width, height) {
                return Err(TurntableError::FrameSizeMismatch {
                    path: path.clone(),
                    width,
                    height,
                    actual_width: rgba.width(),
                    actual_height: rgba.height(),
                });
            }

            let mut frame = self.encode_frame(rgba, canvas_w, canvas_h);
            frame.delay = delay;
            frame.dispose = DisposalMethod::Background;
            encoder.write_frame(&frame)?;
            debug!(path = %path.display(), "Frame encoded");
        }

        encoder.into_inner()?.flush()?;
        info!(
            frames = frames.len(),
            width,
            height,
            delay_cs = delay,
            dither = %self.dither,
            output = %output.display(),
            "GIF written"
        );

        Ok(GifSummary {
            path: output.to_path_buf(),
            frames: frames.len(),
            width,
            height,
        })
    }

    fn encode_frame(&self, rgba: RgbaImage, width: u16, height: u16) -> Frame<'static> {
        let mut pixels = rgba.as_raw().clone();
        let mut frame = Frame::from_rgba_speed(width, height, &mut pixels, self.speed);

        if self.dither == DitherMethod::FloydSteinberg {
            if let Some(palette) = Palette::from_frame(&frame) {
                let mut dithered = rgba;
                imageops::dither(&mut dithered, &palette);
                frame.buffer = Cow::Owned(palette.index_pixels(&dithered));
            }
        }

        if self.optimize {
            compact_palette(&mut frame);
        }
        frame
    }
}

/// Local colour table of an encoded frame, usable as an `image` colour map.
#[derive(Debug, Clone)]
struct Palette {
    colors: Vec<[u8; 3]>,
    transparent: Option<u8>,
}

impl Palette {
    fn from_frame(frame: &Frame<'_>) -> Option<Self> {
        let table = frame.palette.as_ref()?;
        let colors: Vec<[u8; 3]> = table
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        if colors.is_empty() {
            return None;
        }
        Some(Self {
            colors,
            transparent: frame.transparent,
        })
    }

    fn nearest(&self, rgb: [u8; 3]) -> usize {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            if Some(i) == self.transparent.map(usize::from) && self.colors.len() > 1 {
                continue;
            }
            let dist = c
                .iter()
                .zip(rgb.iter())
                .map(|(&a, &b)| {
                    let d = i32::from(a) - i32::from(b);
                    (d * d) as u32
                })
                .sum::<u32>();
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best
    }

    fn index_pixels(&self, image: &RgbaImage) -> Vec<u8> {
        let mut cache: HashMap<[u8; 3], u8> = HashMap::new();
        image
            .pixels()
            .map(|p| match self.transparent {
                Some(t) if p[3] == 0 => t,
                _ => {
                    let rgb = [p[0], p[1], p[2]];
                    *cache
                        .entry(rgb)
                        .or_insert_with(|| self.nearest(rgb) as u8)
                }
            })
            .collect()
    }
}

impl ColorMap for Palette {
    type Color = Rgba<u8>;

    fn index_of(&self, color: &Rgba<u8>) -> usize {
        self.nearest([color[0], color[1], color[2]])
    }

    fn map_color(&self, color: &mut Rgba<u8>) {
        if color[3] == 0 {
            return;
        }
        let [r, g, b] = self.colors[self.index_of(color)];
        color[0] = r;
        color[1] = g;
        color[2] = b;
    }
}

/// Drop palette entries no pixel refers to and renumber the buffer.
fn compact_palette(frame: &mut Frame<'_>) {
    let Some(table) = frame.palette.take() else {
        return;
    };
    let count = table.len() / 3;
    let mut used = vec![false; count];
    for &index in frame.buffer.iter() {
        if let Some(flag) = used.get_mut(usize::from(index)) {
            *flag = true;
        }
    }

    let mut remap = vec![0u8; count];
    let mut compact = Vec::with_capacity(table.len());
    for (old, _) in used.iter().enumerate().filter(|(_, u)| **u) {
        remap[old] = (compact.len() / 3) as u8;
        compact.extend_from_slice(&table[old * 3..old * 3 + 3]);
    }

    if compact.len() == table.len() {
        frame.palette = Some(table);
        return;
    }

    for index in frame.buffer.to_mut().iter_mut() {
        *index = remap[usize::from(*index)];
    }
    frame.transparent = frame
        .transparent
        .filter(|&t| used.get(usize::from(t)).copied().unwrap_or(false))
        .map(|t| remap[usize::from(t)]);
    frame.palette = Some(compact);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str, color: Rgba<u8>, size: (u32, u32)) -> PathBuf {
        let path = dir.join(name);
        let mut img = RgbaImage::from_pixel(size.0, size.1, Rgba([0, 0, 0, 0]));
        for y in 0..size.1 / 2 {
            for x in 0..size.0 {
                img.put_pixel(x, y, color);
            }
        }
        img.save(&path).unwrap();
        path
    }

    fn decode(path: &Path) -> Vec<(u16, DisposalMethod, u16, u16)> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(File::open(path).unwrap()).unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            frames.push((frame.delay, frame.dispose, frame.width, frame.height));
        }
        frames
    }

    #[test]
    fn test_delay_rounding() {
        assert_eq!(delay_centiseconds(100), 10);
        assert_eq!(delay_centiseconds(33), 3);
        assert_eq!(delay_centiseconds(35), 4);
        assert_eq!(delay_centiseconds(u32::MAX), u16::MAX);
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("floyd-steinberg".parse::<DitherMethod>().unwrap(), DitherMethod::FloydSteinberg);
        assert_eq!("none".parse::<DitherMethod>().unwrap(), DitherMethod::None);
        assert_eq!("drop-last".parse::<SeamPolicy>().unwrap(), SeamPolicy::DropLast);
        assert!("sometimes".parse::<SeamPolicy>().is_err());
    }

    #[test]
    fn test_seam_policy() {
        let even = FrameSequence::new(90.0).unwrap();
        let uneven = FrameSequence::new(100.0).unwrap();
        assert!(SeamPolicy::Auto.drops_last(&even));
        assert!(!SeamPolicy::Auto.drops_last(&uneven));
        assert!(SeamPolicy::DropLast.drops_last(&uneven));
        assert!(!SeamPolicy::KeepAll.drops_last(&even));
    }

    #[test]
    fn test_list_frames_sorted_png_only() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "screenshot_002.png", Rgba([255, 0, 0, 255]), (4, 4));
        write_frame(dir.path(), "screenshot_000.png", Rgba([255, 0, 0, 255]), (4, 4));
        write_frame(dir.path(), "screenshot_001.png", Rgba([255, 0, 0, 255]), (4, 4));
        fs::write(dir.path().join("log.txt"), b"x").unwrap();

        let names: Vec<_> = list_frames(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["screenshot_000.png", "screenshot_001.png", "screenshot_002.png"]);
    }

    #[test]
    fn test_assemble_drops_last_frame() {
        let dir = tempfile::tempdir().unwrap();
        for (i, c) in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]].iter().enumerate() {
            write_frame(dir.path(), &format!("screenshot_{i:03}.png"), Rgba([c[0], c[1], c[2], 255]), (8, 6));
        }
        let out = tempfile::tempdir().unwrap();
        let gif_path = out.path().join("out.gif");

        let assembler = GifAssembler {
            drop_last: true,
            ..GifAssembler::default()
        };
        let summary = assembler.assemble(dir.path(), &gif_path).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!((summary.width, summary.height), (8, 6));

        let frames = decode(&gif_path);
        assert_eq!(frames.len(), 3);
        for (delay, dispose, w, h) in frames {
            assert_eq!(delay, 10);
            assert_eq!(dispose, DisposalMethod::Background);
            assert_eq!((w, h), (8, 6));
        }
    }

    #[test]
    fn test_assemble_without_dither_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "a.png", Rgba([10, 20, 30, 255]), (5, 5));
        write_frame(dir.path(), "b.png", Rgba([200, 20, 30, 255]), (5, 5));
        let gif_path = dir.path().join("out.gif");

        let assembler = GifAssembler {
            dither: DitherMethod::None,
            optimize: false,
            frame_duration_ms: 40,
            ..GifAssembler::default()
        };
        assembler.assemble(dir.path(), &gif_path).unwrap();
        let frames = decode(&gif_path);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, 4);
    }

    #[test]
    fn test_assemble_loops_forever() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "a.png", Rgba([10, 20, 30, 255]), (5, 5));
        let gif_path = dir.path().join("out.gif");
        GifAssembler::default().assemble(dir.path(), &gif_path).unwrap();

        let decoder = gif::DecodeOptions::new()
            .read_info(File::open(&gif_path).unwrap())
            .unwrap();
        assert_eq!(decoder.repeat(), Repeat::Infinite);
    }

    #[test]
    fn test_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let err = GifAssembler::default()
            .assemble(dir.path(), &dir.path().join("out.gif"))
            .unwrap_err();
        assert!(matches!(err, TurntableError::NoFrames { .. }));

        write_frame(dir.path(), "only.png", Rgba([1, 2, 3, 255]), (4, 4));
        let assembler = GifAssembler {
            drop_last: true,
            ..GifAssembler::default()
        };
        let err = assembler
            .assemble(dir.path(), &dir.path().join("out.gif"))
            .unwrap_err();
        assert!(matches!(err, TurntableError::NoFrames { .. }));
    }

    #[test]
    fn test_frame_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "a.png", Rgba([1, 2, 3, 255]), (4, 4));
        write_frame(dir.path(), "b.png", Rgba([1, 2, 3, 255]), (6, 4));
        let err = GifAssembler::default()
            .assemble(dir.path(), &dir.path().join("out.gif"))
            .unwrap_err();
        assert!(matches!(
            err,
            TurntableError::FrameSizeMismatch { actual_width: 6, .. }
        ));
    }

    #[test]
    fn test_compact_palette_drops_unused() {
        let mut frame = Frame {
            width: 2,
            height: 1,
            palette: Some(vec![0, 0, 0, 9, 9, 9, 255, 0, 0, 0, 255, 0]),
            transparent: Some(1),
            buffer: Cow::Owned(vec![2, 3]),
            ..Frame::default()
        };
        compact_palette(&mut frame);
        assert_eq!(frame.palette, Some(vec![255, 0, 0, 0, 255, 0]));
        assert_eq!(frame.buffer.as_ref(), &[0, 1]);
        assert_eq!(frame.transparent, None);
    }

    #[test]
    fn test_palette_skips_transparent_entry() {
        let palette = Palette {
            colors: vec![[0, 0, 0], [250, 250, 250]],
            transparent: Some(0),
        };
        assert_eq!(palette.nearest([5, 5, 5]), 1);

        let mut clear = Rgba([5, 5, 5, 0]);
        palette.map_color(&mut clear);
        assert_eq!(clear, Rgba([5, 5, 5, 0]));
    }
}
