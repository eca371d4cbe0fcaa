use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbaImage;
use walkdir::WalkDir;

use crate::background::domain::background_remover::BackgroundRemover;
use crate::detection::domain::face_locator::FaceLocator;
use crate::imaging::domain::image_crop::crop_padded;
use crate::imaging::domain::image_resizer::ImageResizer;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::pipeline::failure_log::FailureLog;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::avatar_size::{avatar_file_name, AvatarSize};
use crate::shared::constants::{ERROR_DIR_PREFIX, IMAGE_EXTENSIONS, ORIGINAL_FILE_NAME};
use crate::shared::face_rect::FaceRect;

/// Scaled copy used for the large variants and the 86×86 face crop.
const LARGE: AvatarSize = AvatarSize::S204x350;
/// Scaled copy used for the 136×234 variant and the 38×38 face crop.
const MEDIUM: AvatarSize = AvatarSize::S136x234;

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    /// Processed files where the 86×86 face search found nothing.
    pub face_misses: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What happened to one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub output_dir: PathBuf,
    pub face_found: bool,
}

/// Batch avatar pipeline: walk → remove background → resize → locate face →
/// crop → write.
///
/// Every image under the input root gets an output directory under the
/// output root at the same relative location, named after the file stem
/// (`error_{stem}` when no face was found at 86×86).
pub struct AvatarPipelineUseCase {
    remover: Box<dyn BackgroundRemover>,
    locator: FaceLocator,
    resizer: Box<dyn ImageResizer>,
    writer: Box<dyn ImageWriter>,
    logger: Box<dyn PipelineLogger>,
}

impl AvatarPipelineUseCase {
    pub fn new(
        remover: Box<dyn BackgroundRemover>,
        locator: FaceLocator,
        resizer: Box<dyn ImageResizer>,
        writer: Box<dyn ImageWriter>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            remover,
            locator,
            resizer,
            writer,
            logger,
        }
    }

    /// Processes every image under `input_root`.
    ///
    /// Per-file failures are collected in the report; only a missing input
    /// root or an unusable output root fails the whole batch.
    pub fn execute(
        &mut self,
        input_root: &Path,
        output_root: &Path,
    ) -> Result<BatchReport, Box<dyn std::error::Error>> {
        if !input_root.is_dir() {
            return Err(format!("input directory not found: {}", input_root.display()).into());
        }
        fs::create_dir_all(output_root)?;

        let files = collect_images(input_root, output_root)?;
        let failure_log = FailureLog::new(output_root);
        let mut report = BatchReport {
            total: files.len(),
            ..Default::default()
        };
        self.logger
            .info(&format!("Found {} images in {}", files.len(), input_root.display()));

        for (i, path) in files.iter().enumerate() {
            self.logger.progress(i + 1, files.len(), path);
            match self.process_file(input_root, output_root, path, &failure_log) {
                Ok(file) => {
                    report.processed += 1;
                    if !file.face_found {
                        report.face_misses += 1;
                    }
                    self.logger.outcome(path, true);
                }
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    report.failures.push((path.clone(), e.to_string()));
                    self.logger.outcome(path, false);
                }
            }
        }

        self.logger.summary();
        Ok(report)
    }

    /// Runs the full per-image sequence for one file.
    pub fn process_file(
        &mut self,
        input_root: &Path,
        output_root: &Path,
        path: &Path,
        failure_log: &FailureLog,
    ) -> Result<FileReport, Box<dyn std::error::Error>> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or("image path has no file name")?;
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.clone());
        let relative_dir = path
            .parent()
            .and_then(|p| p.strip_prefix(input_root).ok())
            .unwrap_or_else(|| Path::new(""));
        let parent_dir = output_root.join(relative_dir);

        let t = Instant::now();
        let original = self.remove_background(path, &stem)?;
        self.logger.timing("remove_bg", elapsed_ms(t));

        let t = Instant::now();
        let large = self.resizer.resize(&original, LARGE.width(), LARGE.height());
        let medium = self
            .resizer
            .resize(&original, MEDIUM.width(), MEDIUM.height());
        self.logger.timing("resize", elapsed_ms(t));

        let t = Instant::now();
        let face_large = self.find_face(&large, AvatarSize::S86x86, path);
        self.logger.timing("locate", elapsed_ms(t));

        let output_dir = match face_large {
            Some(_) => parent_dir.join(&stem),
            None => {
                log::warn!("No face found in {}", path.display());
                failure_log.record_face_miss(&file_name)?;
                parent_dir.join(format!("{ERROR_DIR_PREFIX}{stem}"))
            }
        };

        let t = Instant::now();
        if let Some(rect) = face_large {
            self.write_face_crop(&large, rect, &output_dir)?;
        }
        for (size, source) in [
            (AvatarSize::S204x350, &large),
            (AvatarSize::S204x175, &large),
            (AvatarSize::S136x234, &medium),
        ] {
            self.write_fixed_crop(source, size, &output_dir)?;
        }
        self.logger.timing("write", elapsed_ms(t));

        let t = Instant::now();
        let face_medium = self.find_face(&medium, AvatarSize::S38x38, path);
        self.logger.timing("locate", elapsed_ms(t));

        let t = Instant::now();
        if let Some(rect) = face_medium {
            self.write_face_crop(&medium, rect, &output_dir)?;
        }
        self.writer
            .write(&output_dir.join(ORIGINAL_FILE_NAME), &original, None)?;
        self.logger.timing("write", elapsed_ms(t));

        log::debug!("Wrote avatars to {}", output_dir.display());
        Ok(FileReport {
            output_dir,
            face_found: face_large.is_some(),
        })
    }

    /// Removes the background into a staging file and loads the result.
    ///
    /// The staging file is deleted whether or not loading succeeds.
    fn remove_background(
        &mut self,
        path: &Path,
        stem: &str,
    ) -> Result<RgbaImage, Box<dyn std::error::Error>> {
        let staging = tempfile::Builder::new()
            .prefix(&format!("temp_{stem}_"))
            .suffix(".png")
            .tempfile()?
            .into_temp_path();

        let loaded: Result<RgbaImage, Box<dyn std::error::Error>> =
            match self.remover.remove_background(path, &staging) {
                Ok(()) => image::open(&staging)
                    .map(|img| img.to_rgba8())
                    .map_err(Into::into),
                Err(e) => Err(e.into()),
            };

        if let Err(e) = staging.close() {
            log::debug!("Could not delete staging file: {e}");
        }
        loaded
    }

    fn find_face(&mut self, image: &RgbaImage, size: AvatarSize, path: &Path) -> Option<FaceRect> {
        match self.locator.locate_optimized(image, size.dimensions()) {
            Ok(rect) => rect,
            Err(e) => {
                log::warn!("Face search failed for {}: {e}", path.display());
                None
            }
        }
    }

    fn write_face_crop(
        &self,
        source: &RgbaImage,
        rect: FaceRect,
        output_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let name = avatar_file_name(rect.width, rect.height);
        self.writer
            .write(&output_dir.join(name), &crop_padded(source, rect), None)
    }

    /// Crops `(0, 0, w, h)` and force-resizes to `w × h`.
    fn write_fixed_crop(
        &self,
        source: &RgbaImage,
        size: AvatarSize,
        output_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (w, h) = size.dimensions();
        let crop = crop_padded(source, FaceRect::new(0, 0, w, h));
        self.writer
            .write(&output_dir.join(size.file_name()), &crop, Some((w, h)))
    }
}

/// Image files under `input_root` in file-name order, skipping
/// `output_root` when it is nested inside the input tree.
pub fn collect_images(
    input_root: &Path,
    output_root: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let output_canonical = output_root.canonicalize().ok();
    let is_output = |path: &Path| match &output_canonical {
        Some(out) => path.canonicalize().map(|p| &p == out).unwrap_or(false),
        None => false,
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(input_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_output(e.path())));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
