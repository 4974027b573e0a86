//! OCR for pages with no extractable text.
//!
//! A page is rasterized to PNG by an external program (`pdftoppm` by
//! default) and the image is read by an OCR engine (`tesseract` by default).
//! Both steps sit behind traits so that tests and embedders can swap them.
//!
//! Every call works in its own freshly created scratch directory, which is
//! removed on every exit path; each image is deleted as soon as it has been
//! read.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use regex::Regex;

use super::{PageRecognizer, PageSource};
use crate::confidence::alpha_ratio;
use crate::error::{Error, Result};
use crate::model::PageExtraction;

/// Which pages to rasterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSpan {
    All,
    /// A single 1-indexed page.
    Single(u32),
}

/// Renders PDF pages to image files.
pub trait Rasterizer: Send + Sync {
    /// Render `pages` of `pdf` into `out_dir`, returning the image paths in
    /// page order.
    fn rasterize(&self, pdf: &Path, pages: PageSpan, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Reads text from an image file.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String>;
}

/// OCR configuration.
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Rasterizer program
    pub pdftoppm: PathBuf,
    /// OCR program
    pub tesseract: PathBuf,
    /// Rasterization resolution
    pub dpi: u32,
    /// Tesseract page segmentation mode
    pub psm: u8,
    /// Tesseract language (e.g. "eng", "eng+deu"); engine default when unset
    pub language: Option<String>,
    /// Rasterization attempts before giving up
    pub retries: u32,
    /// Pause between rasterization attempts
    pub retry_delay: Duration,
    /// Where scratch directories are created; the system temp dir when unset
    pub scratch_root: Option<PathBuf>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
            dpi: 150,
            psm: 3,
            language: None,
            retries: 2,
            retry_delay: Duration::from_secs(1),
            scratch_root: None,
        }
    }
}

impl OcrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pdftoppm(mut self, program: impl Into<PathBuf>) -> Self {
        self.pdftoppm = program.into();
        self
    }

    pub fn with_tesseract(mut self, program: impl Into<PathBuf>) -> Self {
        self.tesseract = program.into();
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }
}

/// Rasterizes through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path, pages: PageSpan, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png").arg("-r").arg(self.dpi.to_string());
        if let PageSpan::Single(n) = pages {
            cmd.arg("-f").arg(n.to_string()).arg("-l").arg(n.to_string());
        }
        cmd.arg(pdf).arg(out_dir.join("page"));

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(Error::Other(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        list_images(out_dir)
    }
}

/// Runs the `tesseract` command line.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    psm: u8,
    language: Option<String>,
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>, psm: u8, language: Option<String>) -> Self {
        Self {
            program: program.into(),
            psm,
            language,
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image)
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm.to_string());
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }

        let output = cmd.output().map_err(|e| {
            Error::OcrEngine(format!("failed to run {}: {}", self.program.display(), e))
        })?;
        if !output.status.success() {
            return Err(Error::OcrEngine(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// PNG files in `dir`, ordered by the page number suffix the rasterizer
/// appends (`page-1.png`, `page-02.png`, ...).
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    static PAGE_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = PAGE_SUFFIX.get_or_init(|| Regex::new(r"-(\d+)\.png$").unwrap());

    let mut images: Vec<(u32, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")))
        .map(|p| {
            let n = p
                .file_name()
                .and_then(|name| re.captures(&name.to_string_lossy()).and_then(|c| c[1].parse().ok()))
                .unwrap_or(u32::MAX);
            (n, p)
        })
        .collect();
    images.sort();

    Ok(images.into_iter().map(|(_, p)| p).collect())
}

/// A rasterized image, deleted when dropped.
struct ScratchImage(PathBuf);

impl ScratchImage {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Rasterize-then-recognize extractor.
#[derive(Clone)]
pub struct OcrExtractor {
    options: OcrOptions,
    rasterizer: Arc<dyn Rasterizer>,
    engine: Arc<dyn OcrEngine>,
}

impl Default for OcrExtractor {
    fn default() -> Self {
        Self::new(OcrOptions::default())
    }
}

impl OcrExtractor {
    /// Extractor using `pdftoppm` and `tesseract` as configured in `options`.
    pub fn new(options: OcrOptions) -> Self {
        let rasterizer = PdftoppmRasterizer::new(&options.pdftoppm, options.dpi);
        let engine = TesseractEngine::new(&options.tesseract, options.psm, options.language.clone());
        Self {
            options,
            rasterizer: Arc::new(rasterizer),
            engine: Arc::new(engine),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Arc::new(rasterizer);
        self
    }

    pub fn with_engine(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    /// OCR one page.
    pub fn extract_page(&self, path: &Path, page_number: u32) -> Result<PageExtraction> {
        self.with_scratch_dir("ocrpage_", |dir| {
            let images = self.rasterize_with_retry(path, PageSpan::Single(page_number), dir)?;
            let Some(image) = images.into_iter().next() else {
                return Err(Error::OcrEngine(format!(
                    "rasterizer produced no image for page {}",
                    page_number
                )));
            };
            self.recognize(ScratchImage(image), page_number)
        })
    }

    /// OCR every page of a document.
    pub fn extract_all(&self, path: &Path) -> Result<Vec<PageExtraction>> {
        self.with_scratch_dir("ocrpdf_", |dir| {
            let images = self.rasterize_with_retry(path, PageSpan::All, dir)?;
            log::debug!("OCR: {} page images", images.len());
            let images: Vec<ScratchImage> = images.into_iter().map(ScratchImage).collect();

            let mut pages = Vec::with_capacity(images.len());
            for (idx, image) in images.into_iter().enumerate() {
                pages.push(self.recognize(image, idx as u32 + 1)?);
            }
            Ok(pages)
        })
    }

    fn recognize(&self, image: ScratchImage, page_number: u32) -> Result<PageExtraction> {
        let raw = self.engine.recognize(image.path())?;
        let confidence = alpha_ratio(&raw);
        Ok(PageExtraction::ocr(page_number, raw.trim().to_string(), confidence))
    }

    fn rasterize_with_retry(&self, pdf: &Path, pages: PageSpan, dir: &Path) -> Result<Vec<PathBuf>> {
        let attempts = self.options.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.rasterizer.rasterize(pdf, pages, dir) {
                Ok(images) => return Ok(images),
                Err(e) => {
                    log::debug!("rasterize attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        thread::sleep(self.options.retry_delay);
                    }
                }
            }
        }

        Err(Error::OcrRasterizeExhausted {
            attempts,
            last_error,
        })
    }

    /// Run `f` in a new scratch directory that is removed afterwards,
    /// whatever `f` returns.
    fn with_scratch_dir<T>(&self, prefix: &str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &self.options.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();

        let result = f(&path);

        if let Err(e) = dir.close() {
            log::warn!("failed to remove scratch dir {}: {}", path.display(), e);
        }
        reclaim(&path);
        result
    }
}

/// Second removal attempt for a scratch directory that survived cleanup.
fn reclaim(dir: &Path) {
    if !dir.exists() {
        return;
    }
    log::debug!("scratch dir {} still present, removing again", dir.display());
    if let Err(e) = fs::remove_dir_all(dir) {
        log::warn!("could not reclaim {}: {}", dir.display(), e);
    }
}

impl PageRecognizer for OcrExtractor {
    fn recognize_page(&self, path: &Path, page_number: u32) -> Result<PageExtraction> {
        self.extract_page(path, page_number)
    }
}

impl PageSource for OcrExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract(&self, path: &Path) -> Result<Vec<PageExtraction>> {
        self.extract_all(path)
    }
}
