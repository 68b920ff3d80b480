//! Rasterization through the poppler command-line tools.
//!
//! A call runs `pdfinfo` to learn the page count, clamps the requested range
//! to the document, splits it into contiguous chunks (one backend process per
//! chunk, at most `thread_count` of them) and decodes the PNG files the
//! processes leave in a private working directory.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use tracing::debug;

use super::{Backend, RasterOptions, Rasterizer};
use crate::error::ConvertError;
use crate::scratch::ARTIFACT_PREFIX;

const PDFINFO: &str = "pdfinfo";

/// [`Rasterizer`] backed by `pdftocairo` / `pdftoppm`.
#[derive(Debug, Clone, Default)]
pub struct PopplerRasterizer {
    tool_dir: Option<PathBuf>,
}

impl PopplerRasterizer {
    /// Use the poppler tools found on `PATH`.
    pub fn new() -> Self {
        Self { tool_dir: None }
    }

    /// Use the poppler tools installed in `dir`.
    pub fn with_tool_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_dir: Some(dir.into()),
        }
    }

    pub fn tool_dir(&self) -> Option<&Path> {
        self.tool_dir.as_deref()
    }

    fn program(&self, name: &str) -> PathBuf {
        match &self.tool_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Run a tool to completion. Dropping the future kills the process, so a
    /// failed sibling chunk never leaves a renderer writing into a removed
    /// workspace.
    async fn run(&self, name: &str, command: &mut Command) -> Result<Output, ConvertError> {
        command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConvertError::engine(format!("Failed to run {}: {}", name, e)))
    }

    /// Report the version string of the backend's executable.
    ///
    /// Used as a startup check that the backend is installed.
    pub async fn version(&self, backend: Backend) -> Result<String, ConvertError> {
        let name = backend.program();
        let output = self.run(name, Command::new(self.program(name)).arg("-v")).await?;

        // Older poppler releases print the version to stderr and exit non-zero.
        let text = if output.stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };

        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ConvertError::engine(format!("{} printed no version", name)))
    }

    /// Number of pages in the document.
    pub async fn page_count(&self, input: &Path) -> Result<u32, ConvertError> {
        let output = self
            .run(PDFINFO, Command::new(self.program(PDFINFO)).arg(input))
            .await?;

        if !output.status.success() {
            return Err(ConvertError::engine(format!(
                "Unable to get page count: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_page_count(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| ConvertError::engine("Unable to get page count: no Pages entry"))
    }

    async fn render_chunk(
        &self,
        input: &Path,
        first_page: u32,
        last_page: u32,
        options: &RasterOptions,
        prefix: PathBuf,
    ) -> Result<(), ConvertError> {
        let name = options.backend.program();
        let mut command = Command::new(self.program(name));
        command
            .arg("-png")
            .arg("-r")
            .arg(options.dpi.to_string())
            .arg("-f")
            .arg(first_page.to_string())
            .arg("-l")
            .arg(last_page.to_string())
            .arg(input)
            .arg(&prefix);

        debug!(
            backend = name,
            first_page,
            last_page,
            dpi = options.dpi,
            "Rendering pages"
        );

        let output = self.run(name, &mut command).await?;
        if !output.status.success() {
            return Err(ConvertError::engine(format!(
                "{} failed ({}): {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Rasterizer for PopplerRasterizer {
    async fn rasterize_range(
        &self,
        input: &Path,
        first_page: u32,
        last_page: u32,
        options: &RasterOptions,
    ) -> Result<Vec<DynamicImage>, ConvertError> {
        let total = self.page_count(input).await?;
        let last_page = last_page.min(total);
        if first_page < 1 || first_page > last_page {
            debug!(first_page, last_page, total, "Requested range is outside the document");
            return Ok(Vec::new());
        }

        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        let workspace = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .tempdir_in(parent)?;

        let chunks = plan_chunks(first_page, last_page, options.thread_count);
        let renders = chunks.iter().enumerate().map(|(i, &(first, last))| {
            let prefix = workspace.path().join(format!("chunk{:04}", i));
            self.render_chunk(input, first, last, options, prefix)
        });
        futures::future::try_join_all(renders).await?;

        let dir = workspace.path().to_path_buf();
        let images = tokio::task::spawn_blocking(move || load_pages(&dir))
            .await
            .map_err(|e| ConvertError::engine(format!("Page decode task failed: {}", e)))??;

        debug!(
            pages = images.len(),
            chunks = chunks.len(),
            "Rasterization complete"
        );

        Ok(images)
    }
}

/// Decode every PNG in `dir`, ordered by filename.
///
/// Chunk prefixes sort in chunk order and poppler zero-pads page numbers, so
/// filename order is page order.
fn load_pages(dir: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            image::open(path).map_err(|e| {
                ConvertError::engine(format!("Failed to decode {}: {}", path.display(), e))
            })
        })
        .collect()
}

/// Extract the `Pages:` value from `pdfinfo` output.
pub fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Split `first..=last` into at most `threads` contiguous chunks.
///
/// Earlier chunks receive the remainder, so sizes differ by at most one.
pub fn plan_chunks(first: u32, last: u32, threads: usize) -> Vec<(u32, u32)> {
    if first > last {
        return Vec::new();
    }

    let pages = (last - first + 1) as usize;
    let threads = threads.clamp(1, pages);
    let base = pages / threads;
    let mut remainder = pages % threads;

    let mut chunks = Vec::with_capacity(threads);
    let mut current = first;
    for _ in 0..threads {
        let size = base + usize::from(remainder > 0);
        remainder = remainder.saturating_sub(1);

        let end = current + size as u32 - 1;
        chunks.push((current, end));
        current = end + 1;
    }

    chunks
}

// =============================================================================
// Tests
// =============================================================================
