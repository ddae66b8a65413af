//! Images to PDF.
//!
//! Each image becomes one page. Pixels are embedded as an 8-bit RGB image
//! XObject; the page content stream only positions and scales it.

use lopdf::content::{Content, Operation as ContentOp};
use lopdf::{Dictionary, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::task;
use tracing::{debug, warn};

use crate::error::{DocError, Result};
use crate::operation::{Operation, OperationKind, OperationRequest, Outcome};
use crate::pdf::DocumentBuilder;
use crate::utils::{check_file_exists, ensure_parent_dir};

use super::{geometry_value, save_built, warning_text};

/// Resolution assumed for images without a fixed page size.
const IMAGE_DPI: f32 = 150.0;

/// Margin around images on fixed-size pages.
const MARGIN_MM: f32 = 15.0;

const POINTS_PER_INCH: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;

fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_INCH * POINTS_PER_INCH
}

/// Page size for image pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    /// Page sized to the image at 150 DPI.
    #[default]
    Fit,
    /// ISO A4, 210 x 297 mm.
    A4,
    /// US Letter, 8.5 x 11 in.
    Letter,
}

impl PageSize {
    /// Portrait dimensions in points, `None` for [`PageSize::Fit`].
    pub fn dimensions(&self) -> Option<(f32, f32)> {
        match self {
            Self::Fit => None,
            Self::A4 => Some((mm_to_pt(210.0), mm_to_pt(297.0))),
            Self::Letter => Some((612.0, 792.0)),
        }
    }
}

impl FromStr for PageSize {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            _ => Err(DocError::invalid_option(
                "page_size",
                format!("{s}. Must be one of: fit, a4, letter"),
            )),
        }
    }
}

/// Where an image lands on its page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    page_width: f32,
    page_height: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Placement {
    /// Lay out a `pixels_w` x `pixels_h` image.
    ///
    /// Fixed page sizes take the image's orientation, keep a margin, and
    /// scale the image down (never up) to fit, centred.
    fn compute(pixels_w: u32, pixels_h: u32, page_size: PageSize) -> Self {
        let natural_w = pixels_w as f32 / IMAGE_DPI * POINTS_PER_INCH;
        let natural_h = pixels_h as f32 / IMAGE_DPI * POINTS_PER_INCH;

        let Some((short, long)) = page_size.dimensions() else {
            return Self {
                page_width: natural_w,
                page_height: natural_h,
                x: 0.0,
                y: 0.0,
                width: natural_w,
                height: natural_h,
            };
        };

        let (page_width, page_height) = if pixels_w > pixels_h {
            (long, short)
        } else {
            (short, long)
        };

        let margin = mm_to_pt(MARGIN_MM);
        let usable_w = page_width - 2.0 * margin;
        let usable_h = page_height - 2.0 * margin;
        let scale = (usable_w / natural_w).min(usable_h / natural_h).min(1.0);

        let (width, height) = (natural_w * scale, natural_h * scale);
        Self {
            page_width,
            page_height,
            x: margin + (usable_w - width) / 2.0,
            y: margin + (usable_h - height) / 2.0,
            width,
            height,
        }
    }
}

/// Decoded image ready for embedding.
struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

async fn decode(path: &Path) -> Result<DecodedImage> {
    check_file_exists(path).await?;

    let path = path.to_path_buf();
    task::spawn_blocking(move || {
        let image = image::open(&path).map_err(|e| DocError::FailedToDecodeImage {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DocError::FailedToDecodeImage {
                path,
                reason: "image has no pixels".to_string(),
            });
        }
        Ok(DecodedImage {
            width,
            height,
            rgb: rgb.into_raw(),
        })
    })
    .await
    .map_err(|e| DocError::other(format!("Decode task failed: {e}")))?
}

/// Add `image` as a new page of `builder`.
fn push_image_page(
    builder: &mut DocumentBuilder,
    image: DecodedImage,
    page_size: PageSize,
) -> Result<()> {
    let placement = Placement::compute(image.width, image.height, page_size);

    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        image.rgb,
    );
    let xobject_id = builder.add_object(xobject);

    let content = Content {
        operations: vec![
            ContentOp::new("q", vec![]),
            ContentOp::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            ContentOp::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            ContentOp::new("Q", vec![]),
        ],
    };
    let content_id = builder.add_object(Stream::new(Dictionary::new(), content.encode()?));

    builder.push_page(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![
            0.into(),
            0.into(),
            placement.page_width.into(),
            placement.page_height.into(),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => xobject_id },
        },
    });
    Ok(())
}

/// Turn images into a PDF, one page per image.
///
/// Images come from the `files` option, or the primary input when `files`
/// is absent. Missing or undecodable images are skipped with a warning.
///
/// Options: `files`, `page_size` (`fit`, `a4`, `letter`), `metadata`,
/// `quality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagesToPdf;

impl ImagesToPdf {
    /// Create the operation.
    pub fn new() -> Self {
        Self
    }
}

impl Operation for ImagesToPdf {
    fn kind(&self) -> OperationKind {
        OperationKind::ImagesToPdf
    }

    async fn execute(&self, request: &OperationRequest<'_>) -> Result<Outcome> {
        let mut files = request.options.paths("files");
        if files.is_empty() && !request.input.as_os_str().is_empty() {
            files.push(request.input.to_path_buf());
        }
        if files.is_empty() {
            return Err(DocError::missing_option("files"));
        }

        let page_size = match request.options.string("page_size") {
            Some(value) => value.parse()?,
            None => PageSize::default(),
        };
        let compression = request.options.compression()?;
        ensure_parent_dir(request.output).await?;

        let mut builder = DocumentBuilder::new();
        let mut converted: Vec<PathBuf> = Vec::new();
        let mut warnings = Vec::new();

        for path in &files {
            match decode(path).await {
                Ok(image) => {
                    debug!(
                        file = %path.display(),
                        width = image.width,
                        height = image.height,
                        "Adding image page"
                    );
                    push_image_page(&mut builder, image, page_size)?;
                    converted.push(path.clone());
                }
                Err(err) if err.is_recoverable() => {
                    warn!(file = %path.display(), error = %err, "Skipping image");
                    warnings.push(format!("Skipped {}: {}", path.display(), warning_text(&err)));
                }
                Err(err) => return Err(err),
            }
        }

        if converted.is_empty() {
            return Err(DocError::NoUsableInputs {
                listed: files.len(),
            });
        }

        let geometry = builder.geometry().to_vec();
        let stats = save_built(
            builder,
            &request.options.metadata(),
            compression,
            request.output,
        )
        .await?;

        Ok(Outcome::new(format!(
            "Converted {} of {} image(s) to PDF",
            converted.len(),
            files.len()
        ))
        .detail("images_count", files.len())
        .detail("pages", converted.len())
        .detail("geometry", geometry_value(&geometry))
        .detail("output_size", stats.file_size)
        .warnings(warnings))
    }
}
