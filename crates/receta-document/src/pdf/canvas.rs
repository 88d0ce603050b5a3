// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-buffer canvas — an in-memory display list per page, serialised to PDF
// with `printpdf` 0.8 only once every page is final.
//
// Layout code works in points with the origin at the top-left corner and y
// growing downward. The flip to PDF's bottom-left origin happens in
// `Canvas::render`, so earlier pages can still be decorated (e.g. footers)
// after later pages have been laid out.

use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, RawImageData,
    RawImageFormat, Rgb, TextItem, WindingOrder, XObjectId, XObjectTransform,
};
use receta_core::error::{RecetaError, Result};
use tracing::{debug, instrument};

/// ISO A4 width in millimetres.
pub const A4_WIDTH_MM: f32 = 210.0;
/// ISO A4 height in millimetres.
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Fraction of the font size between the top of a line and its baseline.
const ASCENT: f32 = 0.8;

/// Built-in font faces used by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Oblique,
}

impl Face {
    fn builtin(self) -> BuiltinFont {
        match self {
            Self::Regular => BuiltinFont::Helvetica,
            Self::Bold => BuiltinFont::HelveticaBold,
            Self::Oblique => BuiltinFont::HelveticaOblique,
        }
    }

    /// Average glyph advance as a fraction of the font size.
    fn average_advance(self) -> f32 {
        match self {
            Self::Regular | Self::Oblique => 0.50,
            Self::Bold => 0.55,
        }
    }
}

/// Estimated rendered width of `text` in points.
///
/// Built-in fonts carry no metrics in the document, so this uses an average
/// Helvetica advance. Good enough for centring and wrapping.
pub fn text_width(text: &str, size: f32, face: Face) -> f32 {
    text.chars().count() as f32 * size * face.average_advance()
}

/// Handle to an image registered with [`Canvas::register_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

/// An RGB8 raster ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

/// One drawing instruction, in top-left page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// Single line of text; `y` is the top of the line box.
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        text: String,
    },
    /// Stroked straight segment.
    Line {
        from: (f32, f32),
        to: (f32, f32),
        thickness: f32,
    },
    /// Axis-aligned rectangle anchored at its top-left corner.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        filled: bool,
    },
    /// Registered raster scaled into the given box.
    Image {
        image: ImageId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Display list of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    marks: Vec<Mark>,
}

impl Page {
    pub fn text(&mut self, x: f32, y: f32, size: f32, face: Face, text: impl Into<String>) {
        self.marks.push(Mark::Text {
            x,
            y,
            size,
            face,
            text: text.into(),
        });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), thickness: f32) {
        self.marks.push(Mark::Line {
            from,
            to,
            thickness,
        });
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, filled: bool) {
        self.marks.push(Mark::Rect {
            x,
            y,
            width,
            height,
            filled,
        });
    }

    pub fn image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32) {
        self.marks.push(Mark::Image {
            image,
            x,
            y,
            width,
            height,
        });
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Every text run on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().filter_map(|mark| match mark {
            Mark::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Multi-page canvas that keeps every page editable until [`Canvas::render`].
#[derive(Debug, Clone)]
pub struct Canvas {
    width: Mm,
    height: Mm,
    pages: Vec<Page>,
    images: Vec<Raster>,
}

impl Canvas {
    /// Create a canvas with a single blank page of the given size.
    pub fn new(width: Mm, height: Mm) -> Self {
        Self {
            width,
            height,
            pages: vec![Page::default()],
            images: Vec::new(),
        }
    }

    /// Create a single-page A4 canvas.
    pub fn a4() -> Self {
        Self::new(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM))
    }

    /// Page width in points.
    pub fn width_pt(&self) -> f32 {
        self.width.into_pt().0
    }

    /// Page height in points.
    pub fn height_pt(&self) -> f32 {
        self.height.into_pt().0
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Mutable access to every page, for finalisation passes.
    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut Page> {
        self.pages.iter_mut()
    }

    /// Page at `index`, appending blank pages up to it if needed.
    pub fn page(&mut self, index: usize) -> &mut Page {
        if index >= self.pages.len() {
            self.pages.resize_with(index + 1, Page::default);
        }
        &mut self.pages[index]
    }

    /// Store a raster once; pages reference it through the returned id.
    pub fn register_image(&mut self, raster: Raster) -> ImageId {
        self.images.push(raster);
        ImageId(self.images.len() - 1)
    }

    /// Serialise every page into a PDF document.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn render(&self, title: &str) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new(title);

        let mut xobjects: Vec<(XObjectId, &Raster)> = Vec::with_capacity(self.images.len());
        for raster in &self.images {
            if raster.rgb.len() != raster.width * raster.height * 3 {
                return Err(RecetaError::Render(format!(
                    "raster {}x{} has {} bytes of RGB data",
                    raster.width,
                    raster.height,
                    raster.rgb.len()
                )));
            }
            let raw = RawImage {
                pixels: RawImageData::U8(raster.rgb.clone()),
                width: raster.width,
                height: raster.height,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            xobjects.push((doc.add_image(&raw), raster));
        }

        let page_h = self.height_pt();
        let pages: Vec<PdfPage> = self
            .pages
            .iter()
            .map(|page| {
                let ops = page_ops(page, page_h, &xobjects);
                PdfPage::new(self.width, self.height, ops)
            })
            .collect();
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

        if !output.starts_with(b"%PDF") {
            return Err(RecetaError::Render(
                "serialised document has no PDF header".into(),
            ));
        }

        debug!(
            bytes = output.len(),
            warnings = warnings.len(),
            "PDF serialised"
        );
        Ok(output)
    }
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn point(x: f32, y: f32, page_h: f32) -> LinePoint {
    LinePoint {
        p: Point {
            x: Pt(x),
            y: Pt(page_h - y),
        },
        bezier: false,
    }
}

/// Translate one page's display list into printpdf operations.
fn page_ops(page: &Page, page_h: f32, xobjects: &[(XObjectId, &Raster)]) -> Vec<Op> {
    let mut ops = vec![
        Op::SetFillColor { col: black() },
        Op::SetOutlineColor { col: black() },
    ];

    for mark in &page.marks {
        match mark {
            Mark::Text {
                x,
                y,
                size,
                face,
                text,
            } => {
                if text.is_empty() {
                    continue;
                }
                let font = face.builtin();
                ops.push(Op::StartTextSection);
                ops.push(Op::SetTextCursor {
                    pos: Point {
                        x: Pt(*x),
                        y: Pt(page_h - y - size * ASCENT),
                    },
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(*size),
                    font,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(text.clone())],
                    font,
                });
                ops.push(Op::EndTextSection);
            }
            Mark::Line {
                from,
                to,
                thickness,
            } => {
                ops.push(Op::SetOutlineThickness { pt: Pt(*thickness) });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(from.0, from.1, page_h), point(to.0, to.1, page_h)],
                        is_closed: false,
                    },
                });
            }
            Mark::Rect {
                x,
                y,
                width,
                height,
                filled,
            } => {
                if !filled {
                    ops.push(Op::SetOutlineThickness { pt: Pt(0.75) });
                }
                let ring = PolygonRing {
                    points: vec![
                        point(*x, *y, page_h),
                        point(x + width, *y, page_h),
                        point(x + width, y + height, page_h),
                        point(*x, y + height, page_h),
                    ],
                };
                ops.push(Op::DrawPolygon {
                    polygon: Polygon {
                        rings: vec![ring],
                        mode: if *filled {
                            PaintMode::Fill
                        } else {
                            PaintMode::Stroke
                        },
                        winding_order: WindingOrder::NonZero,
                    },
                });
            }
            Mark::Image {
                image,
                x,
                y,
                width,
                height,
            } => {
                let Some((id, raster)) = xobjects.get(image.0) else {
                    continue;
                };
                // At 72 dpi one pixel is one point, so the scale is the box
                // size over the pixel size.
                ops.push(Op::UseXobject {
                    id: id.clone(),
                    transform: XObjectTransform {
                        translate_x: Some(Pt(*x)),
                        translate_y: Some(Pt(page_h - y - height)),
                        scale_x: Some(width / raster.width as f32),
                        scale_y: Some(height / raster.height as f32),
                        dpi: Some(72.0),
                        rotate: None,
                    },
                });
            }
        }
    }

    ops
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap `text` so that no line exceeds `max_chars` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within
/// each paragraph. Words longer than `max_chars` are force-broken on
/// character boundaries.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut result = Vec::new();

    for paragraph in text.lines() {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_chars {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_chars).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current, word.to_owned()));
                current_len = word_len;
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}

/// Wrap `text` to fit `width` points at the given size and face.
pub fn wrap_to_width(text: &str, width: f32, size: f32, face: Face) -> Vec<String> {
    let max_chars = (width / (size * face.average_advance())) as usize;
    wrap_text(text, max_chars)
}
