// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scannable symbols embedded in the prescription: a Code128 barcode carrying
// the receipt number and a QR code pointing at the patient portal.

use barcoders::sym::code128::Code128;
use image::{DynamicImage, GrayImage, Luma};
use qrcode::{Color as QrColor, QrCode};
use receta_core::PrescriptionRecord;
use receta_core::error::{RecetaError, Result};
use receta_core::types::present;
use tracing::{debug, instrument};

use crate::pdf::canvas::{Face, Page, Raster, text_width};

/// Code128 start marker selecting character set B (printable ASCII).
const CODE128_SET_B: char = 'Ɓ';

/// Characters of the record id used when there is no receipt number.
const ID_PREFIX_LEN: usize = 12;

/// Pixels per QR module in the embedded raster.
const QR_MODULE_PX: u32 = 8;

/// Quiet zone around the QR code, in modules.
const QR_QUIET_ZONE: u32 = 4;

/// Text carried by the barcode: the receipt number when present, otherwise
/// the first twelve characters of the id, upper-cased.
pub fn barcode_content(record: &PrescriptionRecord) -> String {
    match present(record.numero_recibo.as_deref()) {
        Some(numero) => numero.to_owned(),
        None => record
            .id
            .chars()
            .take(ID_PREFIX_LEN)
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Encoded Code128 symbol: one entry per module, `1` for a bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    text: String,
    modules: Vec<u8>,
}

impl Barcode {
    /// Encode `text` with Code128 set B.
    #[instrument]
    pub fn code128(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(RecetaError::Symbol("barcode content is empty".into()));
        }
        let symbol = Code128::new(format!("{CODE128_SET_B}{text}"))
            .map_err(|e| RecetaError::Symbol(format!("Code128 rejected {text:?}: {e}")))?;
        let modules = symbol.encode();
        debug!(modules = modules.len(), "barcode encoded");
        Ok(Self {
            text: text.to_owned(),
            modules,
        })
    }

    /// Encode the barcode for a prescription.
    pub fn for_record(record: &PrescriptionRecord) -> Result<Self> {
        Self::code128(&barcode_content(record))
    }

    /// Human-readable text printed under the bars.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Draw the bars into `width` x `bar_height` at (`x`, `y`) and centre the
    /// text beneath them. Returns the y coordinate below the text.
    pub fn draw(
        &self,
        page: &mut Page,
        x: f32,
        y: f32,
        width: f32,
        bar_height: f32,
        text_size: f32,
    ) -> f32 {
        let module_w = width / self.modules.len().max(1) as f32;

        // Merge consecutive bar modules into a single rectangle.
        let mut run_start: Option<usize> = None;
        for (i, &bit) in self.modules.iter().chain(std::iter::once(&0)).enumerate() {
            match (bit == 1, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    page.rect(
                        x + start as f32 * module_w,
                        y,
                        (i - start) as f32 * module_w,
                        bar_height,
                        true,
                    );
                    run_start = None;
                }
                _ => {}
            }
        }

        let text_y = y + bar_height + 2.0;
        let text_w = text_width(&self.text, text_size, Face::Regular);
        page.text(
            x + (width - text_w) / 2.0,
            text_y,
            text_size,
            Face::Regular,
            self.text.clone(),
        );
        text_y + text_size * 1.25
    }
}

/// QR code rasterised for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct QrSymbol {
    raster: Raster,
}

impl QrSymbol {
    /// Encode `content` and rasterise it with a white quiet zone.
    #[instrument]
    pub fn encode(content: &str) -> Result<Self> {
        let code = QrCode::new(content.as_bytes())
            .map_err(|e| RecetaError::Symbol(format!("QR encoding failed: {e}")))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QR_QUIET_ZONE) * QR_MODULE_PX;

        let gray = GrayImage::from_fn(side, side, |px, py| {
            let mx = (px / QR_MODULE_PX).checked_sub(QR_QUIET_ZONE);
            let my = (py / QR_MODULE_PX).checked_sub(QR_QUIET_ZONE);
            match (mx, my) {
                (Some(mx), Some(my)) if mx < modules && my < modules => {
                    match colors[(my * modules + mx) as usize] {
                        QrColor::Dark => Luma([0u8]),
                        QrColor::Light => Luma([255u8]),
                    }
                }
                _ => Luma([255u8]),
            }
        });

        let rgb = DynamicImage::ImageLuma8(gray).to_rgb8();
        debug!(modules, side, "QR code rasterised");

        Ok(Self {
            raster: Raster {
                width: rgb.width() as usize,
                height: rgb.height() as usize,
                rgb: rgb.into_raw(),
            },
        })
    }

    pub fn into_raster(self) -> Raster {
        self.raster
    }
}
