// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspection — load serialised documents with `lopdf` to check page
// count and page geometry before they leave the process.

use lopdf::{Dictionary, Document, Object, ObjectId};
use receta_core::error::{RecetaError, Result};
use tracing::{debug, instrument};

/// Read-only view over a serialised PDF.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    /// Parse PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !data.starts_with(b"%PDF") {
            return Err(RecetaError::Render("missing %PDF header".into()));
        }
        let document = Document::load_mem(data).map_err(|err| {
            RecetaError::Render(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// `(width, height)` in points of page `page_number` (1-indexed).
    pub fn page_size(&self, page_number: u32) -> Result<(f32, f32)> {
        let pages = self.document.get_pages();
        let page_id: ObjectId = *pages.get(&page_number).ok_or_else(|| {
            RecetaError::Render(format!(
                "page {page_number} out of range (document has {} pages)",
                pages.len()
            ))
        })?;

        let media_box = self
            .media_box(page_id)
            .ok_or_else(|| RecetaError::Render(format!("page {page_number} has no MediaBox")))?;

        match media_box.as_slice() {
            [x0, y0, x1, y1] => Ok((x1 - x0, y1 - y0)),
            _ => Err(RecetaError::Render(format!(
                "page {page_number} has a malformed MediaBox"
            ))),
        }
    }

    /// MediaBox of the page, inherited from the page tree when absent.
    fn media_box(&self, mut id: ObjectId) -> Option<Vec<f32>> {
        loop {
            let dict: &Dictionary = self.document.get_object(id).ok()?.as_dict().ok()?;
            if let Ok(obj) = dict.get(b"MediaBox") {
                let array = match obj {
                    Object::Reference(r) => self.document.get_object(*r).ok()?.as_array().ok()?,
                    other => other.as_array().ok()?,
                };
                return array.iter().map(|v| v.as_float().ok()).collect();
            }
            id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
    }
}
