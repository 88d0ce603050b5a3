// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receta-document — Prescription document composer.
//
// Turns a stored prescription into a paginated A4 PDF: two-column header with
// a Code128 barcode, medication and clinical columns, trailing dispensation
// sections, a signature block and a QR/legend footer on every page.

pub mod composer;
pub mod format;
pub mod pdf;
pub mod symbols;

pub use composer::{ComposedDocument, ComposerSettings, PORTAL_URL, PrescriptionComposer};
pub use pdf::PdfInspector;
pub use symbols::{Barcode, QrSymbol};
