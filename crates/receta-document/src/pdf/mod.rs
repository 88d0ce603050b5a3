// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page-buffer canvas for writing, lopdf-backed inspection for
// reading finished documents back.

pub mod canvas;
pub mod inspect;

pub use canvas::Canvas;
pub use inspect::PdfInspector;
