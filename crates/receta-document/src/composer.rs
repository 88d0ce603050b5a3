// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prescription composer — lays a `PrescriptionRecord` out on A4 pages.
//
// Page structure:
//
//   +--------------------------------------+
//   | brand / org / title  | Dr. / cédula   |
//   | pharmacy, patient    | fecha, estado  |
//   | vitals               | [ barcode ]    |
//   |--------------------------------------|
//   | Prescripción         | Información    |
//   |  1. medication       |   clínica      |
//   |  ...                 |   ...          |
//   | próxima consulta, dispensación        |
//   |                          ____________ |
//   |                          Dr. firma    |
//   | legend ...                   [QR]     |
//   +--------------------------------------+
//
// Body columns flow onto new pages when they run into the footer reserve.
// The footer is stamped on every page in a final pass.

use receta_core::PrescriptionRecord;
use receta_core::error::Result;
use receta_core::types::present;
use tracing::{debug, info, instrument};

use crate::format::{NOT_AVAILABLE, format_date, vital_lines};
use crate::pdf::canvas::{Canvas, Face, ImageId, Page, text_width, wrap_to_width};
use crate::symbols::{Barcode, QrSymbol};

/// Portal encoded in the QR code of every page.
pub const PORTAL_URL: &str = "https://www.recetadigital.mx";

/// Page margin on every side, in points.
pub const MARGIN: f32 = 40.0;
/// Space between the two columns.
pub const GUTTER: f32 = 10.0;
/// Height kept free at the bottom of the page for signature and footer.
pub const SIGNATURE_ZONE: f32 = 130.0;
/// Height kept free at the bottom of the page for the footer alone.
pub const FOOTER_RESERVE: f32 = 100.0;
/// Side of the QR code box in the footer.
pub const QR_SIZE: f32 = 50.0;
/// Length of the signature line.
pub const SIGNATURE_LINE: f32 = 150.0;

const LEFT_SHARE: f32 = 0.55;
const BARCODE_SHARE: f32 = 0.9;
const BARCODE_HEIGHT: f32 = 40.0;
const DIVIDER_GAP: f32 = 20.0;
const LEGEND_SIZE: f32 = 7.0;
const CHECKBOX: f32 = 10.0;

/// Fixed text printed on every prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub brand: String,
    pub organization: String,
    pub title: String,
    pub specialty: String,
    pub portal_url: String,
    pub legend: String,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            brand: "Receta Digital".into(),
            organization: "Servicios Médicos Integrales".into(),
            title: "RECETA MÉDICA".into(),
            specialty: "Médico General".into(),
            portal_url: PORTAL_URL.into(),
            legend: "Este documento es una receta médica emitida electrónicamente. \
                     Escanee el código QR para verificar su autenticidad en nuestro portal. \
                     Conserve este documento para la dispensación de sus medicamentos."
                .into(),
        }
    }
}

impl ComposerSettings {
    pub fn with_portal_url(mut self, url: impl Into<String>) -> Self {
        self.portal_url = url.into();
        self
    }
}

/// Laid-out document, still editable and inspectable before serialisation.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    canvas: Canvas,
    title: String,
    barcode_text: String,
}

impl ComposedDocument {
    pub fn page_count(&self) -> usize {
        self.canvas.page_count()
    }

    pub fn pages(&self) -> &[Page] {
        self.canvas.pages()
    }

    /// Text the barcode encodes.
    pub fn barcode_text(&self) -> &str {
        &self.barcode_text
    }

    /// All text runs of all pages, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.canvas.pages().iter().flat_map(Page::texts).collect()
    }

    /// Serialise to PDF bytes.
    pub fn to_pdf(&self) -> Result<Vec<u8>> {
        self.canvas.render(&self.title)
    }
}

/// Turns prescription records into A4 PDF documents.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionComposer {
    settings: ComposerSettings,
}

impl PrescriptionComposer {
    pub fn new(settings: ComposerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    /// Render `record` as PDF bytes.
    #[instrument(skip_all, fields(receta_id = %record.id))]
    pub fn compose(&self, record: &PrescriptionRecord) -> Result<Vec<u8>> {
        let document = self.layout(record)?;
        let bytes = document.to_pdf()?;
        info!(
            pages = document.page_count(),
            bytes = bytes.len(),
            "prescription rendered"
        );
        Ok(bytes)
    }

    /// Lay `record` out without serialising it.
    pub fn layout(&self, record: &PrescriptionRecord) -> Result<ComposedDocument> {
        // Symbols first: a bad barcode or QR payload fails the whole document.
        let barcode = Barcode::for_record(record)?;
        let qr = QrSymbol::encode(&self.settings.portal_url)?;

        let mut layout = Layout::new(&self.settings);
        let qr_image = layout.canvas.register_image(qr.into_raster());

        let body_top = layout.header(record, &barcode);
        let after_body = layout.body(record, body_top);
        let after_trailing = layout.trailing(record, after_body);
        layout.signature(record, after_trailing);
        layout.footer(qr_image);

        debug!(pages = layout.canvas.page_count(), "layout complete");

        Ok(ComposedDocument {
            canvas: layout.canvas,
            title: format!("Receta {}", record.id),
            barcode_text: barcode.text().to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Layout state
// ---------------------------------------------------------------------------

/// Position in the flow: page index, then y from the top of that page.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Cursor {
    page: usize,
    y: f32,
}

impl Cursor {
    fn later(self, other: Self) -> Self {
        if other > self { other } else { self }
    }
}

/// Horizontal extent of a column.
#[derive(Debug, Clone, Copy)]
struct Column {
    x: f32,
    width: f32,
}

struct Layout<'a> {
    settings: &'a ComposerSettings,
    canvas: Canvas,
    page_w: f32,
    page_h: f32,
    left: Column,
    right: Column,
}

fn line_height(size: f32) -> f32 {
    size * 1.25
}

impl<'a> Layout<'a> {
    fn new(settings: &'a ComposerSettings) -> Self {
        let canvas = Canvas::a4();
        let page_w = canvas.width_pt();
        let page_h = canvas.height_pt();
        let content_w = page_w - 2.0 * MARGIN;
        let left_w = content_w * LEFT_SHARE;

        Self {
            settings,
            canvas,
            page_w,
            page_h,
            left: Column {
                x: MARGIN,
                width: left_w,
            },
            right: Column {
                x: MARGIN + left_w + GUTTER,
                width: content_w - left_w - GUTTER,
            },
        }
    }

    fn content_width(&self) -> f32 {
        self.page_w - 2.0 * MARGIN
    }

    /// Bottom limit for body columns.
    fn body_limit(&self) -> f32 {
        self.page_h - FOOTER_RESERVE
    }

    /// Bottom limit for trailing sections.
    fn trailing_limit(&self) -> f32 {
        self.page_h - SIGNATURE_ZONE
    }

    /// Move to the top of the next page if `height` does not fit above `limit`.
    fn reserve(&mut self, cursor: &mut Cursor, height: f32, limit: f32) {
        if cursor.y + height > limit && cursor.y > MARGIN {
            cursor.page += 1;
            cursor.y = MARGIN;
            self.canvas.page(cursor.page);
        }
    }

    /// Write wrapped text in `column`, advancing the cursor line by line.
    fn write(
        &mut self,
        cursor: &mut Cursor,
        column: Column,
        size: f32,
        face: Face,
        text: &str,
        limit: f32,
    ) {
        let lh = line_height(size);
        for line in wrap_to_width(text, column.width, size, face) {
            self.reserve(cursor, lh, limit);
            self.canvas
                .page(cursor.page)
                .text(column.x, cursor.y, size, face, line);
            cursor.y += lh;
        }
    }

    /// Bold label followed by its wrapped value, then a small gap.
    fn labeled(&mut self, cursor: &mut Cursor, column: Column, label: &str, value: &str, limit: f32) {
        self.reserve(cursor, line_height(9.0) * 2.0, limit);
        self.write(cursor, column, 9.0, Face::Bold, label, limit);
        self.write(cursor, column, 9.0, Face::Regular, value, limit);
        cursor.y += 6.0;
    }

    fn labeled_if_present(
        &mut self,
        cursor: &mut Cursor,
        column: Column,
        label: &str,
        value: Option<&str>,
        limit: f32,
    ) {
        if let Some(value) = present(value) {
            self.labeled(cursor, column, label, value, limit);
        }
    }

    fn wrapped_height(&self, column: Column, size: f32, face: Face, text: &str) -> f32 {
        wrap_to_width(text, column.width, size, face).len() as f32 * line_height(size)
    }

    // -- Header ---------------------------------------------------------------

    /// Two-column header and divider; returns the y where the body starts.
    fn header(&mut self, record: &PrescriptionRecord, barcode: &Barcode) -> f32 {
        let no_limit = f32::INFINITY;
        let (left, right) = (self.left, self.right);
        let settings = self.settings;

        let mut l = Cursor { page: 0, y: MARGIN };
        self.write(&mut l, left, 16.0, Face::Bold, &settings.brand, no_limit);
        self.write(&mut l, left, 10.0, Face::Regular, &settings.organization, no_limit);
        self.write(&mut l, left, 13.0, Face::Bold, &settings.title, no_limit);
        l.y += 6.0;

        if let Some(farmacia) = &record.farmacia_info {
            let lines = [
                ("Farmacia", farmacia.nombre.as_deref()),
                ("Ubicación", farmacia.ubicacion.as_deref()),
                ("Teléfono", farmacia.telefono.as_deref()),
            ];
            let mut wrote_any = false;
            for (label, value) in lines {
                if let Some(value) = present(value) {
                    let line = format!("{label}: {value}");
                    self.write(&mut l, left, 9.0, Face::Regular, &line, no_limit);
                    wrote_any = true;
                }
            }
            if wrote_any {
                l.y += 6.0;
            }
        }

        self.write(&mut l, left, 9.0, Face::Bold, "Paciente:", no_limit);
        let paciente = present(record.paciente_nombre.as_deref()).unwrap_or(NOT_AVAILABLE);
        self.write(&mut l, left, 11.0, Face::Regular, paciente, no_limit);
        l.y += 4.0;

        for vital in vital_lines(record) {
            self.write(&mut l, left, 9.0, Face::Regular, &vital, no_limit);
        }

        let mut r = Cursor { page: 0, y: MARGIN };
        let doctor = present(record.doctor_nombre.as_deref()).unwrap_or(NOT_AVAILABLE);
        self.write(&mut r, right, 12.0, Face::Bold, &format!("Dr. {doctor}"), no_limit);
        self.write(&mut r, right, 9.0, Face::Regular, &settings.specialty, no_limit);
        if let Some(cedula) = present(record.doctor_cedula.as_deref()) {
            let line = format!("Cédula profesional: {cedula}");
            self.write(&mut r, right, 9.0, Face::Regular, &line, no_limit);
        }
        let fecha = format!(
            "Fecha de emisión: {}",
            format_date(record.fecha_emision.as_deref())
        );
        self.write(&mut r, right, 9.0, Face::Regular, &fecha, no_limit);
        if let Some(estado) = present(record.estado_dispensacion.as_deref()) {
            let line = format!("Estado: {estado}");
            self.write(&mut r, right, 9.0, Face::Regular, &line, no_limit);
        }
        r.y += 8.0;

        let barcode_w = right.width * BARCODE_SHARE;
        let barcode_x = right.x + (right.width - barcode_w) / 2.0;
        let barcode_end = barcode.draw(
            self.canvas.page(0),
            barcode_x,
            r.y,
            barcode_w,
            BARCODE_HEIGHT,
            9.0,
        );

        let divider_y = l.y.max(barcode_end) + DIVIDER_GAP;
        let (x0, x1) = (MARGIN, self.page_w - MARGIN);
        self.canvas
            .page(0)
            .line((x0, divider_y), (x1, divider_y), 1.0);

        divider_y + 15.0
    }

    // -- Body -----------------------------------------------------------------

    /// Prescription and clinical columns; returns the cursor below both.
    fn body(&mut self, record: &PrescriptionRecord, top: f32) -> Cursor {
        let limit = self.body_limit();
        let start = Cursor { page: 0, y: top };
        let left = self.prescription_column(record, start, limit);
        let right = self.clinical_column(record, start, limit);
        let end = left.later(right);

        self.column_divider(start, end, limit);

        Cursor {
            page: end.page,
            y: end.y + 15.0,
        }
    }

    fn prescription_column(&mut self, record: &PrescriptionRecord, start: Cursor, limit: f32) -> Cursor {
        let column = self.left;
        let mut c = start;
        self.write(&mut c, column, 12.0, Face::Bold, "Prescripción", limit);
        c.y += 4.0;

        for (index, med) in record.medicamentos.iter().enumerate() {
            let name = format!(
                "{}. {}",
                index + 1,
                present(med.nombre.as_deref()).unwrap_or("Medicamento sin nombre")
            );
            let detail = med.detail_line();
            let entry_h = self.wrapped_height(column, 10.0, Face::Bold, &name)
                + self.wrapped_height(column, 9.0, Face::Regular, &detail)
                + CHECKBOX
                + 14.0;
            self.reserve(&mut c, entry_h, limit);

            self.write(&mut c, column, 10.0, Face::Bold, &name, limit);
            let indented = Column {
                x: column.x + 12.0,
                width: column.width - 12.0,
            };
            if detail.is_empty() {
                c.y += line_height(9.0);
            } else {
                self.write(&mut c, indented, 9.0, Face::Regular, &detail, limit);
            }

            let label = "Cantidad surtida:";
            let page = self.canvas.page(c.page);
            page.text(indented.x, c.y, 9.0, Face::Regular, label);
            let box_x = indented.x + text_width(label, 9.0, Face::Regular) + 6.0;
            page.rect(box_x, c.y - 0.5, CHECKBOX, CHECKBOX, false);
            c.y += CHECKBOX + 4.0 + 10.0;
        }

        c
    }

    fn clinical_column(&mut self, record: &PrescriptionRecord, start: Cursor, limit: f32) -> Cursor {
        let column = self.right;
        let mut c = start;
        self.write(&mut c, column, 12.0, Face::Bold, "Información clínica", limit);
        c.y += 4.0;

        let clinical = [
            ("Motivo de consulta", record.motivo_consulta.as_deref()),
            ("Antecedentes", record.antecedentes.as_deref()),
            ("Diagnóstico", record.diagnostico.as_deref()),
            ("Exploración física", record.exploracion_fisica.as_deref()),
            ("Plan de tratamiento", record.plan_tratamiento.as_deref()),
        ];
        for (label, value) in clinical {
            self.labeled_if_present(&mut c, column, label, value, limit);
        }

        c.y += 6.0;
        self.write(
            &mut c,
            column,
            11.0,
            Face::Bold,
            "Información para el farmacéutico",
            limit,
        );
        c.y += 4.0;

        let pharmacist = [
            ("Indicaciones", record.indicaciones.as_deref()),
            ("Recomendaciones", record.recomendaciones.as_deref()),
            ("Observaciones", record.observaciones.as_deref()),
        ];
        for (label, value) in pharmacist {
            self.labeled_if_present(&mut c, column, label, value, limit);
        }

        c
    }

    /// Vertical rule between the body columns on every page they span.
    fn column_divider(&mut self, start: Cursor, end: Cursor, limit: f32) {
        let x = self.left.x + self.left.width + GUTTER / 2.0;
        for page in start.page..=end.page {
            let top = if page == start.page { start.y - 5.0 } else { MARGIN };
            let bottom = if page == end.page { end.y } else { limit };
            if bottom > top {
                self.canvas.page(page).line((x, top), (x, bottom), 0.5);
            }
        }
    }

    // -- Trailing sections ----------------------------------------------------

    fn trailing(&mut self, record: &PrescriptionRecord, mut c: Cursor) -> Cursor {
        let limit = self.trailing_limit();
        let column = self.left;

        if present(record.proxima_consulta.as_deref()).is_some() {
            let line = format!(
                "Próxima consulta: {}",
                format_date(record.proxima_consulta.as_deref())
            );
            self.reserve(&mut c, line_height(10.0) + 10.0, limit);
            self.write(&mut c, column, 10.0, Face::Bold, &line, limit);
            c.y += 10.0;
        }

        let estado = present(record.estado_dispensacion.as_deref());
        let fecha = present(record.fecha_dispensacion.as_deref());
        let detalle = present(record.medicamentos_dispensados_detalle.as_deref());
        if estado.is_some() || fecha.is_some() || detalle.is_some() {
            let detail_text = detalle.unwrap_or("Sin detalles registrados.");
            let estado_line = format!("Estado: {}", estado.unwrap_or(NOT_AVAILABLE));
            let fecha_line = format!("Fecha de dispensación: {}", format_date(fecha));

            let block_h = line_height(11.0)
                + 4.0
                + line_height(9.0) * 3.0
                + self.wrapped_height(column, 9.0, Face::Regular, detail_text)
                + 6.0;
            self.reserve(&mut c, block_h, limit);

            self.write(&mut c, column, 11.0, Face::Bold, "Información de dispensación", limit);
            c.y += 4.0;
            self.write(&mut c, column, 9.0, Face::Regular, &estado_line, limit);
            self.write(&mut c, column, 9.0, Face::Regular, &fecha_line, limit);
            self.labeled(&mut c, column, "Medicamentos dispensados:", detail_text, limit);
        }

        c
    }

    // -- Signature and footer -------------------------------------------------

    fn signature(&mut self, record: &PrescriptionRecord, mut c: Cursor) {
        let zone_top = self.trailing_limit();
        if c.y > zone_top {
            c.page += 1;
            c.y = MARGIN;
        }
        let y = c.y.max(zone_top);
        let x1 = self.page_w - MARGIN;
        let x0 = x1 - SIGNATURE_LINE;

        let doctor = present(record.doctor_nombre.as_deref()).unwrap_or(NOT_AVAILABLE);
        let name = format!("Dr. {doctor}");
        let name_w = text_width(&name, 9.0, Face::Regular);

        let page = self.canvas.page(c.page);
        page.line((x0, y), (x1, y), 0.75);
        page.text(x0 + (SIGNATURE_LINE - name_w) / 2.0, y + 4.0, 9.0, Face::Regular, name);
    }

    /// Stamp QR code and legend on every page.
    fn footer(&mut self, qr: ImageId) {
        let qr_x = self.page_w - MARGIN - QR_SIZE;
        let qr_y = self.page_h - MARGIN - QR_SIZE;
        let legend_w = self.content_width() - QR_SIZE - GUTTER;
        let legend = wrap_to_width(&self.settings.legend, legend_w, LEGEND_SIZE, Face::Regular);

        for page in self.canvas.pages_mut() {
            page.image(qr, qr_x, qr_y, QR_SIZE, QR_SIZE);
            let mut y = qr_y + 4.0;
            for line in &legend {
                page.text(MARGIN, y, LEGEND_SIZE, Face::Oblique, line.clone());
                y += line_height(LEGEND_SIZE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::canvas::Mark;
    use receta_core::{Medication, PharmacyInfo, Scalar};

    fn minimal() -> PrescriptionRecord {
        PrescriptionRecord {
            id: "9b1deb4d-3b7d-4bad-9bdd-2b0d7b3dcb6d".into(),
            paciente_nombre: Some("Ana López".into()),
            doctor_nombre: Some("Luis Pérez".into()),
            fecha_emision: Some("2026-10-18".into()),
            ..Default::default()
        }
    }

    fn med(nombre: &str) -> Medication {
        Medication {
            nombre: Some(nombre.into()),
            dosis: Some("500 mg".into()),
            frecuencia: Some("cada 8 horas".into()),
            duracion: Some("5 días".into()),
        }
    }

    fn layout(record: &PrescriptionRecord) -> ComposedDocument {
        PrescriptionComposer::default().layout(record).unwrap()
    }

    fn contains(doc: &ComposedDocument, needle: &str) -> bool {
        doc.texts().iter().any(|t| t.contains(needle))
    }

    #[test]
    fn minimal_record_fits_one_page() {
        let doc = layout(&minimal());
        assert_eq!(doc.page_count(), 1);
        assert!(contains(&doc, "Ana López"));
        assert!(contains(&doc, "Dr. Luis Pérez"));
        assert!(contains(&doc, "Fecha de emisión: 18/10/2026"));
    }

    #[test]
    fn barcode_uses_receipt_or_id() {
        let doc = layout(&minimal());
        assert_eq!(doc.barcode_text(), "9B1DEB4D-3B7");

        let mut record = minimal();
        record.numero_recibo = Some("REC-2026-0042".into());
        let doc = layout(&record);
        assert_eq!(doc.barcode_text(), "REC-2026-0042");
        assert!(contains(&doc, "REC-2026-0042"));
    }

    #[test]
    fn absent_blocks_are_omitted() {
        let doc = layout(&minimal());
        for label in [
            "Motivo de consulta",
            "Diagnóstico",
            "Indicaciones",
            "Cédula profesional",
            "Farmacia:",
            "Próxima consulta",
            "Información de dispensación",
            "Temperatura",
            "Estado:",
        ] {
            assert!(!contains(&doc, label), "unexpected block {label}");
        }
    }

    #[test]
    fn present_blocks_are_rendered() {
        let mut record = minimal();
        record.diagnostico = Some("Faringitis aguda".into());
        record.indicaciones = Some("Tomar con alimentos".into());
        record.doctor_cedula = Some("12345678".into());
        record.tension_arterial = Some(Scalar::from("120/80"));
        record.imc = Some(Scalar::from(23.456));
        record.proxima_consulta = Some("2026-11-01".into());
        record.farmacia_info = Some(PharmacyInfo {
            nombre: Some("Farmacia Central".into()),
            ubicacion: None,
            telefono: Some("555-0100".into()),
        });

        let doc = layout(&record);
        assert!(contains(&doc, "Diagnóstico"));
        assert!(contains(&doc, "Faringitis aguda"));
        assert!(contains(&doc, "Tomar con alimentos"));
        assert!(contains(&doc, "Cédula profesional: 12345678"));
        assert!(contains(&doc, "Tensión arterial: 120/80 mmHg"));
        assert!(contains(&doc, "IMC: 23.46"));
        assert!(contains(&doc, "Próxima consulta: 01/11/2026"));
        assert!(contains(&doc, "Farmacia: Farmacia Central"));
        assert!(contains(&doc, "Teléfono: 555-0100"));
        assert!(!contains(&doc, "Ubicación"));
        assert!(!contains(&doc, "Motivo de consulta"));
    }

    #[test]
    fn whitespace_only_fields_count_as_absent() {
        let mut record = minimal();
        record.diagnostico = Some("   ".into());
        record.temperatura_corporal = Some(Scalar::from(" "));
        let doc = layout(&record);
        assert!(!contains(&doc, "Diagnóstico"));
        assert!(!contains(&doc, "Temperatura"));
    }

    #[test]
    fn medications_are_numbered_in_order() {
        let mut record = minimal();
        record.medicamentos = vec![med("Amoxicilina"), med("Paracetamol"), med("Loratadina")];
        let doc = layout(&record);
        let texts = doc.texts();

        let pos = |needle: &str| texts.iter().position(|t| *t == needle).unwrap();
        assert!(pos("1. Amoxicilina") < pos("2. Paracetamol"));
        assert!(pos("2. Paracetamol") < pos("3. Loratadina"));
        assert!(contains(&doc, "500 mg / cada 8 horas / 5 días"));
        assert_eq!(
            texts.iter().filter(|t| **t == "Cantidad surtida:").count(),
            3
        );

        let checkboxes = doc.pages()[0]
            .marks()
            .iter()
            .filter(|m| {
                matches!(m, Mark::Rect { filled: false, width, height, .. }
                    if *width == CHECKBOX && *height == CHECKBOX)
            })
            .count();
        assert_eq!(checkboxes, 3);
    }

    #[test]
    fn name_only_medication_has_no_separators() {
        let mut record = minimal();
        record.medicamentos = vec![Medication {
            nombre: Some("Ibuprofeno".into()),
            ..Default::default()
        }];
        let doc = layout(&record);
        let texts = doc.texts();
        let name_at = texts.iter().position(|t| *t == "1. Ibuprofeno").unwrap();
        assert_eq!(texts[name_at + 1], "Cantidad surtida:");
        assert!(!texts.iter().any(|t| t.contains(" / ")));
    }

    #[test]
    fn dispensation_block_falls_back_to_no_details() {
        let mut record = minimal();
        record.estado_dispensacion = Some("Parcial".into());
        let doc = layout(&record);
        assert!(contains(&doc, "Información de dispensación"));
        assert!(contains(&doc, "Sin detalles registrados."));
        assert!(contains(&doc, "Fecha de dispensación: N/A"));

        let mut record = minimal();
        record.medicamentos_dispensados_detalle = Some("Amoxicilina x 21".into());
        let doc = layout(&record);
        assert!(contains(&doc, "Amoxicilina x 21"));
        assert!(contains(&doc, "Estado: N/A"));
    }

    #[test]
    fn overflow_adds_pages_with_identical_footers() {
        let mut record = minimal();
        record.medicamentos = (1..=40).map(|i| med(&format!("Medicamento {i}"))).collect();
        record.observaciones = Some("Observación extensa. ".repeat(60));
        record.estado_dispensacion = Some("Completa".into());

        let doc = layout(&record);
        assert!(doc.page_count() > 1);
        assert!(contains(&doc, "40. Medicamento 40"));

        let footer = |page: &Page| -> Vec<Mark> {
            page.marks()
                .iter()
                .filter(|m| match m {
                    Mark::Image { .. } => true,
                    Mark::Text { size, .. } => *size == LEGEND_SIZE,
                    _ => false,
                })
                .cloned()
                .collect()
        };
        let first = footer(&doc.pages()[0]);
        assert!(first.iter().any(|m| matches!(m, Mark::Image { .. })));
        assert!(first.len() > 1);
        for page in doc.pages() {
            assert_eq!(footer(page), first);
        }
    }

    #[test]
    fn body_text_stays_clear_of_the_footer() {
        let mut record = minimal();
        record.medicamentos = (1..=40).map(|i| med(&format!("Medicamento {i}"))).collect();
        let doc = layout(&record);
        let limit = Canvas::a4().height_pt() - FOOTER_RESERVE;

        for page in doc.pages() {
            for mark in page.marks() {
                if let Mark::Text { y, size, text, .. } = mark {
                    if *size != LEGEND_SIZE && text.starts_with(char::is_numeric) {
                        assert!(*y < limit, "{text} at {y} overlaps footer");
                    }
                }
            }
        }
    }

    #[test]
    fn signature_sits_in_the_reserved_zone() {
        let doc = layout(&minimal());
        let page_h = Canvas::a4().height_pt();
        let page = &doc.pages()[0];
        let sig_line = page
            .marks()
            .iter()
            .find_map(|m| match m {
                Mark::Line { from, to, .. } if (to.0 - from.0 - SIGNATURE_LINE).abs() < 0.01 => {
                    Some(from.1)
                }
                _ => None,
            })
            .unwrap();
        assert!((sig_line - (page_h - SIGNATURE_ZONE)).abs() < 0.01);
        // Doctor name printed twice: header and signature.
        assert_eq!(page.texts().filter(|t| *t == "Dr. Luis Pérez").count(), 2);
    }

    fn meds(count: usize) -> Vec<Medication> {
        (1..=count).map(|i| med(&format!("Medicamento {i}"))).collect()
    }

    /// Page index and y of the signature line.
    fn signature_line(doc: &ComposedDocument) -> (usize, f32) {
        doc.pages()
            .iter()
            .enumerate()
            .find_map(|(index, page)| {
                page.marks().iter().find_map(|m| match m {
                    Mark::Line { from, to, .. }
                        if (to.0 - from.0 - SIGNATURE_LINE).abs() < 0.01 =>
                    {
                        Some((index, from.1))
                    }
                    _ => None,
                })
            })
            .unwrap()
    }

    fn last_body_page(doc: &ComposedDocument) -> usize {
        doc.pages()
            .iter()
            .rposition(|p| p.texts().any(|t| t == "Cantidad surtida:"))
            .unwrap()
    }

    #[test]
    fn trailing_sections_stay_above_the_signature_zone() {
        let zone_top = Canvas::a4().height_pt() - SIGNATURE_ZONE;
        let trailing = [
            "Próxima consulta:",
            "Información de dispensación",
            "Estado:",
            "Fecha de dispensación:",
            "Medicamentos dispensados:",
            "Amoxicilina x 21",
        ];

        for count in 1..=40 {
            let mut record = minimal();
            record.medicamentos = meds(count);
            record.proxima_consulta = Some("2026-11-01".into());
            record.estado_dispensacion = Some("Completa".into());
            record.fecha_dispensacion = Some("2026-10-19".into());
            record.medicamentos_dispensados_detalle = Some("Amoxicilina x 21".into());
            let doc = layout(&record);

            let mut seen = 0;
            for page in doc.pages() {
                for mark in page.marks() {
                    let Mark::Text { x, y, size, text, .. } = mark else {
                        continue;
                    };
                    // Header "Estado:" sits in the right column.
                    if *x != MARGIN || !trailing.iter().any(|t| text.starts_with(t)) {
                        continue;
                    }
                    seen += 1;
                    assert!(
                        y + line_height(*size) <= zone_top + 0.01,
                        "{count} meds: {text} at {y} runs into the signature zone"
                    );
                }
            }
            assert_eq!(seen, trailing.len(), "{count} meds");

            let (sig_page, sig_y) = signature_line(&doc);
            assert_eq!(sig_page, doc.page_count() - 1, "{count} meds");
            assert!((sig_y - zone_top).abs() < 0.01, "{count} meds");
        }
    }

    #[test]
    fn signature_moves_to_a_new_page_when_body_ends_in_its_zone() {
        let zone_top = Canvas::a4().height_pt() - SIGNATURE_ZONE;
        let mut moved = 0;

        for count in 1..=40 {
            let mut record = minimal();
            record.medicamentos = meds(count);
            let doc = layout(&record);
            let (sig_page, sig_y) = signature_line(&doc);
            let body_page = last_body_page(&doc);

            assert!((sig_y - zone_top).abs() < 0.01, "{count} meds");
            assert!(sig_page == body_page || sig_page == body_page + 1, "{count} meds");
            assert_eq!(doc.page_count(), sig_page + 1, "{count} meds");

            for mark in doc.pages()[sig_page].marks() {
                if let Mark::Text { y, size, text, .. } = mark {
                    if *size == LEGEND_SIZE || text.starts_with("Dr. ") {
                        continue;
                    }
                    assert!(
                        y + line_height(*size) <= sig_y + 0.01,
                        "{count} meds: {text} at {y} crosses the signature"
                    );
                }
            }

            if sig_page > body_page {
                moved += 1;
                let content: Vec<&str> = doc.pages()[sig_page]
                    .marks()
                    .iter()
                    .filter_map(|m| match m {
                        Mark::Text { size, text, .. } if *size != LEGEND_SIZE => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(content, vec!["Dr. Luis Pérez"], "{count} meds");
            }
        }
        assert!(moved > 0, "no medication count pushed the signature over");
    }

    #[test]
    fn column_divider_spans_every_body_page() {
        let mut record = minimal();
        record.medicamentos = meds(40);
        let doc = layout(&record);
        let page_w = Canvas::a4().width_pt();
        let page_h = Canvas::a4().height_pt();
        let x = MARGIN + (page_w - 2.0 * MARGIN) * LEFT_SHARE + GUTTER / 2.0;

        let dividers = |page: &Page| -> Vec<((f32, f32), (f32, f32))> {
            page.marks()
                .iter()
                .filter_map(|m| match m {
                    Mark::Line { from, to, .. }
                        if (from.0 - x).abs() < 0.01 && (to.0 - x).abs() < 0.01 =>
                    {
                        Some((*from, *to))
                    }
                    _ => None,
                })
                .collect()
        };

        let body_page = last_body_page(&doc);
        assert!(body_page >= 2);
        for index in 0..=body_page {
            let found = dividers(&doc.pages()[index]);
            assert_eq!(found.len(), 1, "page {index}");
            let (from, to) = found[0];
            assert!(to.1 > from.1, "page {index}");
            if index > 0 {
                assert!((from.1 - MARGIN).abs() < 0.01, "page {index}");
            }
            if index < body_page {
                assert!((to.1 - (page_h - FOOTER_RESERVE)).abs() < 0.01, "page {index}");
            }
        }
        for page in &doc.pages()[body_page + 1..] {
            assert!(dividers(page).is_empty());
        }
    }

    #[test]
    fn remaining_clinical_blocks_follow_presence() {
        let doc = layout(&minimal());
        for label in [
            "Antecedentes",
            "Exploración física",
            "Recomendaciones",
            "Frecuencia respiratoria",
            "Altura",
            "Tipo de sangre",
        ] {
            assert!(!contains(&doc, label), "unexpected block {label}");
        }

        let mut record = minimal();
        record.motivo_consulta = Some("Dolor de garganta".into());
        record.antecedentes = Some("Asma infantil".into());
        record.exploracion_fisica = Some("Faringe hiperémica".into());
        record.recomendaciones = Some("Evitar bebidas frías".into());
        record.frecuencia_respiratoria = Some(Scalar::from("18"));
        record.altura = Some(Scalar::from("170"));
        record.blood_type = Some(Scalar::from("O+"));

        let doc = layout(&record);
        for text in [
            "Motivo de consulta",
            "Dolor de garganta",
            "Antecedentes",
            "Asma infantil",
            "Exploración física",
            "Faringe hiperémica",
            "Recomendaciones",
            "Evitar bebidas frías",
            "Frecuencia respiratoria: 18 rpm",
            "Altura: 170 cm",
            "Tipo de sangre: O+",
        ] {
            assert!(contains(&doc, text), "missing {text}");
        }

        let texts = doc.texts();
        let pos = |needle: &str| texts.iter().position(|t| *t == needle).unwrap();
        assert!(pos("Motivo de consulta") < pos("Antecedentes"));
        assert!(pos("Antecedentes") < pos("Exploración física"));
        assert!(pos("Información para el farmacéutico") < pos("Recomendaciones"));
    }

    #[test]
    fn compose_produces_pdf_bytes() {
        let mut record = minimal();
        record.medicamentos = vec![med("Amoxicilina")];
        let bytes = PrescriptionComposer::default().compose(&record).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn non_ascii_barcode_fails_the_document() {
        let mut record = minimal();
        record.numero_recibo = Some("RECETA-Ñ".into());
        assert!(PrescriptionComposer::default().compose(&record).is_err());
    }

    #[test]
    fn portal_url_is_configurable() {
        let composer = PrescriptionComposer::new(
            ComposerSettings::default().with_portal_url("https://portal.example.org"),
        );
        assert_eq!(composer.settings().portal_url, "https://portal.example.org");
        assert!(composer.layout(&minimal()).is_ok());
    }
}
