// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value formatting for the printed prescription: short dates, BMI and the
// vital-sign lines of the header.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use receta_core::{PrescriptionRecord, Scalar};

/// Placeholder for a missing or unreadable date.
pub const NOT_AVAILABLE: &str = "N/A";

/// Parse the date part of an ISO-8601 timestamp or plain date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// `DD/MM/YYYY`, or `N/A` when absent or unparseable.
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(parse_date)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

/// BMI with exactly two decimals; non-numeric input is printed as given.
pub fn format_bmi(value: &Scalar) -> Option<String> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Some(format!("{n:.2}")),
        _ => value.display(),
    }
}

/// `Label: value[ unit]` for each vital sign that has a value.
pub fn vital_lines(record: &PrescriptionRecord) -> Vec<String> {
    let plain = |v: &Scalar| v.display();
    let vitals: [(&str, Option<&Scalar>, &str, &dyn Fn(&Scalar) -> Option<String>); 9] = [
        ("Temperatura", record.temperatura_corporal.as_ref(), " °C", &plain),
        ("Frecuencia cardiaca", record.frecuencia_cardiaca.as_ref(), " lpm", &plain),
        (
            "Frecuencia respiratoria",
            record.frecuencia_respiratoria.as_ref(),
            " rpm",
            &plain,
        ),
        ("Tensión arterial", record.tension_arterial.as_ref(), " mmHg", &plain),
        ("Peso", record.peso.as_ref(), " kg", &plain),
        ("Altura", record.altura.as_ref(), " cm", &plain),
        ("IMC", record.imc.as_ref(), "", &format_bmi),
        ("Tipo de sangre", record.blood_type.as_ref(), "", &plain),
        ("Alergias", record.allergies.as_ref(), "", &plain),
    ];

    vitals
        .into_iter()
        .filter_map(|(label, value, unit, fmt)| {
            let shown = fmt(value?)?;
            Some(format!("{label}: {shown}{unit}"))
        })
        .collect()
}
