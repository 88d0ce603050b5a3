// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Receta prescription service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RecetaError, Result};

/// A JSON object as stored in the `recetas` collection.
pub type Row = Map<String, Value>;

// ---------------------------------------------------------------------------
// Presence checks
// ---------------------------------------------------------------------------

/// Trim `value` and return it only if something is left.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Loosely-typed scalar as it arrives from forms: vitals may be sent as
/// strings (`"36.5"`) or numbers (`36.5`) depending on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Scalar {
    /// Display form, trimmed. `None` when the value is empty after trimming.
    pub fn display(&self) -> Option<String> {
        let raw = match self {
            Self::Text(s) => s.trim().to_owned(),
            Self::Number(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
        };
        if raw.is_empty() { None } else { Some(raw) }
    }

    /// Numeric interpretation, if the value is a number or a numeric string.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Flag(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or_else(|| Self::Text(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Prescription record
// ---------------------------------------------------------------------------

/// One prescribed medication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    #[serde(deserialize_with = "lenient_text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dosis: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub frecuencia: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub duracion: Option<String>,
}

impl Medication {
    /// `dosis / frecuencia / duracion`, skipping missing parts.
    pub fn detail_line(&self) -> String {
        [&self.dosis, &self.frecuencia, &self.duracion]
            .into_iter()
            .filter_map(|part| present(part.as_deref()))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Dispensing pharmacy, when the prescription has already been filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmacyInfo {
    #[serde(deserialize_with = "lenient_text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub ubicacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub telefono: Option<String>,
}

/// A stored prescription, as handed to the document composer.
///
/// Everything except `id` is optional; absent fields suppress their block in
/// the rendered document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub numero_recibo: Option<String>,

    #[serde(deserialize_with = "lenient_text")]
    pub paciente_nombre: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub doctor_nombre: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub doctor_cedula: Option<String>,

    #[serde(deserialize_with = "lenient_text")]
    pub fecha_emision: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub proxima_consulta: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub fecha_dispensacion: Option<String>,

    #[serde(deserialize_with = "lenient_scalar")]
    pub temperatura_corporal: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub frecuencia_cardiaca: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub frecuencia_respiratoria: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub tension_arterial: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub peso: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub altura: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub imc: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub blood_type: Option<Scalar>,
    #[serde(deserialize_with = "lenient_scalar")]
    pub allergies: Option<Scalar>,

    #[serde(deserialize_with = "null_as_empty")]
    pub medicamentos: Vec<Medication>,

    #[serde(deserialize_with = "lenient_text")]
    pub motivo_consulta: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub antecedentes: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub diagnostico: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub exploracion_fisica: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub plan_tratamiento: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub indicaciones: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub recomendaciones: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub observaciones: Option<String>,

    #[serde(deserialize_with = "lenient_text")]
    pub estado_dispensacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub medicamentos_dispensados_detalle: Option<String>,
    pub farmacia_info: Option<PharmacyInfo>,
}

impl PrescriptionRecord {
    /// Build a record from a stored row. Unknown keys are ignored.
    pub fn from_row(row: Row) -> Result<Self> {
        let record: Self = serde_json::from_value(Value::Object(row))?;
        if record.id.trim().is_empty() {
            return Err(RecetaError::Validation(
                "stored receta has no id".into(),
            ));
        }
        Ok(record)
    }

    /// Check that a row about to be stored can later be read back as a
    /// record. Failures are caller mistakes.
    pub fn check_shape(row: &Row) -> Result<()> {
        serde_json::from_value::<Self>(Value::Object(row.clone()))
            .map(drop)
            .map_err(|e| RecetaError::Validation(format!("recetaData no es válida: {e}")))
    }
}

/// Id of a stored row: string ids as-is, numeric ids (serial keys) in
/// decimal form.
pub fn row_id(row: &Row) -> Option<String> {
    match row.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Printable text of a loosely-typed value. Numbers and flags keep their
/// JSON form, lists are joined with `, `, objects have no text.
fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(text_of)
                .filter(|part| !part.trim().is_empty())
                .collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_of))
}

fn lenient_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<Scalar>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Some(Scalar::Number(n)),
        Some(Value::Bool(b)) => Some(Scalar::Flag(b)),
        Some(other) => text_of(other).map(Scalar::Text),
        None => None,
    })
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Medication>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Medication>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// HTTP payloads
// ---------------------------------------------------------------------------

/// Patient as sent by the front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Paciente {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Prescribing doctor as sent by the front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Doctor {
    pub id: Option<Value>,
    pub nombre: Option<String>,
    pub cedula_prof: Option<String>,
}

/// Body of `POST /api/crear-y-enviar-receta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrearRecetaRequest {
    pub receta_data: Option<Row>,
    pub paciente: Option<Paciente>,
    pub doctor: Option<Doctor>,
}

/// A request that passed the presence checks.
#[derive(Debug, Clone)]
pub struct NewReceta {
    pub data: Row,
    pub paciente: Paciente,
    pub doctor: Doctor,
    /// Recipient address, trimmed.
    pub email: String,
}

impl CrearRecetaRequest {
    /// Presence checks only: the three top-level members and the patient email.
    pub fn validate(self) -> Result<NewReceta> {
        let (Some(data), Some(paciente), Some(doctor)) =
            (self.receta_data, self.paciente, self.doctor)
        else {
            return Err(RecetaError::Validation(
                "Faltan datos requeridos (recetaData, paciente o doctor)".into(),
            ));
        };

        let Some(email) = present(paciente.email.as_deref()).map(str::to_owned) else {
            return Err(RecetaError::Validation(
                "El paciente no tiene un correo electrónico".into(),
            ));
        };

        Ok(NewReceta {
            data,
            paciente,
            doctor,
            email,
        })
    }
}

impl NewReceta {
    /// Row to insert into `recetas`: the submitted data plus patient and
    /// doctor references. Keys already present in the data win.
    pub fn to_row(&self) -> Row {
        let mut row = self.data.clone();
        let mut fill = |key: &str, value: Option<Value>| {
            if let Some(value) = value.filter(|v| !v.is_null()) {
                row.entry(key.to_owned()).or_insert(value);
            }
        };

        fill("paciente_id", self.paciente.id.clone());
        fill("paciente_nombre", self.paciente.name.clone().map(Value::String));
        fill("doctor_id", self.doctor.id.clone());
        fill("doctor_nombre", self.doctor.nombre.clone().map(Value::String));
        fill(
            "doctor_cedula",
            self.doctor.cedula_prof.clone().map(Value::String),
        );
        row
    }

    /// Name used to greet the patient in the email.
    pub fn patient_name(&self) -> &str {
        present(self.paciente.name.as_deref()).unwrap_or("paciente")
    }
}

/// Success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrearRecetaResponse {
    pub message: String,
    pub receta_id: String,
}
