// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the prescription composer: layout alone and full
// layout + PDF serialisation on a realistic record.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use receta_core::{Medication, PrescriptionRecord, Scalar};
use receta_document::PrescriptionComposer;

fn sample_record(medications: usize) -> PrescriptionRecord {
    PrescriptionRecord {
        id: "c56a4180-65aa-42ec-a945-5fd21dec0538".into(),
        numero_recibo: Some("REC-2026-000981".into()),
        paciente_nombre: Some("María Fernanda Ruiz".into()),
        doctor_nombre: Some("Jorge Salinas".into()),
        doctor_cedula: Some("8745120".into()),
        fecha_emision: Some("2026-10-18T09:30:00Z".into()),
        temperatura_corporal: Some(Scalar::from(37.2)),
        frecuencia_cardiaca: Some(Scalar::from("88")),
        peso: Some(Scalar::from(64.5)),
        altura: Some(Scalar::from(162.0)),
        imc: Some(Scalar::from(24.577)),
        medicamentos: (1..=medications)
            .map(|i| Medication {
                nombre: Some(format!("Medicamento {i}")),
                dosis: Some("1 tableta".into()),
                frecuencia: Some("cada 12 horas".into()),
                duracion: Some("7 días".into()),
            })
            .collect(),
        diagnostico: Some("Infección de vías respiratorias altas".into()),
        plan_tratamiento: Some("Antibiótico, analgésico y reposo relativo.".into()),
        indicaciones: Some("Tomar con alimentos y abundantes líquidos.".into()),
        ..Default::default()
    }
}

fn bench_compose(c: &mut Criterion) {
    let composer = PrescriptionComposer::default();
    let short = sample_record(3);
    let long = sample_record(40);

    c.bench_function("layout (3 medications)", |b| {
        b.iter(|| black_box(composer.layout(black_box(&short)).unwrap().page_count()));
    });

    c.bench_function("compose pdf (3 medications)", |b| {
        b.iter(|| black_box(composer.compose(black_box(&short)).unwrap()));
    });

    c.bench_function("compose pdf (40 medications)", |b| {
        b.iter(|| black_box(composer.compose(black_box(&long)).unwrap()));
    });
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
