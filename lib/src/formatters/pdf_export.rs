// lib/src/formatters/pdf_export.rs
use std::io::BufWriter;

use models::errors::{RecordError, RecordResult};
use models::PatientRecord;
use printpdf::{BuiltinFont, Mm, PdfDocument};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 20.0;
const TITLE_SIZE: f32 = 20.0;
const BODY_SIZE: f32 = 12.0;

/// Heading printed at the top of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdfTitle {
    /// Staff export from the patient list.
    #[default]
    PatientMedicalRecord,
    /// The patient's own export.
    MedicalWallet,
}

impl PdfTitle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfTitle::PatientMedicalRecord => "Patient Medical Record",
            PdfTitle::MedicalWallet => "Medical Wallet",
        }
    }
}

pub fn pdf_file_name(record: &PatientRecord) -> String {
    format!("{}-medical-record.pdf", record.full_name)
}

// (text, distance from the top edge in mm)
fn body_lines(record: &PatientRecord) -> Vec<(String, f32)> {
    let contact = &record.contact_info;
    let history = &record.medical_history;
    vec![
        ("Basic Information".to_string(), 30.0),
        (format!("Full Name: {}", record.full_name), 40.0),
        (format!("Date of Birth: {}", record.date_of_birth), 50.0),
        (format!("Gender: {}", record.gender), 60.0),
        (format!("Blood Group: {}", record.blood_group), 70.0),
        (format!("Marital Status: {}", record.marital_status), 80.0),
        (format!("National ID: {}", record.national_id), 90.0),
        ("Contact Information".to_string(), 110.0),
        (format!("Phone: {}", contact.phone_number), 120.0),
        (format!("Email: {}", contact.email), 130.0),
        (format!("Address: {}", contact.address.one_line()), 140.0),
        (
            format!(
                "Emergency Contact: {} ({})",
                contact.emergency_contact.name, contact.emergency_contact.phone
            ),
            150.0,
        ),
        ("Medical History".to_string(), 170.0),
        (format!("Past Illnesses: {}", history.past_illnesses.join(", ")), 180.0),
        (format!("Allergies: {}", history.allergies.join(", ")), 190.0),
        (format!("Chronic Diseases: {}", history.chronic_diseases.join(", ")), 200.0),
        (format!("Family Medical History: {}", history.family_medical_history), 210.0),
    ]
}

/// Renders a single A4 page summary of `record`. Returns the PDF bytes.
pub fn to_pdf(record: &PatientRecord, title: PdfTitle) -> RecordResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RecordError::SerializationError(format!("PDF font error: {e}")))?;

    // Positions are measured from the top edge; printpdf counts from the bottom.
    let from_top = |y: f32| Mm(PAGE_HEIGHT_MM - y);

    layer.use_text(title.as_str(), TITLE_SIZE, Mm(LEFT_MM), from_top(20.0), &font);
    for (text, y) in body_lines(record) {
        layer.use_text(text, BODY_SIZE, Mm(LEFT_MM), from_top(y), &font);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RecordError::SerializationError(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| RecordError::Io(format!("PDF buffer error: {e}")))
}
