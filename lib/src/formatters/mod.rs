// lib/src/formatters/mod.rs
//! Read-only views of a patient record: the emergency QR payload and the
//! printable PDF.
pub mod pdf_export;
pub mod qr_payload;

pub use pdf_export::{pdf_file_name, to_pdf, PdfTitle};
pub use qr_payload::{parse_qr_payload, to_qr_payload, BasicInfo, QrPayload};
