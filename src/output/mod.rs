//! Report assembly, rendering and verification

pub mod assembler;
pub mod verifier;
pub mod writer;

pub use assembler::ForensicReportAssembler;
pub use verifier::{load_report, ReportVerifier, VerificationCheck, VerificationOutcome};
pub use writer::{render_json, render_text, ReportFormat, ReportWriter};
