//! Lead list loading
//!
//! Leads come from a CSV file with headers `name,phone,interest`. The file
//! is re-read per lookup so edits take effect without a restart; lists are
//! small enough that this never matters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::storage::sanitize_phone;

pub const PLACEHOLDER_NAME: &str = "Potential Client";
pub const PLACEHOLDER_INTEREST: &str = "Real Estate Inquiry";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub phone: String,
    pub interest: String,
}

impl Lead {
    /// Stand-in profile for an inbound number with no matching lead record.
    pub fn placeholder(phone: &str) -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_string(),
            phone: phone.to_string(),
            interest: PLACEHOLDER_INTEREST.to_string(),
        }
    }
}

/// Load all leads from the CSV file.
///
/// A missing or unreadable file reads as an empty list; bad rows are
/// skipped. Callers never see an error.
pub fn load_leads(csv_path: impl AsRef<Path>) -> Vec<Lead> {
    let csv_path = csv_path.as_ref();

    let mut reader = match csv::Reader::from_path(csv_path) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::error!(path = %csv_path.display(), error = %e, "failed to open leads CSV");
            return Vec::new();
        }
    };

    let mut leads = Vec::new();
    for record in reader.deserialize() {
        match record {
            Ok(lead) => leads.push(lead),
            Err(e) => tracing::warn!(error = %e, "skipping malformed lead row"),
        }
    }

    tracing::info!(count = leads.len(), "loaded leads");
    leads
}

/// Find the lead whose phone matches `phone`, ignoring formatting and an
/// optional US country code.
///
/// Falls back to a placeholder profile when no lead matches.
pub fn resolve_lead(csv_path: impl AsRef<Path>, phone: &str) -> Lead {
    let wanted = canonical_digits(phone);
    load_leads(csv_path)
        .into_iter()
        .find(|lead| canonical_digits(&lead.phone) == wanted)
        .unwrap_or_else(|| Lead::placeholder(phone))
}

fn canonical_digits(phone: &str) -> String {
    let digits = sanitize_phone(phone);
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn leads_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name,phone,interest").unwrap();
        writeln!(file, "Sam Carter,+15551234567,Downtown Condo").unwrap();
        writeln!(file, "Ava Reed,555-987-6543,Lakeside Bungalow").unwrap();
        file
    }

    #[test]
    fn loads_all_rows() {
        let file = leads_file();
        let leads = load_leads(file.path());
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].name, "Sam Carter");
        assert_eq!(leads[1].interest, "Lakeside Bungalow");
    }

    #[test]
    fn missing_file_loads_empty() {
        assert!(load_leads("no-such-leads.csv").is_empty());
    }

    #[test]
    fn resolve_matches_despite_formatting() {
        let file = leads_file();
        let lead = resolve_lead(file.path(), "+1 555 987 6543");
        assert_eq!(lead.name, "Ava Reed");
    }

    #[test]
    fn resolve_unknown_number_is_placeholder() {
        let file = leads_file();
        let lead = resolve_lead(file.path(), "+15550000000");
        assert_eq!(lead.name, PLACEHOLDER_NAME);
        assert_eq!(lead.interest, PLACEHOLDER_INTEREST);
        assert_eq!(lead.phone, "+15550000000");
    }
}
