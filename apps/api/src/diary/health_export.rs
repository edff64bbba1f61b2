//! Step totals from an Apple Health `export.zip`.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

const EXPORT_XML_PATH: &str = "apple_health_export/export.xml";
const STEP_COUNT_TYPE: &str = "HKQuantityTypeIdentifierStepCount";

// Quoted attribute values may contain `>`. Entities inside values are left undecoded.
static RECORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<Record\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("valid record regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

#[derive(Debug, Error)]
pub enum HealthExportError {
    #[error("not a readable zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive has no {EXPORT_XML_PATH}")]
    MissingExport,

    #[error("export.xml could not be read as UTF-8 text: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepSummary {
    pub steps: u64,
    pub step_records: u64,
    /// Steps per `startDate` calendar day.
    pub daily_steps: BTreeMap<String, u64>,
}

pub fn read_export_zip(bytes: &[u8]) -> Result<StepSummary, HealthExportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let name = if archive.index_for_name(EXPORT_XML_PATH).is_some() {
        EXPORT_XML_PATH.to_string()
    } else {
        archive
            .file_names()
            .find(|n| *n == "export.xml" || n.ends_with("/export.xml"))
            .map(str::to_string)
            .ok_or(HealthExportError::MissingExport)?
    };

    let mut xml = String::new();
    archive.by_name(&name)?.read_to_string(&mut xml)?;
    Ok(sum_step_records(&xml))
}

/// Sums every step-count `<Record>`; values are truncated to whole steps.
/// Records whose value does not parse are skipped.
pub fn sum_step_records(xml: &str) -> StepSummary {
    let mut summary = StepSummary::default();

    for record in RECORD_RE.captures_iter(xml) {
        let attrs: BTreeMap<&str, &str> = ATTR_RE
            .captures_iter(&record[1])
            .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2).or_else(|| c.get(3))?.as_str())))
            .collect();

        if attrs.get("type") != Some(&STEP_COUNT_TYPE) {
            continue;
        }
        let Some(steps) = attrs
            .get("value")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.trunc() as u64)
        else {
            continue;
        };

        summary.steps = summary.steps.saturating_add(steps);
        summary.step_records += 1;
        if let Some(day) = attrs.get("startDate").and_then(|d| d.get(..10)) {
            let total = summary.daily_steps.entry(day.to_string()).or_default();
            *total = total.saturating_add(steps);
        }
    }

    summary
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    pub const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="ja_JP">
 <ExportDate value="2024-05-02 08:00:00 +0900"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="iPhone" unit="count" startDate="2024-05-01 08:00:00 +0900" endDate="2024-05-01 08:10:00 +0900" value="1200"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="iPhone" unit="count" startDate="2024-05-01 12:00:00 +0900" endDate="2024-05-01 12:30:00 +0900" value="3000.9"/>
 <Record type="HKQuantityTypeIdentifierBodyMass" sourceName="Scale" unit="kg" startDate="2024-05-01 07:00:00 +0900" value="61.2"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Watch" unit="count" startDate="2024-05-02 07:00:00 +0900" value="3000">
  <MetadataEntry key="HKWasUserEntered" value="1"/>
 </Record>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Broken" startDate="2024-05-02 09:00:00 +0900" value="lots"/>
</HealthData>
"#;

    pub fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_sums_only_step_records() {
        let summary = sum_step_records(SAMPLE_XML);
        assert_eq!(summary.steps, 1200 + 3000 + 3000);
        assert_eq!(summary.step_records, 3);
        assert_eq!(summary.daily_steps.get("2024-05-01"), Some(&4200));
        assert_eq!(summary.daily_steps.get("2024-05-02"), Some(&3000));
    }

    #[test]
    fn test_huge_values_saturate() {
        let xml = r#"<HealthData>
 <Record type="HKQuantityTypeIdentifierStepCount" startDate="2024-05-01 08:00:00 +0900" value="1e19"/>
 <Record type="HKQuantityTypeIdentifierStepCount" startDate="2024-05-01 09:00:00 +0900" value="1e19"/>
</HealthData>"#;
        let summary = sum_step_records(xml);
        assert_eq!(summary.steps, u64::MAX);
        assert_eq!(summary.step_records, 2);
        assert_eq!(summary.daily_steps.get("2024-05-01"), Some(&u64::MAX));
    }

    #[test]
    fn test_quoted_gt_and_single_quotes() {
        let xml = r#"<HealthData>
 <Record sourceName="Steps > Walk" type="HKQuantityTypeIdentifierStepCount" startDate="2024-05-01 08:00:00 +0900" value="500"/>
 <Record type='HKQuantityTypeIdentifierStepCount' startDate='2024-05-01 09:00:00 +0900' value='250'/>
</HealthData>"#;
        let summary = sum_step_records(xml);
        assert_eq!(summary.steps, 750);
        assert_eq!(summary.step_records, 2);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(sum_step_records("<HealthData/>"), StepSummary::default());
    }

    #[test]
    fn test_reads_standard_archive_layout() {
        let bytes = zip_with(&[
            ("apple_health_export/export_cda.xml", "<ClinicalDocument/>"),
            (EXPORT_XML_PATH, SAMPLE_XML),
        ]);
        assert_eq!(read_export_zip(&bytes).unwrap().steps, 7200);
    }

    #[test]
    fn test_falls_back_to_any_export_xml() {
        let bytes = zip_with(&[("renamed/export.xml", SAMPLE_XML)]);
        assert_eq!(read_export_zip(&bytes).unwrap().step_records, 3);
    }

    #[test]
    fn test_missing_export_xml() {
        let bytes = zip_with(&[("apple_health_export/export_cda.xml", "<x/>")]);
        assert!(matches!(
            read_export_zip(&bytes),
            Err(HealthExportError::MissingExport)
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            read_export_zip(b"PK but not really"),
            Err(HealthExportError::Zip(_))
        ));
    }
}
