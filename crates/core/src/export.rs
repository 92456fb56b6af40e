//! Voucher export file names and the client-side CSV of a loaded page.

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::types::{Guid, Timestamp};
use crate::voucher::VoucherRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const CSV_HEADER: [&str; 6] = [
    "Bundle Name (EN)",
    "Bundle Name (AR)",
    "Voucher Code",
    "Status",
    "Created At",
    "Used At",
];

/// Default file name of the server-side xlsx export.
pub fn export_file_name(bundle_id: Option<Guid>, today: NaiveDate) -> String {
    let suffix = match bundle_id {
        Some(id) => {
            let id = id.to_string();
            format!("bundle_{}", &id[..8])
        }
        None => "all_bundles".to_string(),
    };
    format!("vouchers_{suffix}_{}.xlsx", today.format("%Y-%m-%d"))
}

pub fn page_csv_file_name(page: u32, today: NaiveDate) -> String {
    format!("vouchers_page{page}_{}.csv", today.format("%Y-%m-%d"))
}

fn timestamp_cell(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// CSV of the given voucher rows: UTF-8 BOM, every field quoted.
pub fn voucher_page_csv(rows: &[VoucherRow]) -> Result<Vec<u8>, CoreError> {
    if rows.is_empty() {
        return Err(CoreError::Validation("No vouchers to export".to_string()));
    }

    let mut out = UTF8_BOM.to_vec();
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(&mut out);

    let csv_err = |e: csv::Error| CoreError::Internal(format!("CSV export failed: {e}"));

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for row in rows {
        let name_en = if row.bundle_name_en.is_empty() {
            row.bundle_name.as_str()
        } else {
            row.bundle_name_en.as_str()
        };
        writer
            .write_record([
                name_en,
                row.bundle_name_primary.as_str(),
                row.voucher.code.as_str(),
                row.status.as_str(),
                timestamp_cell(row.voucher.created_at).as_str(),
                timestamp_cell(row.voucher.used_at).as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| CoreError::Internal(format!("CSV export failed: {e}")))?;
    drop(writer);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voucher::{Voucher, VoucherStatus};

    fn row(code: &str, name_en: &str, used: bool) -> VoucherRow {
        let used_at = used.then_some("2024-02-01T08:30:00Z");
        let voucher: Voucher = serde_json::from_value(serde_json::json!({
            "id": Guid::new_v4(),
            "code": code,
            "bundle_id": Guid::new_v4(),
            "is_active": true,
            "used_at": used_at,
            "created_at": "2024-01-01T10:00:00Z"
        }))
        .unwrap();
        VoucherRow {
            status: voucher.status(),
            voucher,
            bundle_name: if name_en.is_empty() { "باقة".into() } else { name_en.into() },
            bundle_name_primary: "باقة".into(),
            bundle_name_en: name_en.into(),
        }
    }

    #[test]
    fn test_csv_has_bom_header_and_quoted_cells() {
        let bytes = voucher_page_csv(&[row("AB\"C", "Pack", true)]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            r#""Bundle Name (EN)","Bundle Name (AR)","Voucher Code","Status","Created At","Used At""#
        );
        assert_eq!(
            lines[1],
            r#""Pack","باقة","AB""C","Used","2024-01-01 10:00:00","2024-02-01 08:30:00""#
        );
    }

    #[test]
    fn test_csv_falls_back_to_display_name() {
        let bytes = voucher_page_csv(&[row("X1", "", false)]).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.starts_with(r#""باقة","باقة","X1","Available""#));
        assert!(line.ends_with(r#","""#));
        assert_eq!(VoucherStatus::Available.as_str(), "Available");
    }

    #[test]
    fn test_empty_page_rejected() {
        assert!(voucher_page_csv(&[]).is_err());
    }

    #[test]
    fn test_export_file_names() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let id: Guid = "3f1c1a3e-8b7c-4d7e-9d55-2b3a1b2c3d4e".parse().unwrap();
        assert_eq!(
            export_file_name(Some(id), today),
            "vouchers_bundle_3f1c1a3e_2024-03-09.xlsx"
        );
        assert_eq!(export_file_name(None, today), "vouchers_all_bundles_2024-03-09.xlsx");
        assert_eq!(page_csv_file_name(2, today), "vouchers_page2_2024-03-09.csv");
    }
}
