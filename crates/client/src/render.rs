use extract::CompanyData;
use fields::ExtractField;

/// Plain-text table of one result, one row per requested field.
pub fn render_table(data: &CompanyData, fields: &[ExtractField]) -> String {
    let rows = data.align(fields);
    let width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);

    let mut out = format!("{}\n", data.website);
    for row in rows {
        let value = row.value.as_deref().unwrap_or("Unknown");
        out.push_str(&format!("  {:<width$}  {}\n", row.name, value, width = width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::ExtractedInfo;

    #[test]
    fn test_rows_follow_requested_fields() {
        let data = CompanyData {
            website: "https://acme.io".to_string(),
            info: vec![ExtractedInfo {
                name: "Industry".to_string(),
                value: Some("Software".to_string()),
            }],
            timestamp: 0,
        };
        let fields = vec![
            ExtractField::new("country", "Country"),
            ExtractField::new("industry", "Industry"),
        ];

        let table = render_table(&data, &fields);

        assert_eq!(
            table,
            "https://acme.io\n  Country   Unknown\n  Industry  Software\n"
        );
    }
}
