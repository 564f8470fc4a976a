use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Taxpayer identity and registration details as returned by the tax authority.
///
/// Field names follow the upstream's PascalCase keys. Anything the upstream
/// adds beyond the known fields is kept in `extra` so a record can be
/// re-serialized without loss. Every field is optional and loosely typed:
/// `null`, numbers and single strings are accepted where text or lists are
/// expected, so a well-formed upstream answer always decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaxpayerRecord {
    #[serde(
        rename = "TIN",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub tin: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub taxpayer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub tax_office: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub trading_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub primary_sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub tax_types: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub business_registration_number: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// `null` → `None`; strings as-is; numbers, booleans and nested values as JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

/// `null` → empty; a lone scalar → one entry; arrays element by element.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_text).collect(),
        other => value_to_text(other).into_iter().collect(),
    })
}

impl TaxpayerRecord {
    /// Best display name: trading name when present, otherwise the registered name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.trading_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.taxpayer_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload() {
        let record: TaxpayerRecord =
            serde_json::from_str(r#"{"TIN":"12345678","TaxpayerName":"Acme"}"#).unwrap();
        assert_eq!(record.tin.as_deref(), Some("12345678"));
        assert_eq!(record.taxpayer_name.as_deref(), Some("Acme"));
        assert!(record.tax_types.is_empty());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn decodes_full_payload_and_keeps_unknown_fields() {
        let record: TaxpayerRecord = serde_json::from_value(serde_json::json!({
            "TIN": "87654321",
            "TaxpayerName": "Acme Holdings Ltd",
            "ContactNumber": "+255 22 000 0000",
            "TaxOffice": "Ilala",
            "TradingName": "Acme",
            "PrimarySector": "Wholesale",
            "TaxTypes": ["VAT", "Income Tax"],
            "Email": "info@acme.example",
            "BusinessRegistrationNumber": "BRN-0042",
            "RegistrationDate": "2019-04-01"
        }))
        .unwrap();

        assert_eq!(record.tax_office.as_deref(), Some("Ilala"));
        assert_eq!(record.tax_types, vec!["VAT", "Income Tax"]);
        assert_eq!(
            record.business_registration_number.as_deref(),
            Some("BRN-0042")
        );
        assert_eq!(
            record.extra.get("RegistrationDate").and_then(|v| v.as_str()),
            Some("2019-04-01")
        );
        assert_eq!(record.display_name(), Some("Acme"));
    }

    #[test]
    fn reserializes_with_upstream_keys() {
        let record: TaxpayerRecord =
            serde_json::from_str(r#"{"TIN":"12345678","TaxpayerName":"Acme"}"#).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"TIN": "12345678", "TaxpayerName": "Acme"})
        );
    }

    #[test]
    fn display_name_falls_back_to_registered_name() {
        let record: TaxpayerRecord = serde_json::from_str(
            r#"{"TIN":"12345678","TaxpayerName":"Acme","TradingName":"  "}"#,
        )
        .unwrap();
        assert_eq!(record.display_name(), Some("Acme"));
    }

    #[test]
    fn tolerates_nulls_numbers_and_missing_tin() {
        let record: TaxpayerRecord = serde_json::from_value(serde_json::json!({
            "TIN": 12_345_678,
            "TaxpayerName": "Acme",
            "ContactNumber": 255_220_000,
            "TaxTypes": null,
            "Email": null
        }))
        .unwrap();
        assert_eq!(record.tin.as_deref(), Some("12345678"));
        assert_eq!(record.contact_number.as_deref(), Some("255220000"));
        assert!(record.tax_types.is_empty());
        assert_eq!(record.email, None);

        let record: TaxpayerRecord =
            serde_json::from_str(r#"{"TaxpayerName":"Acme","TaxTypes":"VAT"}"#).unwrap();
        assert_eq!(record.tin, None);
        assert_eq!(record.tax_types, vec!["VAT"]);
    }

    #[test]
    fn non_object_payload_still_fails() {
        assert!(serde_json::from_str::<TaxpayerRecord>("[1,2]").is_err());
    }
}
