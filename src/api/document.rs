use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document submitted to the create-document endpoint.
///
/// Top-level fields are always serialized, `null` included. Optional fields of
/// [`Description`] and [`Product`] are left out when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub description: Option<Description>,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    #[serde(rename = "importRequest")]
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: NaiveDate,
    pub production_type: String,
    pub products: Vec<Product>,
    pub reg_date: NaiveDate,
    pub reg_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_inn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tnved_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uit_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uitu_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_field_names_and_date_format() {
        let document = Document {
            description: Some(Description {
                participant_inn: Some("1234567890".into()),
            }),
            doc_id: "doc123".into(),
            doc_status: "NEW".into(),
            doc_type: "LP_INTRODUCE_GOODS".into(),
            import_request: true,
            owner_inn: "1234567890".into(),
            participant_inn: "1234567890".into(),
            producer_inn: "1234567890".into(),
            production_date: date("2020-01-23"),
            production_type: "TYPE".into(),
            products: vec![Product {
                certificate_document: Some("cert123".into()),
                certificate_document_date: Some(date("2020-01-23")),
                tnved_code: Some("tnved123".into()),
                ..Default::default()
            }],
            reg_date: date("2020-01-24"),
            reg_number: "reg123".into(),
        };

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(
            value,
            json!({
                "description": { "participantInn": "1234567890" },
                "doc_id": "doc123",
                "doc_status": "NEW",
                "doc_type": "LP_INTRODUCE_GOODS",
                "importRequest": true,
                "owner_inn": "1234567890",
                "participant_inn": "1234567890",
                "producer_inn": "1234567890",
                "production_date": "2020-01-23",
                "production_type": "TYPE",
                "products": [{
                    "certificate_document": "cert123",
                    "certificate_document_date": "2020-01-23",
                    "tnved_code": "tnved123"
                }],
                "reg_date": "2020-01-24",
                "reg_number": "reg123"
            })
        );
    }

    #[test]
    fn test_missing_description_is_null() {
        let document: Document = serde_json::from_value(json!({
            "description": null,
            "doc_id": "d",
            "doc_status": "NEW",
            "doc_type": "LP_INTRODUCE_GOODS",
            "importRequest": false,
            "owner_inn": "1",
            "participant_inn": "2",
            "producer_inn": "3",
            "production_date": "2021-05-01",
            "production_type": "OWN_PRODUCTION",
            "products": [],
            "reg_date": "2021-05-02",
            "reg_number": "r"
        }))
        .unwrap();

        assert!(document.description.is_none());
        let value = serde_json::to_value(&document).unwrap();
        assert!(value["description"].is_null());
        assert_eq!(value["products"], json!([]));
    }
}
