use anyhow::Context;
use chrono::NaiveDate;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crpt_api::api::{CrptApi, Description, Document, Product};
use crpt_api::config::Config;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn sample_document() -> anyhow::Result<Document> {
    let day = NaiveDate::from_ymd_opt(2020, 1, 23).context("invalid sample date")?;

    Ok(Document {
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
        production_date: day,
        production_type: "TYPE".into(),
        products: vec![Product {
            certificate_document: Some("cert123".into()),
            certificate_document_date: Some(day),
            certificate_document_number: Some("cert_num123".into()),
            owner_inn: Some("1234567890".into()),
            producer_inn: Some("1234567890".into()),
            production_date: Some(day),
            tnved_code: Some("tnved123".into()),
            uit_code: Some("uit123".into()),
            uitu_code: Some("uitu123".into()),
        }],
        reg_date: day,
        reg_number: "reg123".into(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_logging(&config);

    info!(
        "Starting document client: {} requests per {:?} to {}",
        config.request_limit,
        config.refill_interval(),
        config.api_url
    );

    let api = CrptApi::new(&config)?;
    let signature = config.signature.clone().unwrap_or_default();

    match api.create_document(sample_document()?, signature).await {
        Ok(()) => info!("Document created successfully"),
        Err(e) => error!("Failed to create document: {}", e),
    }

    api.dispatcher().stats().log_stats();
    api.shutdown();
    info!("Shutting down...");

    Ok(())
}
