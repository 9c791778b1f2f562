pub mod client;
pub mod document;
pub mod transport;

pub use client::CrptApi;
pub use document::{Description, Document, Product};
pub use transport::{DocumentTransport, HttpTransport};
