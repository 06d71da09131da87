//! OpenAPI Document Generator
//!
//! Writes the PropScope OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p propscope-api --bin generate-openapi --features openapi > openapi.json

use propscope_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
