use actix_web::{error::InternalError, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::services::TrademarkSearcher;

#[derive(Deserialize)]
#[serde(untagged)]
enum NamesField {
    Text(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
struct SearchBody {
    names: NamesField,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl NamesField {
    fn into_names(self) -> Vec<String> {
        match self {
            NamesField::Text(raw) => split_names(&raw),
            NamesField::List(list) => list
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

/// Names separated by commas or newlines, trimmed, blanks dropped.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rejects bodies that do not deserialize with a JSON `400`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorBody {
            error: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    })
}

#[post("/search")]
pub async fn search(
    body: web::Json<SearchBody>,
    searcher: web::Data<TrademarkSearcher>,
) -> HttpResponse {
    let names = body.into_inner().names.into_names();
    if names.is_empty() {
        return HttpResponse::BadRequest().json(ErrorBody {
            error: "No names supplied".to_string(),
        });
    }

    log::info!("Checking {} names", names.len());
    let results = searcher.process_batch(names).await;

    HttpResponse::Ok().json(results)
}
