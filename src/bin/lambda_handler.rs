//! AWS Lambda handler for pricing freight insurance quotes
//!
//! Accepts a quote form as JSON and returns the computed quote, or every
//! validation error at once. GET returns the goods categories offered on the
//! form. Tables are resolved once per cold start from the environment (see
//! `freight_quote::config`).
//!
//! Supports Lambda Function URLs for direct HTTP access.

use aws_lambda_events::event::lambda_function_urls::{LambdaFunctionUrlRequest, LambdaFunctionUrlResponse};
use aws_lambda_events::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use aws_lambda_events::http::{HeaderMap, HeaderValue};
use freight_quote::quote::format_rate_percentage;
use freight_quote::{CategoryList, Quote, QuoteEngine, QuoteError, QuoteForm, SourceConfig, ValidationResult};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Successful quote
#[derive(Debug, Serialize)]
struct QuoteResponse {
    quote: Quote,
    rate_display: String,
    deductible_display: String,
}

#[derive(Debug, Serialize)]
struct ValidationResponse<'a> {
    errors: &'a ValidationResult,
}

#[derive(Debug, Serialize)]
struct CategoriesResponse<'a> {
    categories: &'a CategoryList,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers
}

fn response(status_code: i64, headers: HeaderMap, body: Option<String>) -> LambdaFunctionUrlResponse {
    LambdaFunctionUrlResponse {
        status_code,
        headers,
        body,
        is_base64_encoded: false,
        cookies: Vec::new(),
    }
}

fn json_response<T: Serialize>(status_code: i64, body: &T) -> Result<LambdaFunctionUrlResponse, Error> {
    let mut headers = cors_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response(status_code, headers, Some(serde_json::to_string(body)?)))
}

fn error_response(status_code: i64, message: &str) -> Result<LambdaFunctionUrlResponse, Error> {
    json_response(
        status_code,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

/// Lambda handler function
async fn handler(
    engine: &QuoteEngine,
    event: LambdaEvent<LambdaFunctionUrlRequest>,
) -> Result<LambdaFunctionUrlResponse, Error> {
    let request = event.payload;
    let method = request.request_context.http.method.as_deref().unwrap_or("POST");

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(response(200, cors_headers(), None));
    }
    if method == "GET" {
        return json_response(
            200,
            &CategoriesResponse {
                categories: &engine.tables().categories,
            },
        );
    }
    if method != "POST" {
        return error_response(405, "Method not allowed");
    }
    if request.is_base64_encoded {
        return error_response(400, "Base64-encoded bodies are not supported");
    }

    let body = request.body.unwrap_or_else(|| "{}".to_string());
    let form: QuoteForm = match serde_json::from_str(&body) {
        Ok(form) => form,
        Err(e) => return error_response(400, &format!("Invalid JSON: {}", e)),
    };

    match engine.quote(&form) {
        Ok(quote) => {
            info!(
                "Quoted {} / {} / {}: premium {:.2}, manual quote: {}",
                form.transit_method, form.coverage_type, form.coverage_for, quote.premium, quote.needs_manual_quote
            );
            json_response(
                200,
                &QuoteResponse {
                    rate_display: format_rate_percentage(quote.rate),
                    deductible_display: quote.deductible.to_string(),
                    quote,
                },
            )
        }
        Err(QuoteError::Validation(errors)) => json_response(400, &ValidationResponse { errors: &errors }),
        Err(e @ QuoteError::RateUnavailable { .. }) => {
            warn!("{}", e);
            error_response(422, &e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let config = SourceConfig::from_env();
    // Blocking HTTP client; keep it off the async runtime
    let tables = tokio::task::spawn_blocking(move || config.load_tables()).await??;
    let engine = Arc::new(QuoteEngine::new(tables));

    run(service_fn(move |event: LambdaEvent<LambdaFunctionUrlRequest>| {
        let engine = Arc::clone(&engine);
        async move { handler(&engine, event).await }
    }))
    .await
}
