//! Handing a computed quote to the customer and recording that it was sent
//!
//! Actual transports (email provider, database) live behind the
//! [`QuoteNotifier`] and [`QuoteLedger`] traits. The reference implementations
//! here log the message and keep delivery records in memory.

use crate::errors::DeliveryError;
use crate::quote::{format_currency, Quote, QuoteRequest};
use crate::rates::CategoryList;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::sync::{Mutex, PoisonError};

pub type TransportError = Box<dyn Error + Send + Sync>;

/// Everything needed to send one quote
#[derive(Debug, Clone, Serialize)]
pub struct QuoteDelivery {
    pub email: String,
    pub quote_id: Option<String>,
    pub category: Option<String>,
    pub goods_description: Option<String>,
    pub request: QuoteRequest,
    pub quote: Quote,
}

impl QuoteDelivery {
    pub fn new(email: &str, request: QuoteRequest, quote: Quote) -> Self {
        Self {
            email: email.trim().to_string(),
            quote_id: None,
            category: None,
            goods_description: None,
            request,
            quote,
        }
    }

    pub fn with_quote_id(mut self, quote_id: &str) -> Self {
        self.quote_id = Some(quote_id.to_string());
        self
    }

    pub fn with_goods(mut self, category: &str, description: &str) -> Self {
        self.category = Some(category.to_string());
        self.goods_description = Some(description.to_string());
        self
    }

    /// Attach goods whose category must be on the offered list; the listed
    /// spelling is kept
    pub fn with_listed_goods(
        self,
        categories: &CategoryList,
        category: &str,
        description: &str,
    ) -> Result<Self, DeliveryError> {
        let listed = categories
            .find(category)
            .ok_or_else(|| DeliveryError::UnknownCategory(category.trim().to_string()))?;
        Ok(self.with_goods(listed, description))
    }

    pub fn customer_subject(&self) -> String {
        format!("Your Cargo Insurance Quote - {} Premium", format_currency(self.quote.premium))
    }

    pub fn admin_subject(&self) -> String {
        format!("New Quote Request: {} - {}", self.email, format_currency(self.quote.premium))
    }

    /// Label/value pairs describing the shipment and the quote
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::with_capacity(10);
        if let Some(category) = &self.category {
            lines.push(("Category", category.clone()));
        }
        if let Some(description) = &self.goods_description {
            lines.push(("Goods", description.clone()));
        }
        lines.push(("Transit Method", self.request.transit_method().to_string()));
        lines.push(("Coverage Type", self.request.coverage_type().to_string()));
        lines.push(("Coverage For", self.request.coverage_for().to_string()));
        lines.push(("Cargo Value", format_currency(self.request.cargo_value())));
        if let Some(additional) = self.request.additional_value() {
            lines.push(("Additional Value", format_currency(additional)));
        }
        if let Some(carrier) = self.request.carrier_insurance() {
            lines.push(("Carrier Insurance", format_currency(carrier)));
        }
        lines.push(("Rate", self.quote.rate_display()));
        lines.push(("Premium", format_currency(self.quote.premium)));
        lines.push(("Deductible", self.quote.deductible.to_string()));
        lines
    }
}

/// Sends quote messages
pub trait QuoteNotifier {
    fn send_customer(&self, delivery: &QuoteDelivery) -> Result<(), TransportError>;
    fn send_admin(&self, delivery: &QuoteDelivery) -> Result<(), TransportError>;
}

/// Records that a stored quote was sent
pub trait QuoteLedger {
    fn mark_sent(&self, quote_id: &str, email: &str, sent_at: DateTime<Utc>) -> Result<(), TransportError>;
}

/// Outcome of a successful delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReceipt {
    pub sent_at: DateTime<Utc>,
    pub admin_notified: bool,
    pub recorded: bool,
}

/// Send a quote to the customer, copy the admin, and mark it sent.
///
/// The customer message must go out; a failed admin copy is logged and
/// ignored. The ledger is only touched when the delivery carries a quote id.
pub fn deliver<N, L>(delivery: &QuoteDelivery, notifier: &N, ledger: &L) -> Result<DeliveryReceipt, DeliveryError>
where
    N: QuoteNotifier + ?Sized,
    L: QuoteLedger + ?Sized,
{
    if delivery.email.is_empty() {
        return Err(DeliveryError::MissingEmail);
    }

    notifier
        .send_customer(delivery)
        .map_err(|e| DeliveryError::Notify(e.to_string()))?;

    let admin_notified = match notifier.send_admin(delivery) {
        Ok(()) => true,
        Err(e) => {
            warn!("Admin copy of quote for {} failed: {}", delivery.email, e);
            false
        }
    };

    let sent_at = Utc::now();
    let recorded = match &delivery.quote_id {
        Some(quote_id) => {
            ledger
                .mark_sent(quote_id, &delivery.email, sent_at)
                .map_err(|e| DeliveryError::Ledger(e.to_string()))?;
            true
        }
        None => false,
    };

    info!(
        "Quote delivered to {} (admin copy: {}, recorded: {})",
        delivery.email, admin_notified, recorded
    );

    Ok(DeliveryReceipt {
        sent_at,
        admin_notified,
        recorded,
    })
}

/// Notifier that writes messages to the log
#[derive(Debug, Clone)]
pub struct LogNotifier {
    admin_email: String,
}

impl LogNotifier {
    pub fn new(admin_email: &str) -> Self {
        Self {
            admin_email: admin_email.to_string(),
        }
    }

    fn render(&self, to: &str, subject: &str, delivery: &QuoteDelivery) -> String {
        let mut body = format!("To: {}\nSubject: {}\n", to, subject);
        for (label, value) in delivery.summary() {
            body.push_str(&format!("  {:<18} {}\n", label, value));
        }
        body
    }
}

impl QuoteNotifier for LogNotifier {
    fn send_customer(&self, delivery: &QuoteDelivery) -> Result<(), TransportError> {
        info!("{}", self.render(&delivery.email, &delivery.customer_subject(), delivery));
        Ok(())
    }

    fn send_admin(&self, delivery: &QuoteDelivery) -> Result<(), TransportError> {
        info!("{}", self.render(&self.admin_email, &delivery.admin_subject(), delivery));
        Ok(())
    }
}

/// Delivery record kept by [`MemoryLedger`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentRecord {
    pub quote_id: String,
    pub email: String,
    pub sent_at: DateTime<Utc>,
}

/// Thread-safe in-memory ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<SentRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SentRecord> {
        // Records are pushed whole, so a poisoned lock still holds a consistent list
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sent_at(&self, quote_id: &str) -> Option<DateTime<Utc>> {
        self.records()
            .into_iter()
            .rev()
            .find(|r| r.quote_id == quote_id)
            .map(|r| r.sent_at)
    }
}

impl QuoteLedger for MemoryLedger {
    fn mark_sent(&self, quote_id: &str, email: &str, sent_at: DateTime<Utc>) -> Result<(), TransportError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push(SentRecord {
            quote_id: quote_id.to_string(),
            email: email.to_string(),
            sent_at,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteEngine;
    use crate::rates::{CoverageType, TransitMethod};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_delivery(email: &str) -> QuoteDelivery {
        let request = QuoteRequest::full_value(TransitMethod::Land, CoverageType::AllRisk, 10_000.0).unwrap();
        let quote = QuoteEngine::default().compute(&request).unwrap();
        QuoteDelivery::new(email, request, quote)
    }

    #[derive(Default)]
    struct Flaky {
        fail_customer: bool,
        fail_admin: bool,
        sent: AtomicUsize,
    }

    impl QuoteNotifier for Flaky {
        fn send_customer(&self, _delivery: &QuoteDelivery) -> Result<(), TransportError> {
            if self.fail_customer {
                return Err("provider rejected message".into());
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn send_admin(&self, _delivery: &QuoteDelivery) -> Result<(), TransportError> {
            if self.fail_admin {
                return Err("admin mailbox full".into());
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_deliver_records_quote() {
        let ledger = MemoryLedger::new();
        let delivery = sample_delivery("buyer@example.com").with_quote_id("q-42");

        let receipt = deliver(&delivery, &LogNotifier::new("admin@example.com"), &ledger).unwrap();
        assert!(receipt.admin_notified);
        assert!(receipt.recorded);

        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quote_id, "q-42");
        assert_eq!(records[0].email, "buyer@example.com");
        assert_eq!(ledger.sent_at("q-42"), Some(receipt.sent_at));
    }

    #[test]
    fn test_deliver_without_quote_id() {
        let ledger = MemoryLedger::new();
        let receipt = deliver(&sample_delivery("buyer@example.com"), &Flaky::default(), &ledger).unwrap();
        assert!(!receipt.recorded);
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn test_email_required() {
        let ledger = MemoryLedger::new();
        let err = deliver(&sample_delivery("  "), &Flaky::default(), &ledger).unwrap_err();
        assert!(matches!(err, DeliveryError::MissingEmail));
    }

    #[test]
    fn test_customer_failure_is_fatal() {
        let ledger = MemoryLedger::new();
        let notifier = Flaky {
            fail_customer: true,
            ..Default::default()
        };
        let delivery = sample_delivery("buyer@example.com").with_quote_id("q-1");
        let err = deliver(&delivery, &notifier, &ledger).unwrap_err();

        assert!(matches!(err, DeliveryError::Notify(_)));
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn test_admin_failure_is_ignored() {
        let ledger = MemoryLedger::new();
        let notifier = Flaky {
            fail_admin: true,
            ..Default::default()
        };
        let delivery = sample_delivery("buyer@example.com").with_quote_id("q-7");
        let receipt = deliver(&delivery, &notifier, &ledger).unwrap();

        assert!(!receipt.admin_notified);
        assert!(receipt.recorded);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subjects_and_summary() {
        let delivery = sample_delivery("buyer@example.com").with_goods("Machine Parts & Accessories", "Gearboxes");
        assert_eq!(delivery.customer_subject(), "Your Cargo Insurance Quote - $75 Premium");
        assert_eq!(delivery.admin_subject(), "New Quote Request: buyer@example.com - $75");

        let summary = delivery.summary();
        assert_eq!(summary[0], ("Category", "Machine Parts & Accessories".to_string()));
        assert!(summary.contains(&("Rate", "0.115%".to_string())));
        assert!(summary.contains(&("Deductible", "$500".to_string())));
        assert!(summary.contains(&("Cargo Value", "$10,000".to_string())));
    }

    #[test]
    fn test_listed_goods() {
        let categories = CategoryList::fallback();
        let delivery = sample_delivery("buyer@example.com")
            .with_listed_goods(&categories, " vehicles (road)", "Two vans")
            .unwrap();
        assert_eq!(delivery.category.as_deref(), Some("Vehicles (Road)"));

        let err = sample_delivery("buyer@example.com")
            .with_listed_goods(&categories, "Livestock", "Cattle")
            .unwrap_err();
        assert!(matches!(err, DeliveryError::UnknownCategory(ref c) if c == "Livestock"));
    }

    #[test]
    fn test_summary_additional_and_manual_quote() {
        let engine = QuoteEngine::default();
        let ledger = MemoryLedger::new();
        let notifier = LogNotifier::new("admin@example.com");

        let request = QuoteRequest::additional(TransitMethod::Ocean, CoverageType::TotalLoss, 20_000.0, 5_000.0).unwrap();
        let quote = engine.compute(&request).unwrap();
        let delivery = QuoteDelivery::new("buyer@example.com", request, quote).with_quote_id("q-add");
        let summary = delivery.summary();
        assert!(summary.contains(&("Coverage For", "Additional".to_string())));
        assert!(summary.contains(&("Additional Value", "$20,000".to_string())));
        assert!(summary.contains(&("Carrier Insurance", "$5,000".to_string())));
        assert!(summary.contains(&("Deductible", "$0".to_string())));
        assert!(deliver(&delivery, &notifier, &ledger).unwrap().recorded);

        let request = QuoteRequest::full_value(TransitMethod::Air, CoverageType::AllRisk, 2_000_000.0).unwrap();
        let quote = engine.compute(&request).unwrap();
        assert!(quote.needs_manual_quote);
        let delivery = QuoteDelivery::new("buyer@example.com", request, quote).with_quote_id("q-manual");
        let summary = delivery.summary();
        assert!(summary.contains(&("Deductible", "requires manual quote".to_string())));
        assert!(!summary.iter().any(|(label, _)| *label == "Additional Value"));
        assert!(deliver(&delivery, &notifier, &ledger).unwrap().recorded);

        assert_eq!(ledger.records().len(), 2);
    }

    #[test]
    fn test_poisoned_ledger_stays_usable() {
        let ledger = std::sync::Arc::new(MemoryLedger::new());
        ledger.mark_sent("q-1", "buyer@example.com", Utc::now()).unwrap();

        let poisoner = std::sync::Arc::clone(&ledger);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("writer crashed");
        })
        .join();
        assert!(ledger.records.is_poisoned());

        ledger.mark_sent("q-2", "buyer@example.com", Utc::now()).unwrap();
        let ids: Vec<_> = ledger.records().into_iter().map(|r| r.quote_id).collect();
        assert_eq!(ids, ["q-1", "q-2"]);
    }
}
