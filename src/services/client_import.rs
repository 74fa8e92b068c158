//! Bulk client import from a CSV file with a header row.

use super::clients::{normalize_document, ClientService, CreateClientRequest};
use crate::errors::ServiceError;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

const COLUMNS: &[&str] = &["name", "document", "email", "phone", "address", "city", "state", "notes"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportRowError {
    /// 1-based line number in the uploaded file
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
    pub errors: Vec<ImportRowError>,
}

/// Column name -> position, built from the header row.
#[derive(Debug)]
struct HeaderMap(HashMap<&'static str, usize>);

impl HeaderMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, ServiceError> {
        let mut positions = HashMap::new();
        for (idx, raw) in headers.iter().enumerate() {
            let normalized = raw.trim().trim_start_matches('\u{feff}').to_lowercase();
            if let Some(column) = COLUMNS.iter().find(|c| **c == normalized) {
                positions.entry(*column).or_insert(idx);
            }
        }
        if !positions.contains_key("name") {
            return Err(ServiceError::ValidationError(
                "CSV header must contain a 'name' column".to_string(),
            ));
        }
        Ok(Self(positions))
    }

    fn get(&self, record: &StringRecord, column: &str) -> Option<String> {
        self.0
            .get(column)
            .and_then(|idx| record.get(*idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn to_request(&self, record: &StringRecord) -> CreateClientRequest {
        CreateClientRequest {
            name: self.get(record, "name").unwrap_or_default(),
            document: self.get(record, "document"),
            email: self.get(record, "email"),
            phone: self.get(record, "phone"),
            address: self.get(record, "address"),
            city: self.get(record, "city"),
            state: self.get(record, "state"),
            notes: self.get(record, "notes"),
        }
    }
}

#[derive(Clone)]
pub struct ClientImportService {
    clients: ClientService,
}

impl ClientImportService {
    pub fn new(clients: ClientService) -> Self {
        Self { clients }
    }

    /// Rows are inserted one by one; a bad row is reported and the
    /// import carries on.
    #[instrument(skip(self, csv_text), fields(bytes = csv_text.len()))]
    pub async fn import_clients(&self, csv_text: &str) -> Result<ImportSummary, ServiceError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ServiceError::InvalidInput(format!("Unreadable CSV header: {}", e)))?
            .clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ServiceError::InvalidInput("CSV file is empty".to_string()));
        }
        let columns = HeaderMap::from_headers(&headers)?;

        let mut summary = ImportSummary::default();
        let mut seen_documents = HashSet::new();

        for (offset, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(offset as u64 + 2);
                    summary.errors.push(ImportRowError {
                        line,
                        message: format!("Malformed row: {}", e),
                    });
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(offset as u64 + 2);

            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let mut request = columns.to_request(&record);
            if let Err(e) = request.validate() {
                summary.errors.push(ImportRowError {
                    line,
                    message: e.to_string(),
                });
                continue;
            }

            let document = match request.document.as_deref().map(normalize_document) {
                Some(Ok(doc)) => doc,
                Some(Err(e)) => {
                    summary.errors.push(ImportRowError {
                        line,
                        message: e.to_string(),
                    });
                    continue;
                }
                None => None,
            };
            if let Some(doc) = &document {
                if !seen_documents.insert(doc.clone()) {
                    summary.skipped += 1;
                    continue;
                }
            }
            request.document = document;

            match self.clients.create_client(request).await {
                Ok(_) => summary.imported += 1,
                Err(ServiceError::Conflict(_)) => summary.skipped += 1,
                Err(ServiceError::ValidationError(message)) => {
                    summary.errors.push(ImportRowError { line, message })
                }
                Err(other) => return Err(other),
            }
        }

        if !summary.errors.is_empty() {
            warn!(errors = summary.errors.len(), "Client import finished with row errors");
        }
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "Client import finished"
        );
        Ok(summary)
    }
}
