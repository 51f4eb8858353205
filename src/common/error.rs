use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::budget::QuotationStatus;

// Erros de domínio + infraestrutura, com `thiserror` para a conversão automática via `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Quantidade inválida: {quantity}")]
    InvalidQuantity {
        quantity: Decimal,
        max: Option<Decimal>,
    },

    #[error("Quantidade {requested} excede o restante ({remaining})")]
    ExceedsRemaining {
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Mão de obra do rubro {rubro_id} já foi aplicada")]
    AlreadyApplied { rubro_id: i64 },

    #[error("Rubro {rubro_id} possui materiais; aplique por material")]
    RubroHasMaterials { rubro_id: i64 },

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: QuotationStatus,
        to: QuotationStatus,
    },

    #[error("Orçamento não está pago (status atual: {0:?})")]
    QuotationNotPaid(QuotationStatus),

    #[error("Orçamento {quotation_id} já foi convertido em obra")]
    QuotationAlreadyConverted { quotation_id: i64 },

    #[error("Orçamento bloqueado para edição (status: {0:?})")]
    QuotationLocked(QuotationStatus),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// O erro "pronto para o cliente": status HTTP + mensagem traduzida + contexto.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Chave usada no I18nStore.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidQuantity { .. } => "invalid_quantity",
            AppError::ExceedsRemaining { .. } => "exceeds_remaining",
            AppError::ResourceNotFound(_) => "not_found",
            AppError::AlreadyApplied { .. } => "already_applied",
            AppError::RubroHasMaterials { .. } => "rubro_has_materials",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::QuotationNotPaid(_) => "quotation_not_paid",
            AppError::QuotationAlreadyConverted { .. } => "quotation_already_converted",
            AppError::QuotationLocked(_) => "quotation_locked",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidQuantity { .. }
            | AppError::RubroHasMaterials { .. } => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExceedsRemaining { .. }
            | AppError::AlreadyApplied { .. }
            | AppError::InvalidStatusTransition { .. }
            | AppError::QuotationNotPaid(_)
            | AppError::QuotationAlreadyConverted { .. }
            | AppError::QuotationLocked(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Contexto suficiente para a UI se redesenhar sem outra consulta.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InvalidQuantity { quantity, max } => {
                Some(json!({ "quantity": quantity, "max": max }))
            }
            AppError::ExceedsRemaining { requested, remaining } => {
                Some(json!({ "requested": requested, "remaining": remaining }))
            }
            AppError::ResourceNotFound(what) => Some(json!({ "resource": what })),
            AppError::AlreadyApplied { rubro_id } | AppError::RubroHasMaterials { rubro_id } => {
                Some(json!({ "rubroId": rubro_id }))
            }
            AppError::InvalidStatusTransition { from, to } => {
                Some(json!({ "from": from, "to": to }))
            }
            AppError::QuotationNotPaid(status) | AppError::QuotationLocked(status) => {
                Some(json!({ "status": status }))
            }
            AppError::QuotationAlreadyConverted { quotation_id } => {
                Some(json!({ "quotationId": quotation_id }))
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => None,
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe fica só no log; o cliente recebe a mensagem genérica.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Operação rejeitada: {}", self);
        }

        ApiError {
            status,
            message: store.translate(&locale.0, self.code()),
            details: self.details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn locale(lang: &str) -> Locale {
        Locale(lang.to_string())
    }

    #[test]
    fn exceeds_remaining_is_conflict_with_remaining_in_details() {
        let err = AppError::ExceedsRemaining {
            requested: dec!(6),
            remaining: dec!(5),
        };
        let api = err.to_api_error(&locale("en"), &I18nStore::new());

        assert_eq!(api.status, StatusCode::CONFLICT);
        let details = api.details.expect("details");
        assert_eq!(details["remaining"], json!(5.0));
        assert_eq!(details["requested"], json!(6.0));
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let cases = vec![
            (
                AppError::InvalidQuantity { quantity: dec!(0), max: None },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::ResourceNotFound("material 9".into()), StatusCode::NOT_FOUND),
            (AppError::AlreadyApplied { rubro_id: 1 }, StatusCode::CONFLICT),
            (AppError::RubroHasMaterials { rubro_id: 1 }, StatusCode::BAD_REQUEST),
            (
                AppError::QuotationNotPaid(QuotationStatus::Sent),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{err}");
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exhausted"));
        let api = err.to_api_error(&locale("pt"), &I18nStore::new());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_none());
        assert!(!api.message.contains("pool"));
    }

    #[test]
    fn message_follows_locale() {
        let store = I18nStore::new();
        let es = AppError::AlreadyApplied { rubro_id: 3 }.to_api_error(&locale("es"), &store);
        let en = AppError::AlreadyApplied { rubro_id: 3 }.to_api_error(&locale("en"), &store);

        assert_ne!(es.message, en.message);
    }
}
