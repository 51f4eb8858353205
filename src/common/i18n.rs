// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::Arc;

const FALLBACK_LANG: &str = "en";

// Mensagens de erro por idioma. A chave é o `AppError::code()`.
const MESSAGES: &[(&str, &str, &str)] = &[
    // --- pt ---
    ("pt", "validation_error", "Um ou mais campos são inválidos."),
    ("pt", "invalid_quantity", "Quantidade inválida."),
    ("pt", "exceeds_remaining", "A quantidade informada excede o restante a aplicar."),
    ("pt", "not_found", "Recurso não encontrado."),
    ("pt", "already_applied", "A mão de obra deste rubro já foi aplicada."),
    ("pt", "rubro_has_materials", "Este rubro possui materiais; aplique o avanço por material."),
    ("pt", "invalid_status_transition", "Transição de status não permitida."),
    ("pt", "quotation_not_paid", "Apenas orçamentos pagos podem gerar uma obra."),
    ("pt", "quotation_already_converted", "Este orçamento já gerou uma obra."),
    ("pt", "quotation_locked", "O orçamento não pode mais ser editado."),
    ("pt", "internal_error", "Ocorreu um erro inesperado."),
    // --- es ---
    ("es", "validation_error", "Uno o más campos son inválidos."),
    ("es", "invalid_quantity", "Cantidad inválida."),
    ("es", "exceeds_remaining", "La cantidad supera lo que resta por aplicar."),
    ("es", "not_found", "Recurso no encontrado."),
    ("es", "already_applied", "La mano de obra de este rubro ya fue aplicada."),
    ("es", "rubro_has_materials", "Este rubro tiene materiales; aplique el avance por material."),
    ("es", "invalid_status_transition", "Cambio de estado no permitido."),
    ("es", "quotation_not_paid", "Solo un presupuesto pagado puede generar una obra."),
    ("es", "quotation_already_converted", "Este presupuesto ya generó una obra."),
    ("es", "quotation_locked", "El presupuesto ya no puede editarse."),
    ("es", "internal_error", "Ocurrió un error inesperado."),
    // --- en ---
    ("en", "validation_error", "One or more fields are invalid."),
    ("en", "invalid_quantity", "Invalid quantity."),
    ("en", "exceeds_remaining", "The quantity exceeds what is left to apply."),
    ("en", "not_found", "Resource not found."),
    ("en", "already_applied", "Labor for this rubro was already applied."),
    ("en", "rubro_has_materials", "This rubro has materials; apply progress per material."),
    ("en", "invalid_status_transition", "Status transition not allowed."),
    ("en", "quotation_not_paid", "Only paid quotations can become a project."),
    ("en", "quotation_already_converted", "This quotation was already converted into a project."),
    ("en", "quotation_locked", "The quotation can no longer be edited."),
    ("en", "internal_error", "An unexpected error occurred."),
];

#[derive(Clone)]
pub struct I18nStore {
    messages: Arc<HashMap<&'static str, HashMap<&'static str, &'static str>>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages: HashMap<&'static str, HashMap<&'static str, &'static str>> =
            HashMap::new();
        for (lang, key, text) in MESSAGES {
            messages.entry(*lang).or_default().insert(*key, *text);
        }
        Self { messages: Arc::new(messages) }
    }

    /// Traduz a chave para o idioma pedido, caindo para inglês e, por fim, para a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        let lookup = |lang: &str| self.messages.get(lang).and_then(|m| m.get(key)).copied();

        lookup(lang)
            .or_else(|| lookup(FALLBACK_LANG))
            .map(|text| text.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_language() {
        let store = I18nStore::new();
        assert_eq!(store.translate("es", "invalid_quantity"), "Cantidad inválida.");
        assert_eq!(store.translate("pt", "not_found"), "Recurso não encontrado.");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "invalid_quantity"), "Invalid quantity.");
    }

    #[test]
    fn unknown_key_is_returned_as_is() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "no_such_key"), "no_such_key");
    }
}
