// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "en";

// Extrator de idioma (Accept-Language -> "pt", "es", "en"...)
pub struct Locale(pub String);

// "pt-BR,pt;q=0.9" -> "pt"
fn primary_language(header_str: &str) -> Option<String> {
    accept_language::parse(header_str)
        .first()
        .and_then(|tag| tag.split('-').next())
        .map(|lang| lang.to_lowercase())
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(primary_language)
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Ok(Locale(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn region_is_dropped() {
        assert_eq!(primary_language("es-AR,es;q=0.9,en;q=0.5").as_deref(), Some("es"));
    }

    #[test]
    fn highest_quality_wins() {
        assert_eq!(primary_language("en;q=0.3,pt-BR;q=0.9").as_deref(), Some("pt"));
    }

    #[tokio::test]
    async fn missing_header_defaults_to_english() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();

        let Locale(lang) = Locale::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(lang, "en");
    }
}
