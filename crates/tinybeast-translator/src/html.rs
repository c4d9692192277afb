use scraper::{ElementRef, Selector};

use crate::TranslateError;

pub(crate) fn selector(css: &str) -> Result<Selector, TranslateError> {
    Selector::parse(css).map_err(|e| TranslateError::ApiError(format!("Invalid selector {css}: {e}")))
}

/// Text content with whitespace runs collapsed
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapsed text of the first match below `element`, if not blank
pub(crate) fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
}
