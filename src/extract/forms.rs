//! Form metadata extraction

use crate::url::resolve_url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// A form found on a crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInfo {
    /// Absolute submission URL
    pub action: String,

    /// Upper-cased HTTP method, `GET` when absent
    pub method: String,

    pub fields: Vec<FormField>,
}

/// A named input, select or textarea inside a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,

    /// `type` attribute of inputs (default `text`), or `select` / `textarea`
    pub field_type: String,

    pub value: Option<String>,

    pub required: bool,
}

/// Extracts every form in the document
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `base` - Effective base URL for resolving `action`
/// * `page_url` - Used as the action when it is missing or empty
pub fn extract_forms(document: &Html, base: &Url, page_url: &Url) -> Vec<FormInfo> {
    let (Ok(form_selector), Ok(field_selector)) = (
        Selector::parse("form"),
        Selector::parse("input, select, textarea"),
    ) else {
        return Vec::new();
    };

    document
        .select(&form_selector)
        .map(|form| {
            let action = form
                .value()
                .attr("action")
                .map(str::trim)
                .filter(|action| !action.is_empty())
                .and_then(|action| resolve_url(base, action))
                .unwrap_or_else(|| page_url.clone());

            let method = form
                .value()
                .attr("method")
                .map(|m| m.trim().to_uppercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GET".to_string());

            let fields = form
                .select(&field_selector)
                .filter_map(|element| parse_field(&element))
                .collect();

            FormInfo {
                action: action.to_string(),
                method,
                fields,
            }
        })
        .collect()
}

/// Builds a field from an input, select or textarea; unnamed fields are skipped
fn parse_field(element: &ElementRef) -> Option<FormField> {
    let value = element.value();
    let name = value.attr("name")?.trim();
    if name.is_empty() {
        return None;
    }

    let (field_type, field_value) = match value.name() {
        "select" => ("select".to_string(), selected_option(element)),
        "textarea" => {
            let text: String = element.text().collect();
            ("textarea".to_string(), Some(text).filter(|t| !t.is_empty()))
        }
        _ => (
            value
                .attr("type")
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
            value.attr("value").map(str::to_string),
        ),
    };

    Some(FormField {
        name: name.to_string(),
        field_type,
        value: field_value,
        required: value.attr("required").is_some(),
    })
}

/// The value of the selected option, or the first option when none is selected
fn selected_option(select: &ElementRef) -> Option<String> {
    let selector = Selector::parse("option").ok()?;
    let options: Vec<ElementRef> = select.select(&selector).collect();

    let chosen = options
        .iter()
        .find(|option| option.value().attr("selected").is_some())
        .or_else(|| options.first())?;

    Some(
        chosen
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
    )
}
