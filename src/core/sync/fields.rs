use super::source::{ExternalLead, LeadField};
use crate::core::store::NewLead;

const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Name,
    Email,
    Phone,
    Message,
}

/// Map a form field label onto a lead attribute. Labels are matched by
/// lower-cased substring, English and Portuguese spellings alike, checked
/// in this order.
fn classify(label: &str) -> Option<Target> {
    let label = label.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
    if has(&["name", "nome"]) {
        Some(Target::Name)
    } else if has(&["email", "e-mail"]) {
        Some(Target::Email)
    } else if has(&["phone", "telefone", "celular"]) {
        Some(Target::Phone)
    } else if has(&["message", "mensagem"]) {
        Some(Target::Message)
    } else {
        None
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Takes the first value of each recognised field; a later field mapping to
/// the same attribute replaces the earlier one.
pub fn parse_fields(fields: &[LeadField]) -> ParsedFields {
    let mut parsed = ParsedFields::default();
    for field in fields {
        let Some(value) = field.values.first() else {
            continue;
        };
        let slot = match classify(&field.name) {
            Some(Target::Name) => &mut parsed.name,
            Some(Target::Email) => &mut parsed.email,
            Some(Target::Phone) => &mut parsed.phone,
            Some(Target::Message) => &mut parsed.message,
            None => continue,
        };
        *slot = Some(value.clone());
    }
    parsed
}

pub fn to_new_lead(item: &ExternalLead) -> NewLead {
    let parsed = parse_fields(&item.fields);
    NewLead {
        external_id: item.external_id.clone(),
        name: parsed
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        email: parsed.email,
        phone: parsed.phone,
        message: parsed.message.unwrap_or_default(),
    }
}
