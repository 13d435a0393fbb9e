use serde_json::Value;

use crate::artifact::Section4;
use crate::validator::ValidatedContact;

/// Contacts without both a name and a title are dropped silently; the
/// course-level `NO_CONTACTS_FOUND` flag covers the empty result.
pub(crate) fn parse(section: Option<&Section4>) -> Vec<ValidatedContact> {
    let Some(section) = section else {
        return Vec::new();
    };

    section
        .contacts
        .iter()
        .filter_map(|contact| {
            let name = contact.name.trim();
            let title = contact.title.trim();
            if name.is_empty() || title.is_empty() {
                return None;
            }

            Some(ValidatedContact {
                name: name.to_owned(),
                title: title.to_owned(),
                email: clean_optional(contact.work_email.as_deref()),
                linkedin_url: clean_optional(contact.linkedin_url.as_deref()),
                phone: clean_optional(contact.phone.as_deref()),
                employment_verified: truthy(&contact.employment_verified),
                sources: contact
                    .sources
                    .iter()
                    .filter_map(source_string)
                    .collect(),
            })
        })
        .collect()
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Research output writes this as a bool or as "true"/"yes"/"verified".
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(text) => {
            matches!(text.to_ascii_lowercase().as_str(), "true" | "yes" | "verified")
        }
        _ => false,
    }
}

fn source_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(raw: &str) -> Section4 {
        serde_json::from_str(raw).expect("section shape")
    }

    #[test]
    fn missing_section_yields_empty_list() {
        assert!(parse(None).is_empty());
    }

    #[test]
    fn contacts_without_name_or_title_are_dropped() {
        let contacts = parse(Some(&section(
            r#"{"contacts": [
                {"name": "Stacy Foster", "title": "General Manager"},
                {"name": "  ", "title": "Superintendent"},
                {"name": "Bill Ranson", "title": ""}
            ]}"#,
        )));
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Stacy Foster");
    }

    #[test]
    fn verification_strings_coerce_to_bool() {
        let contacts = parse(Some(&section(
            r#"{"contacts": [
                {"name": "A B", "title": "Owner", "employment_verified": "verified"},
                {"name": "C D", "title": "President", "employment_verified": "no"},
                {"name": "E F", "title": "Club Manager", "employment_verified": true}
            ]}"#,
        )));
        assert!(contacts[0].employment_verified);
        assert!(!contacts[1].employment_verified);
        assert!(contacts[2].employment_verified);
    }

    #[test]
    fn blank_fields_collapse_to_none() {
        let contacts = parse(Some(&section(
            r#"{"contacts": [{"name": "A B", "title": "Owner", "work_email": "  ", "phone": ""}]}"#,
        )));
        assert_eq!(contacts[0].email, None);
        assert_eq!(contacts[0].phone, None);
    }

    #[test]
    fn non_string_sources_are_dropped() {
        let contacts = parse(Some(&section(
            r#"{"contacts": [{"name": "A B", "title": "Owner",
                "sources": ["https://x.test", 42, "", null]}]}"#,
        )));
        assert_eq!(contacts[0].sources, vec![String::from("https://x.test")]);
    }
}
