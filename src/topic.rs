//! Parameterized pub/sub topic patterns.
//!
//! A declared pattern such as `devices/{deviceID}/sensors/{sensorType}` names
//! every variable segment. Protocol wildcards are never accepted in
//! declarations; the wire form substitutes the single-level wildcard `+` for
//! each named segment.

use crate::error::TopicError;
use crate::registry::TopicParameterSpec;
use std::collections::BTreeSet;

pub const SEPARATOR: char = '/';
pub const SINGLE_LEVEL_WILDCARD: char = '+';
pub const MULTI_LEVEL_WILDCARD: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

/// A validated topic pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    pattern: String,
    segments: Vec<Segment>,
}

impl TopicPattern {
    /// Validates the pattern syntax.
    pub fn parse(pattern: &str) -> Result<Self, TopicError> {
        if pattern.is_empty() {
            return Err(TopicError::Empty);
        }
        if let Some(wildcard) = pattern
            .chars()
            .find(|c| *c == SINGLE_LEVEL_WILDCARD || *c == MULTI_LEVEL_WILDCARD)
        {
            return Err(TopicError::Wildcard {
                pattern: pattern.to_string(),
                wildcard,
            });
        }
        if pattern.starts_with(SEPARATOR) {
            return Err(TopicError::LeadingSeparator(pattern.to_string()));
        }
        if pattern.ends_with(SEPARATOR) {
            return Err(TopicError::TrailingSeparator(pattern.to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut segments = Vec::new();
        for (index, raw) in pattern.split(SEPARATOR).enumerate() {
            if raw.is_empty() {
                return Err(TopicError::EmptySegment {
                    pattern: pattern.to_string(),
                    index,
                });
            }
            match placeholder(raw)? {
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(TopicError::RepeatedPlaceholder(name.to_string()));
                    }
                    segments.push(Segment::Parameter(name.to_string()));
                }
                None => segments.push(Segment::Literal(raw.to_string())),
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in pattern order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Wire form: every placeholder segment becomes `+`.
    pub fn to_wire(&self) -> String {
        let wildcard = SINGLE_LEVEL_WILDCARD.to_string();
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Parameter(_) => wildcard.as_str(),
            })
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string())
    }

    /// Checks that placeholders and declared parameters match one to one.
    pub fn cross_validate(&self, declared: &[TopicParameterSpec]) -> Result<(), TopicError> {
        let mut names = BTreeSet::new();
        for parameter in declared {
            if !names.insert(parameter.name.as_str()) {
                return Err(TopicError::DuplicateParameter(parameter.name.clone()));
            }
        }

        let placeholders: BTreeSet<&str> = self.parameters().collect();
        if let Some(missing) = self.parameters().find(|name| !names.contains(name)) {
            return Err(TopicError::UndeclaredParameter(missing.to_string()));
        }

        for parameter in declared {
            if !placeholders.contains(parameter.name.as_str()) {
                return Err(TopicError::UnusedParameter(parameter.name.clone()));
            }
            if parameter.description.trim().is_empty() {
                return Err(TopicError::MissingDescription(parameter.name.clone()));
            }
            if parameter.ty.is_none() {
                return Err(TopicError::MissingType(parameter.name.clone()));
            }
        }
        Ok(())
    }
}

/// Classifies one segment: `Ok(Some(name))` for a well-formed `{name}`
/// placeholder, `Ok(None)` for a literal without braces.
///
/// Shared with HTTP path validation.
pub fn placeholder(segment: &str) -> Result<Option<&str>, TopicError> {
    if !segment.contains(['{', '}']) {
        return Ok(None);
    }
    let malformed = || TopicError::MalformedParameter {
        segment: segment.to_string(),
    };
    let name = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(malformed)?;
    if !is_parameter_name(name) {
        return Err(malformed());
    }
    Ok(Some(name))
}

/// Letter followed by letters, digits or underscores.
fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;
    use pretty_assertions::assert_eq;

    fn param(name: &str) -> TopicParameterSpec {
        TopicParameterSpec {
            name: name.to_string(),
            description: format!("The {}", name),
            ty: Some(FieldType::string()),
        }
    }

    #[test]
    fn test_wire_form_replaces_each_placeholder() {
        let pattern = TopicPattern::parse("devices/{deviceID}/sensors/{sensorType}").unwrap();

        assert_eq!(pattern.to_wire(), "devices/+/sensors/+");
        assert_eq!(pattern.parameters().collect::<Vec<_>>(), vec!["deviceID", "sensorType"]);
        pattern
            .cross_validate(&[param("sensorType"), param("deviceID")])
            .unwrap();
    }

    #[test]
    fn test_wildcards_rejected_anywhere() {
        for pattern in ["devices/#", "#", "devices/+/temperature", "a/b#c"] {
            assert!(
                matches!(TopicPattern::parse(pattern), Err(TopicError::Wildcard { .. })),
                "{}",
                pattern
            );
        }
    }

    #[test]
    fn test_empty_segment_rejected() {
        assert_eq!(
            TopicPattern::parse("devices//temperature"),
            Err(TopicError::EmptySegment {
                pattern: "devices//temperature".to_string(),
                index: 1,
            })
        );
    }

    #[test]
    fn test_separator_and_empty_rules() {
        assert_eq!(TopicPattern::parse(""), Err(TopicError::Empty));
        assert!(matches!(
            TopicPattern::parse("/devices"),
            Err(TopicError::LeadingSeparator(_))
        ));
        assert!(matches!(
            TopicPattern::parse("devices/"),
            Err(TopicError::TrailingSeparator(_))
        ));
    }

    #[test]
    fn test_malformed_placeholders() {
        for pattern in [
            "devices/{deviceID",
            "devices/deviceID}",
            "devices/x{deviceID}",
            "devices/{1device}",
            "devices/{}",
            "devices/{device-id}",
        ] {
            assert!(
                matches!(
                    TopicPattern::parse(pattern),
                    Err(TopicError::MalformedParameter { .. })
                ),
                "{}",
                pattern
            );
        }
        assert_eq!(
            TopicPattern::parse("a/{id}/b/{id}"),
            Err(TopicError::RepeatedPlaceholder("id".to_string()))
        );
    }

    #[test]
    fn test_cross_validation_failures() {
        let pattern = TopicPattern::parse("devices/{deviceID}/status").unwrap();

        assert_eq!(
            pattern.cross_validate(&[]),
            Err(TopicError::UndeclaredParameter("deviceID".to_string()))
        );
        assert_eq!(
            pattern.cross_validate(&[param("deviceID"), param("zone")]),
            Err(TopicError::UnusedParameter("zone".to_string()))
        );
        assert_eq!(
            pattern.cross_validate(&[param("deviceID"), param("deviceID")]),
            Err(TopicError::DuplicateParameter("deviceID".to_string()))
        );

        let mut undocumented = param("deviceID");
        undocumented.description = " ".to_string();
        assert_eq!(
            pattern.cross_validate(&[undocumented]),
            Err(TopicError::MissingDescription("deviceID".to_string()))
        );

        let mut untyped = param("deviceID");
        untyped.ty = None;
        assert_eq!(
            pattern.cross_validate(&[untyped]),
            Err(TopicError::MissingType("deviceID".to_string()))
        );
    }

    #[test]
    fn test_literal_only_pattern() {
        let pattern = TopicPattern::parse("fleet/announcements").unwrap();
        assert_eq!(pattern.to_wire(), "fleet/announcements");
        assert_eq!(pattern.parameters().count(), 0);
    }
}
