//! Field-level validation for each intake step.

use serde::Serialize;

use super::{IntakeFields, IntakeStep};
use crate::estimator::PanelTechnology;
use crate::store::NewInstallation;

/// A user-correctable problem with one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Payload field name.
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// The catalog technology named by `token`; blank counts as none selected.
fn parse_technology(token: Option<&str>) -> Result<Option<PanelTechnology>, FieldError> {
    match token.map(str::trim) {
        None | Some("") => Ok(None),
        Some(token) => token.parse::<PanelTechnology>().map(Some).map_err(|_| {
            let known: Vec<&str> = PanelTechnology::ALL.iter().map(|t| t.as_str()).collect();
            FieldError {
                field: "panel_technology",
                message: format!(
                    "unknown panel technology \"{token}\", expected one of: {}",
                    known.join(", ")
                ),
            }
        }),
    }
}

/// Street, street number, postal code and locality.
pub fn validate_location(fields: &IntakeFields) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if is_blank(fields.street.as_deref()) {
        errors.push(FieldError::new("street", "street is required"));
    }
    if !fields.street_number.is_some_and(|n| n > 0) {
        errors.push(FieldError::new(
            "street_number",
            "street number is required and must be greater than 0",
        ));
    }
    if !fields
        .postal_code
        .is_some_and(|npa| (1000..=9999).contains(&npa))
    {
        errors.push(FieldError::new(
            "postal_code",
            "postal code is required and must have 4 digits",
        ));
    }
    if is_blank(fields.locality.as_deref()) {
        errors.push(FieldError::new("locality", "locality is required"));
    }
    errors
}

/// Energy and integration types are free choices; a panel technology, when
/// selected, must come from the catalog.
pub fn validate_type_selection(fields: &IntakeFields) -> Vec<FieldError> {
    parse_technology(fields.panel_technology.as_deref())
        .err()
        .into_iter()
        .collect()
}

/// Roof azimuth in [0°, 360°] and inclination in [0°, 90°].
pub fn validate_orientation(fields: &IntakeFields) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !fields
        .azimuth
        .is_some_and(|a| (0.0..=360.0).contains(&a))
    {
        errors.push(FieldError::new(
            "azimuth",
            "azimuth is required and must be between 0° and 360°",
        ));
    }
    if !fields
        .inclination
        .is_some_and(|i| (0.0..=90.0).contains(&i))
    {
        errors.push(FieldError::new(
            "inclination",
            "inclination is required and must be between 0° and 90°",
        ));
    }
    errors
}

/// Strictly positive length and width.
pub fn validate_dimensions(fields: &IntakeFields) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !fields.length.is_some_and(|l| l > 0.0) {
        errors.push(FieldError::new(
            "length",
            "length is required and must be greater than 0",
        ));
    }
    if !fields.width.is_some_and(|w| w > 0.0) {
        errors.push(FieldError::new(
            "width",
            "width is required and must be greater than 0",
        ));
    }
    errors
}

/// Validation for the fields owned by `step`.
pub fn validate_step(step: IntakeStep, fields: &IntakeFields) -> Vec<FieldError> {
    match step {
        IntakeStep::Location => validate_location(fields),
        IntakeStep::TypeSelection => validate_type_selection(fields),
        IntakeStep::Orientation => validate_orientation(fields),
        IntakeStep::Dimensions => validate_dimensions(fields),
    }
}

/// Runs every step's validation and builds the installation to register.
///
/// # Errors
///
/// Returns all field errors found across the steps.
pub fn validated_installation(fields: &IntakeFields) -> Result<NewInstallation, Vec<FieldError>> {
    let mut errors = validate_location(fields);
    let panel_technology = match parse_technology(fields.panel_technology.as_deref()) {
        Ok(technology) => technology,
        Err(e) => {
            errors.push(e);
            None
        }
    };
    errors.extend(validate_orientation(fields));
    errors.extend(validate_dimensions(fields));

    let (
        Some(street),
        Some(street_number),
        Some(postal_code),
        Some(locality),
        Some(azimuth_deg),
        Some(inclination_deg),
        Some(length_m),
        Some(width_m),
    ) = (
        fields.street.as_ref(),
        fields.street_number,
        fields.postal_code,
        fields.locality.as_ref(),
        fields.azimuth,
        fields.inclination,
        fields.length,
        fields.width,
    )
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewInstallation {
        street: street.trim().to_string(),
        street_number,
        postal_code,
        locality: locality.trim().to_string(),
        energy_type: fields.energy_type.clone(),
        panel_technology,
        integration_type: fields.integration_type.clone(),
        azimuth_deg,
        inclination_deg,
        length_m,
        width_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> IntakeFields {
        IntakeFields {
            street: Some("Rue Exemple".into()),
            street_number: Some(10),
            postal_code: Some(1950),
            locality: Some("Sion".into()),
            energy_type: Some("Photovoltaïque".into()),
            panel_technology: Some("monocrystalline".into()),
            integration_type: Some("integrated".into()),
            azimuth: Some(180.0),
            inclination: Some(30.0),
            length: Some(10.0),
            width: Some(5.0),
        }
    }

    fn fields_of(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn location_reports_each_missing_field() {
        let fields = IntakeFields {
            street: Some(String::new()),
            street_number: None,
            postal_code: Some(50),
            locality: Some("  ".into()),
            ..IntakeFields::default()
        };
        let errors = validate_location(&fields);
        assert_eq!(
            fields_of(&errors),
            vec!["street", "street_number", "postal_code", "locality"]
        );
    }

    #[test]
    fn postal_code_bounds_are_inclusive() {
        for (npa, ok) in [(999, false), (1000, true), (9999, true), (10000, false)] {
            let fields = IntakeFields {
                postal_code: Some(npa),
                ..complete()
            };
            assert_eq!(validate_location(&fields).is_empty(), ok, "{npa}");
        }
    }

    #[test]
    fn street_number_must_be_positive() {
        let fields = IntakeFields {
            street_number: Some(0),
            ..complete()
        };
        assert_eq!(fields_of(&validate_location(&fields)), vec!["street_number"]);
    }

    #[test]
    fn orientation_ranges() {
        for (azimuth, inclination, expected) in [
            (0.0, 0.0, vec![]),
            (360.0, 90.0, vec![]),
            (-1.0, 30.0, vec!["azimuth"]),
            (361.0, 91.0, vec!["azimuth", "inclination"]),
            (180.0, -0.5, vec!["inclination"]),
        ] {
            let fields = IntakeFields {
                azimuth: Some(azimuth),
                inclination: Some(inclination),
                ..complete()
            };
            assert_eq!(fields_of(&validate_orientation(&fields)), expected);
        }
    }

    #[test]
    fn dimensions_must_be_positive() {
        let fields = IntakeFields {
            length: Some(0.0),
            width: None,
            ..complete()
        };
        assert_eq!(fields_of(&validate_dimensions(&fields)), vec!["length", "width"]);
    }

    #[test]
    fn type_selection_allows_empty_choices() {
        assert!(validate_step(IntakeStep::TypeSelection, &IntakeFields::default()).is_empty());
        let blank = IntakeFields {
            panel_technology: Some("  ".into()),
            ..IntakeFields::default()
        };
        assert!(validate_type_selection(&blank).is_empty());
    }

    #[test]
    fn unknown_technology_is_a_field_error() {
        let fields = IntakeFields {
            panel_technology: Some("Monocristallin".into()),
            ..complete()
        };
        let errors = validate_step(IntakeStep::TypeSelection, &fields);
        assert_eq!(fields_of(&errors), vec!["panel_technology"]);
        assert!(errors[0].message.contains("monocrystalline, polycrystalline"));

        let errors = validated_installation(&fields).expect_err("unknown technology");
        assert_eq!(fields_of(&errors), vec!["panel_technology"]);
    }

    #[test]
    fn location_step_does_not_require_later_fields() {
        let fields = IntakeFields {
            length: None,
            width: None,
            azimuth: None,
            inclination: None,
            ..complete()
        };
        assert!(validate_step(IntakeStep::Location, &fields).is_empty());
    }

    #[test]
    fn validated_installation_builds_from_complete_fields() {
        let installation = validated_installation(&complete()).expect("complete fields");
        assert_eq!(installation.street, "Rue Exemple");
        assert_eq!(installation.surface_m2(), 50.0);
        assert_eq!(installation.panel_technology, Some(PanelTechnology::Monocrystalline));
    }

    #[test]
    fn validated_installation_collects_errors_from_every_step() {
        let fields = IntakeFields {
            street: None,
            inclination: None,
            width: Some(-2.0),
            ..complete()
        };
        let errors = validated_installation(&fields).expect_err("incomplete fields");
        assert_eq!(fields_of(&errors), vec!["street", "inclination", "width"]);
    }
}
