//! Four-step intake workflow for registering a rooftop installation.
//!
//! Steps are location, type selection, orientation and dimensions. State
//! for each session is held in a [`SessionStore`] between round trips and
//! only advances when the submitted step validates. Completing the last
//! step writes a new installation record and discards the session.

pub mod session;
pub mod validate;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::store::{ProductionStore, StoreError};

pub use session::{MemorySessionStore, SessionError, SessionStore, new_session_id};
pub use validate::{
    FieldError, validate_dimensions, validate_location, validate_orientation, validate_step,
    validate_type_selection, validated_installation,
};

/// Position in the intake sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IntakeStep {
    #[default]
    Location = 1,
    TypeSelection = 2,
    Orientation = 3,
    Dimensions = 4,
}

impl IntakeStep {
    pub const FIRST: Self = Self::Location;
    pub const LAST: Self = Self::Dimensions;

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Maps any requested step number into `[1, 4]`.
    pub fn clamped(requested: i64) -> Self {
        match requested {
            i64::MIN..=1 => Self::Location,
            2 => Self::TypeSelection,
            3 => Self::Orientation,
            _ => Self::Dimensions,
        }
    }

    pub fn next(self) -> Self {
        Self::clamped(i64::from(self.number()) + 1)
    }

    pub fn previous(self) -> Self {
        Self::clamped(i64::from(self.number()) - 1)
    }
}

impl From<IntakeStep> for u8 {
    fn from(step: IntakeStep) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for IntakeStep {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=4 => Ok(Self::clamped(i64::from(value))),
            other => Err(format!("intake step must be between 1 and 4, got {other}")),
        }
    }
}

/// Everything a submitter can enter across the four steps.
///
/// Angles are in degrees, lengths in metres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeFields {
    pub street: Option<String>,
    pub street_number: Option<i32>,
    pub postal_code: Option<i32>,
    pub locality: Option<String>,
    pub energy_type: Option<String>,
    pub panel_technology: Option<String>,
    pub integration_type: Option<String>,
    pub azimuth: Option<f64>,
    pub inclination: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
}

impl IntakeFields {
    /// Copies the fields owned by `step` from `submitted`, leaving the rest.
    pub fn merge_step(&mut self, step: IntakeStep, submitted: &IntakeFields) {
        match step {
            IntakeStep::Location => {
                self.street = submitted.street.clone();
                self.street_number = submitted.street_number;
                self.postal_code = submitted.postal_code;
                self.locality = submitted.locality.clone();
            }
            IntakeStep::TypeSelection => {
                self.energy_type = submitted.energy_type.clone();
                self.panel_technology = submitted.panel_technology.clone();
                self.integration_type = submitted.integration_type.clone();
            }
            IntakeStep::Orientation => {
                self.azimuth = submitted.azimuth;
                self.inclination = submitted.inclination;
            }
            IntakeStep::Dimensions => {
                self.length = submitted.length;
                self.width = submitted.width;
            }
        }
    }
}

/// Accumulated state of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeForm {
    pub step: IntakeStep,
    #[serde(flatten)]
    pub fields: IntakeFields,
}

/// Navigation requested alongside a step submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    #[default]
    Next,
    Previous,
}

/// One round trip: the step being submitted and its fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepSubmission {
    pub step: IntakeStep,
    #[serde(default)]
    pub action: StepAction,
    #[serde(flatten)]
    pub fields: IntakeFields,
}

/// Result of submitting a step.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The session moved to `form.step`.
    Advanced(IntakeForm),
    /// The session returned to `form.step` without validation.
    SteppedBack(IntakeForm),
    /// Validation failed; `form.step` is unchanged.
    Rejected {
        form: IntakeForm,
        errors: Vec<FieldError>,
    },
    /// The installation was written and the session discarded.
    Committed { registration_number: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drives intake sessions against a production store.
pub struct IntakeWorkflow<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    sessions: &'a T,
}

impl<'a, S, T> IntakeWorkflow<'a, S, T>
where
    S: ProductionStore + ?Sized,
    T: SessionStore + ?Sized,
{
    pub fn new(store: &'a S, sessions: &'a T) -> Self {
        Self { store, sessions }
    }

    /// Opens a new session with an empty form at the first step.
    pub fn start(&self) -> Result<String, WorkflowError> {
        let session = new_session_id();
        self.sessions.save(&session, IntakeForm::default())?;
        debug!(%session, "intake session started");
        Ok(session)
    }

    /// The saved form, presented at `step` (clamped into range) when given.
    ///
    /// Unknown sessions yield an empty form.
    pub fn view(&self, session: &str, step: Option<i64>) -> Result<IntakeForm, WorkflowError> {
        let mut form = self.sessions.load(session)?.unwrap_or_default();
        if let Some(requested) = step {
            form.step = IntakeStep::clamped(requested);
        }
        Ok(form)
    }

    /// Merges a step submission into the session and validates it.
    ///
    /// Steps up to the session's current one may be submitted; a later step
    /// is rejected untouched. Otherwise the merged form is saved whether or
    /// not validation passes, so fields from earlier steps survive a failed
    /// later step.
    pub fn submit(
        &self,
        session: &str,
        submission: &StepSubmission,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let mut form = self.sessions.load(session)?.unwrap_or_default();
        if submission.step > form.step {
            warn!(
                %session,
                step = submission.step.number(),
                current = form.step.number(),
                "intake step submitted out of sequence"
            );
            let errors = vec![FieldError {
                field: "step",
                message: format!("step {} must be completed first", form.step.number()),
            }];
            return Ok(SubmitOutcome::Rejected { form, errors });
        }
        form.step = submission.step;
        form.fields.merge_step(submission.step, &submission.fields);

        if submission.step == IntakeStep::LAST && submission.action == StepAction::Previous {
            form.step = IntakeStep::LAST.previous();
            self.sessions.save(session, form.clone())?;
            debug!(%session, step = form.step.number(), "intake stepped back");
            return Ok(SubmitOutcome::SteppedBack(form));
        }

        if submission.step == IntakeStep::LAST {
            return match validated_installation(&form.fields) {
                Ok(installation) => {
                    let registration_number = self.store.insert_installation(&installation)?;
                    self.sessions.remove(session)?;
                    info!(
                        %session,
                        registration_number,
                        surface_m2 = installation.surface_m2(),
                        "intake committed"
                    );
                    Ok(SubmitOutcome::Committed {
                        registration_number,
                    })
                }
                Err(errors) => self.reject(session, form, errors),
            };
        }

        let errors = validate_step(submission.step, &form.fields);
        if !errors.is_empty() {
            return self.reject(session, form, errors);
        }

        form.step = submission.step.next();
        self.sessions.save(session, form.clone())?;
        debug!(%session, step = form.step.number(), "intake advanced");
        Ok(SubmitOutcome::Advanced(form))
    }

    fn reject(
        &self,
        session: &str,
        form: IntakeForm,
        errors: Vec<FieldError>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        warn!(%session, step = form.step.number(), errors = errors.len(), "intake step rejected");
        self.sessions.save(session, form.clone())?;
        Ok(SubmitOutcome::Rejected { form, errors })
    }
}
