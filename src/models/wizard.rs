use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Loading,
    NotFound,
    LoadFailed,
    SelectingService,
    SelectingStaff,
    SelectingDate,
    SelectingTime,
    FillingContactForm,
    Submitting,
    Succeeded,
    Failed,
}

impl WizardStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStage::Loading => "loading",
            WizardStage::NotFound => "not_found",
            WizardStage::LoadFailed => "load_failed",
            WizardStage::SelectingService => "selecting_service",
            WizardStage::SelectingStaff => "selecting_staff",
            WizardStage::SelectingDate => "selecting_date",
            WizardStage::SelectingTime => "selecting_time",
            WizardStage::FillingContactForm => "filling_contact_form",
            WizardStage::Submitting => "submitting",
            WizardStage::Succeeded => "succeeded",
            WizardStage::Failed => "failed",
        }
    }

    /// Stages from which the customer may (re)make selections.
    pub fn accepts_selection(&self) -> bool {
        !matches!(
            self,
            WizardStage::Loading
                | WizardStage::NotFound
                | WizardStage::LoadFailed
                | WizardStage::Submitting
        )
    }
}
