//! Session data and the transition table of the conversation state machine.

use crate::database::models::{Category, LocalityCandidate};
use crate::transport::ChatId;
use crate::ui::keyboard::Control;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Volunteer,
    Seeker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    RoleRequest,
    VolunteerCategory,
    VolunteerLocalityInput,
    VolunteerLocalityConfirm,
    VolunteerDescription,
    SeekerCategory,
    SeekerLocalityInput,
    SeekerLocalityConfirm,
    SeekerSubscribeOffer,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::RoleRequest => "role_request",
            Step::VolunteerCategory => "volunteer_category",
            Step::VolunteerLocalityInput => "volunteer_locality_input",
            Step::VolunteerLocalityConfirm => "volunteer_locality_confirm",
            Step::VolunteerDescription => "volunteer_description",
            Step::SeekerCategory => "seeker_category",
            Step::SeekerLocalityInput => "seeker_locality_input",
            Step::SeekerLocalityConfirm => "seeker_locality_confirm",
            Step::SeekerSubscribeOffer => "seeker_subscribe_offer",
        }
    }

    /// The role whose payload this step operates on.
    pub fn role(self) -> Option<Role> {
        match self {
            Step::RoleRequest => None,
            Step::VolunteerCategory
            | Step::VolunteerLocalityInput
            | Step::VolunteerLocalityConfirm
            | Step::VolunteerDescription => Some(Role::Volunteer),
            Step::SeekerCategory
            | Step::SeekerLocalityInput
            | Step::SeekerLocalityConfirm
            | Step::SeekerSubscribeOffer => Some(Role::Seeker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCheckbox {
    pub category_id: Uuid,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolunteerData {
    pub checkboxes: Vec<CategoryCheckbox>,
    pub candidates: Vec<LocalityCandidate>,
    pub locality: Option<LocalityCandidate>,
    pub description: Option<String>,
}

impl VolunteerData {
    pub fn new(categories: &[Category]) -> Self {
        Self {
            checkboxes: categories
                .iter()
                .map(|c| CategoryCheckbox {
                    category_id: c.id,
                    checked: false,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Flips the checkbox. Returns `false` for an unknown category.
    pub fn toggle(&mut self, category_id: Uuid) -> bool {
        match self
            .checkboxes
            .iter_mut()
            .find(|c| c.category_id == category_id)
        {
            Some(checkbox) => {
                checkbox.checked = !checkbox.checked;
                true
            }
            None => false,
        }
    }

    pub fn is_selected(&self, category_id: Uuid) -> bool {
        self.checkboxes
            .iter()
            .any(|c| c.category_id == category_id && c.checked)
    }

    /// Selected ids in category display order.
    pub fn selected(&self) -> Vec<Uuid> {
        self.checkboxes
            .iter()
            .filter(|c| c.checked)
            .map(|c| c.category_id)
            .collect()
    }

    pub fn has_selection(&self) -> bool {
        self.checkboxes.iter().any(|c| c.checked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeekerData {
    pub category: Option<Uuid>,
    pub candidates: Vec<LocalityCandidate>,
    pub locality: Option<LocalityCandidate>,
}

/// Role-specific payload. Holding it in one enum keeps the role and the payload
/// from disagreeing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Unset,
    Volunteer(VolunteerData),
    Seeker(SeekerData),
}

impl Flow {
    pub fn role(&self) -> Option<Role> {
        match self {
            Flow::Unset => None,
            Flow::Volunteer(_) => Some(Role::Volunteer),
            Flow::Seeker(_) => Some(Role::Seeker),
        }
    }

    /// Candidates of the last locality lookup.
    pub fn candidates(&self) -> &[LocalityCandidate] {
        match self {
            Flow::Unset => &[],
            Flow::Volunteer(d) => &d.candidates,
            Flow::Seeker(d) => &d.candidates,
        }
    }

    pub fn set_candidates(&mut self, candidates: Vec<LocalityCandidate>) {
        match self {
            Flow::Unset => {}
            Flow::Volunteer(d) => d.candidates = candidates,
            Flow::Seeker(d) => d.candidates = candidates,
        }
    }

    /// Records the chosen candidate and clears the candidate list.
    pub fn confirm_locality(&mut self, locality: LocalityCandidate) {
        match self {
            Flow::Unset => {}
            Flow::Volunteer(d) => {
                d.candidates.clear();
                d.locality = Some(locality);
            }
            Flow::Seeker(d) => {
                d.candidates.clear();
                d.locality = Some(locality);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub chat_id: ChatId,
    pub step: Step,
    pub flow: Flow,
    /// Controls of the last prompt; inbound text is resolved against these.
    pub controls: Vec<Control>,
}

impl Session {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            step: Step::RoleRequest,
            flow: Flow::Unset,
            controls: Vec::new(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.flow.role()
    }

    /// The current step and the payload belong to the same role.
    pub fn is_consistent(&self) -> bool {
        self.step.role() == self.flow.role()
    }
}

/// Outcome of one step handler, fed to `transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RoleChosen(Role),
    QuotaExceeded,
    CategoryToggled,
    CategoriesConfirmed,
    CategoryPicked,
    CandidatesFound,
    NoCandidates,
    LocalityConfirmed,
    HelpCreated,
    Subscribed,
    AlreadySubscribed,
    /// Input that maps to no action in this step.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Goto(Step),
    /// The flow is over; the session is removed.
    Finish,
}

pub fn transition(step: Step, signal: Signal) -> Transition {
    use Signal as S;
    use Step::*;
    use Transition::*;

    match (step, signal) {
        (RoleRequest, S::RoleChosen(Role::Volunteer)) => Goto(VolunteerCategory),
        (RoleRequest, S::RoleChosen(Role::Seeker)) => Goto(SeekerCategory),
        (RoleRequest, S::QuotaExceeded) => Finish,

        (VolunteerCategory, S::CategoryToggled) => Stay,
        (VolunteerCategory, S::CategoriesConfirmed) => Goto(VolunteerLocalityInput),

        (VolunteerLocalityInput, S::CandidatesFound) => Goto(VolunteerLocalityConfirm),
        (VolunteerLocalityConfirm, S::LocalityConfirmed) => Goto(VolunteerDescription),
        (VolunteerLocalityConfirm, S::CandidatesFound) => Stay,
        (VolunteerLocalityConfirm, S::NoCandidates) => Goto(VolunteerLocalityInput),

        (VolunteerDescription, S::HelpCreated) => Finish,

        (SeekerCategory, S::CategoryPicked) => Goto(SeekerLocalityInput),

        (SeekerLocalityInput, S::CandidatesFound) => Goto(SeekerLocalityConfirm),
        (SeekerLocalityConfirm, S::LocalityConfirmed) => Goto(SeekerSubscribeOffer),
        (SeekerLocalityConfirm, S::CandidatesFound) => Stay,
        (SeekerLocalityConfirm, S::NoCandidates) => Goto(SeekerLocalityInput),

        (SeekerSubscribeOffer, S::Subscribed) => Finish,
        (SeekerSubscribeOffer, S::AlreadySubscribed) => Stay,

        _ => Stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        ["Food", "Medicine", "Clothing"]
            .into_iter()
            .map(|name| Category {
                id: Uuid::new_v4(),
                name_ua: name.into(),
                name_en: name.into(),
            })
            .collect()
    }

    #[test]
    fn double_toggle_restores_selection() {
        let cats = categories();
        let mut data = VolunteerData::new(&cats);
        data.toggle(cats[0].id);
        let before = data.clone();

        assert!(data.toggle(cats[1].id));
        assert!(data.toggle(cats[1].id));
        assert_eq!(data, before);
        assert_eq!(data.selected(), vec![cats[0].id]);
    }

    #[test]
    fn unknown_category_is_not_toggled() {
        let cats = categories();
        let mut data = VolunteerData::new(&cats);
        assert!(!data.toggle(Uuid::new_v4()));
        assert!(!data.has_selection());
    }

    #[test]
    fn selection_keeps_display_order() {
        let cats = categories();
        let mut data = VolunteerData::new(&cats);
        data.toggle(cats[2].id);
        data.toggle(cats[0].id);
        assert_eq!(data.selected(), vec![cats[0].id, cats[2].id]);
    }

    #[test]
    fn volunteer_path() {
        assert_eq!(
            transition(Step::RoleRequest, Signal::RoleChosen(Role::Volunteer)),
            Transition::Goto(Step::VolunteerCategory)
        );
        assert_eq!(
            transition(Step::VolunteerCategory, Signal::CategoryToggled),
            Transition::Stay
        );
        assert_eq!(
            transition(Step::VolunteerCategory, Signal::CategoriesConfirmed),
            Transition::Goto(Step::VolunteerLocalityInput)
        );
        assert_eq!(
            transition(Step::VolunteerLocalityInput, Signal::CandidatesFound),
            Transition::Goto(Step::VolunteerLocalityConfirm)
        );
        assert_eq!(
            transition(Step::VolunteerLocalityConfirm, Signal::LocalityConfirmed),
            Transition::Goto(Step::VolunteerDescription)
        );
        assert_eq!(
            transition(Step::VolunteerDescription, Signal::HelpCreated),
            Transition::Finish
        );
    }

    #[test]
    fn unmatched_confirmation_falls_back_to_input() {
        assert_eq!(
            transition(Step::VolunteerLocalityConfirm, Signal::NoCandidates),
            Transition::Goto(Step::VolunteerLocalityInput)
        );
        assert_eq!(
            transition(Step::SeekerLocalityConfirm, Signal::NoCandidates),
            Transition::Goto(Step::SeekerLocalityInput)
        );
        assert_eq!(
            transition(Step::SeekerLocalityInput, Signal::NoCandidates),
            Transition::Stay
        );
    }

    #[test]
    fn seeker_path_and_soft_terminal() {
        assert_eq!(
            transition(Step::RoleRequest, Signal::RoleChosen(Role::Seeker)),
            Transition::Goto(Step::SeekerCategory)
        );
        assert_eq!(
            transition(Step::SeekerLocalityConfirm, Signal::LocalityConfirmed),
            Transition::Goto(Step::SeekerSubscribeOffer)
        );
        assert_eq!(
            transition(Step::SeekerSubscribeOffer, Signal::Subscribed),
            Transition::Finish
        );
        assert_eq!(
            transition(Step::SeekerSubscribeOffer, Signal::AlreadySubscribed),
            Transition::Stay
        );
        assert_eq!(
            transition(Step::SeekerSubscribeOffer, Signal::Invalid),
            Transition::Stay
        );
    }

    #[test]
    fn quota_rejection_ends_the_flow() {
        assert_eq!(
            transition(Step::RoleRequest, Signal::QuotaExceeded),
            Transition::Finish
        );
    }

    #[test]
    fn invalid_input_never_moves() {
        for step in [
            Step::RoleRequest,
            Step::VolunteerCategory,
            Step::VolunteerLocalityInput,
            Step::VolunteerLocalityConfirm,
            Step::VolunteerDescription,
            Step::SeekerCategory,
            Step::SeekerLocalityInput,
            Step::SeekerLocalityConfirm,
            Step::SeekerSubscribeOffer,
        ] {
            assert_eq!(transition(step, Signal::Invalid), Transition::Stay, "{step:?}");
        }
    }

    #[test]
    fn payload_matches_role() {
        let mut session = Session::new(ChatId(1));
        assert!(session.is_consistent());
        session.step = Step::VolunteerCategory;
        assert!(!session.is_consistent());
        session.flow = Flow::Volunteer(VolunteerData::default());
        assert!(session.is_consistent());
        assert_eq!(session.role(), Some(Role::Volunteer));
    }
}
