//! Questionnaire catalog: questionnaires and their embedded questions.

pub mod router;
pub mod service;


pub use router::questionnaire_router;
pub use service::{
    NewQuestionnaire, QuestionnaireChanges, QuestionnaireService, QuestionnaireStats,
};
