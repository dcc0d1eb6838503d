pub mod annotation;
pub mod assessment;
pub mod draft;
pub mod loaders;
pub mod session;
pub mod task;

pub use annotation::{
    available_categories, Annotation, AnnotationStats, AnnotationType, Severity, TextSegment,
};
pub use assessment::{PlacementResult, Task1Assessment, Task2Assessment, TaskAssessment};
pub use draft::{count_words, format_elapsed, EssayDraft};
pub use loaders::{load_essay, load_topic_bank, TopicBankFile};
pub use session::{SessionId, SessionKind, Step};
pub use task::{PromptDetails, TaskKind, TaskPrompt};
