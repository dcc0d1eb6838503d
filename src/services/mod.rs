pub mod draft_timer;
pub mod draft_writer;
pub mod overlay_engine;
pub mod score_aggregator;

pub use draft_timer::{DraftStore, DraftTimer, TimerSettings};
pub use draft_writer::DraftWriter;
pub use overlay_engine::{build_segments, AnnotationFilter, AnnotationOverlayEngine};
pub use score_aggregator::{band_label, criterion_average, overall_band_score, round_to_half};
