pub mod input;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use input::{Token, TokenSet};
pub use phase::Phase;
pub use stimulus::{Congruency, Direction, StimulusDescriptor};
pub use trial::{Block, ConditionParams, Response, TaskKind, TrialRecord};
