// Library surface for the quiz round engine, question selection and progression.
// The binary in main.rs only wires these to the terminal and the profile file.
pub mod app_dirs;
pub mod bank;
pub mod config;
pub mod error;
pub mod play;
pub mod question;
pub mod review;
pub mod round;
pub mod round_source;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod shuffle;
pub mod stats;
pub mod timer;
pub mod util;

pub use question::{AnswerOutcome, Question, QuestionView};
pub use round::{RoundEngine, RoundResult, TimerEvent};
pub use session::{RoundOptions, RoundPhase};
