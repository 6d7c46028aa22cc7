#![forbid(unsafe_code)]

pub mod grader;
pub mod model;
pub mod policy;
pub mod time;
pub mod window;

pub use grader::{grade, is_blank, normalize_answer};
pub use policy::{AdaptivePolicy, FeedbackPolicy, StaticPolicy};
pub use time::Clock;
pub use window::PerformanceWindow;
