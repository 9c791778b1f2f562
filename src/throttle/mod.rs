pub mod dispatcher;
pub mod gate;

pub use dispatcher::{Dispatcher, SubmissionHandle};
pub use gate::RateGate;
