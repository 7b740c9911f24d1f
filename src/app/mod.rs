//! Result consumer: the single owner of everything that gets displayed.

pub mod presenter;
pub mod readout;

pub use presenter::{Presenter, SessionSummary};
pub use readout::{MetricsDisplay, MovingAverage, Readout};
