pub mod config;
pub mod detectors;
pub mod error;
pub mod filters;
pub mod io;
pub mod request;
pub mod signal;
pub mod window;

pub use detectors::*;
pub use error::{SpikeError, SpikeResult};
pub use filters::*;
pub use signal::*;
pub use window::{detect_window, sweep_windows, SweepReport, WindowReport, WindowSpec};
