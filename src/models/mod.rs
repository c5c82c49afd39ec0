pub mod artifact;
pub mod run;
pub mod trace;

pub use artifact::*;
pub use run::*;
pub use trace::*;
