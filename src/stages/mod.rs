pub mod invoke;
pub mod pipeline;
pub mod stage1_review;
pub mod stage2_validate;
pub mod stage3_refactor;

pub use invoke::*;
pub use pipeline::*;
pub use stage1_review::*;
pub use stage2_validate::*;
pub use stage3_refactor::*;
