pub mod clips;
pub mod dispatch;
pub mod video;
pub mod workflows;
