pub mod certificate;
pub mod quota;

pub use certificate::*;
pub use quota::*;
