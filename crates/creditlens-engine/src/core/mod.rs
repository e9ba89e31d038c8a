pub use self::{catalog::*, derived::*, encoding::*, record::*};

pub(crate) mod catalog;
pub(crate) mod derived;
pub(crate) mod encoding;
pub(crate) mod record;
