// Domain-layer modules and shared errors/models
pub mod engine {
    pub use crate::engine::*;
}

pub mod matching {
    pub use crate::matching::*;
}

pub mod merge {
    pub use crate::merge::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
