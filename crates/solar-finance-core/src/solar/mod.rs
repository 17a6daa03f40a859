pub mod assumptions;
pub mod fields;
pub mod model;
pub mod projection;
pub mod returns;
pub mod validation;
