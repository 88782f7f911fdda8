pub mod estimate;
pub mod horizon;

pub use estimate::Estimate;
pub use horizon::HorizonMap;
