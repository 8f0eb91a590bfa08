//! Classification of continuous rasters into categories

mod reclassify;

pub use reclassify::{classify_value, reclassify, ReclassEntry, ReclassifyParams, UNCLASSIFIED};
