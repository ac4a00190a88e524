mod category;
mod prediction;
mod query;

pub use category::{Category, CategorySet, clean_category_name};
pub use prediction::{Prediction, Predictions};
pub use query::QuerySet;
