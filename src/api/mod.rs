pub mod extract;
pub mod pagination;

pub use extract::{JsonBody, PathParam, QueryParams};
pub use pagination::{Page, Paginated};
