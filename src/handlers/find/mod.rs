mod find_post;

pub use find_post::find_post;
