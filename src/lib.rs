pub mod archive;
pub mod data;
pub mod pipeline;
pub mod transform;
pub mod vis;
