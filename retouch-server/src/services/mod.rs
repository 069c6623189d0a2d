//! Network collaborators: the source image fetcher and the remote
//! generation client

pub mod fetch;
pub mod generation;
