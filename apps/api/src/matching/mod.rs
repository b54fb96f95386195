pub mod analysis;
pub mod extraction;
pub mod fit;
pub mod handlers;
pub mod placeholder;
pub mod prompts;
pub mod ranker;
pub mod recommend;
pub mod skills;
