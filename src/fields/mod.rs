//! Field resolvers: the createStory workflow and the single-stage
//! listStories / publish pipelines.

pub mod create_story;
pub mod list_stories;
pub mod publish;

pub use create_story::{
    GenerateStoryFunction, GetSecretFunction, InitFunction, SaveStoryFunction,
};
pub use list_stories::ListStoriesFunction;
pub use publish::PublishFunction;
