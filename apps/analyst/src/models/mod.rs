// Shared data contracts passed between the agent loop, the tools and the HTTP layer.

pub mod resume;
