pub mod dto;

pub use dto::{DebugOptions, DebugStages, PipelineData, PipelineDto, RouteBinding};
